use std::path::PathBuf;
use tracing::{debug, info};
use crate::core::actions::ExecutionContext;
use crate::core::dispatcher::CommandDispatcher;
use crate::core::error::{DbError, ErrorDisplayMode};
use crate::core::result::QueryResult;
use crate::core::session::{SessionId, SessionStore};
use crate::core::storage::{file::FileStorage, memory::MemoryStorage, TableStore};

pub enum StorageType {
    File(PathBuf),
    Memory,
}

pub struct Database {
    storage: Box<dyn TableStore>,
    sessions: SessionStore,
    dispatcher: CommandDispatcher,
    default_session: SessionId,
    error_mode: ErrorDisplayMode, // 错误显示模式
}

impl Database {
    pub fn new(storage_type: StorageType) -> Self {
        let storage: Box<dyn TableStore> = match storage_type {
            StorageType::File(path) => Box::new(FileStorage::new(path)),
            StorageType::Memory => Box::new(MemoryStorage::new()),
        };

        Database {
            storage,
            sessions: SessionStore::new(),
            dispatcher: CommandDispatcher::new(),
            default_session: SessionId::new(),
            error_mode: ErrorDisplayMode::Brief, // 默认使用简略模式
        }
    }

    // 设置错误显示模式
    pub fn set_error_mode(&mut self, mode: ErrorDisplayMode) {
        self.error_mode = mode;
    }

    pub fn error_mode(&self) -> ErrorDisplayMode {
        self.error_mode
    }

    // 切换错误显示模式
    pub fn toggle_error_mode(&mut self) -> ErrorDisplayMode {
        self.error_mode = match self.error_mode {
            ErrorDisplayMode::Brief => ErrorDisplayMode::Detailed,
            ErrorDisplayMode::Detailed => ErrorDisplayMode::Brief,
        };
        self.error_mode
    }

    // 根据当前模式格式化错误信息
    pub fn format_error(&self, error: &DbError) -> String {
        error.message(self.error_mode)
    }

    /// 新建一个会话，初始没有选择数据库
    pub fn open_session(&mut self) -> SessionId {
        let session = SessionId::new();
        debug!("打开会话 {}", session);
        session
    }

    pub fn close_session(&mut self, session: SessionId) {
        self.sessions.remove(session);
    }

    pub fn default_session(&self) -> SessionId {
        self.default_session
    }

    pub fn current_database(&self, session: SessionId) -> Option<&str> {
        self.sessions.get(session)
    }

    /// 执行一段 SQL 文本：按批次顺序执行每条语句，每条语句对应一个结果。
    /// 单条语句失败只记录在它自己的结果里；无法识别的语句会使整段文本失败。
    pub fn execute(&mut self, session: SessionId, sql: &str) -> Result<Vec<QueryResult>, DbError> {
        let batches = self.dispatcher.to_batches(sql)?;
        let mut results = Vec::new();

        let mut ctx = ExecutionContext {
            store: &mut *self.storage,
            sessions: &mut self.sessions,
            session,
            error_mode: self.error_mode,
        };
        for (number, batch) in batches.into_iter().enumerate() {
            debug!("执行第 {} 批, 共 {} 条语句", number + 1, batch.len());
            for mut action in batch {
                results.push(action.perform(&mut ctx));
            }
        }

        let failed = results.iter().filter(|r| r.is_error()).count();
        info!("执行完成: {} 条语句, {} 条失败", results.len(), failed);
        Ok(results)
    }

    // 使用默认会话执行SQL
    pub fn execute_sql(&mut self, sql: &str) -> Result<Vec<QueryResult>, DbError> {
        let session = self.default_session;
        self.execute(session, sql)
    }

    pub fn list_databases(&self) -> Result<Vec<String>, DbError> {
        self.storage.list_databases()
    }

    pub fn list_tables(&self, session: SessionId) -> Result<Vec<String>, DbError> {
        let database = self.sessions.get(session).ok_or(DbError::NoDatabaseInUse)?;
        self.storage.list_tables(database)
    }

    // 持久化
    pub fn save(&self) -> Result<(), DbError> {
        self.storage.save()
    }

    pub fn load(&mut self) -> Result<(), DbError> {
        self.storage.load()
    }
}
