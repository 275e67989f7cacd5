mod database;
mod delete;
mod index;
mod insert;
mod select;
mod table;

pub use database::{CreateDatabase, DropDatabase, Use};
pub use delete::DeleteFrom;
pub use index::CreateIndex;
pub use insert::InsertInto;
pub use select::Select;
pub use table::{CreateTable, DropTable};

use tracing::error;
use crate::core::error::{DbError, ErrorDisplayMode};
use crate::core::result::QueryResult;
use crate::core::session::{SessionId, SessionStore};
use crate::core::storage::TableStore;

/// 执行一条语句时可用的环境
pub struct ExecutionContext<'a> {
    pub store: &'a mut dyn TableStore,
    pub sessions: &'a mut SessionStore,
    pub session: SessionId,
    pub error_mode: ErrorDisplayMode,
}

impl<'a> ExecutionContext<'a> {
    /// 当前会话使用的数据库
    pub fn database(&self) -> Result<String, DbError> {
        self.sessions
            .get(self.session)
            .map(str::to_string)
            .ok_or(DbError::NoDatabaseInUse)
    }
}

/// 由语句匹配结果构造出的可执行动作
pub trait DbAction {
    fn name(&self) -> &'static str;

    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<QueryResult, DbError>;

    /// 执行并捕获错误，失败只影响这一条语句
    fn perform(&mut self, ctx: &mut ExecutionContext<'_>) -> QueryResult {
        match self.execute(ctx) {
            Ok(result) => result,
            Err(e) => {
                error!("{} 执行失败: {}", self.name(), e);
                QueryResult::failed(e.message(ctx.error_mode))
            }
        }
    }
}

/// 按顶层逗号切分，忽略括号和引号内的逗号
pub(crate) fn split_top_level(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_quote = false;

    for c in text.chars() {
        match c {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => depth = depth.saturating_sub(1),
            ',' if !in_quote && depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.trim().is_empty() || !parts.is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// 取出顶层括号组的内容，例如 `(1, 'a'), (2, 'b')` -> ["1, 'a'", "2, 'b'"]
pub(crate) fn parenthesized_groups(text: &str) -> Result<Vec<String>, DbError> {
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_quote = false;

    for c in text.chars() {
        if in_quote {
            if c == '\'' {
                in_quote = false;
            }
            current.push(c);
            continue;
        }
        match c {
            '\'' => {
                in_quote = true;
                current.push(c);
            }
            '(' => {
                if depth > 0 {
                    current.push(c);
                }
                depth += 1;
            }
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| DbError::SqlError("括号不匹配".to_string()))?;
                if depth == 0 {
                    groups.push(current.trim().to_string());
                    current.clear();
                } else {
                    current.push(c);
                }
            }
            ',' if depth == 0 => {}
            c if depth == 0 && !c.is_whitespace() => {
                return Err(DbError::SqlError(format!("括号外出现多余字符: {}", c)));
            }
            _ if depth > 0 => current.push(c),
            _ => {}
        }
    }
    if depth != 0 || in_quote {
        return Err(DbError::SqlError("括号或引号不匹配".to_string()));
    }
    Ok(groups)
}
