use regex::Captures;
use tracing::info;
use crate::core::error::DbError;
use crate::core::result::QueryResult;
use super::{DbAction, ExecutionContext};

fn database_name(captures: &Captures<'_>) -> Result<String, DbError> {
    captures
        .name("DatabaseName")
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| DbError::SqlError("缺少数据库名".to_string()))
}

/// CREATE DATABASE name
#[derive(Debug)]
pub struct CreateDatabase {
    name: String,
}

impl CreateDatabase {
    pub fn from_match(captures: &Captures<'_>) -> Result<Self, DbError> {
        Ok(CreateDatabase {
            name: database_name(captures)?,
        })
    }
}

impl DbAction for CreateDatabase {
    fn name(&self) -> &'static str {
        "CREATE DATABASE"
    }

    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<QueryResult, DbError> {
        ctx.store.create_database(&self.name)?;
        info!("创建数据库 {}", self.name);
        Ok(QueryResult::message(format!("Database {} created", self.name)))
    }
}

/// DROP DATABASE name
#[derive(Debug)]
pub struct DropDatabase {
    name: String,
}

impl DropDatabase {
    pub fn from_match(captures: &Captures<'_>) -> Result<Self, DbError> {
        Ok(DropDatabase {
            name: database_name(captures)?,
        })
    }
}

impl DbAction for DropDatabase {
    fn name(&self) -> &'static str {
        "DROP DATABASE"
    }

    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<QueryResult, DbError> {
        ctx.store.drop_database(&self.name)?;
        ctx.sessions.forget_database(&self.name);
        info!("删除数据库 {}", self.name);
        Ok(QueryResult::message(format!("Database {} dropped", self.name)))
    }
}

/// USE name：设置当前会话的数据库
#[derive(Debug)]
pub struct Use {
    name: String,
}

impl Use {
    pub fn from_match(captures: &Captures<'_>) -> Result<Self, DbError> {
        Ok(Use {
            name: database_name(captures)?,
        })
    }
}

impl DbAction for Use {
    fn name(&self) -> &'static str {
        "USE"
    }

    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<QueryResult, DbError> {
        // 只允许切换到已存在的数据库
        if !ctx.store.list_databases()?.contains(&self.name) {
            return Err(DbError::TableError(format!("数据库 {} 不存在", self.name)));
        }
        ctx.sessions.set(ctx.session, &self.name);
        Ok(QueryResult::message(format!("Using database {}", self.name)))
    }
}
