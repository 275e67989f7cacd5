use regex::Captures;
use tracing::info;
use crate::core::error::DbError;
use crate::core::result::QueryResult;
use crate::core::types::IndexInfo;
use super::{split_top_level, DbAction, ExecutionContext};

/// CREATE [UNIQUE] INDEX name ON table (col, ...)
#[derive(Debug)]
pub struct CreateIndex {
    index: IndexInfo,
    table: String,
}

impl CreateIndex {
    pub fn from_match(captures: &Captures<'_>) -> Result<Self, DbError> {
        let name = captures
            .name("IndexName")
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| DbError::SqlError("期望索引名".to_string()))?;
        let table = captures
            .name("TableName")
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| DbError::SqlError("期望表名".to_string()))?;
        let columns = split_top_level(captures.name("Columns").map_or("", |m| m.as_str()));
        if columns.is_empty() || columns.iter().any(|c| c.is_empty()) {
            return Err(DbError::SqlError(format!("索引 {} 缺少列名", name)));
        }

        Ok(CreateIndex {
            index: IndexInfo {
                name,
                columns,
                unique: captures.name("Unique").is_some(),
            },
            table,
        })
    }
}

impl DbAction for CreateIndex {
    fn name(&self) -> &'static str {
        "CREATE INDEX"
    }

    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<QueryResult, DbError> {
        let database = ctx.database()?;
        ctx.store.create_index(&database, &self.table, self.index.clone())?;
        info!("在 {}.{} 上创建索引 {}", database, self.table, self.index.name);
        Ok(QueryResult::message(format!(
            "Index {} created on {}",
            self.index.name, self.table
        )))
    }
}
