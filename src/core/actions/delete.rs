use std::collections::BTreeSet;
use regex::Captures;
use tracing::info;
use crate::core::error::DbError;
use crate::core::result::QueryResult;
use crate::core::sql::{Join, Parser, StatementEvaluator, TableDetail, TableService};
use crate::core::types::RowId;
use super::{DbAction, ExecutionContext};

/// DELETE FROM table [WHERE ...]
#[derive(Debug)]
pub struct DeleteFrom {
    table: String,
    where_statement: Option<String>,
}

impl DeleteFrom {
    pub fn from_match(captures: &Captures<'_>) -> Result<Self, DbError> {
        Ok(DeleteFrom {
            table: captures
                .name("TableName")
                .map(|m| m.as_str().to_string())
                .ok_or_else(|| DbError::SqlError("期望表名".to_string()))?,
            where_statement: captures.name("WhereStatement").map(|m| m.as_str().to_string()),
        })
    }

    fn matching_rows(&self, ctx: &ExecutionContext<'_>, database: &str) -> Result<BTreeSet<RowId>, DbError> {
        let table = TableDetail::load(&*ctx.store, database, &self.table, None)?;
        let where_statement = match &self.where_statement {
            Some(text) => text,
            None => return Ok(table.content.keys().cloned().collect()),
        };

        let tree = Parser::new().parse_where(where_statement)?;
        let mut tables = TableService::new(database);
        tables.register(table.clone())?;
        let join = Join::new();
        let evaluator = StatementEvaluator::new(&*ctx.store, &tables, &join, &table);
        Ok(evaluator.evaluate(&tree)?.into_keys().collect())
    }
}

impl DbAction for DeleteFrom {
    fn name(&self) -> &'static str {
        "DELETE"
    }

    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<QueryResult, DbError> {
        let database = ctx.database()?;
        let ids = self.matching_rows(ctx, &database)?;
        let deleted = ctx.store.delete_rows(&database, &self.table, &ids)?;
        info!("Rows affected: {}", deleted);
        Ok(QueryResult::message(format!("{} row(s) affected", deleted)))
    }
}
