use regex::Captures;
use tracing::info;
use crate::core::error::DbError;
use crate::core::result::QueryResult;
use crate::core::sql::Parser;
use crate::core::types::Row;
use super::{parenthesized_groups, split_top_level, DbAction, ExecutionContext};

/// INSERT INTO table [(col, ...)] VALUES (...), (...)
#[derive(Debug)]
pub struct InsertInto {
    table: String,
    columns: Option<Vec<String>>,
    rows: Vec<String>,
}

impl InsertInto {
    pub fn from_match(captures: &Captures<'_>) -> Result<Self, DbError> {
        let table = captures
            .name("TableName")
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| DbError::SqlError("期望表名".to_string()))?;
        let columns = captures.name("Columns").map(|m| split_top_level(m.as_str()));
        let rows = parenthesized_groups(captures.name("Values").map_or("", |m| m.as_str()))?;
        if rows.is_empty() {
            return Err(DbError::SqlError("INSERT 缺少 VALUES".to_string()));
        }
        Ok(InsertInto { table, columns, rows })
    }
}

impl DbAction for InsertInto {
    fn name(&self) -> &'static str {
        "INSERT"
    }

    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<QueryResult, DbError> {
        let database = ctx.database()?;
        let columns = match &self.columns {
            Some(columns) => columns.clone(),
            None => ctx.store.get_schema(&database, &self.table)?.column_names(),
        };

        // 先解析全部行，语法错误时不插入任何数据
        let mut parser = Parser::new();
        let mut rows = Vec::with_capacity(self.rows.len());
        for raw in &self.rows {
            let values = parser.parse_values(raw)?;
            if values.len() != columns.len() {
                return Err(DbError::SqlError(format!(
                    "每行值的数量必须与列数一致: 期望 {}, 实际 {}",
                    columns.len(),
                    values.len()
                )));
            }
            rows.push(columns.iter().cloned().zip(values).collect::<Row>());
        }

        let mut inserted = 0;
        for row in rows {
            ctx.store.insert_row(&database, &self.table, row)?;
            inserted += 1;
        }
        info!("Rows affected: {}", inserted);
        Ok(QueryResult::message(format!("{} row(s) affected", inserted)))
    }
}
