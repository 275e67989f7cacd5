use regex::Captures;
use tracing::info;
use crate::core::error::DbError;
use crate::core::result::QueryResult;
use crate::core::sql::{
    Aggregation, GroupedRows, Join, Parser, StatementEvaluator, TableDetail, TableService,
};
use crate::core::types::DataType;
use super::{split_top_level, DbAction, ExecutionContext};

const RESERVED: &[&str] = &["WHERE", "JOIN", "INNER", "ON", "AS"];

/// 投影列表
enum Projection {
    Columns(Vec<(String, String)>),
    Aggregations(Vec<Aggregation>),
}

/// SELECT cols FROM table [alias] [JOIN ...] [WHERE ...]
#[derive(Debug)]
pub struct Select {
    columns: String,
    table: String,
    alias: Option<String>,
    joins: String,
    where_statement: Option<String>,
}

impl Select {
    pub fn from_match(captures: &Captures<'_>) -> Result<Self, DbError> {
        let table_part = captures
            .name("TableName")
            .map(|m| m.as_str())
            .ok_or_else(|| DbError::SqlError("期望表名".to_string()))?;
        let (table, alias) = parse_table_with_alias(table_part)?;

        Ok(Select {
            columns: captures
                .name("Columns")
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            table,
            alias,
            joins: captures
                .name("Joins")
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            where_statement: captures.name("WhereStatement").map(|m| m.as_str().to_string()),
        })
    }

    /// 解析 SELECT 列表：`*`、列引用或聚合函数，两类不能混用
    fn projection(&self, tables: &TableService) -> Result<Projection, DbError> {
        let items = split_top_level(&self.columns);
        if items.len() == 1 && items[0] == "*" {
            let columns = tables
                .all_columns()
                .iter()
                .filter_map(|qualified| qualified.split_once('.'))
                .map(|(table, column)| (table.to_string(), column.to_string()))
                .collect();
            return Ok(Projection::Columns(columns));
        }

        let mut columns = Vec::new();
        let mut aggregations = Vec::new();
        for item in &items {
            if let Some(mut aggregation) = Aggregation::parse(item) {
                aggregation.validate(tables)?;
                aggregations.push(aggregation);
            } else if item == "*" || item.is_empty() {
                return Err(DbError::SqlError(format!("非法的选择列表: {}", self.columns)));
            } else {
                let (table, column) = tables.resolve(item)?;
                columns.push((table.name_in_use().to_string(), column));
            }
        }

        match (columns.is_empty(), aggregations.is_empty()) {
            (false, true) => Ok(Projection::Columns(columns)),
            (true, false) => Ok(Projection::Aggregations(aggregations)),
            _ => Err(DbError::InvalidExpression(
                "聚合函数不能与普通列同时选择".to_string(),
            )),
        }
    }

    fn rows(
        &self,
        ctx: &ExecutionContext<'_>,
        tables: &TableService,
        join: &Join,
        from_table: &TableDetail,
    ) -> Result<GroupedRows, DbError> {
        match &self.where_statement {
            Some(text) => {
                let tree = Parser::new().parse_where(text)?;
                StatementEvaluator::new(&*ctx.store, tables, join, from_table).evaluate(&tree)
            }
            None if join.contains_join() => join.evaluate(from_table.grouped_content()),
            None => Ok(from_table.grouped_content()),
        }
    }
}

fn parse_table_with_alias(text: &str) -> Result<(String, Option<String>), DbError> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let (table, alias) = match words.as_slice() {
        [table] => (*table, None),
        [table, alias] => (*table, Some(*alias)),
        [table, keyword, alias] if keyword.eq_ignore_ascii_case("AS") => (*table, Some(*alias)),
        _ => return Err(DbError::SqlError(format!("无法解析的表名: {}", text))),
    };
    if let Some(alias) = alias {
        if RESERVED.iter().any(|word| word.eq_ignore_ascii_case(alias)) {
            return Err(DbError::SqlError(format!("别名不能是关键字: {}", alias)));
        }
    }
    Ok((table.to_string(), alias.map(str::to_string)))
}

impl DbAction for Select {
    fn name(&self) -> &'static str {
        "SELECT"
    }

    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<QueryResult, DbError> {
        let database = ctx.database()?;

        let mut tables = TableService::new(&database);
        let from_table = TableDetail::load(&*ctx.store, &database, &self.table, self.alias.clone())?;
        tables.register(from_table.clone())?;
        let join = Join::build(&Join::parse_clauses(&self.joins)?, &mut tables, &*ctx.store)?;

        // 聚合的类型校验在读取任何行之前完成
        let projection = self.projection(&tables)?;
        let rows = self.rows(ctx, &tables, &join, &from_table)?;
        info!("Rows selected: {}", rows.len());

        let result = match projection {
            Projection::Columns(columns) => {
                let fields = columns
                    .iter()
                    .map(|(table, column)| format!("{}.{}", table, column))
                    .collect();
                let values = rows
                    .values()
                    .map(|joined| {
                        columns
                            .iter()
                            .map(|(table, column)| {
                                joined
                                    .get(table)
                                    .and_then(|row| row.get(column))
                                    .cloned()
                                    .unwrap_or(DataType::Null)
                            })
                            .collect()
                    })
                    .collect();
                QueryResult::table(fields, values)
            }
            Projection::Aggregations(aggregations) => {
                let fields = aggregations.iter().map(|a| a.to_string()).collect();
                let values = aggregations
                    .iter()
                    .map(|a| a.apply(&rows))
                    .collect::<Result<Vec<_>, _>>()?;
                QueryResult::table(fields, vec![values])
            }
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_alias_forms() {
        assert_eq!(parse_table_with_alias("Users").unwrap(), ("Users".to_string(), None));
        assert_eq!(
            parse_table_with_alias("Users u").unwrap(),
            ("Users".to_string(), Some("u".to_string()))
        );
        assert_eq!(
            parse_table_with_alias("Users AS u").unwrap(),
            ("Users".to_string(), Some("u".to_string()))
        );
        assert!(parse_table_with_alias("Users where").is_err());
    }
}
