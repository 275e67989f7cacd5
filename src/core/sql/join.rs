use std::sync::OnceLock;
use regex::Regex;
use crate::core::error::DbError;
use crate::core::storage::TableStore;
use crate::core::types::RowId;
use super::table::{GroupedRows, TableDetail, TableService};

/// 从文本中解析出的 JOIN 子句，尚未与任何表关联
#[derive(Debug, Clone, PartialEq)]
pub struct JoinSpec {
    pub table: String,
    pub alias: Option<String>,
    pub left: String,
    pub right: String,
}

/// 已解析到具体表的连接条件：left_table.left_column = target.right_column
#[derive(Debug, Clone)]
struct JoinClause {
    target: TableDetail,
    left_table: String,
    left_column: String,
    right_column: String,
}

/// 内连接求值器
#[derive(Debug, Clone, Default)]
pub struct Join {
    clauses: Vec<JoinClause>,
}

fn join_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)(?:INNER\s+)?JOIN\s+(?P<Table>\w+)(?:\s+(?:AS\s+)?(?P<Alias>\w+))??\s+ON\s+(?P<Left>[\w.]+)\s*=\s*(?P<Right>[\w.]+)",
        )
        .expect("join pattern is valid")
    })
}

impl Join {
    pub fn new() -> Self {
        Join::default()
    }

    /// 解析 `JOIN t [AS] [alias] ON a = b` 序列
    pub fn parse_clauses(raw: &str) -> Result<Vec<JoinSpec>, DbError> {
        let mut specs = Vec::new();
        let mut consumed = 0;
        for captures in join_pattern().captures_iter(raw) {
            let whole = captures.get(0).map_or(0..0, |m| m.range());
            if !raw[consumed..whole.start].trim().is_empty() {
                return Err(DbError::SqlError(format!(
                    "无法解析的JOIN子句: {}",
                    raw[consumed..whole.start].trim()
                )));
            }
            consumed = whole.end;
            specs.push(JoinSpec {
                table: captures["Table"].to_string(),
                alias: captures.name("Alias").map(|m| m.as_str().to_string()),
                left: captures["Left"].to_string(),
                right: captures["Right"].to_string(),
            });
        }
        if !raw[consumed..].trim().is_empty() {
            return Err(DbError::SqlError(format!(
                "无法解析的JOIN子句: {}",
                raw[consumed..].trim()
            )));
        }
        Ok(specs)
    }

    /// 加载每个被连接的表并注册到 TableService，解析连接条件两侧的列
    pub fn build(
        specs: &[JoinSpec],
        tables: &mut TableService,
        store: &dyn TableStore,
    ) -> Result<Self, DbError> {
        let mut clauses = Vec::new();
        for spec in specs {
            let detail = TableDetail::load(store, tables.database_name(), &spec.table, spec.alias.clone())?;
            let target_name = detail.name_in_use().to_string();
            tables.register(detail.clone())?;

            let (left_table, left_column) = resolve_side(tables, &spec.left)?;
            let (right_table, right_column) = resolve_side(tables, &spec.right)?;

            let (left_table, left_column, right_column) = if right_table == target_name && left_table != target_name {
                (left_table, left_column, right_column)
            } else if left_table == target_name && right_table != target_name {
                (right_table, right_column, left_column)
            } else {
                return Err(DbError::InvalidExpression(format!(
                    "连接条件 {} = {} 必须连接 {} 与之前的表",
                    spec.left, spec.right, target_name
                )));
            };

            clauses.push(JoinClause {
                target: detail,
                left_table,
                left_column,
                right_column,
            });
        }
        Ok(Join { clauses })
    }

    pub fn contains_join(&self) -> bool {
        !self.clauses.is_empty()
    }

    /// 表在连接后行标识中的位置：FROM 表为 0，第 k 个 JOIN 的表为 k
    pub fn part_index(&self, name_in_use: &str) -> Option<usize> {
        self.clauses
            .iter()
            .position(|clause| clause.target.name_in_use() == name_in_use)
            .map(|position| position + 1)
    }

    /// 依次应用每个连接子句，只保留两侧连接键相等的组合
    pub fn evaluate(&self, rows: GroupedRows) -> Result<GroupedRows, DbError> {
        let mut current = rows;
        for clause in &self.clauses {
            let target_name = clause.target.name_in_use();
            let mut next = GroupedRows::new();

            for (left_id, joined) in &current {
                let left_value = match joined
                    .get(&clause.left_table)
                    .and_then(|row| row.get(&clause.left_column))
                {
                    Some(value) if !value.is_null() => value,
                    _ => continue,
                };

                for (right_id, right_row) in &clause.target.content {
                    let right_value = match right_row.get(&clause.right_column) {
                        Some(value) if !value.is_null() => value,
                        _ => continue,
                    };
                    if left_value.value_eq(right_value)? {
                        let mut merged = joined.clone();
                        merged.insert(target_name.to_string(), right_row.clone());
                        next.insert(RowId::joined(left_id, right_id), merged);
                    }
                }
            }
            current = next;
        }
        Ok(current)
    }
}

fn resolve_side(tables: &TableService, column_ref: &str) -> Result<(String, String), DbError> {
    let (table, column) = tables.resolve(column_ref)?;
    Ok((table.name_in_use().to_string(), column))
}
