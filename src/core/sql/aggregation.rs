use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;
use regex::Regex;
use crate::core::error::DbError;
use crate::core::types::DataType;
use super::table::{GroupedRows, TableService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Min,
    Max,
}

impl AggregateFunction {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "COUNT" => Some(AggregateFunction::Count),
            "MIN" => Some(AggregateFunction::Min),
            "MAX" => Some(AggregateFunction::Max),
            _ => None,
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
        };
        write!(f, "{}", name)
    }
}

/// 聚合目标列解析后的位置
#[derive(Debug, Clone, PartialEq)]
enum Target {
    AllRows,
    Column { table: String, column: String },
}

/// SELECT 列表中的一个聚合函数，例如 `COUNT(*)` 或 `MAX(u.age)`
#[derive(Debug, Clone)]
pub struct Aggregation {
    function: AggregateFunction,
    column: String,
    target: Option<Target>,
}

fn aggregation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?P<Function>COUNT|MIN|MAX)\s*\(\s*(?P<Column>\*|[\w.]+)\s*\)\s*$")
            .expect("aggregation pattern is valid")
    })
}

impl Aggregation {
    pub fn new(function: AggregateFunction, column: &str) -> Self {
        Aggregation {
            function,
            column: column.to_string(),
            target: None,
        }
    }

    /// 识别 SELECT 列表中的聚合项，不是聚合时返回 None
    pub fn parse(text: &str) -> Option<Self> {
        let captures = aggregation_pattern().captures(text)?;
        let function = AggregateFunction::from_name(&captures["Function"])?;
        Some(Aggregation::new(function, &captures["Column"]))
    }

    pub fn function(&self) -> AggregateFunction {
        self.function
    }

    /// 解析目标列并检查类型，必须在 apply 之前调用一次
    pub fn validate(&mut self, tables: &TableService) -> Result<(), DbError> {
        if self.column == "*" {
            if self.function != AggregateFunction::Count {
                return Err(DbError::InvalidExpression(format!("{}(*) 不受支持", self.function)));
            }
            self.target = Some(Target::AllRows);
            return Ok(());
        }

        let (table, column) = tables.resolve(&self.column)?;
        let column_type = table
            .column_type(&column)
            .ok_or_else(|| DbError::UnknownColumn(self.column.clone()))?;

        let comparable = column_type.is_numeric() || column_type.is_string() || column_type.is_date();
        if self.function != AggregateFunction::Count && !comparable {
            return Err(DbError::UnsupportedColumnType {
                function: self.function.to_string(),
                column: self.column.clone(),
                column_type: column_type.to_string(),
            });
        }

        self.target = Some(Target::Column {
            table: table.name_in_use().to_string(),
            column,
        });
        Ok(())
    }

    pub fn apply(&self, rows: &GroupedRows) -> Result<DataType, DbError> {
        let (table, column) = match &self.target {
            Some(Target::AllRows) => return Ok(DataType::Int(rows.len() as i64)),
            Some(Target::Column { table, column }) => (table, column),
            None => {
                return Err(DbError::InvalidExpression(format!("{} 尚未校验", self)));
            }
        };

        let values = rows
            .values()
            .filter_map(|joined| joined.get(table).and_then(|row| row.get(column)))
            .filter(|value| !value.is_null());

        match self.function {
            AggregateFunction::Count => Ok(DataType::Int(values.count() as i64)),
            AggregateFunction::Min => extreme(values, Ordering::Less),
            AggregateFunction::Max => extreme(values, Ordering::Greater),
        }
    }
}

// 取最小或最大值，没有非空值时为 NULL
fn extreme<'r>(values: impl Iterator<Item = &'r DataType>, wanted: Ordering) -> Result<DataType, DbError> {
    let mut best: Option<&DataType> = None;
    for value in values {
        best = match best {
            Some(current) if value.compare(current)? != Some(wanted) => Some(current),
            _ => Some(value),
        };
    }
    Ok(best.cloned().unwrap_or(DataType::Null))
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.function, self.column)
    }
}
