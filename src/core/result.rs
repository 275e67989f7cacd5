use serde::{Serialize, Deserialize};
use crate::core::types::DataType;

/// 一条语句的执行结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// 形如 `table.column` 的字段名，与每行的值按位置对应
    pub fields: Vec<String>,
    pub rows: Vec<Vec<DataType>>,
    pub messages: Vec<String>,
    pub error: Option<String>,
}

impl QueryResult {
    pub fn message(message: impl Into<String>) -> Self {
        QueryResult {
            messages: vec![message.into()],
            ..QueryResult::default()
        }
    }

    pub fn table(fields: Vec<String>, rows: Vec<Vec<DataType>>) -> Self {
        QueryResult {
            fields,
            rows,
            ..QueryResult::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        QueryResult {
            error: Some(error.into()),
            ..QueryResult::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn has_rows(&self) -> bool {
        !self.fields.is_empty()
    }
}
