use std::io;
use clap::ValueEnum;
use thiserror::Error;

// 错误显示模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ErrorDisplayMode {
    Brief,    // 简略错误信息
    Detailed, // 详细错误信息
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("IO错误: {0}")]
    IoError(#[from] io::Error),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("表错误: {0}")]
    TableError(String),

    #[error("约束冲突: {0}")]
    ConstraintViolation(String),

    #[error("SQL语法错误: {0}")]
    SqlError(String),

    // 查询求值相关错误
    #[error("列名 {0} 不明确")]
    AmbiguousColumn(String),

    #[error("列 {0} 不存在")]
    UnknownColumn(String),

    #[error("非法表达式: {0}")]
    InvalidExpression(String),

    #[error("非法操作符: {0}")]
    InvalidOperator(String),

    #[error("类型不匹配: {left} 与 {right} 无法比较")]
    TypeMismatch { left: String, right: String },

    #[error("聚合函数 {function} 不支持列 {column} 的类型 {column_type}")]
    UnsupportedColumnType {
        function: String,
        column: String,
        column_type: String,
    },

    #[error("非法表达式树: {0}")]
    InvalidTree(String),

    #[error("当前会话未选择数据库")]
    NoDatabaseInUse,

    #[error("无法识别的关键字 {keyword} (第 {line} 行)")]
    UnmatchedStatement { keyword: String, line: usize },
}

impl DbError {
    pub fn type_mismatch(left: impl ToString, right: impl ToString) -> Self {
        DbError::TypeMismatch {
            left: left.to_string(),
            right: right.to_string(),
        }
    }

    // 根据显示模式格式化错误信息
    pub fn message(&self, mode: ErrorDisplayMode) -> String {
        match mode {
            ErrorDisplayMode::Brief => self.brief_message(),
            ErrorDisplayMode::Detailed => self.detailed_message(),
        }
    }

    // 获取详细的错误信息
    pub fn detailed_message(&self) -> String {
        self.to_string()
    }

    // 获取简略的错误信息
    pub fn brief_message(&self) -> String {
        match self {
            DbError::IoError(_) => "Error: IO error".to_string(),
            DbError::Serialization(_) => "Error: Serialization error".to_string(),
            DbError::TableError(msg) => format!("Error: {}", msg),
            DbError::ConstraintViolation(msg) => format!("Error: {}", msg),
            DbError::SqlError(_) => "Error: Syntax error".to_string(),
            DbError::AmbiguousColumn(column) => format!("Error: Ambiguous column '{}'", column),
            DbError::UnknownColumn(column) => format!("Error: Unknown column '{}'", column),
            DbError::InvalidExpression(_) => "Error: Invalid expression".to_string(),
            DbError::InvalidOperator(op) => format!("Error: Invalid operator '{}'", op),
            DbError::TypeMismatch { .. } => "Error: Type mismatch".to_string(),
            DbError::UnsupportedColumnType { function, column, .. } => {
                format!("Error: {} is not supported on column '{}'", function, column)
            }
            DbError::InvalidTree(_) => "Error: Invalid tree node type".to_string(),
            DbError::NoDatabaseInUse => "Error: No database in use".to_string(),
            DbError::UnmatchedStatement { keyword, line } => {
                format!("Error: Invalid keyword '{}' at line {}", keyword, line)
            }
        }
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for DbError {
    fn from(err: bincode::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}
