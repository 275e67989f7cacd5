pub mod core;
pub mod cli;

pub use core::db::{Database, StorageType};
pub use core::error::{DbError, ErrorDisplayMode};
pub use core::result::QueryResult;
pub use core::session::SessionId;
use std::path::PathBuf;

/// 执行SQL语句的统一接口
///
/// # 参数
/// * `sql_statement` - 要执行的SQL语句
/// * `db_path` - 可选的数据目录，如果不提供则使用内存存储
///
/// # 返回值
/// * 每条语句的执行结果；存在无法识别的语句时返回错误
pub fn execute_sql(sql_statement: &str, db_path: Option<PathBuf>) -> Result<Vec<QueryResult>, DbError> {
    let storage_type = match db_path {
        Some(path) => StorageType::File(path),
        None => StorageType::Memory,
    };

    let mut db = Database::new(storage_type);
    db.execute_sql(sql_statement)
}

/// 获取默认数据目录
pub fn get_default_db_path() -> PathBuf {
    PathBuf::from("data")
}
