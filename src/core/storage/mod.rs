pub mod file;
pub mod memory;

use std::collections::BTreeSet;
use crate::core::error::DbError;
use crate::core::types::{DataType, IndexInfo, Row, RowId, TableContent, TableSchema};

/// 表存储。查询求值只通过 select_rows / filter_by_index / filter_by_primary_key 访问数据。
pub trait TableStore {
    // 数据库操作
    fn create_database(&mut self, name: &str) -> Result<(), DbError>;
    fn drop_database(&mut self, name: &str) -> Result<(), DbError>;
    fn list_databases(&self) -> Result<Vec<String>, DbError>;

    // 表操作
    fn create_table(&mut self, database: &str, schema: TableSchema) -> Result<(), DbError>;
    fn drop_table(&mut self, database: &str, table: &str) -> Result<(), DbError>;
    fn get_schema(&self, database: &str, table: &str) -> Result<&TableSchema, DbError>;
    fn list_tables(&self, database: &str) -> Result<Vec<String>, DbError>;
    fn create_index(&mut self, database: &str, table: &str, index: IndexInfo) -> Result<(), DbError>;

    // 数据操作
    fn insert_row(&mut self, database: &str, table: &str, row: Row) -> Result<RowId, DbError>;
    fn delete_rows(&mut self, database: &str, table: &str, ids: &BTreeSet<RowId>) -> Result<usize, DbError>;

    // 查询
    /// ids 为 None 时返回全部行；columns 为空时返回全部列
    fn select_rows(
        &self,
        ids: Option<&BTreeSet<RowId>>,
        columns: &[String],
        table: &str,
        database: &str,
    ) -> Result<TableContent, DbError>;
    fn filter_by_index(
        &self,
        value: &DataType,
        index_file: &str,
        table: &str,
        database: &str,
    ) -> Result<BTreeSet<RowId>, DbError>;
    fn filter_by_primary_key(
        &self,
        value: &DataType,
        key_column_index: usize,
        table: &str,
        database: &str,
    ) -> Result<BTreeSet<RowId>, DbError>;

    // 持久化
    fn save(&self) -> Result<(), DbError>;
    fn load(&mut self) -> Result<(), DbError>;
}
