use std::collections::{BTreeMap, BTreeSet};
use serde::{Serialize, Deserialize};
use crate::core::error::DbError;
use crate::core::types::{composite_key, DataType, IndexInfo, Row, RowId, TableContent, TableSchema};
use super::TableStore;

/// 索引文件：索引键 -> 行标识集合
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexFile {
    pub columns: Vec<String>,
    pub unique: bool,
    pub entries: BTreeMap<String, BTreeSet<RowId>>,
}

impl IndexFile {
    fn new(info: &IndexInfo) -> Self {
        IndexFile {
            columns: info.columns.clone(),
            unique: info.unique,
            entries: BTreeMap::new(),
        }
    }

    /// 含 NULL 的行没有索引键
    fn key(&self, row: &Row) -> Option<String> {
        composite_key(
            self.columns
                .iter()
                .map(|c| row.get(c).unwrap_or(&DataType::Null)),
        )
    }

    fn insert(&mut self, id: &RowId, row: &Row) {
        if let Some(key) = self.key(row) {
            self.entries.entry(key).or_default().insert(id.clone());
        }
    }

    fn remove(&mut self, id: &RowId, row: &Row) {
        let Some(key) = self.key(row) else {
            return;
        };
        if let Some(ids) = self.entries.get_mut(&key) {
            ids.remove(id);
            if ids.is_empty() {
                self.entries.remove(&key);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoredTable {
    pub schema: TableSchema,
    pub rows: TableContent,
    pub indexes: BTreeMap<String, IndexFile>,
}

impl StoredTable {
    pub fn new(schema: TableSchema) -> Self {
        let mut table = StoredTable {
            schema,
            rows: TableContent::new(),
            indexes: BTreeMap::new(),
        };
        let infos = table.schema.indexes.clone();
        for info in &infos {
            table.build_index(info);
        }
        table
    }

    /// 根据现有行重建索引
    pub fn build_index(&mut self, info: &IndexInfo) {
        let mut index = IndexFile::new(info);
        for (id, row) in &self.rows {
            index.insert(id, row);
        }
        self.indexes.insert(info.name.clone(), index);
    }

    fn insert(&mut self, row: Row) -> Result<RowId, DbError> {
        let row = self.schema.validate_row(row)?;
        let id = self.schema.row_id(&row);

        if self.rows.contains_key(&id) {
            return Err(DbError::ConstraintViolation(format!(
                "表 {} 主键 {} 重复",
                self.schema.name, id
            )));
        }

        for column in self.schema.columns.iter().filter(|c| c.unique) {
            let value = &row[&column.name];
            if value.is_null() {
                continue;
            }
            for existing in self.rows.values() {
                if existing[&column.name].value_eq(value)? {
                    return Err(DbError::ConstraintViolation(format!(
                        "列 {} 的值 {} 重复",
                        column.name, value
                    )));
                }
            }
        }

        for (name, index) in self.indexes.iter().filter(|(_, index)| index.unique) {
            if let Some(key) = index.key(&row).filter(|key| index.entries.contains_key(key)) {
                return Err(DbError::ConstraintViolation(format!(
                    "唯一索引 {} 的键 {} 重复",
                    name, key
                )));
            }
        }

        for index in self.indexes.values_mut() {
            index.insert(&id, &row);
        }
        self.rows.insert(id.clone(), row);
        Ok(id)
    }

    fn delete(&mut self, ids: &BTreeSet<RowId>) -> usize {
        let mut deleted = 0;
        for id in ids {
            if let Some(row) = self.rows.remove(id) {
                for index in self.indexes.values_mut() {
                    index.remove(id, &row);
                }
                deleted += 1;
            }
        }
        deleted
    }
}

pub struct MemoryStorage {
    databases: BTreeMap<String, BTreeMap<String, StoredTable>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage {
            databases: BTreeMap::new(),
        }
    }

    fn database(&self, name: &str) -> Result<&BTreeMap<String, StoredTable>, DbError> {
        self.databases
            .get(name)
            .ok_or_else(|| DbError::TableError(format!("数据库 {} 不存在", name)))
    }

    fn database_mut(&mut self, name: &str) -> Result<&mut BTreeMap<String, StoredTable>, DbError> {
        self.databases
            .get_mut(name)
            .ok_or_else(|| DbError::TableError(format!("数据库 {} 不存在", name)))
    }

    pub fn table(&self, database: &str, table: &str) -> Result<&StoredTable, DbError> {
        self.database(database)?
            .get(table)
            .ok_or_else(|| DbError::TableError(format!("表 {} 不存在", table)))
    }

    fn table_mut(&mut self, database: &str, table: &str) -> Result<&mut StoredTable, DbError> {
        self.database_mut(database)?
            .get_mut(table)
            .ok_or_else(|| DbError::TableError(format!("表 {} 不存在", table)))
    }

    /// 加载时直接放入已持久化的表
    pub(super) fn restore_table(&mut self, database: &str, table: StoredTable) {
        self.databases
            .entry(database.to_string())
            .or_default()
            .insert(table.schema.name.clone(), table);
    }

    pub(super) fn restore_database(&mut self, database: &str) {
        self.databases.entry(database.to_string()).or_default();
    }

    pub(super) fn clear(&mut self) {
        self.databases.clear();
    }
}

impl TableStore for MemoryStorage {
    fn create_database(&mut self, name: &str) -> Result<(), DbError> {
        if self.databases.contains_key(name) {
            return Err(DbError::TableError(format!("数据库 {} 已存在", name)));
        }
        self.databases.insert(name.to_string(), BTreeMap::new());
        Ok(())
    }

    fn drop_database(&mut self, name: &str) -> Result<(), DbError> {
        self.databases
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| DbError::TableError(format!("数据库 {} 不存在", name)))
    }

    fn list_databases(&self) -> Result<Vec<String>, DbError> {
        Ok(self.databases.keys().cloned().collect())
    }

    fn create_table(&mut self, database: &str, schema: TableSchema) -> Result<(), DbError> {
        let tables = self.database_mut(database)?;
        if tables.contains_key(&schema.name) {
            return Err(DbError::TableError(format!("表 {} 已存在", schema.name)));
        }
        if schema.primary_keys.is_empty() {
            return Err(DbError::TableError(format!("表 {} 必须定义主键", schema.name)));
        }
        for key in &schema.primary_keys {
            if schema.column(key).is_none() {
                return Err(DbError::UnknownColumn(key.clone()));
            }
        }
        tables.insert(schema.name.clone(), StoredTable::new(schema));
        Ok(())
    }

    fn drop_table(&mut self, database: &str, table: &str) -> Result<(), DbError> {
        self.database_mut(database)?
            .remove(table)
            .map(|_| ())
            .ok_or_else(|| DbError::TableError(format!("表 {} 不存在", table)))
    }

    fn get_schema(&self, database: &str, table: &str) -> Result<&TableSchema, DbError> {
        Ok(&self.table(database, table)?.schema)
    }

    fn list_tables(&self, database: &str) -> Result<Vec<String>, DbError> {
        Ok(self.database(database)?.keys().cloned().collect())
    }

    fn create_index(&mut self, database: &str, table: &str, index: IndexInfo) -> Result<(), DbError> {
        let stored = self.table_mut(database, table)?;
        if stored.indexes.contains_key(&index.name) {
            return Err(DbError::TableError(format!("索引 {} 已存在", index.name)));
        }
        for column in &index.columns {
            if stored.schema.column(column).is_none() {
                return Err(DbError::UnknownColumn(column.clone()));
            }
        }
        stored.build_index(&index);
        if index.unique {
            let duplicated = stored.indexes[&index.name].entries.values().any(|ids| ids.len() > 1);
            if duplicated {
                stored.indexes.remove(&index.name);
                return Err(DbError::ConstraintViolation(format!(
                    "无法创建唯一索引 {}: 存在重复值",
                    index.name
                )));
            }
        }
        stored.schema.indexes.push(index);
        Ok(())
    }

    fn insert_row(&mut self, database: &str, table: &str, row: Row) -> Result<RowId, DbError> {
        self.table_mut(database, table)?.insert(row)
    }

    fn delete_rows(&mut self, database: &str, table: &str, ids: &BTreeSet<RowId>) -> Result<usize, DbError> {
        Ok(self.table_mut(database, table)?.delete(ids))
    }

    fn select_rows(
        &self,
        ids: Option<&BTreeSet<RowId>>,
        columns: &[String],
        table: &str,
        database: &str,
    ) -> Result<TableContent, DbError> {
        let stored = self.table(database, table)?;
        let project = |row: &Row| -> Row {
            if columns.is_empty() {
                row.clone()
            } else {
                row.iter()
                    .filter(|(name, _)| columns.contains(name))
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect()
            }
        };

        let content = match ids {
            None => stored.rows.iter().map(|(id, row)| (id.clone(), project(row))).collect(),
            Some(ids) => ids
                .iter()
                .filter_map(|id| stored.rows.get(id).map(|row| (id.clone(), project(row))))
                .collect(),
        };
        Ok(content)
    }

    fn filter_by_index(
        &self,
        value: &DataType,
        index_file: &str,
        table: &str,
        database: &str,
    ) -> Result<BTreeSet<RowId>, DbError> {
        let stored = self.table(database, table)?;
        let index = stored
            .indexes
            .get(index_file)
            .ok_or_else(|| DbError::TableError(format!("索引 {} 不存在", index_file)))?;
        Ok(composite_key([value])
            .and_then(|key| index.entries.get(&key).cloned())
            .unwrap_or_default())
    }

    fn filter_by_primary_key(
        &self,
        value: &DataType,
        key_column_index: usize,
        table: &str,
        database: &str,
    ) -> Result<BTreeSet<RowId>, DbError> {
        let stored = self.table(database, table)?;
        let key_column = stored
            .schema
            .primary_keys
            .get(key_column_index)
            .ok_or_else(|| DbError::TableError(format!("主键位置 {} 超出范围", key_column_index)))?;
        // 主键列不含 NULL
        let Some(key) = value.index_key() else {
            return Ok(BTreeSet::new());
        };

        // 单列主键时行标识就是主键值
        if stored.schema.primary_keys.len() == 1 {
            let id = RowId::new(composite_key([value]).unwrap_or_default());
            return Ok(stored.rows.contains_key(&id).then_some(id).into_iter().collect());
        }

        Ok(stored
            .rows
            .iter()
            .filter(|(_, row)| row.get(key_column).and_then(DataType::index_key).as_ref() == Some(&key))
            .map(|(id, _)| id.clone())
            .collect())
    }

    fn save(&self) -> Result<(), DbError> {
        Ok(()) // 内存存储无需持久化
    }

    fn load(&mut self) -> Result<(), DbError> {
        Ok(()) // 内存存储无需加载
    }
}
