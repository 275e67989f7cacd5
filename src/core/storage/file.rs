use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use serde::{Serialize, Deserialize};
use tracing::{debug, warn};
use crate::core::error::DbError;
use crate::core::types::{DataType, IndexInfo, Row, RowId, TableContent, TableSchema};
use super::memory::{IndexFile, MemoryStorage, StoredTable};
use super::TableStore;

/// 磁盘上的表文件：表结构加全部行
#[derive(Serialize, Deserialize)]
struct TableFile {
    schema: TableSchema,
    rows: Vec<StoredRow>,
}

#[derive(Serialize, Deserialize)]
struct StoredRow {
    id: RowId,
    values: Row,
}

/// 文件存储：每个数据库一个目录，表以 JSON 保存，索引文件以 bincode 保存
pub struct FileStorage {
    base_dir: PathBuf,
    inner: MemoryStorage,
}

impl FileStorage {
    pub fn new(base_dir: PathBuf) -> Self {
        // 确保根目录存在
        if !base_dir.exists() {
            if let Err(e) = fs::create_dir_all(&base_dir) {
                warn!("无法创建数据目录 {:?}: {}", base_dir, e);
            }
        }

        let mut storage = FileStorage {
            base_dir,
            inner: MemoryStorage::new(),
        };

        // 加载所有数据库
        if let Err(e) = storage.load() {
            warn!("加载数据目录失败: {}", e);
        }
        storage
    }

    fn database_dir(&self, database: &str) -> PathBuf {
        self.base_dir.join(database)
    }

    // 获取表文件路径
    fn table_path(&self, database: &str, table: &str) -> PathBuf {
        self.database_dir(database).join(format!("{}.json", table))
    }

    fn index_path(&self, database: &str, table: &str, index: &str) -> PathBuf {
        self.database_dir(database).join(format!("{}.{}.idx", table, index))
    }

    // 保存单个表及其索引文件
    fn save_table(&self, database: &str, table: &str) -> Result<(), DbError> {
        let stored = self.inner.table(database, table)?;
        let file = TableFile {
            schema: stored.schema.clone(),
            rows: stored
                .rows
                .iter()
                .map(|(id, values)| StoredRow {
                    id: id.clone(),
                    values: values.clone(),
                })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(self.table_path(database, table), json)?;

        for (name, index) in &stored.indexes {
            let bytes = bincode::serialize(index)?;
            fs::write(self.index_path(database, table, name), bytes)?;
        }
        Ok(())
    }

    fn remove_table_files(&self, database: &str, table: &str) -> Result<(), DbError> {
        let dir = self.database_dir(database);
        if !dir.exists() {
            return Ok(());
        }
        let prefix = format!("{}.", table);
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            let is_table_file = name == format!("{}.json", table)
                || (name.starts_with(&prefix) && name.ends_with(".idx"));
            if is_table_file {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    // 加载单个表
    fn load_table(&mut self, database: &str, path: &Path) -> Result<(), DbError> {
        let content = fs::read_to_string(path)?;
        let file: TableFile = serde_json::from_str(&content)?;
        let table_name = file.schema.name.clone();

        let mut stored = StoredTable::new(file.schema);
        stored.rows = file
            .rows
            .into_iter()
            .map(|row| (row.id, row.values))
            .collect::<TableContent>();

        let infos = stored.schema.indexes.clone();
        for info in &infos {
            let index_path = self.index_path(database, &table_name, &info.name);
            match read_index(&index_path) {
                Ok(index) => {
                    stored.indexes.insert(info.name.clone(), index);
                }
                Err(e) => {
                    // 索引文件缺失或损坏时根据行重建
                    debug!("重建索引 {} ({}): {}", info.name, table_name, e);
                    stored.build_index(info);
                }
            }
        }

        self.inner.restore_table(database, stored);
        Ok(())
    }
}

fn read_index(path: &Path) -> Result<IndexFile, DbError> {
    let bytes = fs::read(path)?;
    Ok(bincode::deserialize(&bytes)?)
}

impl TableStore for FileStorage {
    fn create_database(&mut self, name: &str) -> Result<(), DbError> {
        self.inner.create_database(name)?;
        fs::create_dir_all(self.database_dir(name))?;
        Ok(())
    }

    fn drop_database(&mut self, name: &str) -> Result<(), DbError> {
        self.inner.drop_database(name)?;
        let dir = self.database_dir(name);
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        Ok(())
    }

    fn list_databases(&self) -> Result<Vec<String>, DbError> {
        self.inner.list_databases()
    }

    fn create_table(&mut self, database: &str, schema: TableSchema) -> Result<(), DbError> {
        let table_name = schema.name.clone();
        self.inner.create_table(database, schema)?;
        self.save_table(database, &table_name)
    }

    fn drop_table(&mut self, database: &str, table: &str) -> Result<(), DbError> {
        self.inner.drop_table(database, table)?;
        self.remove_table_files(database, table)
    }

    fn get_schema(&self, database: &str, table: &str) -> Result<&TableSchema, DbError> {
        self.inner.get_schema(database, table)
    }

    fn list_tables(&self, database: &str) -> Result<Vec<String>, DbError> {
        self.inner.list_tables(database)
    }

    fn create_index(&mut self, database: &str, table: &str, index: IndexInfo) -> Result<(), DbError> {
        self.inner.create_index(database, table, index)?;
        self.save_table(database, table)
    }

    fn insert_row(&mut self, database: &str, table: &str, row: Row) -> Result<RowId, DbError> {
        let id = self.inner.insert_row(database, table, row)?;
        self.save_table(database, table)?;
        Ok(id)
    }

    fn delete_rows(&mut self, database: &str, table: &str, ids: &BTreeSet<RowId>) -> Result<usize, DbError> {
        let deleted = self.inner.delete_rows(database, table, ids)?;
        if deleted > 0 {
            self.save_table(database, table)?;
        }
        Ok(deleted)
    }

    fn select_rows(
        &self,
        ids: Option<&BTreeSet<RowId>>,
        columns: &[String],
        table: &str,
        database: &str,
    ) -> Result<TableContent, DbError> {
        self.inner.select_rows(ids, columns, table, database)
    }

    fn filter_by_index(
        &self,
        value: &DataType,
        index_file: &str,
        table: &str,
        database: &str,
    ) -> Result<BTreeSet<RowId>, DbError> {
        self.inner.filter_by_index(value, index_file, table, database)
    }

    fn filter_by_primary_key(
        &self,
        value: &DataType,
        key_column_index: usize,
        table: &str,
        database: &str,
    ) -> Result<BTreeSet<RowId>, DbError> {
        self.inner.filter_by_primary_key(value, key_column_index, table, database)
    }

    fn save(&self) -> Result<(), DbError> {
        // 保存所有表
        for database in self.inner.list_databases()? {
            fs::create_dir_all(self.database_dir(&database))?;
            for table in self.inner.list_tables(&database)? {
                self.save_table(&database, &table)?;
            }
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), DbError> {
        // 清空现有数据
        self.inner.clear();

        if !self.base_dir.exists() {
            return Ok(());
        }

        // 每个子目录是一个数据库，其中的 json 文件是表
        for entry in fs::read_dir(&self.base_dir)? {
            let db_path = entry?.path();
            if !db_path.is_dir() {
                continue;
            }
            let database = match db_path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            self.inner.restore_database(&database);

            for table_entry in fs::read_dir(&db_path)? {
                let path = table_entry?.path();
                if path.is_file() && path.extension().map_or(false, |ext| ext == "json") {
                    self.load_table(&database, &path)?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Column, ColumnType};

    fn schema() -> TableSchema {
        let mut schema = TableSchema::new(
            "users".to_string(),
            vec![
                Column {
                    name: "id".to_string(),
                    data_type: ColumnType::Int,
                    nullable: false,
                    primary_key: true,
                    unique: false,
                },
                Column {
                    name: "name".to_string(),
                    data_type: ColumnType::Varchar(10),
                    nullable: true,
                    primary_key: false,
                    unique: false,
                },
            ],
            vec!["id".to_string()],
        );
        schema.indexes.push(IndexInfo {
            name: "idx_name".to_string(),
            columns: vec!["name".to_string()],
            unique: false,
        });
        schema
    }

    #[test]
    fn persists_tables_and_indexes_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut storage = FileStorage::new(dir.path().to_path_buf());
            storage.create_database("app").unwrap();
            storage.create_table("app", schema()).unwrap();
            let mut row = Row::new();
            row.insert("id".to_string(), DataType::Int(7));
            row.insert("name".to_string(), DataType::Varchar("Ann".to_string()));
            storage.insert_row("app", "users", row).unwrap();
        }

        let storage = FileStorage::new(dir.path().to_path_buf());
        assert_eq!(storage.list_databases().unwrap(), vec!["app"]);
        let ids = storage
            .filter_by_index(&DataType::Varchar("Ann".to_string()), "idx_name", "users", "app")
            .unwrap();
        assert_eq!(ids, [RowId::new("7")].into_iter().collect());
    }

    #[test]
    fn drop_table_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path().to_path_buf());
        storage.create_database("app").unwrap();
        storage.create_table("app", schema()).unwrap();
        assert!(dir.path().join("app").join("users.json").exists());
        storage.drop_table("app", "users").unwrap();
        assert!(!dir.path().join("app").join("users.json").exists());
        assert!(!dir.path().join("app").join("users.idx_name.idx").exists());
    }
}
