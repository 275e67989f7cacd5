use std::collections::{BTreeMap, HashMap};
use crate::core::error::DbError;
use crate::core::storage::TableStore;
use crate::core::types::{Column, ColumnType, Row, RowId};

pub use crate::core::types::TableContent;

/// 跨表的一行：表名（或别名）-> 该表的行
pub type JoinedRow = BTreeMap<String, Row>;

/// 求值与连接之间传递的中间结果
pub type GroupedRows = BTreeMap<RowId, JoinedRow>;

/// 查询中对某张表的一次引用
#[derive(Debug, Clone)]
pub struct TableDetail {
    pub table_name: String,
    pub alias: Option<String>,
    pub database_name: String,
    pub columns: Vec<Column>,
    pub primary_keys: Vec<String>,
    pub indexed_columns: HashMap<String, String>,
    pub content: TableContent,
}

impl TableDetail {
    /// 从存储层读取表结构和全部行
    pub fn load(
        store: &dyn TableStore,
        database_name: &str,
        table_name: &str,
        alias: Option<String>,
    ) -> Result<Self, DbError> {
        let schema = store.get_schema(database_name, table_name)?;
        let content = store.select_rows(None, &[], table_name, database_name)?;

        Ok(TableDetail {
            table_name: schema.name.clone(),
            alias,
            database_name: database_name.to_string(),
            columns: schema.columns.clone(),
            primary_keys: schema.primary_keys.clone(),
            indexed_columns: schema.indexed_columns(),
            content,
        })
    }

    /// 查询结果中使用的表名：有别名时用别名
    pub fn name_in_use(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table_name)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.name == column)
    }

    pub fn column_type(&self, column: &str) -> Option<&ColumnType> {
        self.columns.iter().find(|c| c.name == column).map(|c| &c.data_type)
    }

    /// 把给定的行包装成单表的分组结果
    pub fn group(&self, rows: TableContent) -> GroupedRows {
        rows.into_iter()
            .map(|(id, row)| {
                let mut joined = JoinedRow::new();
                joined.insert(self.name_in_use().to_string(), row);
                (id, joined)
            })
            .collect()
    }

    pub fn grouped_content(&self) -> GroupedRows {
        self.group(self.content.clone())
    }
}

/// 单次查询内的表注册表，负责把列引用解析到具体的表
#[derive(Debug, Clone)]
pub struct TableService {
    database_name: String,
    tables: Vec<TableDetail>,
}

impl TableService {
    pub fn new(database_name: &str) -> Self {
        TableService {
            database_name: database_name.to_string(),
            tables: Vec::new(),
        }
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// 注册一张表，返回它在连接顺序中的位置
    pub fn register(&mut self, detail: TableDetail) -> Result<usize, DbError> {
        let collides = self
            .tables
            .iter()
            .any(|existing| existing.name_in_use() == detail.name_in_use());
        if collides {
            return Err(DbError::TableError(format!(
                "表名或别名 {} 重复",
                detail.name_in_use()
            )));
        }
        self.tables.push(detail);
        Ok(self.tables.len() - 1)
    }

    pub fn tables(&self) -> &[TableDetail] {
        &self.tables
    }

    /// 按别名或表名查找，别名优先
    pub fn table(&self, name: &str) -> Result<&TableDetail, DbError> {
        self.lookup(name)
            .map(|position| &self.tables[position])
            .ok_or_else(|| DbError::TableError(format!("表 {} 不在查询中", name)))
    }

    /// 表在注册顺序中的位置
    pub fn position(&self, name: &str) -> Option<usize> {
        self.lookup(name)
    }

    fn lookup(&self, name: &str) -> Option<usize> {
        self.tables
            .iter()
            .position(|t| t.alias.as_deref() == Some(name))
            .or_else(|| self.tables.iter().position(|t| t.table_name == name))
    }

    /// 把 `table.column` 或裸列名解析为 (表, 列名)
    pub fn resolve(&self, column_ref: &str) -> Result<(&TableDetail, String), DbError> {
        if let Some((qualifier, column)) = column_ref.split_once('.') {
            let table = self
                .lookup(qualifier)
                .map(|position| &self.tables[position])
                .ok_or_else(|| DbError::UnknownColumn(column_ref.to_string()))?;
            if !table.has_column(column) {
                return Err(DbError::UnknownColumn(column_ref.to_string()));
            }
            return Ok((table, column.to_string()));
        }

        let mut owners = self.tables.iter().filter(|t| t.has_column(column_ref));
        match (owners.next(), owners.next()) {
            (Some(table), None) => Ok((table, column_ref.to_string())),
            (Some(_), Some(_)) => Err(DbError::AmbiguousColumn(column_ref.to_string())),
            (None, _) => Err(DbError::UnknownColumn(column_ref.to_string())),
        }
    }

    /// 所有已注册表的全部列，形如 `table.column`
    pub fn all_columns(&self) -> Vec<String> {
        self.tables
            .iter()
            .flat_map(|t| {
                t.columns
                    .iter()
                    .map(move |c| format!("{}.{}", t.name_in_use(), c.name))
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::types::{ColumnType, DataType};

    pub(crate) fn detail(name: &str, alias: Option<&str>, columns: &[&str]) -> TableDetail {
        TableDetail {
            table_name: name.to_string(),
            alias: alias.map(str::to_string),
            database_name: "test".to_string(),
            columns: columns
                .iter()
                .map(|c| Column {
                    name: c.to_string(),
                    data_type: ColumnType::Int,
                    nullable: true,
                    primary_key: false,
                    unique: false,
                })
                .collect(),
            primary_keys: Vec::new(),
            indexed_columns: HashMap::new(),
            content: TableContent::new(),
        }
    }

    fn service() -> TableService {
        let mut service = TableService::new("test");
        service.register(detail("Users", Some("u"), &["id", "name"])).unwrap();
        service.register(detail("Orders", None, &["id", "user_id"])).unwrap();
        service
    }

    #[test]
    fn resolves_qualified_and_bare_columns() {
        let service = service();
        let (table, column) = service.resolve("u.name").unwrap();
        assert_eq!((table.table_name.as_str(), column.as_str()), ("Users", "name"));
        let (table, column) = service.resolve("user_id").unwrap();
        assert_eq!((table.table_name.as_str(), column.as_str()), ("Orders", "user_id"));
        let (table, _) = service.resolve("Users.id").unwrap();
        assert_eq!(table.name_in_use(), "u");
    }

    #[test]
    fn bare_shared_column_is_ambiguous() {
        let service = service();
        assert!(matches!(service.resolve("id"), Err(DbError::AmbiguousColumn(_))));
        assert!(matches!(service.resolve("age"), Err(DbError::UnknownColumn(_))));
        assert!(matches!(service.resolve("x.id"), Err(DbError::UnknownColumn(_))));
        assert!(matches!(service.resolve("Orders.name"), Err(DbError::UnknownColumn(_))));
    }

    #[test]
    fn alias_takes_precedence_over_real_name() {
        let mut service = TableService::new("test");
        service.register(detail("Orders", None, &["total"])).unwrap();
        service.register(detail("Archive", Some("a"), &["total", "kept"])).unwrap();
        service.register(detail("a", Some("b"), &["other"])).unwrap();
        let (table, _) = service.resolve("a.total").unwrap();
        assert_eq!(table.table_name, "Archive");
    }

    #[test]
    fn alias_collisions_are_rejected() {
        let mut service = service();
        let err = service.register(detail("Items", Some("u"), &["sku"])).unwrap_err();
        assert!(matches!(err, DbError::TableError(_)));
        let err = service.register(detail("Items", Some("Orders"), &["sku"])).unwrap_err();
        assert!(matches!(err, DbError::TableError(_)));
    }

    #[test]
    fn all_columns_follow_registration_order() {
        assert_eq!(
            service().all_columns(),
            vec!["u.id", "u.name", "Orders.id", "Orders.user_id"]
        );
    }

    #[test]
    fn group_wraps_rows_under_name_in_use() {
        let mut users = detail("Users", Some("u"), &["id"]);
        let mut row = Row::new();
        row.insert("id".to_string(), DataType::Int(1));
        users.content.insert(RowId::new("1"), row);
        let grouped = users.grouped_content();
        assert!(grouped[&RowId::new("1")].contains_key("u"));
    }
}
