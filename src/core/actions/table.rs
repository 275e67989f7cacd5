use std::sync::OnceLock;
use regex::{Captures, Regex};
use tracing::info;
use crate::core::error::DbError;
use crate::core::result::QueryResult;
use crate::core::types::{Column, ColumnType, IndexInfo, TableSchema};
use super::{split_top_level, DbAction, ExecutionContext};

fn table_name(captures: &Captures<'_>) -> Result<String, DbError> {
    captures
        .name("TableName")
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| DbError::SqlError("期望表名".to_string()))
}

fn column_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)\A(?P<Name>\w+)\s+(?P<Type>[A-Za-z]+)(?:\s*\(\s*(?P<Length>\d+)\s*\))?(?P<Constraints>.*)\z")
            .expect("column pattern is valid")
    })
}

fn key_list_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)\A(?P<Kind>PRIMARY\s+KEY|UNIQUE)\s*\((?P<Columns>[^()]*)\)\z")
            .expect("key list pattern is valid")
    })
}

/// CREATE TABLE name (字段定义, ...)
#[derive(Debug)]
pub struct CreateTable {
    name: String,
    fields: String,
}

impl CreateTable {
    pub fn from_match(captures: &Captures<'_>) -> Result<Self, DbError> {
        Ok(CreateTable {
            name: table_name(captures)?,
            fields: captures
                .name("Fields")
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
        })
    }

    /// 解析列定义和表级约束
    fn schema(&self) -> Result<TableSchema, DbError> {
        let mut columns: Vec<Column> = Vec::new();
        let mut table_keys: Option<Vec<String>> = None;
        let mut unique_keys: Vec<Vec<String>> = Vec::new();

        for field in split_top_level(&self.fields) {
            if field.is_empty() {
                return Err(DbError::SqlError("期望列定义".to_string()));
            }
            if let Some(captures) = key_list_pattern().captures(&field) {
                let names: Vec<String> = split_top_level(&captures["Columns"]);
                if names.is_empty() || names.iter().any(|n| n.is_empty()) {
                    return Err(DbError::SqlError(format!("约束缺少列名: {}", field)));
                }
                if captures["Kind"].to_uppercase().starts_with("PRIMARY") {
                    if table_keys.is_some() {
                        return Err(DbError::SqlError("表中只能有一个主键".to_string()));
                    }
                    table_keys = Some(names);
                } else {
                    unique_keys.push(names);
                }
                continue;
            }
            let column = parse_column(&field)?;
            if columns.iter().any(|c| c.name == column.name) {
                return Err(DbError::SqlError(format!("列 {} 重复定义", column.name)));
            }
            columns.push(column);
        }

        let column_keys: Vec<String> = columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect();
        let primary_keys = match table_keys {
            Some(keys) if column_keys.is_empty() => keys,
            Some(_) => return Err(DbError::SqlError("表中只能有一个主键".to_string())),
            None if column_keys.len() > 1 => {
                return Err(DbError::SqlError("表中只能有一个主键".to_string()));
            }
            None => column_keys,
        };

        for key in &primary_keys {
            let column = columns
                .iter_mut()
                .find(|c| &c.name == key)
                .ok_or_else(|| DbError::UnknownColumn(key.clone()))?;
            column.primary_key = true;
            column.nullable = false;
        }

        let mut schema = TableSchema::new(self.name.clone(), columns, primary_keys);
        for names in unique_keys {
            for name in &names {
                if schema.column(name).is_none() {
                    return Err(DbError::UnknownColumn(name.clone()));
                }
            }
            if let [single] = names.as_slice() {
                if let Some(column) = schema.columns.iter_mut().find(|c| &c.name == single) {
                    column.unique = true;
                }
            } else {
                // 多列唯一约束用唯一索引实现
                schema.indexes.push(IndexInfo {
                    name: format!("uq_{}_{}", self.name, names.join("_")),
                    columns: names,
                    unique: true,
                });
            }
        }
        Ok(schema)
    }
}

fn parse_column(field: &str) -> Result<Column, DbError> {
    let captures = column_pattern()
        .captures(field)
        .ok_or_else(|| DbError::SqlError(format!("无法解析的列定义: {}", field)))?;
    let name = captures["Name"].to_string();
    let length = captures.name("Length").map(|m| m.as_str());

    let data_type = match (captures["Type"].to_uppercase().as_str(), length) {
        ("INT" | "INTEGER", None) => ColumnType::Int,
        ("FLOAT" | "REAL" | "DOUBLE", None) => ColumnType::Float,
        ("VARCHAR" | "CHAR", Some(n)) => ColumnType::Varchar(
            n.parse()
                .map_err(|_| DbError::SqlError("期望VARCHAR长度".to_string()))?,
        ),
        ("VARCHAR" | "CHAR", None) => return Err(DbError::SqlError("期望VARCHAR长度".to_string())),
        ("DATE", None) => ColumnType::Date,
        ("BIT", None) => ColumnType::Bit,
        (other, _) => return Err(DbError::SqlError(format!("未知数据类型: {}", other))),
    };

    let mut column = Column {
        name,
        data_type,
        nullable: true,
        primary_key: false,
        unique: false,
    };

    let words: Vec<String> = captures["Constraints"]
        .split_whitespace()
        .map(str::to_uppercase)
        .collect();
    let mut i = 0;
    while i < words.len() {
        match (words[i].as_str(), words.get(i + 1).map(String::as_str)) {
            ("PRIMARY", Some("KEY")) => {
                column.primary_key = true;
                column.nullable = false;
                i += 2;
            }
            ("NOT", Some("NULL")) => {
                column.nullable = false;
                i += 2;
            }
            ("NULL", _) => i += 1,
            ("UNIQUE", _) => {
                column.unique = true;
                i += 1;
            }
            (word, _) => {
                return Err(DbError::SqlError(format!("未知的列约束: {}", word)));
            }
        }
    }
    Ok(column)
}

impl DbAction for CreateTable {
    fn name(&self) -> &'static str {
        "CREATE TABLE"
    }

    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<QueryResult, DbError> {
        let database = ctx.database()?;
        let schema = self.schema()?;
        ctx.store.create_table(&database, schema)?;
        info!("创建表 {}.{}", database, self.name);
        Ok(QueryResult::message(format!("Table {} created", self.name)))
    }
}

/// DROP TABLE name
#[derive(Debug)]
pub struct DropTable {
    name: String,
}

impl DropTable {
    pub fn from_match(captures: &Captures<'_>) -> Result<Self, DbError> {
        Ok(DropTable {
            name: table_name(captures)?,
        })
    }
}

impl DbAction for DropTable {
    fn name(&self) -> &'static str {
        "DROP TABLE"
    }

    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<QueryResult, DbError> {
        let database = ctx.database()?;
        ctx.store.drop_table(&database, &self.name)?;
        info!("删除表 {}.{}", database, self.name);
        Ok(QueryResult::message(format!("Table {} dropped", self.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(fields: &str) -> Result<TableSchema, DbError> {
        CreateTable {
            name: "t".to_string(),
            fields: fields.to_string(),
        }
        .schema()
    }

    #[test]
    fn parses_column_level_constraints() {
        let schema = create("id INT PRIMARY KEY, name VARCHAR(20) NOT NULL UNIQUE, born DATE, active BIT").unwrap();
        assert_eq!(schema.primary_keys, vec!["id"]);
        assert_eq!(schema.columns[1].data_type, ColumnType::Varchar(20));
        assert!(!schema.columns[1].nullable);
        assert!(schema.columns[1].unique);
        assert_eq!(schema.columns[2].data_type, ColumnType::Date);
        assert_eq!(schema.columns[3].data_type, ColumnType::Bit);
    }

    #[test]
    fn parses_table_level_keys() {
        let schema = create("a INT, b INT, c FLOAT, PRIMARY KEY (a, b), UNIQUE (c), UNIQUE (b, c)").unwrap();
        assert_eq!(schema.primary_keys, vec!["a", "b"]);
        assert!(schema.columns.iter().take(2).all(|c| c.primary_key && !c.nullable));
        assert!(schema.columns[2].unique);
        assert_eq!(schema.indexes.len(), 1);
        assert!(schema.indexes[0].unique);
        assert_eq!(schema.indexes[0].columns, vec!["b", "c"]);
    }

    #[test]
    fn rejects_bad_definitions() {
        assert!(matches!(create("id BLOB"), Err(DbError::SqlError(_))));
        assert!(matches!(create("id INT PRIMARY KEY, x INT PRIMARY KEY"), Err(DbError::SqlError(_))));
        assert!(matches!(create("id INT, PRIMARY KEY (nope)"), Err(DbError::UnknownColumn(_))));
        assert!(matches!(create("id INT DEFAULT"), Err(DbError::SqlError(_))));
        assert!(matches!(create("name VARCHAR"), Err(DbError::SqlError(_))));
    }
}
