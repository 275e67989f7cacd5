use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use serde::{Serialize, Deserialize};
use crate::core::error::DbError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataType {
    Int(i64),
    Float(f64),
    Varchar(String),
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Int,
    Float,
    Varchar(usize), // 存储varchar的最大长度
    Date,           // 以 YYYY-MM-DD 文本存储
    Bit,            // 以 0/1 整数存储
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: ColumnType,
    pub nullable: bool,
    pub primary_key: bool,
    pub unique: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_keys: Vec<String>,
    pub indexes: Vec<IndexInfo>,
}

/// 行标识：由存储层分配，在表内唯一且稳定。
///
/// 连接后的行使用复合标识，按连接顺序保存各表的行标识。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(Vec<String>);

/// 一行数据：列名 -> 值
pub type Row = BTreeMap<String, DataType>;

/// 表内容：行标识 -> 行
pub type TableContent = BTreeMap<RowId, Row>;

impl RowId {
    pub fn new(key: impl Into<String>) -> Self {
        RowId(vec![key.into()])
    }

    /// 连接两行时生成的新标识，对同一对输入总是相同
    pub fn joined(left: &RowId, right: &RowId) -> Self {
        let mut parts = left.0.clone();
        parts.extend(right.0.iter().cloned());
        RowId(parts)
    }

    /// 第 position 个参与连接的表对应的行标识
    pub fn part(&self, position: usize) -> Option<RowId> {
        self.0.get(position).map(|key| RowId::new(key.clone()))
    }

    pub fn width(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("|"))
    }
}

impl DataType {
    pub fn is_null(&self) -> bool {
        matches!(self, DataType::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            DataType::Int(_) => "INT",
            DataType::Float(_) => "FLOAT",
            DataType::Varchar(_) => "VARCHAR",
            DataType::Null => "NULL",
        }
    }

    /// 按类型比较两个值。任一侧为 NULL 时返回 None，类型不兼容时返回错误。
    pub fn compare(&self, other: &DataType) -> Result<Option<Ordering>, DbError> {
        match (self, other) {
            (DataType::Null, _) | (_, DataType::Null) => Ok(None),
            (DataType::Int(a), DataType::Int(b)) => Ok(Some(a.cmp(b))),
            (DataType::Float(a), DataType::Float(b)) => Ok(a.partial_cmp(b)),
            (DataType::Int(a), DataType::Float(b)) => Ok(compare_int_float(*a, *b)),
            (DataType::Float(a), DataType::Int(b)) => Ok(compare_int_float(*b, *a).map(Ordering::reverse)),
            (DataType::Varchar(a), DataType::Varchar(b)) => Ok(Some(a.cmp(b))),
            (left, right) => Err(DbError::type_mismatch(left.type_name(), right.type_name())),
        }
    }

    /// 值相等：类型兼容且内容相同，NULL 只与 NULL 相等
    pub fn value_eq(&self, other: &DataType) -> Result<bool, DbError> {
        if self.is_null() || other.is_null() {
            return Ok(self.is_null() && other.is_null());
        }
        Ok(self.compare(other)? == Some(Ordering::Equal))
    }

    /// 索引和行标识中使用的键。NULL 没有键，不进入任何索引。
    pub fn index_key(&self) -> Option<String> {
        match self {
            DataType::Null => None,
            // -0.0 与 0.0 相等，键也必须相同
            DataType::Float(f) if *f == 0.0 => Some("0".to_string()),
            other => Some(other.to_string()),
        }
    }
}

/// 多个值组成的键，各部分转义后以 '#' 连接；任一部分为 NULL 时没有键
pub fn composite_key<'a>(values: impl IntoIterator<Item = &'a DataType>) -> Option<String> {
    let parts = values
        .into_iter()
        .map(|value| value.index_key().map(|key| escape_key_part(&key)))
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("#"))
}

fn escape_key_part(part: &str) -> String {
    part.replace('\\', "\\\\").replace('#', "\\#")
}

const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

/// 整数与浮点数精确比较，不经过有损的 i64 -> f64 转换
fn compare_int_float(int: i64, float: f64) -> Option<Ordering> {
    if float.is_nan() {
        return None;
    }
    if float >= TWO_POW_63 {
        return Some(Ordering::Less);
    }
    if float < -TWO_POW_63 {
        return Some(Ordering::Greater);
    }
    // 此范围内截断后的整数部分可以精确转换
    match int.cmp(&(float.trunc() as i64)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&float.fract()),
        other => Some(other),
    }
}

/// 能精确表示为 i64 的浮点数
fn exact_int(float: f64) -> Option<i64> {
    if float.fract() == 0.0 && (-TWO_POW_63..TWO_POW_63).contains(&float) {
        Some(float as i64)
    } else {
        None
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int(n) => write!(f, "{}", n),
            DataType::Float(n) => write!(f, "{}", n),
            DataType::Varchar(s) => write!(f, "{}", s),
            DataType::Null => write!(f, "NULL"),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Int => write!(f, "INT"),
            ColumnType::Float => write!(f, "FLOAT"),
            ColumnType::Varchar(len) => write!(f, "VARCHAR({})", len),
            ColumnType::Date => write!(f, "DATE"),
            ColumnType::Bit => write!(f, "BIT"),
        }
    }
}

impl ColumnType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Int | ColumnType::Float)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, ColumnType::Varchar(_))
    }

    pub fn is_date(&self) -> bool {
        matches!(self, ColumnType::Date)
    }

    fn is_textual(&self) -> bool {
        self.is_string() || self.is_date()
    }

    /// 插入时把值转换为列声明的类型
    pub fn coerce(&self, column: &str, value: DataType) -> Result<DataType, DbError> {
        let mismatch = |value: &DataType| DbError::type_mismatch(self, value.type_name());
        match (self, value) {
            (_, DataType::Null) => Ok(DataType::Null),
            (ColumnType::Int, DataType::Int(n)) => Ok(DataType::Int(n)),
            (ColumnType::Int, DataType::Float(f)) if exact_int(f).is_some() => {
                Ok(DataType::Int(f as i64))
            }
            (ColumnType::Float, DataType::Int(n)) => Ok(DataType::Float(n as f64)),
            (ColumnType::Float, DataType::Float(f)) => Ok(DataType::Float(f)),
            (ColumnType::Varchar(max_len), DataType::Varchar(s)) => {
                let actual = s.chars().count();
                if actual > *max_len {
                    return Err(DbError::ConstraintViolation(format!(
                        "列 {} 字符串长度超出限制: 最大长度 {}, 实际长度 {}",
                        column, max_len, actual
                    )));
                }
                Ok(DataType::Varchar(s))
            }
            (ColumnType::Date, DataType::Varchar(s)) if is_iso_date(&s) => Ok(DataType::Varchar(s)),
            (ColumnType::Bit, DataType::Int(n)) if n == 0 || n == 1 => Ok(DataType::Int(n)),
            (_, other) => Err(mismatch(&other)),
        }
    }

    /// 查询时检查常量能否与该列比较
    pub fn check_comparable(&self, value: &DataType) -> Result<(), DbError> {
        let ok = match value {
            DataType::Null => true,
            DataType::Int(_) | DataType::Float(_) => !self.is_textual(),
            DataType::Varchar(_) => self.is_textual(),
        };
        if ok {
            Ok(())
        } else {
            Err(DbError::type_mismatch(self, value.type_name()))
        }
    }

    /// 把常量转换成该列存储时的形式，用于索引和主键查找。
    /// 无法精确表示（如整数列上的 2.5）时返回 None，表示不可能命中。
    pub fn lookup_value(&self, value: &DataType) -> Option<DataType> {
        match (self, value) {
            (ColumnType::Int | ColumnType::Bit, DataType::Int(n)) => Some(DataType::Int(*n)),
            (ColumnType::Int | ColumnType::Bit, DataType::Float(f)) => exact_int(*f).map(DataType::Int),
            (ColumnType::Float, DataType::Int(n)) => {
                let f = *n as f64;
                (compare_int_float(*n, f) == Some(Ordering::Equal)).then_some(DataType::Float(f))
            }
            (ColumnType::Float, DataType::Float(f)) => Some(DataType::Float(*f)),
            (ColumnType::Varchar(_) | ColumnType::Date, DataType::Varchar(s)) => {
                Some(DataType::Varchar(s.clone()))
            }
            _ => None,
        }
    }
}

fn is_iso_date(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
}

impl TableSchema {
    pub fn new(name: String, columns: Vec<Column>, primary_keys: Vec<String>) -> Self {
        TableSchema {
            name,
            columns,
            primary_keys,
            indexes: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// 单列索引：列名 -> 索引文件名
    pub fn indexed_columns(&self) -> HashMap<String, String> {
        self.indexes
            .iter()
            .filter(|index| index.columns.len() == 1)
            .map(|index| (index.columns[0].clone(), index.name.clone()))
            .collect()
    }

    /// 由主键值生成行标识，主键列在插入校验时保证非空
    pub fn row_id(&self, row: &Row) -> RowId {
        let key = composite_key(
            self.primary_keys
                .iter()
                .map(|pk| row.get(pk).unwrap_or(&DataType::Null)),
        );
        RowId::new(key.unwrap_or_default())
    }

    /// 校验并转换一行数据
    pub fn validate_row(&self, mut row: Row) -> Result<Row, DbError> {
        for name in row.keys() {
            if self.column(name).is_none() {
                return Err(DbError::UnknownColumn(name.clone()));
            }
        }

        let mut validated = Row::new();
        for column in &self.columns {
            let value = row.remove(&column.name).unwrap_or(DataType::Null);
            let value = column.data_type.coerce(&column.name, value)?;
            if value.is_null() && (!column.nullable || column.primary_key) {
                return Err(DbError::ConstraintViolation(format!(
                    "非空字段 {} 不能为null",
                    column.name
                )));
            }
            validated.insert(column.name.clone(), value);
        }
        Ok(validated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_mixes_integer_and_float() {
        let ord = DataType::Int(2).compare(&DataType::Float(2.5)).unwrap();
        assert_eq!(ord, Some(Ordering::Less));
        assert!(DataType::Int(2).value_eq(&DataType::Float(2.0)).unwrap());
    }

    #[test]
    fn compare_rejects_text_against_number() {
        let err = DataType::Varchar("a".into()).compare(&DataType::Int(1)).unwrap_err();
        assert!(matches!(err, DbError::TypeMismatch { .. }));
    }

    #[test]
    fn null_only_equals_null() {
        assert!(DataType::Null.value_eq(&DataType::Null).unwrap());
        assert!(!DataType::Null.value_eq(&DataType::Int(1)).unwrap());
        assert_eq!(DataType::Null.compare(&DataType::Int(1)).unwrap(), None);
    }

    #[test]
    fn coerce_checks_varchar_length_and_dates() {
        let err = ColumnType::Varchar(3)
            .coerce("name", DataType::Varchar("Alice".into()))
            .unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)));
        assert!(ColumnType::Date.coerce("d", DataType::Varchar("2024-01-15".into())).is_ok());
        assert!(ColumnType::Date.coerce("d", DataType::Varchar("15/01/2024".into())).is_err());
        assert_eq!(
            ColumnType::Float.coerce("f", DataType::Int(3)).unwrap(),
            DataType::Float(3.0)
        );
    }

    #[test]
    fn lookup_value_drops_unrepresentable_constants() {
        assert_eq!(ColumnType::Int.lookup_value(&DataType::Float(2.5)), None);
        assert_eq!(ColumnType::Int.lookup_value(&DataType::Float(2.0)), Some(DataType::Int(2)));
    }

    #[test]
    fn integer_and_float_compare_exactly_beyond_2_pow_53() {
        let big = DataType::Int(9_007_199_254_740_993);
        let float = DataType::Float(9_007_199_254_740_992.0);
        assert_eq!(big.compare(&float).unwrap(), Some(Ordering::Greater));
        assert_eq!(float.compare(&big).unwrap(), Some(Ordering::Less));
        assert!(!big.value_eq(&float).unwrap());
        assert!(DataType::Int(9_007_199_254_740_992).value_eq(&float).unwrap());
        assert_eq!(
            DataType::Int(i64::MAX).compare(&DataType::Float(TWO_POW_63)).unwrap(),
            Some(Ordering::Less)
        );
        assert_eq!(
            DataType::Int(-3).compare(&DataType::Float(-2.5)).unwrap(),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn lookup_value_agrees_with_exact_comparison() {
        assert_eq!(ColumnType::Int.lookup_value(&DataType::Float(TWO_POW_63)), None);
        assert_eq!(
            ColumnType::Float.lookup_value(&DataType::Int(9_007_199_254_740_993)),
            None
        );
        assert_eq!(
            ColumnType::Float.lookup_value(&DataType::Int(1 << 53)),
            Some(DataType::Float(9_007_199_254_740_992.0))
        );
        assert!(ColumnType::Int.coerce("n", DataType::Float(1e19)).is_err());
    }

    #[test]
    fn null_has_no_key_and_zero_signs_share_one() {
        assert_eq!(DataType::Null.index_key(), None);
        assert_eq!(DataType::Varchar("NULL".into()).index_key(), Some("NULL".to_string()));
        assert_eq!(DataType::Float(-0.0).index_key(), DataType::Float(0.0).index_key());
        assert_eq!(composite_key([&DataType::Int(1), &DataType::Null]), None);
    }

    #[test]
    fn composite_keys_do_not_collide_on_separator() {
        let left = composite_key([&DataType::Varchar("x#y".into()), &DataType::Varchar("z".into())]);
        let right = composite_key([&DataType::Varchar("x".into()), &DataType::Varchar("y#z".into())]);
        assert_ne!(left, right);
        let slash = composite_key([&DataType::Varchar("a\\".into()), &DataType::Varchar("b".into())]);
        let hash = composite_key([&DataType::Varchar("a".into()), &DataType::Varchar("#b".into())]);
        assert_ne!(slash, hash);
    }

    #[test]
    fn joined_row_id_keeps_parts_in_order() {
        let id = RowId::joined(&RowId::new("1"), &RowId::new("7"));
        assert_eq!(id.width(), 2);
        assert_eq!(id.part(0), Some(RowId::new("1")));
        assert_eq!(id.part(1), Some(RowId::new("7")));
        assert_eq!(id.to_string(), "1|7");
    }
}
