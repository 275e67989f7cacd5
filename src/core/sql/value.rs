use std::fmt;
use crate::core::error::DbError;
use crate::core::types::DataType;

/// 解析后的字面量或列引用
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedValue {
    Constant(DataType),
    Column(String),
}

/// WHERE 子句中的一个操作数，保留原始文本和解析后的形式
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    raw: String,
    parsed: ParsedValue,
}

impl Value {
    /// 解析原始文本：'...' 为字符串，数字为整数或浮点数，NULL，其余视为列名
    pub fn parse(raw: &str) -> Result<Value, DbError> {
        let raw = raw.trim();
        let parsed = if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
            ParsedValue::Constant(DataType::Varchar(unquote(&raw[1..raw.len() - 1])))
        } else if raw.eq_ignore_ascii_case("NULL") {
            ParsedValue::Constant(DataType::Null)
        } else if let Ok(n) = raw.parse::<i64>() {
            ParsedValue::Constant(DataType::Int(n))
        } else if is_float_literal(raw) {
            let f = raw
                .parse::<f64>()
                .map_err(|_| DbError::SqlError(format!("非法数字: {}", raw)))?;
            ParsedValue::Constant(DataType::Float(f))
        } else if is_column_reference(raw) {
            ParsedValue::Column(raw.to_string())
        } else {
            return Err(DbError::SqlError(format!("无法解析的值: {}", raw)));
        };

        Ok(Value {
            raw: raw.to_string(),
            parsed,
        })
    }

    /// 由已求值的常量构造，原始文本为可再次解析的字面量
    pub fn constant(value: DataType) -> Value {
        let raw = match &value {
            DataType::Varchar(s) => format!("'{}'", s.replace('\'', "''")),
            DataType::Float(f) if f.fract() == 0.0 && f.is_finite() => format!("{:.1}", f),
            other => other.to_string(),
        };
        Value {
            raw,
            parsed: ParsedValue::Constant(value),
        }
    }

    pub fn column(name: &str) -> Value {
        Value {
            raw: name.to_string(),
            parsed: ParsedValue::Column(name.to_string()),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn parsed(&self) -> &ParsedValue {
        &self.parsed
    }

    pub fn is_column(&self) -> bool {
        matches!(self.parsed, ParsedValue::Column(_))
    }

    pub fn column_name(&self) -> Option<&str> {
        match &self.parsed {
            ParsedValue::Column(name) => Some(name),
            ParsedValue::Constant(_) => None,
        }
    }

    pub fn typed(&self) -> Option<&DataType> {
        match &self.parsed {
            ParsedValue::Constant(value) => Some(value),
            ParsedValue::Column(_) => None,
        }
    }

    /// 重新解析原始文本，结果必须与当前解析结果一致
    pub fn reparse(&self) -> Result<Value, DbError> {
        Value::parse(&self.raw)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn unquote(inner: &str) -> String {
    inner.replace("''", "'")
}

fn is_float_literal(raw: &str) -> bool {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    let mut parts = digits.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let fraction = parts.next();
    match fraction {
        Some(fraction) => {
            !(whole.is_empty() && fraction.is_empty())
                && whole.chars().all(|c| c.is_ascii_digit())
                && fraction.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

fn is_column_reference(raw: &str) -> bool {
    !raw.is_empty()
        && raw.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_')
        })
        && raw.split('.').count() <= 2
}
