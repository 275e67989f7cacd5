use std::fmt;
use std::str::FromStr;
use crate::core::error::DbError;
use crate::core::types::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // 逻辑
    And,
    Or,
    // 比较
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    // 算术
    Add,
    Sub,
    Mul,
    Div,
    // 函数
    Len,
    Upper,
    Lower,
    // 取反
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorClass {
    Logical,
    Comparison,
    Arithmetic,
    Function,
    Negation,
}

/// 符号操作符的拼写，按长度降序排列，保证最长匹配
const SYMBOLS: &[(&str, Operator)] = &[
    ("!=", Operator::Ne),
    ("<=", Operator::Le),
    (">=", Operator::Ge),
    ("=", Operator::Eq),
    ("<", Operator::Lt),
    (">", Operator::Gt),
    ("+", Operator::Add),
    ("-", Operator::Sub),
    ("*", Operator::Mul),
    ("/", Operator::Div),
];

/// 以关键字形式出现的操作符
const KEYWORDS: &[(&str, Operator)] = &[
    ("AND", Operator::And),
    ("OR", Operator::Or),
    ("NOT", Operator::Not),
    ("LEN", Operator::Len),
    ("UPPER", Operator::Upper),
    ("LOWER", Operator::Lower),
];

impl Operator {
    pub fn class(&self) -> OperatorClass {
        match self {
            Operator::And | Operator::Or => OperatorClass::Logical,
            Operator::Eq | Operator::Ne | Operator::Lt | Operator::Gt | Operator::Le | Operator::Ge => {
                OperatorClass::Comparison
            }
            Operator::Add | Operator::Sub | Operator::Mul | Operator::Div => OperatorClass::Arithmetic,
            Operator::Len | Operator::Upper | Operator::Lower => OperatorClass::Function,
            Operator::Not => OperatorClass::Negation,
        }
    }

    pub fn arity(&self) -> usize {
        match self.class() {
            OperatorClass::Function | OperatorClass::Negation => 1,
            _ => 2,
        }
    }

    pub fn is_comparison(&self) -> bool {
        self.class() == OperatorClass::Comparison
    }

    pub fn spelling(&self) -> &'static str {
        SYMBOLS
            .iter()
            .chain(KEYWORDS.iter())
            .find(|(_, op)| op == self)
            .map(|(text, _)| *text)
            .unwrap_or("?")
    }

    /// 在 input 的 pos 处尝试匹配符号操作符，返回操作符及其长度
    pub fn match_symbol(input: &[char], pos: usize) -> Option<(Operator, usize)> {
        SYMBOLS.iter().find_map(|(text, op)| {
            let len = text.chars().count();
            let matches = pos + len <= input.len()
                && text.chars().zip(&input[pos..pos + len]).all(|(a, b)| a == *b);
            matches.then_some((*op, len))
        })
    }

    pub fn from_keyword(word: &str) -> Option<Operator> {
        KEYWORDS
            .iter()
            .find(|(text, _)| text.eq_ignore_ascii_case(word))
            .map(|(_, op)| *op)
    }

    /// 交换左右操作数后的等价操作符
    pub fn inverted(&self) -> Operator {
        match self {
            Operator::Lt => Operator::Gt,
            Operator::Gt => Operator::Lt,
            Operator::Le => Operator::Ge,
            Operator::Ge => Operator::Le,
            other => *other,
        }
    }

    /// NOT 作用于比较后的操作符
    pub fn negated(&self) -> Option<Operator> {
        match self {
            Operator::Eq => Some(Operator::Ne),
            Operator::Ne => Some(Operator::Eq),
            Operator::Lt => Some(Operator::Ge),
            Operator::Ge => Some(Operator::Lt),
            Operator::Gt => Some(Operator::Le),
            Operator::Le => Some(Operator::Gt),
            _ => None,
        }
    }

    /// 比较两个类型化的值
    pub fn compare(&self, left: &DataType, right: &DataType) -> Result<bool, DbError> {
        use std::cmp::Ordering::*;

        match self {
            Operator::Eq => left.value_eq(right),
            Operator::Ne => left.value_eq(right).map(|eq| !eq),
            Operator::Lt | Operator::Gt | Operator::Le | Operator::Ge => {
                let ord = match left.compare(right)? {
                    Some(ord) => ord,
                    None => return Ok(false),
                };
                Ok(match self {
                    Operator::Lt => ord == Less,
                    Operator::Gt => ord == Greater,
                    Operator::Le => ord != Greater,
                    _ => ord != Less,
                })
            }
            other => Err(DbError::InvalidOperator(other.spelling().to_string())),
        }
    }

    /// 常量上的算术运算
    pub fn apply_arithmetic(&self, left: &DataType, right: &DataType) -> Result<DataType, DbError> {
        if left.is_null() || right.is_null() {
            return Ok(DataType::Null);
        }
        match (left, right) {
            (DataType::Int(a), DataType::Int(b)) => {
                let result = match self {
                    Operator::Add => a.checked_add(*b),
                    Operator::Sub => a.checked_sub(*b),
                    Operator::Mul => a.checked_mul(*b),
                    Operator::Div => {
                        if *b == 0 {
                            return Err(DbError::InvalidExpression("除数不能为0".to_string()));
                        }
                        a.checked_div(*b)
                    }
                    other => return Err(DbError::InvalidOperator(other.spelling().to_string())),
                };
                result
                    .map(DataType::Int)
                    .ok_or_else(|| DbError::InvalidExpression("整数溢出".to_string()))
            }
            (DataType::Int(_) | DataType::Float(_), DataType::Int(_) | DataType::Float(_)) => {
                let a = as_float(left);
                let b = as_float(right);
                let result = match self {
                    Operator::Add => a + b,
                    Operator::Sub => a - b,
                    Operator::Mul => a * b,
                    Operator::Div => {
                        if b == 0.0 {
                            return Err(DbError::InvalidExpression("除数不能为0".to_string()));
                        }
                        a / b
                    }
                    other => return Err(DbError::InvalidOperator(other.spelling().to_string())),
                };
                Ok(DataType::Float(result))
            }
            _ => Err(DbError::type_mismatch(left.type_name(), right.type_name())),
        }
    }

    /// LEN / UPPER / LOWER
    pub fn apply_function(&self, argument: &DataType) -> Result<DataType, DbError> {
        let text = match argument {
            DataType::Null => return Ok(DataType::Null),
            DataType::Varchar(s) => s,
            other => return Err(DbError::type_mismatch(self.spelling(), other.type_name())),
        };
        match self {
            Operator::Len => Ok(DataType::Int(text.chars().count() as i64)),
            Operator::Upper => Ok(DataType::Varchar(text.to_uppercase())),
            Operator::Lower => Ok(DataType::Varchar(text.to_lowercase())),
            other => Err(DbError::InvalidOperator(other.spelling().to_string())),
        }
    }
}

fn as_float(value: &DataType) -> f64 {
    match value {
        DataType::Int(n) => *n as f64,
        DataType::Float(f) => *f,
        _ => 0.0,
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spelling())
    }
}

impl FromStr for Operator {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chars: Vec<char> = s.trim().chars().collect();
        if let Some((op, len)) = Operator::match_symbol(&chars, 0) {
            if len == chars.len() {
                return Ok(op);
            }
        }
        Operator::from_keyword(s.trim()).ok_or_else(|| DbError::InvalidOperator(s.to_string()))
    }
}
