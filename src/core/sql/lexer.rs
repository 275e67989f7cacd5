use crate::core::error::DbError;
use super::operator::Operator;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // 操作符（符号和关键字）
    Operator(Operator),
    Null,
    // 分隔符
    Comma,  // ,
    LParen, // (
    RParen, // )
    // 字面量
    Identifier(String),
    String(String),
    Number(String),
    // 其他
    Comment(String),
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new() -> Self {
        Lexer {
            input: Vec::new(),
            position: 0,
        }
    }

    pub fn tokenize(&mut self, input: &str) -> Result<Vec<Token>, DbError> {
        self.input = input.chars().collect();
        self.position = 0;
        let mut tokens = Vec::new();

        while let Some(c) = self.current() {
            // 跳过空白字符
            if c.is_whitespace() {
                self.position += 1;
                continue;
            }

            // 处理注释
            if c == '-' && self.peek() == Some('-') {
                self.position += 2;
                let comment = self.read_until('\n');
                tokens.push(Token::Comment(comment));
                continue;
            }

            // 处理标识符和关键字，标识符可以带表名前缀 (t.col)
            if c.is_alphabetic() || c == '_' {
                let identifier = self.read_identifier();
                let token = if identifier.eq_ignore_ascii_case("NULL") {
                    Token::Null
                } else if let Some(op) = Operator::from_keyword(&identifier) {
                    Token::Operator(op)
                } else {
                    Token::Identifier(identifier)
                };
                tokens.push(token);
                continue;
            }

            // 处理数字
            if c.is_ascii_digit() || (c == '.' && self.peek().map_or(false, |n| n.is_ascii_digit())) {
                tokens.push(Token::Number(self.read_number()));
                continue;
            }

            // 处理字符串，'' 表示转义的单引号
            if c == '\'' {
                self.position += 1;
                tokens.push(Token::String(self.read_string()?));
                continue;
            }

            // 处理分隔符
            let token = match c {
                ',' => Some(Token::Comma),
                '(' => Some(Token::LParen),
                ')' => Some(Token::RParen),
                _ => None,
            };
            if let Some(token) = token {
                tokens.push(token);
                self.position += 1;
                continue;
            }

            // 处理操作符，多字符操作符优先
            match Operator::match_symbol(&self.input, self.position) {
                Some((op, len)) => {
                    tokens.push(Token::Operator(op));
                    self.position += len;
                }
                None => return Err(DbError::SqlError(format!("未知字符: {}", c))),
            }
        }

        Ok(tokens)
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn read_identifier(&mut self) -> String {
        let mut identifier = String::new();
        while let Some(c) = self.current() {
            let continues_qualified = c == '.'
                && self.peek().map_or(false, |n| n.is_alphabetic() || n == '_');
            if c.is_alphanumeric() || c == '_' || continues_qualified {
                identifier.push(c);
                self.position += 1;
            } else {
                break;
            }
        }
        identifier
    }

    fn read_number(&mut self) -> String {
        let mut number = String::new();
        let mut seen_dot = false;
        while let Some(c) = self.current() {
            if c.is_ascii_digit() || (c == '.' && !seen_dot) {
                seen_dot |= c == '.';
                number.push(c);
                self.position += 1;
            } else {
                break;
            }
        }
        number
    }

    fn read_string(&mut self) -> Result<String, DbError> {
        let mut result = String::new();
        loop {
            match self.current() {
                Some('\'') if self.peek() == Some('\'') => {
                    result.push('\'');
                    self.position += 2;
                }
                Some('\'') => {
                    self.position += 1;
                    return Ok(result);
                }
                Some(c) => {
                    result.push(c);
                    self.position += 1;
                }
                None => return Err(DbError::SqlError("字符串缺少结束引号".to_string())),
            }
        }
    }

    fn read_until(&mut self, end: char) -> String {
        let mut result = String::new();
        while let Some(c) = self.current() {
            if c == end {
                break;
            }
            result.push(c);
            self.position += 1;
        }
        result
    }
}
