use crate::core::error::DbError;
use crate::core::types::DataType;
use super::expression::Node;
use super::lexer::{Lexer, Token};
use super::operator::{Operator, OperatorClass};
use super::value::Value;

/// 表达式中的操作数：列引用或已折叠的常量
enum Operand {
    Column(Value),
    Constant(Value),
}

impl Operand {
    fn into_node(self) -> Node {
        match self {
            Operand::Column(value) => Node::Column(value),
            Operand::Constant(value) => Node::Value(value),
        }
    }

    fn constant(&self, context: &str) -> Result<&DataType, DbError> {
        match self {
            Operand::Constant(value) => value
                .typed()
                .ok_or_else(|| DbError::InvalidExpression(format!("{} 需要常量", context))),
            Operand::Column(value) => Err(DbError::InvalidExpression(format!(
                "{} 不支持作用于列 {}",
                context, value
            ))),
        }
    }
}

/// WHERE 子句与 VALUES 列表的递归下降解析器
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new() -> Self {
        Parser {
            tokens: Vec::new(),
            position: 0,
        }
    }

    /// 把 WHERE 子句解析为表达式树
    pub fn parse_where(&mut self, text: &str) -> Result<Node, DbError> {
        self.load(text)?;
        if self.tokens.is_empty() {
            return Err(DbError::SqlError("WHERE子句为空".to_string()));
        }
        let node = self.parse_or_condition()?;
        self.expect_end()?;
        Ok(node)
    }

    /// 解析以逗号分隔的常量列表，例如 INSERT 的一行值
    pub fn parse_values(&mut self, text: &str) -> Result<Vec<DataType>, DbError> {
        self.load(text)?;
        let mut values = Vec::new();
        if self.tokens.is_empty() {
            return Ok(values);
        }
        loop {
            let operand = self.parse_operand()?;
            values.push(operand.constant("VALUES")?.clone());
            match self.peek() {
                Some(Token::Comma) => {
                    self.next();
                }
                None => break,
                Some(token) => {
                    return Err(DbError::SqlError(format!("期望逗号, 实际 {:?}", token)));
                }
            }
        }
        Ok(values)
    }

    fn load(&mut self, text: &str) -> Result<(), DbError> {
        // 过滤掉所有注释Token
        self.tokens = Lexer::new()
            .tokenize(text)?
            .into_iter()
            .filter(|token| !matches!(token, Token::Comment(_)))
            .collect();
        self.position = 0;
        Ok(())
    }

    fn parse_or_condition(&mut self) -> Result<Node, DbError> {
        let mut left = self.parse_and_condition()?;
        while let Some(Token::Operator(Operator::Or)) = self.peek() {
            self.next(); // 消费 OR
            let right = self.parse_and_condition()?;
            left = Node::or(left, right);
        }
        Ok(left)
    }

    fn parse_and_condition(&mut self) -> Result<Node, DbError> {
        let mut left = self.parse_not_condition()?;
        while let Some(Token::Operator(Operator::And)) = self.peek() {
            self.next(); // 消费 AND
            let right = self.parse_not_condition()?;
            left = Node::and(left, right);
        }
        Ok(left)
    }

    fn parse_not_condition(&mut self) -> Result<Node, DbError> {
        if let Some(Token::Operator(Operator::Not)) = self.peek() {
            self.next(); // 消费 NOT
            return self.parse_not_condition()?.negated();
        }
        self.parse_condition()
    }

    fn parse_condition(&mut self) -> Result<Node, DbError> {
        // 括号可能包住一个条件，也可能只是包住操作数，先按条件尝试
        if let Some(Token::LParen) = self.peek() {
            let saved = self.position;
            self.next();
            if let Ok(condition) = self.parse_or_condition() {
                if let Some(Token::RParen) = self.peek() {
                    self.next();
                    if !self.at_operand_continuation() {
                        return Ok(condition);
                    }
                }
            }
            self.position = saved;
        }

        let left = self.parse_operand()?;
        let op = match self.next() {
            Some(Token::Operator(op)) if op.is_comparison() => op,
            Some(token) => return Err(DbError::SqlError(format!("期望比较操作符, 实际 {:?}", token))),
            None => return Err(DbError::SqlError("期望比较操作符, 但已到结尾".to_string())),
        };
        let right = self.parse_operand()?;

        Ok(Node::compare(op, left.into_node(), right.into_node()))
    }

    fn at_operand_continuation(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Operator(op))
                if matches!(op.class(), OperatorClass::Comparison | OperatorClass::Arithmetic)
        )
    }

    // operand := term (('+' | '-') term)*
    fn parse_operand(&mut self) -> Result<Operand, DbError> {
        let mut left = self.parse_term()?;
        while let Some(Token::Operator(op @ (Operator::Add | Operator::Sub))) = self.peek().cloned() {
            self.next();
            let right = self.parse_term()?;
            left = fold(op, left, right)?;
        }
        Ok(left)
    }

    // term := factor (('*' | '/') factor)*
    fn parse_term(&mut self) -> Result<Operand, DbError> {
        let mut left = self.parse_factor()?;
        while let Some(Token::Operator(op @ (Operator::Mul | Operator::Div))) = self.peek().cloned() {
            self.next();
            let right = self.parse_factor()?;
            left = fold(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Operand, DbError> {
        match self.next() {
            Some(Token::Number(raw)) => Ok(Operand::Constant(Value::parse(&raw)?)),
            Some(Token::String(s)) => Ok(Operand::Constant(Value::constant(DataType::Varchar(s)))),
            Some(Token::Null) => Ok(Operand::Constant(Value::constant(DataType::Null))),
            Some(Token::Identifier(name)) => Ok(Operand::Column(Value::parse(&name)?)),
            Some(Token::Operator(Operator::Sub)) => {
                let operand = self.parse_factor()?;
                let negated = match operand.constant("-")? {
                    DataType::Int(n) => n
                        .checked_neg()
                        .map(DataType::Int)
                        .ok_or_else(|| DbError::InvalidExpression("整数溢出".to_string()))?,
                    DataType::Float(f) => DataType::Float(-f),
                    DataType::Null => DataType::Null,
                    other => return Err(DbError::type_mismatch("-", other.type_name())),
                };
                Ok(Operand::Constant(Value::constant(negated)))
            }
            Some(Token::Operator(op)) if op.class() == OperatorClass::Function => {
                self.expect(Token::LParen)?;
                let argument = self.parse_operand()?;
                self.expect(Token::RParen)?;
                let result = op.apply_function(argument.constant(op.spelling())?)?;
                Ok(Operand::Constant(Value::constant(result)))
            }
            Some(Token::LParen) => {
                let operand = self.parse_operand()?;
                self.expect(Token::RParen)?;
                Ok(operand)
            }
            Some(token) => Err(DbError::SqlError(format!("期望表达式, 实际 {:?}", token))),
            None => Err(DbError::SqlError("期望表达式, 但已到结尾".to_string())),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), DbError> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(DbError::SqlError(format!("期望 {:?}, 实际 {:?}", expected, token))),
            None => Err(DbError::SqlError(format!("期望 {:?}, 但已到结尾", expected))),
        }
    }

    fn expect_end(&self) -> Result<(), DbError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(DbError::SqlError(format!("多余的内容: {:?}", token))),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }
}

fn fold(op: Operator, left: Operand, right: Operand) -> Result<Operand, DbError> {
    let context = op.spelling();
    let result = op.apply_arithmetic(left.constant(context)?, right.constant(context)?)?;
    Ok(Operand::Constant(Value::constant(result)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sql::expression::NodeKind;

    fn parse(text: &str) -> Node {
        Parser::new().parse_where(text).unwrap()
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let node = parse("a = 1 OR b = 2 AND c = 3");
        match node {
            Node::Or(left, right) => {
                assert_eq!(left.kind(), NodeKind::Eq);
                assert_eq!(right.kind(), NodeKind::And);
            }
            other => panic!("unexpected tree {}", other),
        }
    }

    #[test]
    fn parentheses_group_conditions_and_operands() {
        let node = parse("(a = 1 OR b = 2) AND (1 + 2) * 2 < c");
        match &node {
            Node::And(left, right) => {
                assert_eq!(left.kind(), NodeKind::Or);
                assert_eq!(right.to_string(), "6 < c");
            }
            other => panic!("unexpected tree {}", other),
        }
        assert!(node.validate().is_ok());
    }

    #[test]
    fn folds_functions_and_negative_numbers() {
        assert_eq!(parse("name = UPPER('ann')").to_string(), "name = 'ANN'");
        assert_eq!(parse("age > -5").to_string(), "age > -5");
        assert_eq!(parse("LEN('abcd') = size").to_string(), "4 = size");
    }

    #[test]
    fn negating_the_smallest_integer_is_an_error() {
        let err = Parser::new()
            .parse_where("id > -(-9223372036854775807 - 1)")
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidExpression(_)));
        assert_eq!(
            parse("id > -9223372036854775807 - 1").to_string(),
            "id > -9223372036854775808"
        );
    }

    #[test]
    fn not_is_pushed_into_comparisons() {
        assert_eq!(parse("NOT age > 5").to_string(), "age <= 5");
        assert_eq!(
            parse("NOT (a = 1 AND b < 2)").to_string(),
            "(a != 1 OR b >= 2)"
        );
    }

    #[test]
    fn arithmetic_over_columns_is_rejected() {
        let err = Parser::new().parse_where("age + 1 > 5").unwrap_err();
        assert!(matches!(err, DbError::InvalidExpression(_)));
    }

    #[test]
    fn rejects_trailing_tokens_and_missing_operator() {
        assert!(Parser::new().parse_where("a = 1 b").is_err());
        assert!(Parser::new().parse_where("a").is_err());
    }

    #[test]
    fn parses_value_lists() {
        let values = Parser::new().parse_values("1, 'Ann', NULL, -2.5, 3 * 4").unwrap();
        assert_eq!(
            values,
            vec![
                DataType::Int(1),
                DataType::Varchar("Ann".to_string()),
                DataType::Null,
                DataType::Float(-2.5),
                DataType::Int(12),
            ]
        );
        assert!(Parser::new().parse_values("1, name").is_err());
    }
}
