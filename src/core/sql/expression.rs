use std::fmt;
use crate::core::error::DbError;
use super::operator::Operator;
use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    And,
    Or,
    Eq,
    Operator,
    Column,
    Value,
}

/// WHERE 子句的二叉表达式树
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Compare {
        op: Operator,
        left: Box<Node>,
        right: Box<Node>,
    },
    Column(Value),
    Value(Value),
}

impl Node {
    pub fn and(left: Node, right: Node) -> Node {
        Node::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Node, right: Node) -> Node {
        Node::Or(Box::new(left), Box::new(right))
    }

    pub fn compare(op: Operator, left: Node, right: Node) -> Node {
        Node::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// 由操作数构造叶子节点
    pub fn leaf(value: Value) -> Node {
        if value.is_column() {
            Node::Column(value)
        } else {
            Node::Value(value)
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::And(..) => NodeKind::And,
            Node::Or(..) => NodeKind::Or,
            Node::Compare { op: Operator::Eq, .. } => NodeKind::Eq,
            Node::Compare { .. } => NodeKind::Operator,
            Node::Column(_) => NodeKind::Column,
            Node::Value(_) => NodeKind::Value,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind(), NodeKind::Column | NodeKind::Value)
    }

    /// 检查树是否合法：比较节点的两个子节点必须是叶子，逻辑节点的子节点必须是合法子表达式
    pub fn validate(&self) -> Result<(), DbError> {
        match self {
            Node::And(left, right) | Node::Or(left, right) => {
                if left.is_leaf() || right.is_leaf() {
                    return Err(DbError::InvalidTree(format!("逻辑节点的子节点不能是叶子: {}", self)));
                }
                left.validate()?;
                right.validate()
            }
            Node::Compare { op, left, right } => {
                if !op.is_comparison() {
                    return Err(DbError::InvalidOperator(op.spelling().to_string()));
                }
                if !left.is_leaf() || !right.is_leaf() {
                    return Err(DbError::InvalidTree(format!("比较节点的子节点必须是列或值: {}", self)));
                }
                Ok(())
            }
            Node::Column(_) | Node::Value(_) => {
                Err(DbError::InvalidTree(format!("表达式不能只有一个操作数: {}", self)))
            }
        }
    }

    /// 常量在左、列在右时，返回交换两侧并反转操作符的新节点；其余情况返回 None
    pub fn normalized(&self) -> Option<Node> {
        match self {
            Node::Compare { op, left, right }
                if left.kind() == NodeKind::Value && right.kind() == NodeKind::Column =>
            {
                Some(Node::Compare {
                    op: op.inverted(),
                    left: right.clone(),
                    right: left.clone(),
                })
            }
            _ => None,
        }
    }

    /// NOT 作用于子树：比较取反操作符，逻辑节点按德摩根定律展开
    pub fn negated(self) -> Result<Node, DbError> {
        match self {
            Node::And(left, right) => Ok(Node::or(left.negated()?, right.negated()?)),
            Node::Or(left, right) => Ok(Node::and(left.negated()?, right.negated()?)),
            Node::Compare { op, left, right } => {
                let op = op
                    .negated()
                    .ok_or_else(|| DbError::InvalidOperator(op.spelling().to_string()))?;
                Ok(Node::Compare { op, left, right })
            }
            leaf => Err(DbError::InvalidExpression(format!("NOT 不能作用于 {}", leaf))),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::And(left, right) => write!(f, "({} AND {})", left, right),
            Node::Or(left, right) => write!(f, "({} OR {})", left, right),
            Node::Compare { op, left, right } => write!(f, "{} {} {}", left, op, right),
            Node::Column(value) | Node::Value(value) => write!(f, "{}", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str) -> Node {
        Node::leaf(Value::parse(name).unwrap())
    }

    fn val(raw: &str) -> Node {
        Node::leaf(Value::parse(raw).unwrap())
    }

    #[test]
    fn kind_distinguishes_equality_from_other_comparisons() {
        assert_eq!(Node::compare(Operator::Eq, col("a"), val("1")).kind(), NodeKind::Eq);
        assert_eq!(Node::compare(Operator::Lt, col("a"), val("1")).kind(), NodeKind::Operator);
        assert_eq!(col("a").kind(), NodeKind::Column);
        assert_eq!(val("'x'").kind(), NodeKind::Value);
    }

    #[test]
    fn validate_rejects_logical_children_under_comparison() {
        let inner = Node::and(
            Node::compare(Operator::Eq, col("a"), val("1")),
            Node::compare(Operator::Eq, col("b"), val("2")),
        );
        let bad = Node::compare(Operator::Eq, inner.clone(), val("1"));
        assert!(matches!(bad.validate(), Err(DbError::InvalidTree(_))));
        assert!(inner.validate().is_ok());
        assert!(matches!(col("a").validate(), Err(DbError::InvalidTree(_))));
    }

    #[test]
    fn normalized_swaps_and_inverts_without_touching_original() {
        let node = Node::compare(Operator::Lt, val("5"), col("age"));
        let normalized = node.normalized().unwrap();
        assert_eq!(normalized, Node::compare(Operator::Gt, col("age"), val("5")));
        assert_eq!(node.kind(), NodeKind::Operator);
        assert!(Node::compare(Operator::Lt, col("age"), val("5")).normalized().is_none());
    }

    #[test]
    fn negation_applies_de_morgan() {
        let node = Node::or(
            Node::compare(Operator::Eq, col("a"), val("1")),
            Node::compare(Operator::Lt, col("b"), val("2")),
        );
        let expected = Node::and(
            Node::compare(Operator::Ne, col("a"), val("1")),
            Node::compare(Operator::Ge, col("b"), val("2")),
        );
        assert_eq!(node.negated().unwrap(), expected);
    }
}
