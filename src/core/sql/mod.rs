mod aggregation;
mod evaluator;
mod expression;
mod formatter;
mod join;
mod lexer;
mod operator;
mod parser;
mod table;
mod value;

pub use aggregation::{AggregateFunction, Aggregation};
pub use evaluator::{row_ids, StatementEvaluator};
pub use expression::{Node, NodeKind};
pub use formatter::TableFormatter;
pub use join::{Join, JoinSpec};
pub use lexer::{Lexer, Token};
pub use operator::{Operator, OperatorClass};
pub use parser::Parser;
pub use table::{GroupedRows, JoinedRow, TableContent, TableDetail, TableService};
pub use value::{ParsedValue, Value};
