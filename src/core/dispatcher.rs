use std::sync::OnceLock;
use regex::{Captures, Regex};
use tracing::debug;
use crate::core::actions::{
    CreateDatabase, CreateIndex, CreateTable, DbAction, DeleteFrom, DropDatabase, DropTable,
    ExecutionContext, InsertInto, Select, Use,
};
use crate::core::error::DbError;
use crate::core::result::QueryResult;

/// 一个批次内按顺序执行的动作
pub type Batch = Vec<Box<dyn DbAction>>;

type Constructor = fn(&Captures<'_>) -> Result<Box<dyn DbAction>, DbError>;

/// 语句模式与对应的动作构造函数
struct Command {
    name: &'static str,
    pattern: Regex,
    build: Constructor,
}

/// 可以开始一条新语句的关键字，包括不支持的语句以便报告出错位置
const STATEMENT_KEYWORDS: &[&str] = &[
    "GO", "CREATE", "DROP", "USE", "INSERT", "DELETE", "SELECT", "UPDATE", "ALTER", "TRUNCATE",
];

fn command(name: &'static str, pattern: &str, build: Constructor) -> Command {
    Command {
        name,
        pattern: Regex::new(pattern).expect("statement pattern is valid"),
        build,
    }
}

/// 按优先级排列的语句注册表
fn registry() -> &'static [Command] {
    static REGISTRY: OnceLock<Vec<Command>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        vec![
            command(
                "CreateDatabase",
                r"(?is)\ACREATE\s+DATABASE\s+(?P<DatabaseName>\w+)\z",
                |c| Ok(Box::new(CreateDatabase::from_match(c)?)),
            ),
            command(
                "DropDatabase",
                r"(?is)\ADROP\s+DATABASE\s+(?P<DatabaseName>\w+)\z",
                |c| Ok(Box::new(DropDatabase::from_match(c)?)),
            ),
            command(
                "CreateTable",
                r"(?is)\ACREATE\s+TABLE\s+(?P<TableName>\w+)\s*\((?P<Fields>(?:[^()]|\([^()]*\))*)\)\z",
                |c| Ok(Box::new(CreateTable::from_match(c)?)),
            ),
            command(
                "DropTable",
                r"(?is)\ADROP\s+TABLE\s+(?P<TableName>\w+)\z",
                |c| Ok(Box::new(DropTable::from_match(c)?)),
            ),
            command(
                "CreateIndex",
                r"(?is)\ACREATE\s+(?P<Unique>UNIQUE\s+)?INDEX\s+(?P<IndexName>\w+)\s+ON\s+(?P<TableName>\w+)\s*\((?P<Columns>[^()]*)\)\z",
                |c| Ok(Box::new(CreateIndex::from_match(c)?)),
            ),
            command(
                "Use",
                r"(?is)\AUSE\s+(?P<DatabaseName>\w+)\z",
                |c| Ok(Box::new(Use::from_match(c)?)),
            ),
            command(
                "InsertInto",
                r"(?is)\AINSERT\s+INTO\s+(?P<TableName>\w+)\s*(?:\((?P<Columns>[^()]*)\)\s*)?VALUES\s*(?P<Values>\(.*\))\z",
                |c| Ok(Box::new(InsertInto::from_match(c)?)),
            ),
            command(
                "DeleteFrom",
                r"(?is)\ADELETE\s+FROM\s+(?P<TableName>\w+)(?:\s+WHERE\s+(?P<WhereStatement>.+))?\z",
                |c| Ok(Box::new(DeleteFrom::from_match(c)?)),
            ),
            command(
                "Select",
                r"(?is)\ASELECT\s+(?P<Columns>.+?)\s+FROM\s+(?P<TableName>\w+(?:\s+(?:AS\s+)?\w+)?)(?P<Joins>(?:\s+(?:INNER\s+)?JOIN\s+\w+(?:\s+(?:AS\s+)?\w+)?\s+ON\s+[\w.]+\s*=\s*[\w.]+)*)(?:\s+WHERE\s+(?P<WhereStatement>.+))?\z",
                |c| Ok(Box::new(Select::from_match(c)?)),
            ),
        ]
    })
}

fn go_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\AGO\z").expect("go pattern is valid"))
}

/// 构造阶段就失败的语句，执行时报告错误，不影响其他语句
struct FailedStatement {
    name: &'static str,
    error: Option<DbError>,
}

impl DbAction for FailedStatement {
    fn name(&self) -> &'static str {
        self.name
    }

    fn execute(&mut self, _ctx: &mut ExecutionContext<'_>) -> Result<QueryResult, DbError> {
        Err(self
            .error
            .take()
            .unwrap_or_else(|| DbError::SqlError(format!("{} 无法执行", self.name))))
    }
}

/// 把原始 SQL 文本拆分为按 GO 分隔的批次
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandDispatcher;

impl CommandDispatcher {
    pub fn new() -> Self {
        CommandDispatcher
    }

    pub fn to_batches(&self, raw: &str) -> Result<Vec<Batch>, DbError> {
        let mut batches = Vec::new();
        let mut actions: Batch = Vec::new();
        let mut rest = raw;
        let mut line = 1;

        loop {
            let skipped = skip_blank(rest);
            line += count_lines(&rest[..skipped]);
            rest = &rest[skipped..];
            if rest.is_empty() {
                break;
            }

            let end = statement_end(rest);
            let statement = rest[..end].trim();

            if go_pattern().is_match(statement) {
                // GO 结束当前批次
                if !actions.is_empty() {
                    batches.push(std::mem::take(&mut actions));
                }
            } else {
                let action = self
                    .build(statement)
                    .ok_or_else(|| DbError::UnmatchedStatement {
                        keyword: first_keyword(statement),
                        line,
                    })?;
                actions.push(action);
            }

            line += count_lines(&rest[..end]);
            rest = &rest[end..];
        }

        if !actions.is_empty() {
            batches.push(actions);
        }
        Ok(batches)
    }

    /// 用第一个匹配的模式构造动作
    fn build(&self, statement: &str) -> Option<Box<dyn DbAction>> {
        registry().iter().find_map(|command| {
            let captures = command.pattern.captures(statement)?;
            debug!("语句匹配 {}", command.name);
            Some(match (command.build)(&captures) {
                Ok(action) => action,
                Err(e) => Box::new(FailedStatement {
                    name: command.name,
                    error: Some(e),
                }) as Box<dyn DbAction>,
            })
        })
    }
}

// 跳过空白、分号和 -- 注释，返回跳过的字节数
fn skip_blank(text: &str) -> usize {
    let mut position = 0;
    loop {
        let rest = &text[position..];
        let trimmed = rest.trim_start();
        position += rest.len() - trimmed.len();
        if trimmed.starts_with(';') {
            position += 1;
        } else if trimmed.starts_with("--") {
            position += trimmed.find('\n').unwrap_or(trimmed.len());
        } else {
            return position;
        }
    }
}

/// 语句结束位置：引号外的分号，或括号外、位于行首的另一条语句的起始关键字。
/// 行中间与关键字同名的列名或别名不会截断语句。
fn statement_end(text: &str) -> usize {
    let first_word_end = text
        .find(|c: char| !c.is_alphanumeric() && c != '_')
        .unwrap_or(text.len());
    let mut in_quote = false;
    let mut depth = 0usize;
    let mut line_start = false;

    for (index, c) in text.char_indices() {
        if in_quote {
            if c == '\'' {
                in_quote = false;
            }
        } else {
            match c {
                '\'' => in_quote = true,
                ';' => return index,
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                _ if index >= first_word_end
                    && depth == 0
                    && line_start
                    && starts_keyword(&text[index..]) =>
                {
                    return index;
                }
                _ => {}
            }
        }
        if c == '\n' {
            line_start = true;
        } else if !c.is_whitespace() {
            line_start = false;
        }
    }
    text.len()
}

fn starts_keyword(text: &str) -> bool {
    let word_end = text
        .find(|c: char| !c.is_alphanumeric() && c != '_')
        .unwrap_or(text.len());
    let word = &text[..word_end];
    STATEMENT_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

fn first_keyword(statement: &str) -> String {
    statement
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn count_lines(text: &str) -> usize {
    text.matches('\n').count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(batches: &[Batch]) -> Vec<Vec<&'static str>> {
        batches
            .iter()
            .map(|batch| batch.iter().map(|action| action.name()).collect())
            .collect()
    }

    #[test]
    fn splits_statements_and_batches() {
        let sql = "CREATE DATABASE shop; USE shop\nGO\n\
                   CREATE TABLE t (id INT PRIMARY KEY, name VARCHAR(10))\n\
                   INSERT INTO t VALUES (1, 'a; SELECT'), (2, 'b')\n\
                   SELECT * FROM t WHERE name = 'a'\nGO";
        let batches = CommandDispatcher::new().to_batches(sql).unwrap();
        assert_eq!(
            names(&batches),
            vec![
                vec!["CREATE DATABASE", "USE"],
                vec!["CREATE TABLE", "INSERT", "SELECT"],
            ]
        );
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let batches = CommandDispatcher::new()
            .to_batches("select count(*) from t u join o on u.id = o.uid where u.id > 1;\ndelete from t")
            .unwrap();
        assert_eq!(names(&batches), vec![vec!["SELECT", "DELETE"]]);
    }

    #[test]
    fn unmatched_statement_reports_keyword_and_line() {
        let err = CommandDispatcher::new()
            .to_batches("USE shop;\n\n-- comment\nUPDATE t SET a = 1;")
            .err()
            .unwrap();
        match err {
            DbError::UnmatchedStatement { keyword, line } => {
                assert_eq!(keyword, "UPDATE");
                assert_eq!(line, 4);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn statement_end_respects_quotes_and_parentheses() {
        assert_eq!(statement_end("SELECT a FROM t WHERE b = 'x;y'; USE z"), 31);
        assert_eq!(statement_end("SELECT a FROM t\nDROP TABLE t"), 16);
        assert_eq!(statement_end("USE db"), 6);
        assert_eq!(statement_end("SELECT a FROM t\n  GO"), 18);
    }

    #[test]
    fn keyword_named_columns_do_not_split_statements() {
        let sql = "SELECT go FROM t use WHERE go = 1 AND use.drop > 2\nGO";
        assert_eq!(statement_end(sql), sql.len() - 2);
        let batches = CommandDispatcher::new().to_batches(sql).unwrap();
        assert_eq!(names(&batches), vec![vec!["SELECT"]]);
    }

    #[test]
    fn empty_input_has_no_batches() {
        assert!(CommandDispatcher::new().to_batches("  ;\n-- nothing\n").unwrap().is_empty());
    }
}
