use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use crate::core::db::{Database, StorageType};
use crate::core::error::{DbError, ErrorDisplayMode};
use crate::core::result::QueryResult;
use crate::core::session::SessionId;
use crate::core::sql::TableFormatter;

#[derive(Parser, Debug)]
#[command(author, version, about = "一个支持连接、索引和聚合查询的简单关系数据库", long_about = None)]
pub struct Cli {
    /// 数据目录，每个数据库一个子目录
    #[arg(short, long, default_value = "data")]
    pub data_dir: PathBuf,

    /// 使用内存存储，不读写磁盘
    #[arg(long)]
    pub memory: bool,

    /// 错误信息的显示方式
    #[arg(long, value_enum, default_value_t = ErrorDisplayMode::Brief)]
    pub error_mode: ErrorDisplayMode,

    /// 以 JSON 输出结果
    #[arg(long)]
    pub json: bool,

    /// 日志级别 (RUST_LOG 优先)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// 执行给定的 SQL 后退出
    #[arg(short, long)]
    pub execute: Option<String>,
}

impl Cli {
    pub fn run(&self) -> Result<(), DbError> {
        let storage_type = if self.memory {
            StorageType::Memory
        } else {
            StorageType::File(self.data_dir.clone())
        };
        let mut db = Database::new(storage_type);
        db.set_error_mode(self.error_mode);
        let session = db.open_session();

        if let Some(sql) = &self.execute {
            return self.run_sql(&mut db, session, sql);
        }
        self.repl(&mut db, session)
    }

    fn repl(&self, db: &mut Database, session: SessionId) -> Result<(), DbError> {
        println!("SimpleRDB - 一个简单的关系数据库");
        println!("输入 'help' 获取帮助信息");
        println!("输入 'exit' 退出程序");
        println!("语句以分号(;)或单独一行的 GO 结束，可以跨多行输入");

        // 用于缓存多行SQL语句
        let mut sql_buffer = String::new();
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();

        loop {
            // 根据是否在继续输入SQL语句显示不同的提示符
            if sql_buffer.is_empty() {
                print!("> ");
            } else {
                print!("-> ");
            }
            io::stdout().flush()?;

            let line = match lines.next() {
                Some(line) => line?,
                None => break,
            };
            let input = line.trim();

            // 特殊命令只在缓冲区为空时生效，不需要分号
            if sql_buffer.is_empty() {
                match input.to_lowercase().as_str() {
                    "" => continue,
                    "exit" | "quit" => break,
                    "help" => {
                        print_help();
                        continue;
                    }
                    "databases" => {
                        for name in db.list_databases()? {
                            println!("  {}", name);
                        }
                        continue;
                    }
                    "list" => {
                        match db.list_tables(session) {
                            Ok(tables) if tables.is_empty() => println!("没有表"),
                            Ok(tables) => {
                                println!("表列表:");
                                for table in tables {
                                    println!("  {}", table);
                                }
                            }
                            Err(e) => println!("{}", db.format_error(&e)),
                        }
                        continue;
                    }
                    "save" => {
                        db.save()?;
                        println!("数据库已保存");
                        continue;
                    }
                    "mode" => {
                        let mode = db.toggle_error_mode();
                        println!("错误显示模式: {:?}", mode);
                        continue;
                    }
                    _ => {}
                }
            } else if input.eq_ignore_ascii_case("clear") {
                println!("已清除当前SQL缓冲区");
                sql_buffer.clear();
                continue;
            }

            sql_buffer.push_str(&line);
            sql_buffer.push('\n');

            let complete = input.ends_with(';') || input.eq_ignore_ascii_case("GO");
            if complete {
                let sql = std::mem::take(&mut sql_buffer);
                self.run_sql(db, session, &sql)?;
            }
        }

        Ok(())
    }

    fn run_sql(&self, db: &mut Database, session: SessionId, sql: &str) -> Result<(), DbError> {
        match db.execute(session, sql) {
            Ok(results) => self.print_results(&results),
            Err(e) => {
                println!("{}", db.format_error(&e));
                Ok(())
            }
        }
    }

    fn print_results(&self, results: &[QueryResult]) -> Result<(), DbError> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(results)?);
            return Ok(());
        }
        for result in results {
            print!("{}", TableFormatter::format_result(result));
        }
        Ok(())
    }
}

fn print_help() {
    println!("可用命令:");
    println!("  help      - 显示帮助信息");
    println!("  exit      - 退出程序");
    println!("  databases - 列出所有数据库");
    println!("  list      - 列出当前数据库的表");
    println!("  save      - 保存数据");
    println!("  mode      - 切换错误显示模式");
    println!("  clear     - 清除当前SQL缓冲区");
    println!("SQL命令:");
    println!("  -- 这是SQL注释");
    println!("  CREATE DATABASE name; DROP DATABASE name; USE name;");
    println!("  CREATE TABLE t (id INT PRIMARY KEY, name VARCHAR(20) NOT NULL, ...);");
    println!("  DROP TABLE t;");
    println!("  CREATE [UNIQUE] INDEX idx ON t (column);");
    println!("  INSERT INTO t [(c1, c2)] VALUES (v1, v2), (v3, v4);");
    println!("  DELETE FROM t [WHERE condition];");
    println!("  SELECT c1, t2.c2 | * | COUNT(*) | MIN(c) | MAX(c) FROM t [alias]");
    println!("      [JOIN t2 [alias] ON t.c = t2.c] [WHERE condition];");
    println!("  GO  - 结束当前批次");
}
