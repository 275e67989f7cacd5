use simple_rdb::core::db::{Database, StorageType};
use simple_rdb::core::sql::TableFormatter;

fn main() {
    // 使用内存存储，不影响数据目录
    let mut db = Database::new(StorageType::Memory);

    let setup = "
        CREATE DATABASE shop;
        USE shop;
        CREATE TABLE Users (id INT PRIMARY KEY, name VARCHAR(20), age INT, active BIT);
        CREATE TABLE Orders (order_id INT PRIMARY KEY, user_id INT, total FLOAT);
        CREATE INDEX idx_users_name ON Users (name);
        INSERT INTO Users VALUES (1, 'Ann', 30, 1), (2, 'Bob', 25, 0), (3, NULL, 41, 1);
        INSERT INTO Orders VALUES (10, 1, 12.5), (11, 3, 99.0);
        GO
    ";

    println!("\n=== 初始化示例数据 ===");
    run(&mut db, setup);

    let queries = [
        "SELECT * FROM Users WHERE age > 25",
        "SELECT name FROM Users WHERE 30 >= age AND name = 'Bob'",
        "SELECT u.name, o.total FROM Users u JOIN Orders o ON u.id = o.user_id",
        "SELECT COUNT(*), COUNT(name), MAX(age) FROM Users",
        "SELECT MAX(active) FROM Users",
        "SELECT id FROM Users WHERE id = user_id",
        "DELETE FROM Users WHERE id = 2; SELECT COUNT(*) FROM Users",
    ];

    for sql in queries {
        println!("\n执行: {}", sql);
        run(&mut db, sql);
    }
}

fn run(db: &mut Database, sql: &str) {
    match db.execute_sql(sql) {
        Ok(results) => {
            for result in &results {
                print!("{}", TableFormatter::format_result(result));
            }
        }
        Err(e) => println!("执行失败: {}", db.format_error(&e)),
    }
}
