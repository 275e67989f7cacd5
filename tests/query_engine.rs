use simple_rdb::core::types::DataType;
use simple_rdb::{Database, DbError, QueryResult, StorageType};

const SETUP: &str = "
    CREATE DATABASE shop;
    USE shop;
    CREATE TABLE Users (id INT PRIMARY KEY, name VARCHAR(20), age INT, active BIT);
    CREATE TABLE Orders (order_id INT PRIMARY KEY, user_id INT, total FLOAT);
    INSERT INTO Users VALUES (1, 'Ann', 30, 1), (2, 'Bob', 25, 0);
    INSERT INTO Orders (order_id, user_id, total) VALUES (10, 1, 12.5);
    GO
";

fn shop() -> Database {
    let mut db = Database::new(StorageType::Memory);
    let results = db.execute_sql(SETUP).expect("setup parses");
    for result in &results {
        assert!(!result.is_error(), "setup failed: {:?}", result.error);
    }
    db
}

fn query(db: &mut Database, sql: &str) -> QueryResult {
    let mut results = db.execute_sql(sql).expect("statement parses");
    assert_eq!(results.len(), 1, "expected one statement in {}", sql);
    results.remove(0)
}

fn int(n: i64) -> DataType {
    DataType::Int(n)
}

fn text(s: &str) -> DataType {
    DataType::Varchar(s.to_string())
}

#[test]
fn scan_filters_rows_by_comparison() {
    let mut db = shop();
    let result = query(&mut db, "SELECT id FROM Users WHERE age > 25");
    assert_eq!(result.fields, vec!["Users.id"]);
    assert_eq!(result.rows, vec![vec![int(1)]]);
}

#[test]
fn index_and_scan_paths_agree() {
    let mut db = shop();
    let before = query(&mut db, "SELECT id FROM Users WHERE id = 2");
    let by_name = query(&mut db, "SELECT id FROM Users WHERE name = 'Bob'");

    query(&mut db, "CREATE INDEX idx_users_id ON Users (id)");
    query(&mut db, "CREATE INDEX idx_users_name ON Users (name)");
    let after = query(&mut db, "SELECT id FROM Users WHERE id = 2");

    assert_eq!(before.rows, vec![vec![int(2)]]);
    assert_eq!(after.rows, before.rows);
    assert_eq!(query(&mut db, "SELECT id FROM Users WHERE name = 'Bob'").rows, by_name.rows);
    assert_eq!(query(&mut db, "SELECT id FROM Users WHERE 'Bob' = name").rows, by_name.rows);
}

fn rows(db: &mut Database, sql: &str) -> Vec<Vec<DataType>> {
    let result = query(db, sql);
    assert!(!result.is_error(), "{}: {:?}", sql, result.error);
    result.rows
}

fn database(setup: &str) -> Database {
    let mut db = Database::new(StorageType::Memory);
    for result in db.execute_sql(setup).expect("setup parses") {
        assert!(!result.is_error(), "setup failed: {:?}", result.error);
    }
    db
}

/// 对每个常量，等值查询走主键/扫描、走索引，以及用区间强制全表扫描，三者结果一致
fn assert_lookup_paths_agree(setup: &str, table: &str, column: &str, constants: &[&str]) {
    let mut plain = database(setup);
    let mut indexed = database(setup);
    rows(&mut indexed, &format!("CREATE INDEX idx_lookup ON {} ({})", table, column));

    for constant in constants {
        let scanned = rows(
            &mut plain,
            &format!("SELECT * FROM {t} WHERE {c} >= {v} AND {c} <= {v}", t = table, c = column, v = constant),
        );
        let equality = format!("SELECT * FROM {} WHERE {} = {}", table, column, constant);
        assert_eq!(rows(&mut plain, &equality), scanned, "{}", equality);
        assert_eq!(rows(&mut indexed, &equality), scanned, "indexed: {}", equality);
    }
}

#[test]
fn null_is_never_found_through_an_index() {
    let setup = "CREATE DATABASE d; USE d;
        CREATE TABLE t (id INT PRIMARY KEY, name VARCHAR(10));
        INSERT INTO t VALUES (1, NULL), (2, 'NULL'), (3, 'a#b'), (4, 'a'), (5, NULL)";
    assert_lookup_paths_agree(setup, "t", "name", &["'NULL'", "'a#b'", "'a'", "'b'"]);

    let mut db = database(setup);
    assert_eq!(rows(&mut db, "SELECT id FROM t WHERE name = 'NULL'"), vec![vec![int(2)]]);
    rows(&mut db, "CREATE UNIQUE INDEX uq_name ON t (name)");
    rows(&mut db, "INSERT INTO t VALUES (6, NULL)");
    assert!(query(&mut db, "INSERT INTO t VALUES (7, 'a')").is_error());
}

#[test]
fn composite_primary_key_parts_do_not_collide() {
    let setup = "CREATE DATABASE d; USE d;
        CREATE TABLE t (a VARCHAR(10), b VARCHAR(10), n INT, PRIMARY KEY (a, b));
        INSERT INTO t VALUES ('x#y', 'z', 1);
        INSERT INTO t VALUES ('x', 'y#z', 2);
        INSERT INTO t VALUES ('x', 'y', 3)";
    let mut db = database(setup);
    assert_eq!(rows(&mut db, "SELECT COUNT(*) FROM t"), vec![vec![int(3)]]);
    assert!(query(&mut db, "INSERT INTO t VALUES ('x', 'y#z', 4)").is_error());

    assert_lookup_paths_agree(setup, "t", "a", &["'x'", "'x#y'", "'y'"]);
    assert_lookup_paths_agree(setup, "t", "b", &["'z'", "'y#z'", "'y'"]);
}

#[test]
fn negative_zero_is_the_same_key_as_zero() {
    let setup = "CREATE DATABASE d; USE d;
        CREATE TABLE t (f FLOAT PRIMARY KEY, n INT);
        INSERT INTO t VALUES (0.0, 1), (1.5, 2), (-1.5, 3)";
    let mut db = database(setup);
    assert!(query(&mut db, "INSERT INTO t VALUES (-0.0, 4)").is_error());
    assert_eq!(rows(&mut db, "SELECT n FROM t WHERE f = -0.0"), vec![vec![int(1)]]);

    assert_lookup_paths_agree(setup, "t", "f", &["0", "-0.0", "0.0", "1.5", "-1.5", "2"]);
}

#[test]
fn large_integers_compare_exactly_against_floats() {
    let setup = "CREATE DATABASE d; USE d;
        CREATE TABLE t (id INT PRIMARY KEY, k INT, f FLOAT);
        INSERT INTO t VALUES (9007199254740993, 9007199254740993, 1.0),
                             (9007199254740992, 9007199254740992, 9007199254740992.0),
                             (9223372036854775807, 9223372036854775807, 2.0)";
    let constants = [
        "9007199254740992.0",
        "9007199254740993",
        "9007199254740992",
        "9223372036854775807",
        "9223372036854775808.0",
    ];
    assert_lookup_paths_agree(setup, "t", "id", &constants);
    assert_lookup_paths_agree(setup, "t", "k", &constants);
    assert_lookup_paths_agree(setup, "t", "f", &["9007199254740993", "9007199254740992", "2"]);

    let mut db = database(setup);
    assert_eq!(
        rows(&mut db, "SELECT k FROM t WHERE k = 9007199254740992.0"),
        vec![vec![int(9007199254740992)]]
    );
}

#[test]
fn integer_overflow_fails_only_its_statement() {
    let mut db = shop();
    let results = db
        .execute_sql("SELECT id FROM Users WHERE id > -(-9223372036854775807 - 1); SELECT COUNT(*) FROM Users")
        .unwrap();
    assert_eq!(results[0].error.as_deref(), Some("Error: Invalid expression"));
    assert_eq!(results[1].rows, vec![vec![int(2)]]);
}

#[test]
fn join_produces_one_row_per_matching_pair() {
    let mut db = shop();
    let result = query(&mut db, "SELECT * FROM Users JOIN Orders ON Users.id = Orders.user_id");
    assert_eq!(
        result.fields,
        vec![
            "Users.id",
            "Users.name",
            "Users.age",
            "Users.active",
            "Orders.order_id",
            "Orders.user_id",
            "Orders.total",
        ]
    );
    assert_eq!(
        result.rows,
        vec![vec![int(1), text("Ann"), int(30), int(1), int(10), int(1), DataType::Float(12.5)]]
    );
}

#[test]
fn joined_columns_can_be_filtered_and_aliased() {
    let mut db = shop();
    query(&mut db, "INSERT INTO Orders VALUES (11, 2, 3.0), (12, 2, 40.0)");
    let result = query(
        &mut db,
        "SELECT u.name, o.order_id FROM Users AS u JOIN Orders o ON o.user_id = u.id WHERE o.total > 10 OR u.id = 1",
    );
    assert_eq!(result.fields, vec!["u.name", "o.order_id"]);
    assert_eq!(
        result.rows,
        vec![vec![text("Ann"), int(10)], vec![text("Bob"), int(12)]]
    );
}

#[test]
fn count_star_and_count_column() {
    let mut db = shop();
    query(&mut db, "INSERT INTO Users (id, age, active) VALUES (3, 41, 1)");
    let result = query(&mut db, "SELECT COUNT(*), COUNT(name) FROM Users");
    assert_eq!(result.fields, vec!["COUNT(*)", "COUNT(name)"]);
    assert_eq!(result.rows, vec![vec![int(3), int(2)]]);

    let result = query(&mut db, "SELECT MIN(age), MAX(name) FROM Users WHERE active = 1");
    assert_eq!(result.rows, vec![vec![int(30), text("Ann")]]);
}

#[test]
fn max_on_bit_column_is_rejected() {
    let mut db = shop();
    let result = query(&mut db, "SELECT MAX(active) FROM Users");
    assert_eq!(
        result.error.as_deref(),
        Some("Error: MAX is not supported on column 'active'")
    );
    assert!(result.rows.is_empty());
}

#[test]
fn failing_statement_does_not_stop_the_batch() {
    let mut db = shop();
    let results = db
        .execute_sql("SELECT * FROM Missing; SELECT COUNT(*) FROM Users\nGO\nSELECT name FROM Users WHERE id = 1")
        .unwrap();
    assert_eq!(results.len(), 3);
    assert!(results[0].is_error());
    assert_eq!(results[1].rows, vec![vec![int(2)]]);
    assert_eq!(results[2].rows, vec![vec![text("Ann")]]);
}

#[test]
fn unmatched_statement_fails_the_request() {
    let mut db = shop();
    let err = db.execute_sql("SELECT * FROM Users\nUPDATE Users SET age = 1").err().unwrap();
    assert!(matches!(
        err,
        DbError::UnmatchedStatement { ref keyword, line: 2 } if keyword == "UPDATE"
    ));
}

#[test]
fn ambiguous_and_cross_table_columns_are_rejected() {
    let mut db = shop();
    let result = query(&mut db, "SELECT name FROM Users a JOIN Users b ON a.id = b.id");
    assert_eq!(result.error.as_deref(), Some("Error: Ambiguous column 'name'"));

    let result = query(
        &mut db,
        "SELECT * FROM Users JOIN Orders ON Users.id = Orders.user_id WHERE id = user_id",
    );
    assert_eq!(result.error.as_deref(), Some("Error: Invalid expression"));

    let result = query(&mut db, "SELECT a.name, b.name FROM Users a JOIN Users b ON a.id = b.id");
    assert_eq!(result.rows.len(), 2);
}

#[test]
fn type_mismatch_in_where_is_reported() {
    let mut db = shop();
    let result = query(&mut db, "SELECT id FROM Users WHERE name > 3");
    assert_eq!(result.error.as_deref(), Some("Error: Type mismatch"));
}

#[test]
fn delete_uses_where_clause() {
    let mut db = shop();
    let result = query(&mut db, "DELETE FROM Users WHERE age < 26 AND NOT active = 1");
    assert_eq!(result.messages, vec!["1 row(s) affected"]);
    let result = query(&mut db, "SELECT id FROM Users");
    assert_eq!(result.rows, vec![vec![int(1)]]);

    let result = query(&mut db, "DELETE FROM Orders");
    assert_eq!(result.messages, vec!["1 row(s) affected"]);
}

#[test]
fn constraints_are_enforced_on_insert() {
    let mut db = shop();
    let result = query(&mut db, "INSERT INTO Users VALUES (1, 'Dup', 20, 0)");
    assert!(result.is_error());
    let result = query(&mut db, "INSERT INTO Users VALUES (5, 'Eve', 20, 7)");
    assert_eq!(result.error.as_deref(), Some("Error: Type mismatch"));
    let result = query(&mut db, "INSERT INTO Users VALUES (6, 'Short')");
    assert_eq!(result.error.as_deref(), Some("Error: Syntax error"));
}

#[test]
fn statements_need_a_database_in_use() {
    let mut db = Database::new(StorageType::Memory);
    let session = db.open_session();
    let results = db.execute(session, "CREATE TABLE t (id INT PRIMARY KEY)").unwrap();
    assert_eq!(results[0].error.as_deref(), Some("Error: No database in use"));
}
