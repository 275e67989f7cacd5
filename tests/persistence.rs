use simple_rdb::core::types::DataType;
use simple_rdb::{Database, StorageType};

#[test]
fn file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    {
        let mut db = Database::new(StorageType::File(dir.path().to_path_buf()));
        let results = db
            .execute_sql(
                "CREATE DATABASE hr; USE hr;
                 CREATE TABLE Staff (id INT, dept VARCHAR(10), hired DATE, PRIMARY KEY (id));
                 CREATE INDEX idx_staff_dept ON Staff (dept);
                 INSERT INTO Staff VALUES (1, 'ops', '2021-03-01'), (2, 'dev', '2022-07-15'), (3, 'dev', '2020-01-10');",
            )
            .unwrap();
        assert!(results.iter().all(|r| !r.is_error()), "{:?}", results);
    }

    let mut db = Database::new(StorageType::File(dir.path().to_path_buf()));
    let session = db.open_session();
    let results = db
        .execute(
            session,
            "USE hr; SELECT id FROM Staff WHERE dept = 'dev'; SELECT MIN(hired) FROM Staff",
        )
        .unwrap();
    assert_eq!(results[1].rows, vec![vec![DataType::Int(2)], vec![DataType::Int(3)]]);
    assert_eq!(results[2].rows, vec![vec![DataType::Varchar("2020-01-10".to_string())]]);
    assert_eq!(db.list_tables(session).unwrap(), vec!["Staff"]);
}

#[test]
fn dropped_database_is_gone_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut db = Database::new(StorageType::File(dir.path().to_path_buf()));
        db.execute_sql("CREATE DATABASE tmp; CREATE DATABASE keep; DROP DATABASE tmp").unwrap();
    }
    let db = Database::new(StorageType::File(dir.path().to_path_buf()));
    assert_eq!(db.list_databases().unwrap(), vec!["keep"]);
}
