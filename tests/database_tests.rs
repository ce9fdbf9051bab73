mod common;

use common::temp_db_path;
use sqlbot_backend::services::database::{DatabaseError, SqlDatabase, create_sample_database};

#[tokio::test]
async fn missing_file_is_store_unavailable() {
    let path = temp_db_path("missing");
    let err = SqlDatabase::open_read_only(&path).await.unwrap_err();
    assert!(matches!(err, DatabaseError::NotFound(p) if p == path));
    // The check must not create the file as a side effect.
    assert!(!path.exists());
}

#[tokio::test]
async fn sample_database_answers_sales_query() {
    let path = temp_db_path("company");
    create_sample_database(&path).await.unwrap();

    let db = SqlDatabase::open_read_only(&path).await.unwrap();
    assert_eq!(db.table_names().await.unwrap(), ["Departments", "Employees"]);

    let out = db
        .run("SELECT Name, Salary FROM Employees WHERE Department = 'Sales'")
        .await
        .unwrap();
    assert_eq!(out.columns, ["Name", "Salary"]);
    assert_eq!(out.to_tuple_list(), "[('Alice', 50000)]");

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn destructive_statements_fail_at_the_store() {
    let path = temp_db_path("readonly");
    create_sample_database(&path).await.unwrap();

    let db = SqlDatabase::open_read_only(&path).await.unwrap();
    for statement in [
        "DROP TABLE Employees",
        "DELETE FROM Employees",
        "INSERT INTO Departments VALUES (4, 'Legal', 'Dana')",
        "UPDATE Employees SET Salary = 0",
    ] {
        let err = db.run(statement).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Query(_)), "{statement} succeeded");
    }
    drop(db);

    let db = SqlDatabase::open_read_only(&path).await.unwrap();
    let count = db.run("SELECT COUNT(*) FROM Employees").await.unwrap();
    assert_eq!(count.rows, vec![vec!["3".to_owned()]]);
    let salaries = db
        .run("SELECT SUM(Salary) FROM Employees")
        .await
        .unwrap();
    assert_eq!(salaries.rows, vec![vec!["180000".to_owned()]]);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn table_info_shows_schema_and_sample_rows() {
    let path = temp_db_path("schema");
    create_sample_database(&path).await.unwrap();
    let db = SqlDatabase::open_read_only(&path).await.unwrap();

    let info = db.table_info(&["employees"]).await.unwrap();
    assert!(info.contains("CREATE TABLE Employees"));
    assert!(info.contains("3 rows from Employees table:"));
    assert!(info.contains("ID\tName\tDepartment\tSalary\tHire_Date"));
    assert!(info.contains("1\t'Alice'\t'Sales'\t50000\t'2021-01-15'"));

    let err = db.table_info(&["Employees", "Payroll"]).await.unwrap_err();
    assert!(matches!(err, DatabaseError::UnknownTables(t) if t == ["Payroll"]));

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn null_values_render_as_none() {
    let path = temp_db_path("nulls");
    create_sample_database(&path).await.unwrap();
    let db = SqlDatabase::open_read_only(&path).await.unwrap();

    let out = db.run("SELECT NULL, 1.5, 'it''s'").await.unwrap();
    assert_eq!(out.rows, vec![vec!["None".to_owned(), "1.5".to_owned(), "'it\\'s'".to_owned()]]);

    let empty = db
        .run("SELECT Name FROM Employees WHERE Department = 'Legal'")
        .await
        .unwrap();
    assert_eq!(empty.to_tuple_list(), "");

    let _ = std::fs::remove_file(&path);
}
