//! End-to-end exercises of the orchestrator (§4.7, §8) against a real,
//! file-backed SQLite database — the one dialect that needs no external
//! service, so it plays the integration-test backend role here.

use std::fs;
use std::path::Path;

use migrator_core::connection::MigrationApply;
use migrator_core::{execute_migrations, DbType, NativeMigration};
use rusqlite::Connection as RqlConnection;
use tempfile::TempDir;

fn write_sql(dir: &Path, name: &str, body: &str) {
    fs::write(dir.join(name), body).unwrap();
}

fn version_rows(db_path: &Path) -> Vec<i64> {
    let conn = RqlConnection::open(db_path).unwrap();
    let mut stmt = conn.prepare("SELECT Version FROM VersionInfo ORDER BY Version").unwrap();
    let mut rows: Vec<i64> = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    rows.sort_unstable();
    rows
}

fn users_email(db_path: &Path) -> String {
    let conn = RqlConnection::open(db_path).unwrap();
    conn.query_row(
        "SELECT Email FROM Users WHERE Username = 'admin'",
        [],
        |row| row.get(0),
    )
    .unwrap()
}

/// Scenario 1 (§8): native units creating tables, SQL units adding and
/// backfilling columns, applied in a single clean run.
#[test]
fn mixed_clean_apply() {
    let migrations_dir = TempDir::new().unwrap();
    let db_dir = TempDir::new().unwrap();
    let db_path = db_dir.path().join("scenario1.db");

    write_sql(
        migrations_dir.path(),
        "202601010002_AddUserEmail.sql",
        "ALTER TABLE Users ADD COLUMN Email TEXT;\n\
         UPDATE Users SET Email = 'admin@example.com' WHERE Username = 'admin';",
    );
    write_sql(
        migrations_dir.path(),
        "202601010004_AddSettingValue.sql",
        "ALTER TABLE Settings ADD COLUMN Value TEXT;\n\
         UPDATE Settings SET Value = 'DefaultValue' WHERE Key = 'DefaultTheme';",
    );
    write_sql(
        migrations_dir.path(),
        "202601010006_AddProductPrice.sql",
        "ALTER TABLE Products ADD COLUMN Price REAL;\n\
         UPDATE Products SET Price = 9.99 WHERE Name = 'Sample Product';",
    );

    let native = vec![
        NativeMigration::new(202601010001, "create Users".to_string(), |conn| {
            conn.execute("CREATE TABLE Users (Username TEXT NOT NULL)")?;
            conn.execute("INSERT INTO Users (Username) VALUES ('admin')")?;
            Ok(())
        }),
        NativeMigration::new(202601010003, "create Settings".to_string(), |conn| {
            conn.execute("CREATE TABLE Settings (Key TEXT NOT NULL)")?;
            conn.execute("INSERT INTO Settings (Key) VALUES ('DefaultTheme')")?;
            Ok(())
        }),
        NativeMigration::new(202601010005, "create Products".to_string(), |conn| {
            conn.execute("CREATE TABLE Products (Name TEXT NOT NULL)")?;
            conn.execute("INSERT INTO Products (Name) VALUES ('Sample Product')")?;
            Ok(())
        }),
    ];

    execute_migrations(
        DbType::SQLite,
        db_path.to_str().unwrap(),
        migrations_dir.path(),
        native,
    )
    .unwrap();

    assert_eq!(
        version_rows(&db_path),
        vec![
            202601010001,
            202601010002,
            202601010003,
            202601010004,
            202601010005,
            202601010006,
        ]
    );
    assert_eq!(users_email(&db_path), "admin@example.com");
}

/// Scenario 2 (§8): rerunning the same directory against the same database
/// is a no-op — every unit is skipped, no additional rows appear.
#[test]
fn rerun_is_idempotent() {
    let migrations_dir = TempDir::new().unwrap();
    let db_dir = TempDir::new().unwrap();
    let db_path = db_dir.path().join("scenario2.db");

    write_sql(
        migrations_dir.path(),
        "202601020001_CreateWidgets.sql",
        "CREATE TABLE Widgets (Id INTEGER NOT NULL);",
    );

    let run = || {
        execute_migrations(
            DbType::SQLite,
            db_path.to_str().unwrap(),
            migrations_dir.path(),
            Vec::new(),
        )
    };

    run().unwrap();
    assert_eq!(version_rows(&db_path), vec![202601020001]);

    run().unwrap();
    assert_eq!(version_rows(&db_path), vec![202601020001]);
}

/// Scenario 3 (§8): a lower-versioned unit added after a higher version has
/// already been applied is still applied, with only a warning (not a
/// failure) logged for being out of order.
#[test]
fn out_of_order_unit_still_applies() {
    let migrations_dir = TempDir::new().unwrap();
    let db_dir = TempDir::new().unwrap();
    let db_path = db_dir.path().join("scenario3.db");

    write_sql(
        migrations_dir.path(),
        "202601030004_CreateLate.sql",
        "CREATE TABLE Late (Id INTEGER NOT NULL);",
    );

    let native = vec![
        NativeMigration::new(202601030001, None, |conn| {
            conn.execute("CREATE TABLE First (Id INTEGER NOT NULL)")
        }),
        NativeMigration::new(202601030003, None, |conn| {
            conn.execute("CREATE TABLE Second (Id INTEGER NOT NULL)")
        }),
    ];

    execute_migrations(
        DbType::SQLite,
        db_path.to_str().unwrap(),
        migrations_dir.path(),
        native,
    )
    .unwrap();
    assert_eq!(
        version_rows(&db_path),
        vec![202601030001, 202601030003, 202601030004]
    );

    // A unit with a lower version than the max already applied shows up.
    write_sql(
        migrations_dir.path(),
        "202601030002_CreateInserted.sql",
        "CREATE TABLE Inserted (Id INTEGER NOT NULL);",
    );

    execute_migrations(
        DbType::SQLite,
        db_path.to_str().unwrap(),
        migrations_dir.path(),
        Vec::new(),
    )
    .unwrap();

    assert_eq!(
        version_rows(&db_path),
        vec![202601030001, 202601030002, 202601030003, 202601030004]
    );

    let conn = RqlConnection::open(&db_path).unwrap();
    conn.execute("SELECT * FROM Inserted", []).unwrap();
}

/// Scenario 4 (§8): a failing job rolls back, halts the run, and leaves no
/// trace of itself or any job after it in `VersionInfo`.
#[test]
fn failure_halts_the_run() {
    let migrations_dir = TempDir::new().unwrap();
    let db_dir = TempDir::new().unwrap();
    let db_path = db_dir.path().join("scenario4.db");

    write_sql(
        migrations_dir.path(),
        "202601040001_ok.sql",
        "CREATE TABLE Ok1 (Id INTEGER NOT NULL);",
    );
    write_sql(
        migrations_dir.path(),
        "202601040002_fail.sql",
        "THIS IS NOT VALID SQL AT ALL;",
    );
    write_sql(
        migrations_dir.path(),
        "202601040003_never_runs.sql",
        "CREATE TABLE Never (Id INTEGER NOT NULL);",
    );

    let result = execute_migrations(
        DbType::SQLite,
        db_path.to_str().unwrap(),
        migrations_dir.path(),
        Vec::new(),
    );
    assert!(result.is_err());
    assert_eq!(version_rows(&db_path), vec![202601040001]);

    let conn = RqlConnection::open(&db_path).unwrap();
    let never_exists: Result<i64, _> = conn.query_row(
        "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='Never'",
        [],
        |row| row.get(0),
    );
    assert_eq!(never_exists.unwrap(), 0);

    // Rerunning without fixing 202601040002 fails again at the same version.
    let second = execute_migrations(
        DbType::SQLite,
        db_path.to_str().unwrap(),
        migrations_dir.path(),
        Vec::new(),
    );
    assert!(second.is_err());
    assert_eq!(version_rows(&db_path), vec![202601040001]);
}

/// Scenario 5 (§8): an empty migrations directory is a successful no-op.
#[test]
fn empty_directory_succeeds_with_no_rows() {
    let migrations_dir = TempDir::new().unwrap();
    let db_dir = TempDir::new().unwrap();
    let db_path = db_dir.path().join("scenario5.db");

    execute_migrations(
        DbType::SQLite,
        db_path.to_str().unwrap(),
        migrations_dir.path(),
        Vec::new(),
    )
    .unwrap();

    // An empty job list returns success before step 4 ever opens a
    // connection (§4.7 step 3), so the database file is never created.
    assert!(!db_path.exists());
}

/// Scenario 6 (§8): a missing migrations directory fails before any
/// database connection is opened; the database file is never created.
#[test]
fn missing_directory_fails_before_any_db_work() {
    let db_dir = TempDir::new().unwrap();
    let db_path = db_dir.path().join("scenario6.db");

    let err = execute_migrations(
        DbType::SQLite,
        db_path.to_str().unwrap(),
        Path::new("/does/not/exist/at/all/migrator"),
        Vec::new(),
    )
    .unwrap_err();

    assert!(matches!(
        err.kind(),
        migrator_core::error::Kind::DirectoryMissing(_)
    ));
    assert!(!db_path.exists());
}

/// Duplicate versions across native and SQL units are rejected before any
/// job runs, and before any database connection is opened.
#[test]
fn duplicate_version_is_rejected_before_db_work() {
    let migrations_dir = TempDir::new().unwrap();
    let db_dir = TempDir::new().unwrap();
    let db_path = db_dir.path().join("scenario_dup.db");

    write_sql(
        migrations_dir.path(),
        "202601070001_dup.sql",
        "CREATE TABLE Dup (Id INTEGER NOT NULL);",
    );
    let native = vec![NativeMigration::new(202601070001, None, |conn| {
        conn.execute("CREATE TABLE AlsoDup (Id INTEGER NOT NULL)")
    })];

    let err = execute_migrations(
        DbType::SQLite,
        db_path.to_str().unwrap(),
        migrations_dir.path(),
        native,
    )
    .unwrap_err();

    assert!(matches!(
        err.kind(),
        migrator_core::error::Kind::DuplicateVersion { version: 202601070001, .. }
    ));
    assert!(!db_path.exists());
}
