//! SQLite driver (§4.9), backed by the synchronous `rusqlite` crate.

use std::collections::HashSet;
use std::path::Path;

use rusqlite::Connection as RqlConnection;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::connection::Connection;
use crate::dialect::DbType;
use crate::error::{Error, Kind};

pub fn connect(connection_string: &str) -> Result<RqlConnection, Error> {
    RqlConnection::open(Path::new(connection_string))
        .map_err(|err| Error::new(Kind::VersionStoreError(Box::new(err))))
}

impl Connection for RqlConnection {
    type Error = rusqlite::Error;

    fn begin(&mut self) -> Result<(), Self::Error> {
        self.execute_batch("BEGIN")
    }

    fn commit(&mut self) -> Result<(), Self::Error> {
        self.execute_batch("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), Self::Error> {
        self.execute_batch("ROLLBACK")
    }

    fn execute_sql(&mut self, sql: &str) -> Result<(), Self::Error> {
        self.execute_batch(sql)
    }

    fn ensure_version_table(&mut self, dialect: DbType) -> Result<(), Self::Error> {
        self.execute_batch(&dialect.version_table_ddl())
    }

    fn load_applied_versions(&mut self, dialect: DbType) -> Result<HashSet<u64>, Self::Error> {
        let table = dialect.qualified_version_table();
        let mut stmt = self.prepare(&format!("SELECT Version FROM {table}"))?;
        let versions = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(versions.into_iter().map(|v| v as u64).collect())
    }

    fn record_version(
        &mut self,
        dialect: DbType,
        version: u64,
        description: &str,
    ) -> Result<(), Self::Error> {
        let table = dialect.qualified_version_table();
        let now = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .expect("RFC3339 formatting of the current time cannot fail");
        let escaped_description = description.replace('\'', "''");
        self.execute_batch(&format!(
            "INSERT INTO {table} (Version, AppliedOn, Description) VALUES ({version}, '{now}', '{escaped_description}')"
        ))
    }
}
