//! PostgreSQL driver (§4.9), backed by the synchronous `postgres` crate.

use std::collections::HashSet;

use postgres::{Client, NoTls};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::connection::Connection;
use crate::dialect::DbType;
use crate::error::{Error, Kind};

pub fn connect(connection_string: &str) -> Result<Client, Error> {
    Client::connect(connection_string, NoTls)
        .map_err(|err| Error::new(Kind::VersionStoreError(Box::new(err))))
}

impl Connection for Client {
    type Error = postgres::Error;

    fn begin(&mut self) -> Result<(), Self::Error> {
        self.batch_execute("BEGIN")
    }

    fn commit(&mut self) -> Result<(), Self::Error> {
        self.batch_execute("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), Self::Error> {
        self.batch_execute("ROLLBACK")
    }

    fn execute_sql(&mut self, sql: &str) -> Result<(), Self::Error> {
        self.batch_execute(sql)
    }

    fn ensure_version_table(&mut self, dialect: DbType) -> Result<(), Self::Error> {
        self.batch_execute(&dialect.version_table_ddl())
    }

    fn load_applied_versions(&mut self, dialect: DbType) -> Result<HashSet<u64>, Self::Error> {
        let table = dialect.qualified_version_table();
        let rows = self.query(&format!("SELECT \"Version\" FROM {table}"), &[])?;
        Ok(rows
            .into_iter()
            .map(|row| row.get::<_, i64>(0) as u64)
            .collect())
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
        self.batch_execute(&format!(
            "INSERT INTO {table} (\"Version\", \"AppliedOn\", \"Description\") VALUES ({version}, '{now}', '{escaped_description}')"
        ))
    }
}
