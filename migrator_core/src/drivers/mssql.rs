//! SQL Server driver (§4.9), backed by the async-only `tiberius` crate.
//!
//! Tiberius has no notion of a transaction object (see
//! <https://github.com/prisma/tiberius/issues/28>), so `begin`/`commit`/
//! `rollback` are plain `BEGIN TRAN T1` / `COMMIT TRAN T1` / `ROLLBACK TRAN
//! T1` batches, the same workaround the rest of the ecosystem uses.

use std::collections::HashSet;

use tiberius::{Client, Config};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::connection::AsyncConnection;
use crate::dialect::DbType;
use crate::error::{Error, Kind};

type MssqlClient = Client<Compat<TcpStream>>;

pub async fn connect(connection_string: &str) -> Result<MssqlClient, Error> {
    let config = Config::from_ado_string(connection_string)
        .map_err(|err| Error::new(Kind::VersionStoreError(Box::new(err))))?;
    let tcp = TcpStream::connect(config.get_addr())
        .await
        .map_err(|err| Error::new(Kind::VersionStoreError(Box::new(err))))?;
    tcp.set_nodelay(true)
        .map_err(|err| Error::new(Kind::VersionStoreError(Box::new(err))))?;
    Client::connect(config, tcp.compat_write())
        .await
        .map_err(|err| Error::new(Kind::VersionStoreError(Box::new(err))))
}

impl AsyncConnection for MssqlClient {
    type Error = tiberius::error::Error;

    async fn begin(&mut self) -> Result<(), Self::Error> {
        self.simple_query("BEGIN TRAN T1;").await.map(drop)
    }

    async fn commit(&mut self) -> Result<(), Self::Error> {
        self.simple_query("COMMIT TRAN T1;").await.map(drop)
    }

    async fn rollback(&mut self) -> Result<(), Self::Error> {
        self.simple_query("ROLLBACK TRAN T1;").await.map(drop)
    }

    async fn execute_sql(&mut self, sql: &str) -> Result<(), Self::Error> {
        self.simple_query(sql).await.map(drop)
    }

    async fn ensure_version_table(&mut self, dialect: DbType) -> Result<(), Self::Error> {
        self.simple_query(dialect.version_table_ddl()).await.map(drop)
    }

    async fn load_applied_versions(&mut self, dialect: DbType) -> Result<HashSet<u64>, Self::Error> {
        use futures::TryStreamExt;
        use tiberius::QueryItem;

        let table = dialect.qualified_version_table();
        let mut stream = self
            .simple_query(format!("SELECT Version FROM {table}"))
            .await?;
        let mut versions = HashSet::new();
        while let Some(item) = stream.try_next().await? {
            if let QueryItem::Row(row) = item {
                if let Some(version) = row.get::<i64, usize>(0) {
                    versions.insert(version as u64);
                }
            }
        }
        Ok(versions)
    }

    async fn record_version(
        &mut self,
        dialect: DbType,
        version: u64,
        description: &str,
    ) -> Result<(), Self::Error> {
        let table = dialect.qualified_version_table();
        let escaped_description = description.replace('\'', "''");
        self.simple_query(format!(
            "INSERT INTO {table} (Version, AppliedOn, Description) VALUES ({version}, SYSUTCDATETIME(), '{escaped_description}')"
        ))
        .await
        .map(drop)
    }

    async fn execute_native(
        &mut self,
        apply: &crate::connection::ApplyFn,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // `apply` is a plain synchronous closure (§4.2); tiberius has no
        // synchronous API, so the adapter only buffers the SQL text the
        // closure submits and this method awaits each batch afterwards,
        // in submission order, inside the active T1 transaction.
        #[derive(Default)]
        struct Adapter {
            statements: Vec<String>,
        }

        impl crate::connection::MigrationApply for Adapter {
            fn execute(&mut self, sql: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
                self.statements.push(sql.to_string());
                Ok(())
            }
        }

        let mut adapter = Adapter::default();
        apply(&mut adapter)?;

        for statement in adapter.statements {
            self.simple_query(statement)
                .await
                .map(drop)
                .map_err(|err| Box::new(err) as Box<dyn std::error::Error + Send + Sync>)?;
        }
        Ok(())
    }
}
