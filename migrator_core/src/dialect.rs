use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Kind};

/// The database dialects the engine knows how to drive.
///
/// Each variant carries its own identifier quoting, default schema, and
/// version-info table DDL (§4.9, §6.3 of the specification). Unknown
/// dialects are rejected before any database work starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbType {
    SqlServer,
    PostgreSql,
    SQLite,
}

/// Name of the version-info table tracking applied migrations.
pub const VERSION_TABLE_NAME: &str = "VersionInfo";

impl DbType {
    /// Identifier quoting for this dialect: `[x]` for SQL Server, `"x"` for
    /// PostgreSQL and SQLite.
    pub fn quote_ident(&self, ident: &str) -> String {
        match self {
            DbType::SqlServer => format!("[{ident}]"),
            DbType::PostgreSql | DbType::SQLite => format!("\"{ident}\""),
        }
    }

    /// Default schema for this dialect, if any.
    pub fn default_schema(&self) -> Option<&'static str> {
        match self {
            DbType::SqlServer => Some("dbo"),
            DbType::PostgreSql => Some("public"),
            DbType::SQLite => None,
        }
    }

    /// Fully-qualified, dialect-quoted name of the version-info table.
    pub fn qualified_version_table(&self) -> String {
        match self.default_schema() {
            Some(schema) => format!(
                "{}.{}",
                self.quote_ident(schema),
                self.quote_ident(VERSION_TABLE_NAME)
            ),
            None => self.quote_ident(VERSION_TABLE_NAME),
        }
    }

    /// DDL creating the version-info table if it does not already exist
    /// (§6.3): `Version BIGINT NOT NULL`, `AppliedOn TIMESTAMP NOT NULL`,
    /// `Description NVARCHAR/TEXT NULL`, with a unique index on `Version`.
    pub fn version_table_ddl(&self) -> String {
        let table = self.qualified_version_table();
        match self {
            DbType::SqlServer => format!(
                "IF NOT EXISTS (SELECT 1 FROM sys.tables WHERE name = N'{name}')
                BEGIN
                    CREATE TABLE {table} (
                        Version BIGINT NOT NULL,
                        AppliedOn DATETIME2 NOT NULL,
                        Description NVARCHAR(MAX) NULL
                    );
                    CREATE UNIQUE INDEX UC_Version ON {table} (Version);
                END",
                name = VERSION_TABLE_NAME,
                table = table,
            ),
            DbType::PostgreSql => format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    \"Version\" BIGINT NOT NULL,
                    \"AppliedOn\" TIMESTAMP NOT NULL,
                    \"Description\" TEXT NULL
                );
                CREATE UNIQUE INDEX IF NOT EXISTS \"UC_Version\" ON {table} (\"Version\");",
                table = table,
            ),
            DbType::SQLite => format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    Version BIGINT NOT NULL,
                    AppliedOn TIMESTAMP NOT NULL,
                    Description TEXT NULL
                );
                CREATE UNIQUE INDEX IF NOT EXISTS UC_Version ON {table} (Version);",
                table = table,
            ),
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DbType::SqlServer => "SqlServer",
            DbType::PostgreSql => "PostgreSql",
            DbType::SQLite => "SQLite",
        };
        write!(f, "{name}")
    }
}

impl FromStr for DbType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SqlServer" | "sqlserver" | "mssql" => Ok(DbType::SqlServer),
            "PostgreSql" | "postgresql" | "postgres" => Ok(DbType::PostgreSql),
            "SQLite" | "sqlite" => Ok(DbType::SQLite),
            other => Err(Error::new(Kind::UnsupportedDialect(other.to_string()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_identifiers_per_dialect() {
        assert_eq!(DbType::SqlServer.quote_ident("VersionInfo"), "[VersionInfo]");
        assert_eq!(
            DbType::PostgreSql.quote_ident("VersionInfo"),
            "\"VersionInfo\""
        );
        assert_eq!(DbType::SQLite.quote_ident("VersionInfo"), "\"VersionInfo\"");
    }

    #[test]
    fn default_schemas_match_spec() {
        assert_eq!(DbType::SqlServer.default_schema(), Some("dbo"));
        assert_eq!(DbType::PostgreSql.default_schema(), Some("public"));
        assert_eq!(DbType::SQLite.default_schema(), None);
    }

    #[test]
    fn parses_known_dialects() {
        assert_eq!("SqlServer".parse::<DbType>().unwrap(), DbType::SqlServer);
        assert_eq!("PostgreSql".parse::<DbType>().unwrap(), DbType::PostgreSql);
        assert_eq!("SQLite".parse::<DbType>().unwrap(), DbType::SQLite);
    }

    #[test]
    fn rejects_unknown_dialect() {
        let err = "Oracle".parse::<DbType>().unwrap_err();
        match err.kind() {
            Kind::UnsupportedDialect(name) => assert_eq!(name, "Oracle"),
            _ => panic!("wrong error kind"),
        }
    }
}
