use std::fmt;
use std::path::PathBuf;
use thiserror::Error as TError;

/// An error that terminated a migration run.
///
/// The orchestrator never recovers from a fatal condition; it wraps the
/// underlying cause (if any) in one of these and returns it to the caller.
#[derive(Debug)]
pub struct Error {
    kind: Box<Kind>,
}

impl Error {
    pub(crate) fn new(kind: Kind) -> Error {
        Error {
            kind: Box::new(kind),
        }
    }

    /// Return the kind of error that occurred.
    pub fn kind(&self) -> &Kind {
        &self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

/// Enum listing the kinds of error the engine can surface, matching the
/// error-handling table of the specification.
#[derive(Debug, TError)]
pub enum Kind {
    /// The migrations directory does not exist.
    #[error("migrations directory not found: {0}")]
    DirectoryMissing(PathBuf),

    /// `dbType` did not name one of the supported dialects.
    #[error("unsupported database dialect: {0}")]
    UnsupportedDialect(String),

    /// Two migration units declared the same version.
    #[error("duplicate migration version {version}: {first} and {second}")]
    DuplicateVersion {
        version: u64,
        first: String,
        second: String,
    },

    /// A migration's `apply` failed; the offending job has been rolled back.
    #[error("migration {version} ({kind}) failed: {source}")]
    MigrationFailed {
        version: u64,
        kind: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Rolling back a failed migration itself failed. Logged, never the
    /// primary error returned to the caller.
    #[error("rollback of migration {0} failed: {1}")]
    RollbackFailed(u64, #[source] Box<dyn std::error::Error + Send + Sync>),

    /// The version-info table could not be created, read, or written.
    #[error("version store error: {0}")]
    VersionStoreError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Extension trait adding migration-engine context to a driver `Result`.
pub trait WrapMigrationError<T> {
    fn version_store_err(self) -> Result<T, Error>;
}

impl<T, E> WrapMigrationError<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn version_store_err(self) -> Result<T, Error> {
        self.map_err(|err| Error::new(Kind::VersionStoreError(Box::new(err))))
    }
}
