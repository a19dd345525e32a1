//! The Transaction/Processor component (§4.6): a single logical connection
//! per run, exposing transaction control, verbatim SQL execution, and a
//! bridge for invoking a native migration's opaque `apply` routine.

use std::collections::HashSet;

use crate::dialect::DbType;

/// The narrow, object-safe surface a native migration's `apply` routine is
/// allowed to see. The engine never lets native code reach into transaction
/// control directly; it can only submit SQL against the already-open
/// transaction the orchestrator manages.
pub trait MigrationApply {
    fn execute(&mut self, sql: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// A native migration's imperative body, bound to the engine's active
/// connection/transaction at invocation time (§3, §4.2). The loader hands
/// the engine a collection of these; the engine never introspects what
/// produced them.
pub type ApplyFn =
    Box<dyn Fn(&mut dyn MigrationApply) -> Result<(), Box<dyn std::error::Error + Send + Sync>> + Send + Sync>;

/// One logical database connection for the duration of a run (§4.6, §5).
///
/// Implementations are provided per dialect under `drivers/`. The
/// orchestrator is generic over this trait and never matches on the
/// concrete driver type.
pub trait Connection {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Begin a single-level transaction. Nesting is not supported.
    fn begin(&mut self) -> Result<(), Self::Error>;

    /// Commit the active transaction.
    fn commit(&mut self) -> Result<(), Self::Error>;

    /// Roll back the active transaction.
    fn rollback(&mut self) -> Result<(), Self::Error>;

    /// Submit one or more statements of verbatim SQL text inside the active
    /// transaction.
    fn execute_sql(&mut self, sql: &str) -> Result<(), Self::Error>;

    /// Create the version-info table if it is not already present (§4.5,
    /// §6.3).
    fn ensure_version_table(&mut self, dialect: DbType) -> Result<(), Self::Error>;

    /// Read the full set of already-applied versions (§3 "Applied Set").
    fn load_applied_versions(&mut self, dialect: DbType) -> Result<HashSet<u64>, Self::Error>;

    /// Insert a version record with `applied_on = now()` (§4.5).
    fn record_version(
        &mut self,
        dialect: DbType,
        version: u64,
        description: &str,
    ) -> Result<(), Self::Error>;

    /// Invoke a native migration's `apply` routine against this connection
    /// (§4.6 `execute_native`). The default implementation adapts `Self` to
    /// the object-safe [`MigrationApply`] surface via [`execute_sql`].
    ///
    /// [`execute_sql`]: Connection::execute_sql
    fn execute_native(
        &mut self,
        apply: &ApplyFn,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        struct Adapter<'a, C: ?Sized>(&'a mut C);

        impl<'a, C> MigrationApply for Adapter<'a, C>
        where
            C: Connection,
        {
            fn execute(
                &mut self,
                sql: &str,
            ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
                self.0
                    .execute_sql(sql)
                    .map_err(|err| Box::new(err) as Box<dyn std::error::Error + Send + Sync>)
            }
        }

        let mut adapter = Adapter(self);
        apply(&mut adapter)
    }
}

/// Asynchronous counterpart of [`Connection`], used by drivers (SQL Server
/// via `tiberius`) whose upstream client is async-only. Mirrors the sync
/// trait method-for-method; the orchestrator runs the same algorithm over
/// either.
pub trait AsyncConnection {
    type Error: std::error::Error + Send + Sync + 'static;

    fn begin(&mut self) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send;
    fn commit(&mut self) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send;
    fn rollback(&mut self) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send;
    fn execute_sql(
        &mut self,
        sql: &str,
    ) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send;
    fn ensure_version_table(
        &mut self,
        dialect: DbType,
    ) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send;
    fn load_applied_versions(
        &mut self,
        dialect: DbType,
    ) -> impl std::future::Future<Output = Result<HashSet<u64>, Self::Error>> + Send;
    fn record_version(
        &mut self,
        dialect: DbType,
        version: u64,
        description: &str,
    ) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send;
    fn execute_native(
        &mut self,
        apply: &ApplyFn,
    ) -> impl std::future::Future<
        Output = Result<(), Box<dyn std::error::Error + Send + Sync>>,
    > + Send;
}
