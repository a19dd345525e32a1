//! The Orchestrator (§4.7): the core algorithm driving a single migration
//! run, plus [`execute_migrations`], the one entrypoint the CLI front-end
//! (or any other collaborator) calls.

use std::path::Path;

use crate::connection::{ApplyFn, AsyncConnection, Connection};
use crate::dialect::DbType;
use crate::error::{Error, Kind, WrapMigrationError};
use crate::job::{Job, JobKind};
use crate::native::NativeMigration;
use crate::version_store::AppliedVersions;
use crate::{drivers, error_log, scanner};

/// Discover, order, and apply every not-yet-applied migration under
/// `migrations_path` against the database named by `db_type` and
/// `connection_string` (§6.1).
///
/// `native_migrations` is whatever an external loader has already produced;
/// this crate never discovers native artifacts itself (§4.2).
pub fn execute_migrations(
    db_type: DbType,
    connection_string: &str,
    migrations_path: &Path,
    native_migrations: Vec<NativeMigration>,
) -> Result<(), Error> {
    let jobs = build_jobs(migrations_path, native_migrations)?;
    if jobs.is_empty() {
        log::warn!(
            "no migrations found under {}; nothing to do",
            migrations_path.display()
        );
        return Ok(());
    }

    match db_type {
        DbType::PostgreSql => {
            cfg_if::cfg_if! {
                if #[cfg(feature = "postgres")] {
                    let mut conn = drivers::postgres::connect(connection_string)?;
                    run_sync(&mut conn, db_type, jobs)
                } else {
                    let _ = connection_string;
                    panic!("tried to migrate PostgreSql but the \"postgres\" feature is not enabled");
                }
            }
        }
        DbType::SQLite => {
            cfg_if::cfg_if! {
                if #[cfg(feature = "rusqlite")] {
                    let mut conn = drivers::sqlite::connect(connection_string)?;
                    run_sync(&mut conn, db_type, jobs)
                } else {
                    let _ = connection_string;
                    panic!("tried to migrate SQLite but no rusqlite feature is enabled");
                }
            }
        }
        DbType::SqlServer => {
            cfg_if::cfg_if! {
                if #[cfg(feature = "mssql")] {
                    let runtime = tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()
                        .expect("failed to start the async runtime backing the mssql driver");
                    runtime.block_on(async {
                        let mut conn = drivers::mssql::connect(connection_string).await?;
                        run_async(&mut conn, db_type, jobs).await
                    })
                } else {
                    let _ = connection_string;
                    panic!("tried to migrate SqlServer but the \"mssql\" feature is not enabled");
                }
            }
        }
    }
}

fn build_jobs(
    migrations_path: &Path,
    native_migrations: Vec<NativeMigration>,
) -> Result<Vec<Job>, Error> {
    let entries = scanner::scan(migrations_path)?;
    let mut sql_units = Vec::new();
    for entry in &entries {
        match scanner::parse_sql_entry(entry) {
            Some(unit) => sql_units.push(unit),
            None if entry.is_file() => {
                log::debug!("ignoring non-migration file: {}", entry.display());
            }
            None => {}
        }
    }
    crate::job::create(native_migrations, sql_units)
}

/// Drive the synchronous side of the algorithm (§4.7 steps 4-7) over any
/// [`Connection`] implementation.
fn run_sync<C: Connection>(conn: &mut C, dialect: DbType, jobs: Vec<Job>) -> Result<(), Error> {
    conn.ensure_version_table(dialect).version_store_err()?;
    let initial = conn.load_applied_versions(dialect).version_store_err()?;
    let mut applied = AppliedVersions::new(initial);

    for job in jobs {
        if applied.has(job.version()) {
            log::info!(
                "Skipping already applied migration (from previous run): {}",
                job.version()
            );
            continue;
        }
        warn_if_out_of_order(&job, &applied);

        conn.begin().version_store_err()?;
        let outcome = apply_job_sync(conn, dialect, &job);
        match outcome {
            Ok(()) => {
                conn.commit().version_store_err()?;
                applied.mark_applied(job.version());
            }
            Err(err) => return Err(halt_on_failure_sync(conn, &job, err)),
        }
    }
    Ok(())
}

fn apply_job_sync<C: Connection>(
    conn: &mut C,
    dialect: DbType,
    job: &Job,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match job.kind() {
        JobKind::Native(native) => {
            let apply: ApplyFn = native.apply_fn();
            conn.execute_native(&apply)?;
            conn.record_version(dialect, job.version(), job.description())
                .map_err(|err| Box::new(err) as Box<dyn std::error::Error + Send + Sync>)
        }
        JobKind::Sql(unit) => {
            let sql = unit
                .read_sql()
                .map_err(|err| Box::new(err) as Box<dyn std::error::Error + Send + Sync>)?;
            conn.execute_sql(&sql)
                .map_err(|err| Box::new(err) as Box<dyn std::error::Error + Send + Sync>)?;
            conn.record_version(dialect, job.version(), job.description())
                .map_err(|err| Box::new(err) as Box<dyn std::error::Error + Send + Sync>)
        }
    }
}

fn halt_on_failure_sync<C: Connection>(
    conn: &mut C,
    job: &Job,
    cause: Box<dyn std::error::Error + Send + Sync>,
) -> Error {
    if let Err(rollback_err) = conn.rollback() {
        log_rollback_failure(job.version(), Box::new(rollback_err));
    }
    halt(job, cause)
}

/// Async counterpart of [`run_sync`], used by the `mssql` driver.
async fn run_async<C: AsyncConnection>(
    conn: &mut C,
    dialect: DbType,
    jobs: Vec<Job>,
) -> Result<(), Error> {
    conn.ensure_version_table(dialect)
        .await
        .version_store_err()?;
    let initial = conn
        .load_applied_versions(dialect)
        .await
        .version_store_err()?;
    let mut applied = AppliedVersions::new(initial);

    for job in jobs {
        if applied.has(job.version()) {
            log::info!(
                "Skipping already applied migration (from previous run): {}",
                job.version()
            );
            continue;
        }
        warn_if_out_of_order(&job, &applied);

        conn.begin().await.version_store_err()?;
        let outcome = apply_job_async(conn, dialect, &job).await;
        match outcome {
            Ok(()) => {
                conn.commit().await.version_store_err()?;
                applied.mark_applied(job.version());
            }
            Err(err) => {
                if let Err(rollback_err) = conn.rollback().await {
                    log_rollback_failure(job.version(), Box::new(rollback_err));
                }
                return Err(halt(&job, err));
            }
        }
    }
    Ok(())
}

async fn apply_job_async<C: AsyncConnection>(
    conn: &mut C,
    dialect: DbType,
    job: &Job,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match job.kind() {
        JobKind::Native(native) => {
            let apply: ApplyFn = native.apply_fn();
            conn.execute_native(&apply).await?;
            conn.record_version(dialect, job.version(), job.description())
                .await
                .map_err(|err| Box::new(err) as Box<dyn std::error::Error + Send + Sync>)
        }
        JobKind::Sql(unit) => {
            let sql = unit
                .read_sql()
                .map_err(|err| Box::new(err) as Box<dyn std::error::Error + Send + Sync>)?;
            conn.execute_sql(&sql)
                .await
                .map_err(|err| Box::new(err) as Box<dyn std::error::Error + Send + Sync>)?;
            conn.record_version(dialect, job.version(), job.description())
                .await
                .map_err(|err| Box::new(err) as Box<dyn std::error::Error + Send + Sync>)
        }
    }
}

fn warn_if_out_of_order(job: &Job, applied: &AppliedVersions) {
    let max_so_far = applied.max_applied();
    if max_so_far > 0 && job.version() < max_so_far {
        log::warn!(
            "Applying out-of-order migration: Version {} is being applied after a higher version {max_so_far} has already been applied.",
            job.version()
        );
    }
}

/// Log a secondary failure that occurred while rolling back an already-failed
/// job (§4.7 step d, §7 `RollbackFailed`). Wrapped in the same [`Kind`] the
/// primary error path uses so the message matches, but never returned —
/// the original failure remains the one surfaced to the caller.
fn log_rollback_failure(version: u64, cause: Box<dyn std::error::Error + Send + Sync>) {
    let wrapped = Error::new(Kind::RollbackFailed(version, cause));
    log::error!("{wrapped}");
}

fn halt(job: &Job, cause: Box<dyn std::error::Error + Send + Sync>) -> Error {
    let message = format!(
        "CRITICAL ERROR applying {} migration {} ({}). Halting execution.",
        job.kind_label(),
        job.version(),
        job.source()
    );
    log::error!("{message}");
    error_log::append(&format!("{message} Cause: {cause}"));
    Error::new(Kind::MigrationFailed {
        version: job.version(),
        kind: job.kind_label(),
        source: cause,
    })
}
