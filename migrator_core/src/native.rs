//! The Native Migration Loader's output type (§4.2).
//!
//! The engine is loader-agnostic: some external collaborator (a native
//! migration authoring framework, in the language this spec targets; a
//! `build.rs`-generated registry or a hand-written `Vec` in Rust) hands the
//! orchestrator a `Vec<NativeMigration>`. The engine never knows, and never
//! needs to know, how that collection was produced.

use std::sync::Arc;

use crate::connection::ApplyFn;

/// A single native-code migration: a declared version, an optional
/// description, and an imperative `apply` routine bound to the engine's
/// active connection at invocation time.
#[derive(Clone)]
pub struct NativeMigration {
    version: u64,
    description: String,
    apply: Arc<ApplyFnInner>,
}

type ApplyFnInner = dyn Fn(&mut dyn crate::connection::MigrationApply) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    + Send
    + Sync;

impl NativeMigration {
    /// Construct a native migration unit. `description` defaults to the
    /// empty string when `None`, matching the "optional description"
    /// contract of §4.2.
    pub fn new<F>(version: u64, description: impl Into<Option<String>>, apply: F) -> NativeMigration
    where
        F: Fn(&mut dyn crate::connection::MigrationApply) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
            + Send
            + Sync
            + 'static,
    {
        NativeMigration {
            version,
            description: description.into().unwrap_or_default(),
            apply: Arc::new(apply),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub(crate) fn apply_fn(&self) -> ApplyFn {
        let apply = Arc::clone(&self.apply);
        Box::new(move |conn| apply(conn))
    }
}

impl std::fmt::Debug for NativeMigration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeMigration")
            .field("version", &self.version)
            .field("description", &self.description)
            .finish()
    }
}

/// Helper for loader authors (§4.2): given one fallible load attempt per
/// candidate artifact, keep the ones that produced a migration and
/// debug-log the rest, matching the "tolerates 'not a valid artifact' and
/// 'no migrations inside' as non-fatal" contract. The orchestrator itself
/// never calls this — it only consumes the `Vec<NativeMigration>` the
/// loader hands it — but a loader built on top of this crate can use it to
/// get that tolerance for free instead of reimplementing it.
pub fn load_tolerant<I, E>(attempts: I) -> Vec<NativeMigration>
where
    I: IntoIterator<Item = (String, Result<Option<NativeMigration>, E>)>,
    E: std::fmt::Display,
{
    let mut migrations = Vec::new();
    for (artifact_name, attempt) in attempts {
        match attempt {
            Ok(Some(migration)) => migrations.push(migration),
            Ok(None) => log::debug!("artifact {artifact_name} contains no migrations"),
            Err(err) => {
                log::debug!("artifact {artifact_name} is not a valid migration artifact: {err}")
            }
        }
    }
    migrations
}
