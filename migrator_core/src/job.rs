//! The Job Factory (§4.4): merges native and SQL migration units into a
//! single, duplicate-free, ascending-version sequence.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Kind};
use crate::native::NativeMigration;
use crate::scanner::SqlUnit;

/// The tagged union of the two migration unit kinds the engine knows about
/// (§3, §9 "variant types... modeled as a tagged union, not inheritance").
#[derive(Clone, Debug)]
pub enum JobKind {
    Native(NativeMigration),
    Sql(SqlUnit),
}

impl JobKind {
    fn label(&self) -> &'static str {
        match self {
            JobKind::Native(_) => "native",
            JobKind::Sql(_) => "SQL",
        }
    }

    fn source(&self) -> String {
        match self {
            JobKind::Native(n) => format!("native migration {}", n.version()),
            JobKind::Sql(s) => s.path().display().to_string(),
        }
    }
}

/// One migration unit ready to be applied, ordered for the orchestrator by
/// [`version`](Job::version) alone — the kind never affects ordering (§4.4).
#[derive(Clone, Debug)]
pub struct Job {
    version: u64,
    description: String,
    kind: JobKind,
}

impl Job {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> &JobKind {
        &self.kind
    }

    /// A short label used in log messages: "native" or "SQL".
    pub fn kind_label(&self) -> &'static str {
        self.kind.label()
    }

    /// The file path (for SQL units) or a synthetic identifier (for native
    /// units), used in error and log messages (§4.7 step d).
    pub fn source(&self) -> String {
        self.kind.source()
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.version, self.description)
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}
impl Eq for Job {}

impl PartialOrd for Job {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Job {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version.cmp(&other.version)
    }
}

/// Merge native and SQL units into the ordered job list the orchestrator
/// drives (§4.4).
///
/// # Errors
///
/// Fails with [`Kind::DuplicateVersion`] the first time two units (native,
/// SQL, or one of each) declare the same `version`, before any job runs.
pub fn create(
    native_units: Vec<NativeMigration>,
    sql_units: Vec<SqlUnit>,
) -> Result<Vec<Job>, Error> {
    let mut by_version: HashMap<u64, Job> = HashMap::new();
    let mut jobs = Vec::with_capacity(native_units.len() + sql_units.len());

    for native in native_units {
        let job = Job {
            version: native.version(),
            description: native.description().to_string(),
            kind: JobKind::Native(native),
        };
        check_and_insert(&mut by_version, job, &mut jobs)?;
    }

    for sql in sql_units {
        let job = Job {
            version: sql.version(),
            description: sql.description().to_string(),
            kind: JobKind::Sql(sql),
        };
        check_and_insert(&mut by_version, job, &mut jobs)?;
    }

    jobs.sort();
    Ok(jobs)
}

fn check_and_insert(
    by_version: &mut HashMap<u64, Job>,
    job: Job,
    jobs: &mut Vec<Job>,
) -> Result<(), Error> {
    if let Some(existing) = by_version.get(&job.version) {
        return Err(Error::new(Kind::DuplicateVersion {
            version: job.version,
            first: existing.source(),
            second: job.source(),
        }));
    }
    by_version.insert(job.version, job.clone());
    jobs.push(job);
    Ok(())
}
