//! The Path Scanner (§4.1) and SQL Task Parser (§4.3).

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Kind};

/// Matches `<12-digit version>_<freeform name>.sql` (extension
/// case-insensitive, §4.3).
fn sql_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(\d{12})_.+\.sql$").unwrap())
}

/// Enumerate the non-recursive entries of `dir` (§4.1). Fails with
/// [`Kind::DirectoryMissing`] if the directory does not exist; the error is
/// surfaced unchanged, before any database connection is opened.
pub fn scan(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    if !dir.is_dir() {
        return Err(Error::new(Kind::DirectoryMissing(dir.to_path_buf())));
    }

    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|_| Error::new(Kind::DirectoryMissing(dir.to_path_buf())))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .collect();
    entries.sort();
    Ok(entries)
}

/// A migration unit whose `apply()` reads a SQL script file verbatim and
/// submits it as one or more statements (§3, §4.3).
#[derive(Clone, Debug)]
pub struct SqlUnit {
    version: u64,
    description: String,
    path: PathBuf,
}

impl SqlUnit {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the migration script's contents verbatim; no parsing or
    /// validation is performed on them (§4.3).
    pub fn read_sql(&self) -> std::io::Result<String> {
        fs::read_to_string(&self.path)
    }
}

/// Parse one scanned entry into a [`SqlUnit`], if its name matches the
/// `<12-digit>_<name>.sql` convention. Non-matching entries (including
/// directories and native artifacts) are silently ignored here; the caller
/// debug-logs them (§6.2).
pub fn parse_sql_entry(path: &Path) -> Option<SqlUnit> {
    if !path.is_file() {
        return None;
    }
    let file_name = path.file_name().and_then(OsStr::to_str)?;
    let captures = sql_name_re().captures(file_name)?;
    let version: u64 = captures[1].parse().ok()?;

    Some(SqlUnit {
        version,
        description: format!("SQL Migration: {file_name}"),
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn scan_missing_directory_fails() {
        let err = scan(Path::new("/does/not/exist/at/all")).unwrap_err();
        match err.kind() {
            Kind::DirectoryMissing(_) => {}
            other => panic!("wrong kind: {other:?}"),
        }
    }

    #[test]
    fn scan_empty_directory_is_ok() {
        let dir = TempDir::new().unwrap();
        let entries = scan(dir.path()).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn parses_well_formed_sql_filename() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("202601020304_add_user_email.sql");
        File::create(&path).unwrap();

        let unit = parse_sql_entry(&path).unwrap();
        assert_eq!(unit.version(), 202601020304);
        assert_eq!(
            unit.description(),
            "SQL Migration: 202601020304_add_user_email.sql"
        );
    }

    #[test]
    fn case_insensitive_extension_matches() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("202601020304_add_user_email.SQL");
        File::create(&path).unwrap();
        assert!(parse_sql_entry(&path).is_some());
    }

    #[test]
    fn ignores_non_matching_files() {
        let dir = TempDir::new().unwrap();
        for name in ["readme.txt", "1_too_short.sql", "some.dll", "V1__legacy.sql"] {
            let path = dir.path().join(name);
            File::create(&path).unwrap();
            assert!(
                parse_sql_entry(&path).is_none(),
                "expected {name} to be ignored"
            );
        }
    }

    #[test]
    fn ignores_directories() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("202601020304_a_directory.sql");
        std::fs::create_dir(&sub).unwrap();
        assert!(parse_sql_entry(&sub).is_none());
    }
}
