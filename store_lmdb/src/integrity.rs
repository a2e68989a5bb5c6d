//! LMDB database integrity checks.
//!
//! Run on startup to detect corruption early, before the scheduler begins
//! finalizing polls.

use std::path::Path;

use heed::types::Bytes;

use crate::environment::LmdbEnvironment;
use crate::keys::parse_expiry_key;
use crate::LmdbError;

/// Summary of an integrity check run.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    /// Polls still waiting for the sweep.
    pub pending_polls: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Database names that we expect to exist in a valid foulbot environment.
const EXPECTED_DATABASES: &[&str] = &["polls", "gainers", "votes", "expiry", "meta"];

/// Check LMDB database integrity on startup.
///
/// Counts entries in every expected database and verifies that each
/// pending-expiry index entry points at an existing poll. Read failures are
/// recorded in the report rather than causing a hard error.
pub fn check_integrity(env: &LmdbEnvironment) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport::default();
    let rtxn = env.env().read_txn()?;

    for &db_name in EXPECTED_DATABASES {
        match env.env().open_database::<Bytes, Bytes>(&rtxn, Some(db_name)) {
            Ok(Some(db)) => {
                report.databases_checked += 1;
                match db.len(&rtxn) {
                    Ok(count) => report.total_entries += count,
                    Err(e) => report
                        .errors
                        .push(format!("failed to read database '{}': {}", db_name, e)),
                }
            }
            Ok(None) => report
                .errors
                .push(format!("database '{}' is missing", db_name)),
            Err(e) => report
                .errors
                .push(format!("failed to open database '{}': {}", db_name, e)),
        }
    }

    for result in env.expiry_db.iter(&rtxn)? {
        let (key, _) = result?;
        report.pending_polls += 1;
        match parse_expiry_key(key) {
            Some((_, poll)) => {
                if env.polls_db.get(&rtxn, &poll.encode()?)?.is_none() {
                    report
                        .errors
                        .push(format!("expiry index references missing poll {}", poll));
                }
            }
            None => report
                .errors
                .push("malformed expiry index key".to_string()),
        }
    }

    Ok(report)
}

/// Check if the LMDB data directory looks valid before opening.
///
/// Returns `Ok(())` for a fresh (nonexistent) directory. Returns an error
/// if the directory exists but `data.mdb` is missing, which suggests
/// corruption or misconfiguration.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(());
    }
    let data_file = path.join("data.mdb");
    if !data_file.exists() {
        return Err(format!(
            "LMDB directory exists but data.mdb is missing at {}",
            path.display()
        ));
    }
    Ok(())
}
