//! LMDB database integrity checks.
//!
//! Run on startup to detect corruption early, before the service begins
//! accepting votes.

use std::collections::BTreeMap;
use std::path::Path;

use ballast_store::{StoreError, TallyStore, VoteStore};
use ballast_types::{ProposalId, Weight};

use crate::{LmdbEnvironment, LmdbError};

/// Summary of an integrity check run.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Database names that we expect to exist in a valid ledger environment.
const EXPECTED_DATABASES: &[&str] = &[
    "proposals",
    "votes",
    "wallet_votes",
    "proposal_votes",
    "staleness",
    "tallies",
    "meta",
];

/// Check LMDB database integrity on startup.
///
/// Opens each expected database and counts entries, then checks that every
/// vote index has one entry per vote. Read failures are recorded in the
/// report rather than causing a hard error.
pub fn check_integrity(store: &LmdbEnvironment) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport::default();
    let env = store.env();
    let rtxn = env.read_txn()?;

    let mut counts = BTreeMap::new();
    for &db_name in EXPECTED_DATABASES {
        match env.open_database::<heed::types::Bytes, heed::types::Bytes>(&rtxn, Some(db_name)) {
            Ok(Some(db)) => {
                report.databases_checked += 1;
                match db.len(&rtxn) {
                    Ok(count) => {
                        report.total_entries += count;
                        counts.insert(db_name, count);
                    }
                    Err(e) => {
                        report
                            .errors
                            .push(format!("failed to read database '{}': {}", db_name, e));
                    }
                }
            }
            Ok(None) => {
                report
                    .errors
                    .push(format!("database '{}' is missing", db_name));
            }
            Err(e) => {
                report
                    .errors
                    .push(format!("failed to open database '{}': {}", db_name, e));
            }
        }
    }

    if let Some(&votes) = counts.get("votes") {
        for index in ["wallet_votes", "proposal_votes", "staleness"] {
            if let Some(&n) = counts.get(index) {
                if n != votes {
                    report
                        .errors
                        .push(format!("index '{index}' has {n} entries for {votes} votes"));
                }
            }
        }
    }

    Ok(report)
}

/// Recompute one proposal's tally from its votes and report any option
/// whose stored total or voter count disagrees.
pub fn verify_tally(store: &LmdbEnvironment, proposal: ProposalId) -> Result<Vec<String>, StoreError> {
    let votes = store.proposal_votes(proposal)?;
    let mut expected: BTreeMap<String, (Weight, u64)> = BTreeMap::new();
    for vote in &votes {
        let entry = expected.entry(vote.option.clone()).or_insert((Weight::ZERO, 0));
        entry.0 = entry
            .0
            .checked_add(vote.weight)
            .ok_or_else(|| StoreError::Corruption("vote weights overflow".to_string()))?;
        entry.1 += 1;
    }

    let mut errors = Vec::new();
    let tally = store.get_tally(proposal)?;
    match tally {
        None if votes.is_empty() => {}
        None => errors.push(format!("proposal {proposal} has votes but no tally")),
        Some(tally) => {
            for (option, (weight, voters)) in &expected {
                if tally.total_for(option) != *weight {
                    errors.push(format!(
                        "proposal {proposal} option '{option}': tally {} != votes {weight}",
                        tally.total_for(option)
                    ));
                }
                if tally.voters.get(option).copied().unwrap_or(0) != *voters {
                    errors.push(format!("proposal {proposal} option '{option}': voter count drift"));
                }
            }
            for (option, total) in &tally.totals {
                if !expected.contains_key(option) && !total.is_zero() {
                    errors.push(format!("proposal {proposal} option '{option}' has no votes"));
                }
            }
        }
    }
    Ok(errors)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_data_dir_fresh_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_data_dir(&dir.path().join("absent")).is_ok());
    }

    #[test]
    fn check_data_dir_without_data_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_data_dir(dir.path()).is_err());
    }

    #[test]
    fn fresh_environment_is_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbEnvironment::open_default(dir.path()).unwrap();
        let report = check_integrity(&store).unwrap();
        assert!(report.is_healthy(), "{:?}", report.errors);
        assert_eq!(report.databases_checked, EXPECTED_DATABASES.len() as u32);
        assert!(verify_tally(&store, ProposalId::new(1)).unwrap().is_empty());
    }
}
