//! Append-only transaction ledger.
//!
//! The ledger is the system of record for payment attempts and the sole
//! authority for the rolling daily total the spend policy consumes. Records
//! are never mutated: when a tentative (`pending`) payment reaches a
//! terminal state, a *new* record is appended with a link back to the
//! tentative one.
//!
//! Entries are held most-recent-first and snapshotted to a JSON file on
//! every append (write-temp-then-rename). Retention is capped by insertion
//! order, not timestamp, so clock skew cannot cause unbounded growth.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use p402::timestamp::UnixTimestamp;

/// Default number of entries retained before FIFO pruning.
pub const DEFAULT_RETENTION: usize = 1000;

/// Errors that can occur during ledger operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LedgerError {
    /// I/O error reading or writing the snapshot file.
    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot file is not valid JSON for this schema.
    #[error("ledger snapshot is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// A terminal record referenced a tentative entry that is not present.
    #[error("no ledger entry with id {id}")]
    UnknownEntry {
        /// The id that was not found.
        id: EntryId,
    },
}

/// Unique identifier of a ledger entry: a random 128-bit token, hex-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(String);

impl EntryId {
    /// Generates a fresh random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(format!("{:032x}", rand::random::<u128>()))
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Payment attempt in flight; never counts toward daily spend.
    Pending,
    /// The service accepted the payment.
    Success,
    /// The retried request was not accepted; the amount is recorded but
    /// never counted as spend.
    Failed,
}

impl EntryStatus {
    /// Returns the `snake_case` string used in the persisted snapshot.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

/// One immutable ledger record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier.
    pub id: EntryId,

    /// UTC time the record was appended. Assigned by the ledger,
    /// monotonically non-decreasing across appends.
    pub timestamp: UnixTimestamp,

    /// Counterparty service identifier (host of the paid URL).
    pub service: String,

    /// Human-readable description of the payment.
    pub description: String,

    /// Payment amount in the currency's major unit.
    pub amount: Decimal,

    /// Currency code.
    pub currency: String,

    /// Lifecycle state. Terminal states are assigned exactly once, on a
    /// fresh record.
    pub status: EntryStatus,

    /// Optional settlement reference (e.g. a transfer identifier).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement_ref: Option<String>,

    /// For terminal records, the tentative entry this one resolves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<EntryId>,
}

/// Caller-provided fields for a new entry; the ledger assigns id and
/// timestamp on append.
#[derive(Debug, Clone)]
pub struct EntryDraft {
    /// Counterparty service identifier.
    pub service: String,
    /// Human-readable description.
    pub description: String,
    /// Payment amount.
    pub amount: Decimal,
    /// Currency code.
    pub currency: String,
    /// Initial lifecycle state.
    pub status: EntryStatus,
}

/// The append-only transaction ledger.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    retention: usize,
    // Most-recent-first. The mutex also serializes snapshot writes.
    entries: Mutex<Vec<LedgerEntry>>,
}

impl Ledger {
    /// Opens the ledger at `path` with the default retention cap, loading
    /// any existing snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if an existing snapshot cannot be read or
    /// parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        Self::open_with_retention(path, DEFAULT_RETENTION)
    }

    /// Opens the ledger with an explicit retention cap.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if an existing snapshot cannot be read or
    /// parsed.
    pub fn open_with_retention(
        path: impl Into<PathBuf>,
        retention: usize,
    ) -> Result<Self, LedgerError> {
        let path = path.into();
        let entries = if path.exists() {
            serde_json::from_str(&std::fs::read_to_string(&path)?)?
        } else {
            Vec::new()
        };
        Ok(Self {
            path,
            retention,
            entries: Mutex::new(entries),
        })
    }

    /// Appends a new entry, assigning its id and timestamp.
    ///
    /// Entries beyond the retention cap are pruned oldest-first by
    /// insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the snapshot cannot be persisted; the
    /// in-memory state is rolled back so memory and disk stay consistent.
    pub fn append(&self, draft: EntryDraft) -> Result<LedgerEntry, LedgerError> {
        let mut entries = self.lock();
        let entry = LedgerEntry {
            id: EntryId::random(),
            timestamp: Self::next_timestamp(&entries),
            service: draft.service,
            description: draft.description,
            amount: draft.amount,
            currency: draft.currency,
            status: draft.status,
            settlement_ref: None,
            supersedes: None,
        };
        self.commit(&mut entries, entry.clone())?;
        Ok(entry)
    }

    /// Appends a terminal record resolving the tentative entry `tentative`.
    ///
    /// The new record copies the tentative entry's payment fields, carries
    /// the terminal `status` and optional `settlement_ref`, and links back
    /// via `supersedes`. The tentative record itself is never touched.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UnknownEntry`] if `tentative` is not present
    /// (it may have been pruned), or a persistence error.
    pub fn record_outcome(
        &self,
        tentative: &EntryId,
        status: EntryStatus,
        settlement_ref: Option<String>,
    ) -> Result<LedgerEntry, LedgerError> {
        let mut entries = self.lock();
        let source = entries
            .iter()
            .find(|e| &e.id == tentative)
            .ok_or_else(|| LedgerError::UnknownEntry {
                id: tentative.clone(),
            })?;
        let entry = LedgerEntry {
            id: EntryId::random(),
            timestamp: Self::next_timestamp(&entries),
            service: source.service.clone(),
            description: source.description.clone(),
            amount: source.amount,
            currency: source.currency.clone(),
            status,
            settlement_ref,
            supersedes: Some(tentative.clone()),
        };
        self.commit(&mut entries, entry.clone())?;
        Ok(entry)
    }

    /// Sum of successful payment amounts in the trailing 24-hour window
    /// ending at `as_of`.
    ///
    /// Walks the time-ordered sequence from the newest entry and stops at
    /// the window edge, so the cost is proportional to the entries in the
    /// window, not the full history. Pending and failed records never
    /// count.
    #[must_use]
    pub fn daily_spend(&self, as_of: UnixTimestamp) -> Decimal {
        let cutoff = as_of.window_start();
        let entries = self.lock();
        let mut total = Decimal::ZERO;
        for entry in entries.iter() {
            if entry.timestamp < cutoff {
                break;
            }
            if entry.timestamp > as_of {
                continue;
            }
            if entry.status == EntryStatus::Success {
                total += entry.amount;
            }
        }
        total
    }

    /// Returns up to `limit` entries, most recent first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<LedgerEntry> {
        let entries = self.lock();
        entries.iter().take(limit).cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<LedgerEntry>> {
        // Poisoning means another thread panicked mid-append; the snapshot
        // on disk is still consistent, so continue with the data we have.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Picks the next timestamp: wall clock, clamped so it never runs
    /// behind the newest entry. Keeps insertion order and time order from
    /// diverging across a backwards clock step.
    fn next_timestamp(entries: &[LedgerEntry]) -> UnixTimestamp {
        let now = UnixTimestamp::now();
        entries.first().map_or(now, |newest| now.max(newest.timestamp))
    }

    /// Inserts `entry` at the front, prunes past the retention cap, and
    /// persists the snapshot. On a persistence failure the in-memory state
    /// is restored so memory and disk stay consistent.
    fn commit(
        &self,
        entries: &mut Vec<LedgerEntry>,
        entry: LedgerEntry,
    ) -> Result<(), LedgerError> {
        entries.insert(0, entry);
        let pruned = if entries.len() > self.retention {
            entries.pop()
        } else {
            None
        };
        if let Err(e) = self.persist(entries) {
            entries.remove(0);
            if let Some(old) = pruned {
                entries.push(old);
            }
            return Err(e);
        }
        Ok(())
    }

    fn persist(&self, entries: &[LedgerEntry]) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        let tmp = tmp_path(&self.path);
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Sibling temp path for the atomic snapshot write.
fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn draft(amount: &str, status: EntryStatus) -> EntryDraft {
        EntryDraft {
            service: "api.example.com".to_owned(),
            description: "metered call".to_owned(),
            amount: dec(amount),
            currency: "USDC".to_owned(),
            status,
        }
    }

    fn open_ledger(dir: &tempfile::TempDir) -> Ledger {
        Ledger::open(dir.path().join("ledger.json")).unwrap()
    }

    #[test]
    fn append_assigns_id_and_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);
        let entry = ledger.append(draft("0.05", EntryStatus::Success)).unwrap();
        assert_eq!(entry.id.to_string().len(), 32);
        assert!(entry.timestamp.as_secs() > 0);
        assert_eq!(ledger.recent(10).len(), 1);
    }

    #[test]
    fn recent_is_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);
        let first = ledger.append(draft("1", EntryStatus::Success)).unwrap();
        let second = ledger.append(draft("2", EntryStatus::Success)).unwrap();
        let recent = ledger.recent(10);
        assert_eq!(recent[0].id, second.id);
        assert_eq!(recent[1].id, first.id);
    }

    #[test]
    fn daily_spend_counts_only_successes_in_window() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);
        ledger.append(draft("3", EntryStatus::Success)).unwrap();
        ledger.append(draft("7", EntryStatus::Failed)).unwrap();
        ledger.append(draft("11", EntryStatus::Pending)).unwrap();
        assert_eq!(ledger.daily_spend(UnixTimestamp::now()), dec("3"));
    }

    #[test]
    fn daily_spend_excludes_entries_older_than_the_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let now = UnixTimestamp::now();

        // Seed a snapshot with one entry 25 hours old and one 1 hour old.
        let old = LedgerEntry {
            id: EntryId::random(),
            timestamp: UnixTimestamp::from_secs(now.as_secs() - 25 * 3600),
            service: "api.example.com".to_owned(),
            description: "old".to_owned(),
            amount: dec("5"),
            currency: "USDC".to_owned(),
            status: EntryStatus::Success,
            settlement_ref: None,
            supersedes: None,
        };
        let fresh = LedgerEntry {
            timestamp: UnixTimestamp::from_secs(now.as_secs() - 3600),
            description: "fresh".to_owned(),
            amount: dec("3"),
            id: EntryId::random(),
            ..old.clone()
        };
        std::fs::write(&path, serde_json::to_string(&vec![fresh, old]).unwrap()).unwrap();

        let ledger = Ledger::open(&path).unwrap();
        assert_eq!(ledger.daily_spend(now), dec("3"));
    }

    #[test]
    fn record_outcome_links_and_never_mutates() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);
        let pending = ledger.append(draft("0.05", EntryStatus::Pending)).unwrap();
        let settled = ledger
            .record_outcome(&pending.id, EntryStatus::Success, Some("0xdeed".to_owned()))
            .unwrap();

        assert_eq!(settled.supersedes.as_ref(), Some(&pending.id));
        assert_eq!(settled.amount, pending.amount);
        assert_eq!(settled.settlement_ref.as_deref(), Some("0xdeed"));

        // The tentative record is still present and still pending.
        let recent = ledger.recent(10);
        assert_eq!(recent.len(), 2);
        let original = recent.iter().find(|e| e.id == pending.id).unwrap();
        assert_eq!(original.status, EntryStatus::Pending);
        // Exactly the settled record counts toward daily spend.
        assert_eq!(ledger.daily_spend(UnixTimestamp::now()), dec("0.05"));
    }

    #[test]
    fn record_outcome_rejects_unknown_ids() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);
        let err = ledger
            .record_outcome(&EntryId::random(), EntryStatus::Failed, None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnknownEntry { .. }));
    }

    #[test]
    fn retention_prunes_oldest_by_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let ledger =
            Ledger::open_with_retention(dir.path().join("ledger.json"), 3).unwrap();
        let first = ledger.append(draft("1", EntryStatus::Success)).unwrap();
        for amount in ["2", "3", "4"] {
            ledger.append(draft(amount, EntryStatus::Success)).unwrap();
        }
        let recent = ledger.recent(10);
        assert_eq!(recent.len(), 3);
        assert!(recent.iter().all(|e| e.id != first.id));
    }

    #[test]
    fn snapshot_round_trips_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let entry = {
            let ledger = Ledger::open(&path).unwrap();
            ledger.append(draft("1.50", EntryStatus::Success)).unwrap()
        };
        let reopened = Ledger::open(&path).unwrap();
        let recent = reopened.recent(10);
        assert_eq!(recent, vec![entry]);
        assert_eq!(recent[0].amount.to_string(), "1.50");
    }

    #[test]
    fn corrupt_snapshot_is_an_error_not_a_silent_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            Ledger::open(&path).unwrap_err(),
            LedgerError::Corrupt(_)
        ));
    }
}
