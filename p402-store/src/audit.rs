//! Append-only audit trail with size-bounded rotation.
//!
//! Every security-relevant event — approval decisions, executions,
//! failures, configuration changes, credential lifecycle — lands here as
//! one line-delimited JSON record. The trail is independent of the ledger:
//! it duplicates some payment data for compliance but also records events
//! the ledger never sees.
//!
//! Writing an audit record must never jeopardize the payment it documents,
//! so [`AuditTrail::record`] is infallible from the caller's perspective:
//! failures are logged and swallowed. Rotation renames the whole active
//! file aside and prunes old backups; individual entries are never deleted.

use std::fmt;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Rotation threshold for the active file, in bytes (10 MiB).
pub const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated backups retained.
pub const DEFAULT_MAX_BACKUPS: usize = 5;

/// The closed set of auditable actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum AuditAction {
    /// A payment was approved, automatically or by an external decider.
    PaymentApproved,
    /// A payment was denied by the approval capability.
    PaymentDenied,
    /// A payment was executed and accepted by the service.
    PaymentExecuted,
    /// A payment was attempted and not accepted.
    PaymentFailed,
    /// A payment was blocked by spend limits.
    LimitExceeded,
    /// Configuration was changed.
    ConfigChanged,
    /// A wallet credential was created.
    WalletCreated,
    /// A wallet credential was exported.
    WalletExported,
}

impl AuditAction {
    /// Returns the `snake_case` string used in the persisted record.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentApproved => "payment_approved",
            Self::PaymentDenied => "payment_denied",
            Self::PaymentExecuted => "payment_executed",
            Self::PaymentFailed => "payment_failed",
            Self::LimitExceeded => "limit_exceeded",
            Self::ConfigChanged => "config_changed",
            Self::WalletCreated => "wallet_created",
            Self::WalletExported => "wallet_exported",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// UTC time of the event, RFC 3339.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub action: AuditAction,
    /// Free-form structured context.
    pub details: Value,
}

/// The append-only audit trail.
#[derive(Debug)]
pub struct AuditTrail {
    path: PathBuf,
    max_size: u64,
    max_backups: usize,
    // Serializes the size check, rotation, and append.
    write_lock: Mutex<()>,
}

impl AuditTrail {
    /// Creates a trail writing to `path` with default rotation settings.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_size: DEFAULT_MAX_SIZE,
            max_backups: DEFAULT_MAX_BACKUPS,
            write_lock: Mutex::new(()),
        }
    }

    /// Overrides the rotation threshold and backup count.
    #[must_use]
    pub fn with_rotation(mut self, max_size: u64, max_backups: usize) -> Self {
        self.max_size = max_size;
        self.max_backups = max_backups;
        self
    }

    /// Appends one record.
    ///
    /// Best-effort: a failure to write is logged at `warn` level and
    /// swallowed, never surfaced to the payment path.
    pub fn record(&self, action: AuditAction, details: Value) {
        let event = AuditEvent {
            timestamp: Utc::now(),
            action,
            details,
        };
        if let Err(e) = self.try_record(&event) {
            tracing::warn!(action = %action, error = %e, "failed to write audit record");
        }
    }

    fn try_record(&self, event: &AuditEvent) -> std::io::Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        self.rotate_if_needed();

        let line = serde_json::to_string(event).map_err(std::io::Error::other)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }

    /// Renames the active file aside once it exceeds the size threshold and
    /// prunes old backups. All failures here are non-fatal and swallowed.
    fn rotate_if_needed(&self) {
        let Ok(metadata) = std::fs::metadata(&self.path) else {
            return;
        };
        if metadata.len() <= self.max_size {
            return;
        }

        let backup = backup_path(&self.path, Utc::now().timestamp_millis());
        if std::fs::rename(&self.path, &backup).is_err() {
            return;
        }
        self.prune_backups();
    }

    /// Deletes rotated backups beyond the retained count, oldest first.
    fn prune_backups(&self) {
        let Some(parent) = effective_parent(&self.path) else {
            return;
        };
        let Some(file_name) = self.path.file_name().and_then(|n| n.to_str()) else {
            return;
        };
        let prefix = format!("{file_name}.");

        let Ok(dir) = std::fs::read_dir(parent) else {
            return;
        };
        let mut backups: Vec<(i64, PathBuf)> = dir
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name();
                let stamp = name.to_str()?.strip_prefix(&prefix)?.parse::<i64>().ok()?;
                Some((stamp, entry.path()))
            })
            .collect();

        backups.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        for (_, path) in backups.into_iter().skip(self.max_backups) {
            let _ = std::fs::remove_file(path);
        }
    }

    /// Reads the active file back into events, skipping unparsable lines.
    ///
    /// With `limit`, returns only the `limit` most recent events.
    #[must_use]
    pub fn read(&self, limit: Option<usize>) -> Vec<AuditEvent> {
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        let events: Vec<AuditEvent> = content
            .lines()
            .filter(|line| !line.is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        match limit {
            Some(n) if n < events.len() => events[events.len() - n..].to_vec(),
            _ => events,
        }
    }
}

/// Backup name for a rotated file: the active name plus a millisecond stamp.
fn backup_path(path: &Path, stamp_millis: i64) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(format!(".{stamp_millis}"));
    PathBuf::from(os)
}

/// Parent directory, treating a bare file name as the current directory.
fn effective_parent(path: &Path) -> Option<&Path> {
    match path.parent() {
        Some(p) if p.as_os_str().is_empty() => Some(Path::new(".")),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn records_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let trail = AuditTrail::new(dir.path().join("audit.log"));
        trail.record(
            AuditAction::PaymentExecuted,
            json!({ "service": "api.example.com", "amount": "0.05" }),
        );
        trail.record(AuditAction::ConfigChanged, json!({ "field": "daily_limit" }));

        let content = std::fs::read_to_string(dir.path().join("audit.log")).unwrap();
        assert_eq!(content.lines().count(), 2);

        let events = trail.read(None);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, AuditAction::PaymentExecuted);
        assert_eq!(events[0].details["amount"], "0.05");
        assert_eq!(events[1].action, AuditAction::ConfigChanged);
    }

    #[test]
    fn read_with_limit_keeps_the_most_recent() {
        let dir = tempfile::tempdir().unwrap();
        let trail = AuditTrail::new(dir.path().join("audit.log"));
        for i in 0..5 {
            trail.record(AuditAction::PaymentExecuted, json!({ "i": i }));
        }
        let events = trail.read(Some(2));
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].details["i"], 3);
        assert_eq!(events[1].details["i"], 4);
    }

    #[test]
    fn read_skips_unparsable_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let trail = AuditTrail::new(&path);
        trail.record(AuditAction::WalletCreated, json!({}));
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("garbage line\n");
        std::fs::write(&path, content).unwrap();
        trail.record(AuditAction::WalletExported, json!({}));

        let events = trail.read(None);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn oversized_file_rotates_on_next_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let trail = AuditTrail::new(&path).with_rotation(256, 5);

        // Fill past the threshold.
        while std::fs::metadata(&path).map_or(0, |m| m.len()) <= 256 {
            trail.record(AuditAction::PaymentExecuted, json!({ "pad": "x".repeat(64) }));
        }
        trail.record(AuditAction::PaymentExecuted, json!({ "after": "rotation" }));

        let backups: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .is_some_and(|n| n.starts_with("audit.log."))
            })
            .collect();
        assert_eq!(backups.len(), 1);

        // The active file starts fresh with only the post-rotation record.
        let events = trail.read(None);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].details["after"], "rotation");
    }

    #[test]
    fn prunes_backups_beyond_the_retained_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let trail = AuditTrail::new(&path).with_rotation(64, 2);

        // Seed stale backups with known stamps.
        for stamp in [1_000, 2_000, 3_000] {
            std::fs::write(backup_path(&path, stamp), "old").unwrap();
        }
        // Force one real rotation; its fresh backup plus the two newest
        // seeded ones survive.
        std::fs::write(&path, "x".repeat(100)).unwrap();
        trail.record(AuditAction::PaymentExecuted, json!({}));

        let mut stamps: Vec<i64> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter_map(|e| {
                e.file_name()
                    .to_str()?
                    .strip_prefix("audit.log.")?
                    .parse()
                    .ok()
            })
            .collect();
        stamps.sort_unstable();
        assert_eq!(stamps.len(), 2);
        // Oldest deleted first.
        assert_eq!(stamps[0], 3_000);
    }

    #[test]
    fn write_failure_does_not_panic_or_propagate() {
        // A directory at the trail path makes every append fail.
        let dir = tempfile::tempdir().unwrap();
        let trail = AuditTrail::new(dir.path());
        trail.record(AuditAction::PaymentFailed, json!({}));
        assert!(trail.read(None).is_empty());
    }
}
