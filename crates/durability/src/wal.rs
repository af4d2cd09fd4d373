//! Write-ahead log
//!
//! Every committed mutation is appended here before it is applied to the
//! in-memory store. Opening a WAL replays it; the caller re-applies the
//! returned entries in order.
//!
//! Record types:
//! - CreateExperiment / SetExperimentStage: experiment lifecycle
//! - PutTrace / SetTraceTag / DeleteTraceTag: trace writes
//! - DeleteTraces: irreversible trace deletion
//! - SetPermission: grant changes
//!
//! A trace deletion is durable once its `DeleteTraces` record is on disk.
//! If the process dies before that point the deletion never happened.

use crate::encoding::{decode_entry, encode_entry};
use crate::error::DurabilityError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracebase_core::{Experiment, ExperimentId, LifecycleStage, Trace, TraceId};
use tracebase_security::{Permission, Principal};
use tracing::{debug, info, warn};

/// State-changing operations recorded in the WAL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WalRecord {
    /// A new experiment
    CreateExperiment {
        /// The experiment as created
        experiment: Experiment,
    },
    /// Soft delete or restore
    SetExperimentStage {
        /// Target experiment
        experiment_id: ExperimentId,
        /// New stage
        stage: LifecycleStage,
        /// Time of the change
        at_ms: u64,
    },
    /// Insert or replace a whole trace
    PutTrace {
        /// The trace after the write
        trace: Trace,
    },
    /// Set one trace tag
    SetTraceTag {
        /// Target trace
        trace_id: TraceId,
        /// Tag key
        key: String,
        /// Tag value
        value: String,
    },
    /// Remove one trace tag
    DeleteTraceTag {
        /// Target trace
        trace_id: TraceId,
        /// Tag key
        key: String,
    },
    /// Permanently remove traces of one experiment
    DeleteTraces {
        /// Owning experiment
        experiment_id: ExperimentId,
        /// Exactly the traces removed
        trace_ids: Vec<TraceId>,
    },
    /// Set (`Some`) or revoke (`None`) a grant
    SetPermission {
        /// Target experiment
        experiment_id: ExperimentId,
        /// Grantee
        principal: Principal,
        /// New level, `None` to revoke
        permission: Option<Permission>,
    },
}

impl WalRecord {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            WalRecord::CreateExperiment { .. } => "create_experiment",
            WalRecord::SetExperimentStage { .. } => "set_experiment_stage",
            WalRecord::PutTrace { .. } => "put_trace",
            WalRecord::SetTraceTag { .. } => "set_trace_tag",
            WalRecord::DeleteTraceTag { .. } => "delete_trace_tag",
            WalRecord::DeleteTraces { .. } => "delete_traces",
            WalRecord::SetPermission { .. } => "set_permission",
        }
    }
}

/// A record stamped with its commit version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Commit version, strictly increasing
    pub version: u64,
    /// The operation
    pub record: WalRecord,
}

/// How eagerly appended records reach the disk
///
/// | Mode | WAL | fsync | Data Loss Window |
/// |------|-----|-------|------------------|
/// | InMemory | None | None | All (on crash) |
/// | Buffered | Append | Every `max_pending` records | Bounded |
/// | Strict | Append | Every record | Zero |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurabilityMode {
    /// No WAL at all
    InMemory,
    /// fsync after `max_pending` appends, on flush, and on drop
    Buffered {
        /// Appends between syncs
        max_pending: usize,
    },
    /// fsync after every append
    Strict,
}

impl DurabilityMode {
    /// Whether a WAL file is needed
    pub fn requires_wal(&self) -> bool {
        !matches!(self, DurabilityMode::InMemory)
    }
}

impl Default for DurabilityMode {
    fn default() -> Self {
        DurabilityMode::Buffered { max_pending: 64 }
    }
}

/// Replay configuration
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Maximum corrupt records to skip before failing
    pub max_corrupt_records: usize,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        ReplayOptions {
            max_corrupt_records: 0,
        }
    }
}

/// What replay found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Entries returned for re-application
    pub entries_replayed: u64,
    /// Corrupt records skipped
    pub corrupt_records_skipped: usize,
    /// Bytes of torn tail truncated
    pub truncated_tail_bytes: u64,
    /// Highest version seen
    pub last_version: u64,
}

impl ReplayReport {
    /// Human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "replayed {} WAL entries (last version {}), {} corrupt skipped, {} tail bytes truncated",
            self.entries_replayed,
            self.last_version,
            self.corrupt_records_skipped,
            self.truncated_tail_bytes
        )
    }
}

struct WalWriter {
    file: BufWriter<File>,
    pending: usize,
}

/// Append-only write-ahead log file
pub struct Wal {
    path: PathBuf,
    mode: DurabilityMode,
    writer: Mutex<WalWriter>,
}

impl Wal {
    /// Open (creating if needed) and replay the WAL at `path`
    ///
    /// A torn final frame is truncated away. Corrupt frames in the middle
    /// are skipped up to `options.max_corrupt_records`.
    ///
    /// # Errors
    ///
    /// IO failures, or more corrupt records than allowed.
    pub fn open(
        path: impl AsRef<Path>,
        mode: DurabilityMode,
        options: &ReplayOptions,
    ) -> Result<(Wal, Vec<WalEntry>, ReplayReport), DurabilityError> {
        let path = path.as_ref().to_path_buf();
        let bytes = read_wal_file(&path)?;
        let (entries, report, valid_len) = replay_bytes(&bytes, options)?;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)?;
        if (valid_len as u64) < bytes.len() as u64 {
            warn!(
                path = %path.display(),
                truncated = report.truncated_tail_bytes,
                "truncating torn WAL tail"
            );
            file.set_len(valid_len as u64)?;
            file.sync_all()?;
        }
        drop(file);

        let file = OpenOptions::new().append(true).open(&path)?;
        info!(path = %path.display(), "{}", report.summary());

        Ok((
            Wal {
                path,
                mode,
                writer: Mutex::new(WalWriter {
                    file: BufWriter::new(file),
                    pending: 0,
                }),
            },
            entries,
            report,
        ))
    }

    /// Replay the WAL at `path` without creating, truncating or locking it
    ///
    /// A missing file replays as empty. A torn tail is reported in
    /// `truncated_tail_bytes` but left on disk.
    ///
    /// # Errors
    ///
    /// IO failures, or more corrupt records than allowed.
    pub fn replay(
        path: impl AsRef<Path>,
        options: &ReplayOptions,
    ) -> Result<(Vec<WalEntry>, ReplayReport), DurabilityError> {
        let path = path.as_ref();
        let bytes = read_wal_file(path)?;
        let (entries, report, _) = replay_bytes(&bytes, options)?;
        info!(path = %path.display(), read_only = true, "{}", report.summary());
        Ok((entries, report))
    }

    /// Path of the WAL file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durability mode in effect
    pub fn mode(&self) -> DurabilityMode {
        self.mode
    }

    /// Append one entry, syncing according to the durability mode
    pub fn append(&self, entry: &WalEntry) -> Result<(), DurabilityError> {
        let frame = encode_entry(entry)?;
        let mut writer = self.writer.lock();
        writer.file.write_all(&frame)?;
        match self.mode {
            DurabilityMode::Strict => {
                writer.file.flush()?;
                writer.file.get_ref().sync_data()?;
            }
            DurabilityMode::Buffered { max_pending } => {
                writer.pending += 1;
                if writer.pending >= max_pending.max(1) {
                    writer.file.flush()?;
                    writer.file.get_ref().sync_data()?;
                    writer.pending = 0;
                }
            }
            DurabilityMode::InMemory => writer.file.flush()?,
        }
        debug!(version = entry.version, kind = entry.record.kind(), "WAL append");
        Ok(())
    }

    /// Flush buffered bytes and fsync
    pub fn flush(&self) -> Result<(), DurabilityError> {
        let mut writer = self.writer.lock();
        writer.file.flush()?;
        writer.file.get_ref().sync_data()?;
        writer.pending = 0;
        Ok(())
    }
}

impl Drop for Wal {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(path = %self.path.display(), error = %e, "failed to flush WAL on drop");
        }
    }
}

fn read_wal_file(path: &Path) -> Result<Vec<u8>, DurabilityError> {
    let mut bytes = Vec::new();
    if path.exists() {
        File::open(path)?.read_to_end(&mut bytes)?;
    }
    Ok(bytes)
}

/// Decode every valid entry in `bytes`
///
/// Returns the entries, the report, and the length of the valid prefix.
///
/// A frame that fails to decode is skipped by scanning forward to the next
/// frame that decodes cleanly, and counts against the corruption budget. When
/// no valid frame follows it, the rest of the file is a torn tail.
fn replay_bytes(
    bytes: &[u8],
    options: &ReplayOptions,
) -> Result<(Vec<WalEntry>, ReplayReport, usize), DurabilityError> {
    let mut entries = Vec::new();
    let mut report = ReplayReport::default();
    let mut offset = 0;

    while offset < bytes.len() {
        let error = match decode_entry(&bytes[offset..]) {
            Ok((entry, used)) => {
                report.last_version = report.last_version.max(entry.version);
                entries.push(entry);
                offset += used;
                continue;
            }
            Err(e) => e,
        };

        match next_valid_frame(bytes, offset + 1) {
            Some(resume) => {
                report.corrupt_records_skipped += 1;
                warn!(
                    offset,
                    skipped = resume - offset,
                    error = ?error,
                    "skipping corrupt WAL record"
                );
                if report.corrupt_records_skipped > options.max_corrupt_records {
                    return Err(DurabilityError::TooManyCorruptRecords {
                        found: report.corrupt_records_skipped,
                        max: options.max_corrupt_records,
                    });
                }
                offset = resume;
            }
            None => {
                report.truncated_tail_bytes = (bytes.len() - offset) as u64;
                break;
            }
        }
    }

    report.entries_replayed = entries.len() as u64;
    Ok((entries, report, offset))
}

/// Offset of the first frame at or after `from` that decodes cleanly
fn next_valid_frame(bytes: &[u8], from: usize) -> Option<usize> {
    (from..bytes.len()).find(|&at| decode_entry(&bytes[at..]).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tracebase_core::{TraceInfo, TraceStatus};

    fn trace(id: &str, ts: u64) -> Trace {
        Trace {
            info: TraceInfo {
                trace_id: TraceId::parse(id).unwrap(),
                experiment_id: ExperimentId::new("1"),
                timestamp_ms: ts,
                execution_time_ms: Some(3),
                status: TraceStatus::Ok,
                request_metadata: BTreeMap::new(),
                tags: BTreeMap::new(),
            },
            spans: vec![tracebase_core::Span::new(1, "root", 0)
                .with_attribute("inputs", serde_json::json!({"q": "hi"}))],
        }
    }

    fn put(version: u64, id: &str) -> WalEntry {
        WalEntry {
            version,
            record: WalRecord::PutTrace {
                trace: trace(id, version),
            },
        }
    }

    #[test]
    fn test_append_and_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wal.log");

        {
            let (wal, entries, _) =
                Wal::open(&path, DurabilityMode::Strict, &ReplayOptions::default()).unwrap();
            assert!(entries.is_empty());
            wal.append(&put(1, "a")).unwrap();
            wal.append(&put(2, "b")).unwrap();
            wal.append(&WalEntry {
                version: 3,
                record: WalRecord::DeleteTraces {
                    experiment_id: ExperimentId::new("1"),
                    trace_ids: vec![TraceId::parse("a").unwrap()],
                },
            })
            .unwrap();
        }

        let (_, entries, report) =
            Wal::open(&path, DurabilityMode::Strict, &ReplayOptions::default()).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], put(1, "a"));
        assert_eq!(report.last_version, 3);
        assert_eq!(report.entries_replayed, 3);
        assert!(matches!(entries[2].record, WalRecord::DeleteTraces { .. }));
    }

    #[test]
    fn test_buffered_mode_flushes_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wal.log");
        {
            let (wal, _, _) = Wal::open(
                &path,
                DurabilityMode::Buffered { max_pending: 1000 },
                &ReplayOptions::default(),
            )
            .unwrap();
            wal.append(&put(1, "a")).unwrap();
        }
        let (_, entries, _) =
            Wal::open(&path, DurabilityMode::Strict, &ReplayOptions::default()).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_torn_tail_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wal.log");
        {
            let (wal, _, _) =
                Wal::open(&path, DurabilityMode::Strict, &ReplayOptions::default()).unwrap();
            wal.append(&put(1, "a")).unwrap();
        }
        let good_len = std::fs::metadata(&path).unwrap().len();

        // Half of a second frame
        let partial = encode_entry(&put(2, "b")).unwrap();
        let mut f = OpenOptions::new().append(true).open(&path).unwrap();
        f.write_all(&partial[..partial.len() / 2]).unwrap();
        drop(f);

        let (wal, entries, report) =
            Wal::open(&path, DurabilityMode::Strict, &ReplayOptions::default()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(report.truncated_tail_bytes, (partial.len() / 2) as u64);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), good_len);

        // Appends after truncation are readable
        wal.append(&put(2, "b")).unwrap();
        drop(wal);
        let (_, entries, _) =
            Wal::open(&path, DurabilityMode::Strict, &ReplayOptions::default()).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_corrupt_record_respects_budget() {
        let mut bytes = encode_entry(&put(1, "a")).unwrap();
        let mut bad = encode_entry(&put(2, "b")).unwrap();
        let last = bad.len() - 1;
        bad[last] ^= 0xff;
        bytes.extend(&bad);
        bytes.extend(encode_entry(&put(3, "c")).unwrap());

        let strict = ReplayOptions {
            max_corrupt_records: 0,
        };
        assert!(matches!(
            replay_bytes(&bytes, &strict),
            Err(DurabilityError::TooManyCorruptRecords { found: 1, max: 0 })
        ));

        let lenient = ReplayOptions {
            max_corrupt_records: 1,
        };
        let (entries, report, valid) = replay_bytes(&bytes, &lenient).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(report.corrupt_records_skipped, 1);
        assert_eq!(valid, bytes.len());
    }

    #[test]
    fn test_damaged_length_header_mid_log_is_corruption() {
        let mut bytes = encode_entry(&put(1, "a")).unwrap();
        let second = bytes.len();
        bytes.extend(encode_entry(&put(2, "b")).unwrap());
        bytes.extend(encode_entry(&put(3, "c")).unwrap());
        bytes[second..second + 4].copy_from_slice(&0x00ff_ffffu32.to_le_bytes());

        let strict = ReplayOptions {
            max_corrupt_records: 0,
        };
        assert!(matches!(
            replay_bytes(&bytes, &strict),
            Err(DurabilityError::TooManyCorruptRecords { found: 1, max: 0 })
        ));

        let lenient = ReplayOptions {
            max_corrupt_records: 1,
        };
        let (entries, report, valid) = replay_bytes(&bytes, &lenient).unwrap();
        assert_eq!(entries, vec![put(1, "a"), put(3, "c")]);
        assert_eq!(report.corrupt_records_skipped, 1);
        assert_eq!(report.truncated_tail_bytes, 0);
        assert_eq!(valid, bytes.len());
    }

    #[test]
    fn test_damaged_length_header_keeps_file_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wal.log");
        let mut bytes = encode_entry(&put(1, "a")).unwrap();
        let second = bytes.len();
        bytes.extend(encode_entry(&put(2, "b")).unwrap());
        bytes.extend(encode_entry(&put(3, "c")).unwrap());
        bytes[second..second + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();

        let result = Wal::open(&path, DurabilityMode::Strict, &ReplayOptions::default());
        assert!(matches!(
            result,
            Err(DurabilityError::TooManyCorruptRecords { found: 1, max: 0 })
        ));
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn test_garbage_tail_is_torn_not_corrupt() {
        let mut bytes = encode_entry(&put(1, "a")).unwrap();
        let good = bytes.len();
        let mut torn = encode_entry(&put(2, "b")).unwrap();
        let last = torn.len() - 1;
        torn[last] ^= 0xff;
        bytes.extend(&torn);

        let (entries, report, valid) =
            replay_bytes(&bytes, &ReplayOptions::default()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(report.corrupt_records_skipped, 0);
        assert_eq!(report.truncated_tail_bytes, torn.len() as u64);
        assert_eq!(valid, good);
    }

    #[test]
    fn test_replay_leaves_torn_tail_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wal.log");
        let mut bytes = encode_entry(&put(1, "a")).unwrap();
        let partial = encode_entry(&put(2, "b")).unwrap();
        bytes.extend(&partial[..partial.len() / 2]);
        std::fs::write(&path, &bytes).unwrap();

        let (entries, report) = Wal::replay(&path, &ReplayOptions::default()).unwrap();
        assert_eq!(entries, vec![put(1, "a")]);
        assert_eq!(report.truncated_tail_bytes, (partial.len() / 2) as u64);
        assert_eq!(std::fs::read(&path).unwrap(), bytes);

        let missing = dir.path().join("absent.log");
        let (entries, _) = Wal::replay(&missing, &ReplayOptions::default()).unwrap();
        assert!(entries.is_empty());
        assert!(!missing.exists());
    }

    #[test]
    fn test_in_memory_mode_needs_no_wal() {
        assert!(!DurabilityMode::InMemory.requires_wal());
        assert!(DurabilityMode::Strict.requires_wal());
        assert!(DurabilityMode::default().requires_wal());
    }
}
