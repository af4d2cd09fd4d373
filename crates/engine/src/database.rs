//! Database: the engine's single owner of state
//!
//! A `Database` holds the sharded trace store, the experiment registry, the
//! access policy and (unless ephemeral) the write-ahead log.
//!
//! # Commit path
//!
//! Every mutation runs under one commit lock:
//!
//! ```text
//! lock → resolve + authorize → build WalRecord → WAL.append() → apply → unlock
//! ```
//!
//! Replay on open feeds the recovered records through the same `apply`, so a
//! reopened database is exactly the state the last durable record left.

use crate::config::{DatabaseConfig, DurabilitySetting};
use crate::registry::ExperimentRegistry;
use parking_lot::{Mutex, MutexGuard, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracebase_core::{
    now_millis, Error, Experiment, ExperimentId, LifecycleStage, Result, DEFAULT_EXPERIMENT_NAME,
};
use tracebase_durability::{DurabilityMode, ReplayOptions, Wal, WalEntry, WalRecord};
use tracebase_security::{AccessMode, AccessPolicy, OpenOptions, Permission, Principal};
use tracebase_storage::ShardedStore;
use tracing::{debug, info};

/// Name of the WAL file inside the database directory
pub const WAL_FILE_NAME: &str = "wal.log";

/// Proof that the caller holds the commit lock
pub(crate) type CommitGuard<'a> = MutexGuard<'a, ()>;

/// Embedded trace database
///
/// Create one with [`Database::open`], [`Database::ephemeral`] or
/// [`Database::builder`], then share it through an `Arc`.
pub struct Database {
    data_dir: Option<PathBuf>,
    config: DatabaseConfig,
    options: OpenOptions,
    mode: DurabilityMode,
    pub(crate) store: ShardedStore,
    pub(crate) experiments: RwLock<ExperimentRegistry>,
    pub(crate) policy: RwLock<AccessPolicy>,
    wal: Option<Wal>,
    commit_lock: Mutex<()>,
}

/// Summary of a database's state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    /// Data directory, `None` when ephemeral
    pub path: Option<String>,
    /// `in_memory`, `buffered` or `strict`
    pub durability: String,
    /// Whether writes are refused
    pub read_only: bool,
    /// Experiments in any stage
    pub experiments: usize,
    /// Stored traces across all experiments
    pub traces: usize,
    /// Last committed version
    pub version: u64,
}

impl Database {
    /// Open (or create) a database directory with default settings
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        DatabaseBuilder::new().path(path).open()
    }

    /// A database with no files and no WAL
    pub fn ephemeral() -> Result<Self> {
        DatabaseBuilder::new().open()
    }

    /// Start configuring a database
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    fn open_with(
        data_dir: Option<PathBuf>,
        config: DatabaseConfig,
        options: OpenOptions,
    ) -> Result<Self> {
        let mode = if data_dir.is_some() {
            config.durability_mode()
        } else {
            DurabilityMode::InMemory
        };

        let replay = ReplayOptions {
            max_corrupt_records: config.max_corrupt_wal_records,
        };
        let (wal, entries) = match (&data_dir, mode.requires_wal(), options.access_mode) {
            (Some(dir), true, AccessMode::ReadOnly) => {
                let (entries, _report) = Wal::replay(dir.join(WAL_FILE_NAME), &replay)?;
                (None, entries)
            }
            (Some(dir), true, AccessMode::ReadWrite) => {
                let (wal, entries, _report) = Wal::open(dir.join(WAL_FILE_NAME), mode, &replay)?;
                (Some(wal), entries)
            }
            _ => (None, Vec::new()),
        };

        let db = Database {
            data_dir,
            policy: RwLock::new(AccessPolicy::new(config.default_permission)),
            config,
            options,
            mode,
            store: ShardedStore::new(),
            experiments: RwLock::new(ExperimentRegistry::new()),
            wal,
            commit_lock: Mutex::new(()),
        };

        let mut last_version = 0;
        for entry in entries {
            last_version = last_version.max(entry.version);
            db.apply(entry.record);
        }
        db.store.set_version(last_version);

        db.ensure_default_experiment()?;
        info!(
            experiments = db.experiments.read().len(),
            traces = db.store.total_traces(),
            version = last_version,
            "database opened"
        );
        Ok(db)
    }

    fn ensure_default_experiment(&self) -> Result<()> {
        let id = ExperimentId::default_experiment();
        if self.experiments.read().get(&id).is_some() || self.check_writable().is_err() {
            return Ok(());
        }
        let guard = self.lock_commit();
        let now = now_millis();
        self.commit(
            &guard,
            WalRecord::CreateExperiment {
                experiment: Experiment {
                    experiment_id: id,
                    name: DEFAULT_EXPERIMENT_NAME.to_string(),
                    lifecycle_stage: LifecycleStage::Active,
                    creation_time_ms: now,
                    last_update_time_ms: now,
                    tags: BTreeMap::new(),
                },
            },
        )?;
        Ok(())
    }

    /// Data directory, `None` when ephemeral
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Whether the database has no files at all
    pub fn is_ephemeral(&self) -> bool {
        self.data_dir.is_none()
    }

    /// WAL sync policy in effect
    pub fn durability_mode(&self) -> DurabilityMode {
        self.mode
    }

    /// Effective configuration
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Read-write or read-only
    pub fn access_mode(&self) -> AccessMode {
        self.options.access_mode
    }

    /// Last committed version
    pub fn version(&self) -> u64 {
        self.store.version()
    }

    /// Snapshot of counters and settings
    pub fn info(&self) -> DatabaseInfo {
        DatabaseInfo {
            path: self.data_dir.as_ref().map(|p| p.display().to_string()),
            durability: durability_label(self.mode).to_string(),
            read_only: self.options.access_mode == AccessMode::ReadOnly,
            experiments: self.experiments.read().len(),
            traces: self.store.total_traces(),
            version: self.store.version(),
        }
    }

    /// Force buffered WAL records to disk
    pub fn flush(&self) -> Result<()> {
        if let Some(wal) = &self.wal {
            wal.flush()?;
        }
        Ok(())
    }

    /// Wait for in-flight commits, then flush the WAL
    pub fn shutdown(&self) -> Result<()> {
        let _guard = self.lock_commit();
        self.flush()?;
        info!("database shut down");
        Ok(())
    }

    pub(crate) fn check_writable(&self) -> Result<()> {
        self.options.check_writable()
    }

    pub(crate) fn lock_commit(&self) -> CommitGuard<'_> {
        self.commit_lock.lock()
    }

    /// Log `record` to the WAL, then apply it
    ///
    /// Returns the commit version. When the WAL append fails nothing is
    /// applied and the version is not consumed.
    pub(crate) fn commit(&self, _guard: &CommitGuard<'_>, record: WalRecord) -> Result<u64> {
        let version = self.store.version() + 1;
        let entry = WalEntry { version, record };
        if let Some(wal) = &self.wal {
            wal.append(&entry)?;
        }
        debug!(version, kind = entry.record.kind(), "commit");
        self.apply(entry.record);
        self.store.set_version(version);
        Ok(version)
    }

    fn apply(&self, record: WalRecord) {
        match record {
            WalRecord::CreateExperiment { experiment } => {
                self.experiments.write().insert(experiment);
            }
            WalRecord::SetExperimentStage {
                experiment_id,
                stage,
                at_ms,
            } => {
                self.experiments
                    .write()
                    .set_stage(&experiment_id, stage, at_ms);
            }
            WalRecord::PutTrace { trace } => {
                self.store.insert(trace);
            }
            WalRecord::SetTraceTag {
                trace_id,
                key,
                value,
            } => {
                self.store.update(&trace_id, |trace| {
                    trace.info.tags.insert(key, value);
                });
            }
            WalRecord::DeleteTraceTag { trace_id, key } => {
                self.store.update(&trace_id, |trace| {
                    trace.info.tags.remove(&key);
                });
            }
            WalRecord::DeleteTraces {
                experiment_id,
                trace_ids,
            } => {
                self.store.remove_many(&experiment_id, &trace_ids);
            }
            WalRecord::SetPermission {
                experiment_id,
                principal,
                permission,
            } => {
                let mut policy = self.policy.write();
                match permission {
                    Some(permission) => policy.grant(experiment_id, principal, permission),
                    None => {
                        policy.revoke(&experiment_id, &principal);
                    }
                }
            }
        }
    }

    /// Active experiment with this id, or `NotFound`
    pub(crate) fn resolve_active(&self, experiment_id: &ExperimentId) -> Result<Experiment> {
        self.experiments
            .read()
            .active(experiment_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("experiment '{}'", experiment_id)))
    }

    /// Fail unless `principal` holds `required` on the experiment
    pub(crate) fn authorize(
        &self,
        principal: &Principal,
        experiment_id: &ExperimentId,
        required: Permission,
    ) -> Result<()> {
        self.policy.read().check(principal, experiment_id, required)
    }
}

fn durability_label(mode: DurabilityMode) -> &'static str {
    match mode {
        DurabilityMode::InMemory => "in_memory",
        DurabilityMode::Buffered { .. } => "buffered",
        DurabilityMode::Strict => "strict",
    }
}

/// Builder for [`Database`]
///
/// Settings given here override `<db>/tracebase.toml`.
///
/// ```ignore
/// let db = Database::builder()
///     .path("./traces")
///     .strict()
///     .default_permission(Permission::Read)
///     .open()?;
/// ```
#[derive(Debug, Default, Clone)]
pub struct DatabaseBuilder {
    path: Option<PathBuf>,
    durability: Option<DurabilityMode>,
    default_permission: Option<Permission>,
    max_search_results: Option<usize>,
    max_corrupt_wal_records: Option<usize>,
    access_mode: AccessMode,
}

impl DatabaseBuilder {
    /// Builder with every setting taken from the config file or defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Database directory; without one the database is ephemeral
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// No WAL; files other than config are not created
    pub fn in_memory(mut self) -> Self {
        self.durability = Some(DurabilityMode::InMemory);
        self
    }

    /// fsync every 64 WAL records and on flush
    pub fn buffered(self) -> Self {
        self.buffered_with(DatabaseConfig::default().buffered_flush_writes)
    }

    /// fsync every `max_pending` WAL records and on flush
    pub fn buffered_with(mut self, max_pending: usize) -> Self {
        self.durability = Some(DurabilityMode::Buffered {
            max_pending: max_pending.max(1),
        });
        self
    }

    /// fsync every WAL record
    pub fn strict(mut self) -> Self {
        self.durability = Some(DurabilityMode::Strict);
        self
    }

    /// Permission of principals without an explicit grant
    pub fn default_permission(mut self, permission: Permission) -> Self {
        self.default_permission = Some(permission);
        self
    }

    /// Upper bound for trace search page sizes
    pub fn max_search_results(mut self, max: usize) -> Self {
        self.max_search_results = Some(max.max(1));
        self
    }

    /// Corrupt WAL records tolerated on open
    pub fn max_corrupt_wal_records(mut self, max: usize) -> Self {
        self.max_corrupt_wal_records = Some(max);
        self
    }

    /// Open read-only; every mutation fails with `PermissionDenied`
    pub fn read_only(mut self) -> Self {
        self.access_mode = AccessMode::ReadOnly;
        self
    }

    /// Set the access mode explicitly
    pub fn access_mode(mut self, mode: AccessMode) -> Self {
        self.access_mode = mode;
        self
    }

    fn resolve_config(&self, base: DatabaseConfig) -> DatabaseConfig {
        let mut config = base;
        if let Some(mode) = self.durability {
            match mode {
                DurabilityMode::InMemory => {
                    config.durability = DurabilitySetting::InMemory
                }
                DurabilityMode::Buffered { max_pending } => {
                    config.durability = DurabilitySetting::Buffered;
                    config.buffered_flush_writes = max_pending;
                }
                DurabilityMode::Strict => {
                    config.durability = DurabilitySetting::Strict
                }
            }
        }
        if let Some(permission) = self.default_permission {
            config.default_permission = permission;
        }
        if let Some(max) = self.max_search_results {
            config.max_search_results = max;
        }
        if let Some(max) = self.max_corrupt_wal_records {
            config.max_corrupt_wal_records = max;
        }
        config
    }

    /// Open the database
    ///
    /// With a path the directory is created when missing and its config
    /// file, if any, is loaded. Without a path the database is ephemeral.
    /// A read-only open never creates, truncates or appends to any file, and
    /// fails with `NotFound` when the directory does not exist.
    pub fn open(self) -> Result<Database> {
        let options = OpenOptions::new().access_mode(self.access_mode);
        match &self.path {
            Some(path) => {
                if self.access_mode == AccessMode::ReadOnly {
                    if !path.is_dir() {
                        return Err(Error::not_found(format!(
                            "database directory '{}'",
                            path.display()
                        )));
                    }
                } else {
                    std::fs::create_dir_all(path)?;
                }
                let config = self.resolve_config(DatabaseConfig::load_from_dir(path)?);
                Database::open_with(Some(path.clone()), config, options)
            }
            None => {
                let config = self.resolve_config(DatabaseConfig::default());
                Database::open_with(None, config, options)
            }
        }
    }

    /// Open in a fresh directory under the system temp dir
    pub fn open_temp(mut self) -> Result<Database> {
        let dir = std::env::temp_dir().join(format!("tracebase-{}", uuid::Uuid::new_v4()));
        self.path = Some(dir);
        self.open()
    }
}
