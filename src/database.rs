//! Main database entry point for Tracebase.

use crate::primitives::{Experiments, Traces};
use crate::{DatabaseInfo, DurabilityMode, Permission, Principal, Result};
use std::path::Path;
use std::sync::Arc;
use tracebase_api::SubstrateImpl;

/// The Tracebase database.
///
/// Create one with [`Tracebase::open`], [`Tracebase::ephemeral`] or
/// [`Tracebase::builder`]. Handles are cheap to clone and share one engine.
///
/// ```ignore
/// let db = Tracebase::open("./traces")?;
/// let alice = db.as_user("alice");
/// alice.traces.delete_ids(&exp, ["tr-1", "tr-2"])?;
/// ```
#[derive(Clone)]
pub struct Tracebase {
    inner: Arc<tracebase_engine::Database>,
    principal: Principal,

    /// Experiment lifecycle and permissions
    pub experiments: Experiments,

    /// Trace logging, search and deletion
    pub traces: Traces,
}

impl Tracebase {
    /// Open a database at the given path.
    ///
    /// Uses buffered durability unless `<path>/tracebase.toml` says otherwise.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::builder().path(path).open()
    }

    /// Create an ephemeral database with no disk I/O.
    ///
    /// Nothing survives the handle being dropped.
    ///
    /// | Method | Disk Files | Recovery |
    /// |--------|------------|----------|
    /// | `Tracebase::ephemeral()` | None | No |
    /// | `builder().open_temp()` | Temp dir | Yes |
    /// | `Tracebase::open(path)` | User dir | Yes |
    pub fn ephemeral() -> Result<Self> {
        let db = Arc::new(tracebase_engine::Database::ephemeral()?);
        Ok(Self::from_engine(db, Principal::system()))
    }

    /// Create a builder for database configuration.
    pub fn builder() -> TracebaseBuilder {
        TracebaseBuilder::new()
    }

    /// A handle over the same database acting as `user`.
    pub fn as_user(&self, user: impl Into<String>) -> Self {
        Self::from_engine(Arc::clone(&self.inner), Principal::new(user))
    }

    /// Principal this handle acts as.
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Force buffered WAL records to disk.
    pub fn flush(&self) -> Result<()> {
        self.inner.flush()
    }

    /// Wait for in-flight writes and flush.
    pub fn close(&self) -> Result<()> {
        self.inner.shutdown()
    }

    /// Database directory, `None` when ephemeral.
    pub fn path(&self) -> Option<&Path> {
        self.inner.data_dir()
    }

    /// Current durability mode.
    pub fn durability_mode(&self) -> DurabilityMode {
        self.inner.durability_mode()
    }

    /// Check if this is an ephemeral (no-disk) database.
    pub fn is_ephemeral(&self) -> bool {
        self.inner.is_ephemeral()
    }

    /// Counters and settings.
    pub fn info(&self) -> DatabaseInfo {
        self.inner.info()
    }

    /// The engine under this handle.
    pub fn engine(&self) -> &Arc<tracebase_engine::Database> {
        &self.inner
    }

    fn from_engine(db: Arc<tracebase_engine::Database>, principal: Principal) -> Self {
        let substrate = SubstrateImpl::new(Arc::clone(&db)).as_principal(principal.clone());
        Self {
            experiments: Experiments::new(substrate.clone()),
            traces: Traces::new(substrate),
            inner: db,
            principal,
        }
    }
}

impl std::fmt::Debug for Tracebase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracebase")
            .field("path", &self.inner.data_dir())
            .field("principal", &self.principal)
            .finish()
    }
}

/// Builder for database configuration.
///
/// ```ignore
/// // Production: disk-backed, fsync on every commit
/// let db = Tracebase::builder().path("./traces").strict().open()?;
///
/// // Tests: temp directory with a WAL, so reopen can be exercised
/// let db = Tracebase::builder().open_temp()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct TracebaseBuilder {
    inner: tracebase_engine::DatabaseBuilder,
}

impl TracebaseBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the database directory path.
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.inner = self.inner.path(path);
        self
    }

    /// Keep everything in memory; no WAL is written.
    pub fn in_memory(mut self) -> Self {
        self.inner = self.inner.in_memory();
        self
    }

    /// Buffered WAL (default).
    pub fn buffered(mut self) -> Self {
        self.inner = self.inner.buffered();
        self
    }

    /// Buffered WAL, fsync after `max_pending` records.
    pub fn buffered_with(mut self, max_pending: usize) -> Self {
        self.inner = self.inner.buffered_with(max_pending);
        self
    }

    /// Fsync every commit before it is acknowledged.
    pub fn strict(mut self) -> Self {
        self.inner = self.inner.strict();
        self
    }

    /// Permission of users without an explicit grant.
    pub fn default_permission(mut self, permission: Permission) -> Self {
        self.inner = self.inner.default_permission(permission);
        self
    }

    /// Refuse every write.
    pub fn read_only(mut self) -> Self {
        self.inner = self.inner.read_only();
        self
    }

    /// Open the database.
    pub fn open(self) -> Result<Tracebase> {
        let db = Arc::new(self.inner.open()?);
        Ok(Tracebase::from_engine(db, Principal::system()))
    }

    /// Open in a fresh temporary directory.
    pub fn open_temp(self) -> Result<Tracebase> {
        let db = Arc::new(self.inner.open_temp()?);
        Ok(Tracebase::from_engine(db, Principal::system()))
    }
}
