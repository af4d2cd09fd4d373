//! Substrate API
//!
//! The substrate layer exposes every engine operation as a trait method bound
//! to a calling [`Principal`]. Nothing here adds semantics: each method maps to
//! exactly one engine call, and errors pass through untouched.
//!
//! | Trait | Operations |
//! |-------|------------|
//! | [`ExperimentStore`] | create, get, get by name, list, delete, restore, grants |
//! | [`TraceStore`] | log, start, end, get, tags, count, search, delete |

mod experiment;
mod trace;

pub use experiment::ExperimentStore;
pub use trace::TraceStore;

use std::sync::Arc;
use tracebase_engine::Database;
use tracebase_security::Principal;

/// Substrate implementation over an engine [`Database`]
///
/// Cloning is cheap; clones share the database.
#[derive(Clone)]
pub struct SubstrateImpl {
    db: Arc<Database>,
    principal: Principal,
}

impl SubstrateImpl {
    /// Substrate acting as the system principal
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            principal: Principal::system(),
        }
    }

    /// Same database, acting as another principal
    pub fn as_principal(&self, principal: Principal) -> Self {
        Self {
            db: Arc::clone(&self.db),
            principal,
        }
    }

    /// Principal every call is authorized for
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Underlying engine database
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }
}

impl std::fmt::Debug for SubstrateImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubstrateImpl")
            .field("principal", &self.principal)
            .field("path", &self.db.data_dir())
            .finish()
    }
}
