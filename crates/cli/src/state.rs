//! Session state: where commands go and who they run as.

use std::sync::Arc;

use tokio::runtime::Runtime;
use tracebase_api::SubstrateImpl;
use tracebase_core::{Error, Result};
use tracebase_engine::Database;
use tracebase_executor::{Command, Executor, Output};
use tracebase_security::Principal;
use tracebase_server::Client;

enum Backend {
    Local {
        executor: Executor,
    },
    Remote {
        runtime: Runtime,
        client: Client,
        address: String,
    },
}

/// Connection plus the current principal.
pub struct SessionState {
    backend: Backend,
    user: Option<String>,
}

impl SessionState {
    /// Run commands in-process against `db`.
    pub fn local(db: Arc<Database>, user: Option<String>) -> Self {
        Self {
            backend: Backend::Local {
                executor: Executor::new(SubstrateImpl::new(db)),
            },
            user,
        }
    }

    /// Run commands on the server at `address`.
    pub fn remote(address: &str, user: Option<String>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let client = runtime
            .block_on(Client::connect(address))
            .map_err(Error::from)?;
        Ok(Self {
            backend: Backend::Remote {
                runtime,
                client,
                address: address.to_string(),
            },
            user,
        })
    }

    /// Execute one command as the current user.
    pub fn execute(&mut self, cmd: Command) -> Result<Output> {
        match &mut self.backend {
            Backend::Local { executor } => {
                // A local shell owns the directory; no --user means full access.
                let principal = self
                    .user
                    .as_deref()
                    .map(Principal::new)
                    .unwrap_or_else(Principal::system);
                executor.execute_as(principal, cmd).map_err(Error::from)
            }
            Backend::Remote {
                runtime, client, ..
            } => {
                let request_as = self.user.clone();
                runtime
                    .block_on(async {
                        match request_as {
                            Some(user) => client.execute_as(user, cmd).await,
                            None => client.execute(cmd).await,
                        }
                    })
                    .map_err(Error::from)
            }
        }
    }

    /// Switch principal. `None` restores the default.
    pub fn set_user(&mut self, user: Option<String>) {
        self.user = user;
    }

    /// Prompt text for the REPL.
    pub fn prompt(&self) -> String {
        let target = match &self.backend {
            Backend::Local { executor } => executor
                .substrate()
                .database()
                .data_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "memory".to_string()),
            Backend::Remote { address, .. } => address.clone(),
        };
        match &self.user {
            Some(user) => format!("{}@{}> ", user, target),
            None => format!("{}> ", target),
        }
    }

    /// Database handle, when running in-process.
    pub fn database(&self) -> Option<Arc<Database>> {
        match &self.backend {
            Backend::Local { executor } => Some(Arc::clone(executor.substrate().database())),
            Backend::Remote { .. } => None,
        }
    }
}
