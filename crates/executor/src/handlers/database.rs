//! Database command handlers: ping, info, flush.

use tracebase_api::SubstrateImpl;

use crate::{Output, Result};

/// Handle Ping command.
pub fn ping() -> Result<Output> {
    Ok(Output::Pong {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle Info command.
pub fn info(substrate: &SubstrateImpl) -> Result<Output> {
    Ok(Output::DatabaseInfo(substrate.database().info()))
}

/// Handle Flush command.
pub fn flush(substrate: &SubstrateImpl) -> Result<Output> {
    substrate.database().flush()?;
    Ok(Output::Unit)
}
