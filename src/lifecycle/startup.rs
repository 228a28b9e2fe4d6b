//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration and build the first state snapshot
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener starts last, once the snapshot exists

use std::net::SocketAddr;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::validation::validate_config;
use crate::config::{ConfigError, RelayConfig};
use crate::error::BuildError;
use crate::lifecycle::Shutdown;
use crate::net::listener::{Listener, ListenerError};
use crate::state::{shared, RelayState, SharedState};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// A relay that is accepting connections.
pub struct Running {
    pub state: SharedState,
    pub local_addr: SocketAddr,
    pub accept_loop: JoinHandle<()>,
}

/// Bring the relay up on `config.listen_address`.
///
/// The accept loop stops when `shutdown` is triggered.
pub async fn start(config: RelayConfig, shutdown: &Shutdown) -> Result<Running, StartupError> {
    validate_config(&config).map_err(ConfigError::Validation)?;

    let listen_address = config.listen_address.clone();
    let state = shared(RelayState::new(config)?);

    let listener = Listener::bind(&listen_address, state.clone()).await?;
    let local_addr = listener
        .local_addr()
        .map_err(ListenerError::LocalAddr)?;

    let accept_loop = tokio::spawn(listener.run(shutdown.subscribe()));

    Ok(Running {
        state,
        local_addr,
        accept_loop,
    })
}
