//! Runtime snapshot shared by all sessions.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::RelayConfig;
use crate::error::BuildError;
use crate::http::forward::HttpForwarder;
use crate::observability::events;
use crate::routing::RouteTable;

/// Everything a session needs, built once per configuration.
///
/// A snapshot is never mutated; reloading builds a new one.
#[derive(Debug)]
pub struct RelayState {
    pub config: RelayConfig,
    pub routes: RouteTable,
    pub forwarder: HttpForwarder,
}

impl RelayState {
    pub fn new(config: RelayConfig) -> Result<Self, BuildError> {
        let routes = RouteTable::from_config(&config.routes)?;
        let forwarder = HttpForwarder::new(&config.proxy_address)?;
        Ok(Self {
            config,
            routes,
            forwarder,
        })
    }
}

/// The current snapshot, swappable at runtime.
pub type SharedState = Arc<ArcSwap<RelayState>>;

/// Wrap an initial snapshot for sharing.
pub fn shared(state: RelayState) -> SharedState {
    Arc::new(ArcSwap::from_pointee(state))
}

/// Build a snapshot from a reloaded configuration and swap it in.
///
/// New sessions see the new snapshot; running ones keep theirs. On error
/// the current snapshot stays in place.
pub fn apply_reload(state: &SharedState, config: RelayConfig) -> Result<(), BuildError> {
    let current = state.load();
    if current.config.listen_address != config.listen_address {
        tracing::warn!(
            current = %current.config.listen_address,
            requested = %config.listen_address,
            "Listen address changes take effect after a restart"
        );
    }

    let next = RelayState::new(config)?;
    tracing::info!(
        event = events::CONFIG_RELOADED,
        routes = next.routes.len(),
        proxy = %next.config.proxy_address,
        smtp_target = %next.config.smtp_target,
        "Configuration reloaded"
    );
    state.store(Arc::new(next));
    Ok(())
}
