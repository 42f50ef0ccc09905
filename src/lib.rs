// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod export;
pub mod invoker;
pub mod metrics;
pub mod rotation;
pub mod sources;

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

pub use crate::aggregate::{AggregateOutcome, Aggregator};
pub use crate::api::{router, AppState};
pub use crate::error::{AggregatorError, SourceError};
pub use crate::sources::JobRecord;

use crate::clock::Clock;
use crate::config::AggregatorConfig;
use crate::invoker::HttpInvoker;
use crate::rotation::{fingerprint, CredentialPool};

/// Wire registry, credential pool and HTTP invoker from a loaded config.
///
/// An empty pool is allowed here; requests then fail with a configuration
/// error instead of the process refusing to start.
pub fn build_state(cfg: &AggregatorConfig, clock: Arc<dyn Clock>) -> Result<AppState> {
    let registry = sources::build_registry(&cfg.sources, clock.as_ref())?;
    let pool = Arc::new(CredentialPool::new(cfg.api_keys.clone()));
    if pool.is_empty() {
        warn!("no API keys configured; /combined-jobs will fail until KEY1.. or RAPIDAPI_KEYS is set");
    }
    let names: Vec<&str> = registry.iter().map(|d| d.name.as_str()).collect();
    let key_tags: Vec<String> = cfg.api_keys.iter().map(|k| fingerprint(k)).collect();
    info!(
        sources = ?names,
        keys = ?key_tags,
        policy = ?cfg.key_policy,
        "aggregator configured"
    );

    let invoker = Arc::new(HttpInvoker::new(clock.clone(), cfg.request_timeout())?);
    let aggregator = Aggregator::new(registry, pool, invoker, cfg.key_policy);
    Ok(AppState {
        aggregator: Arc::new(aggregator),
        clock,
    })
}
