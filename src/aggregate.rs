// src/aggregate.rs
//! Concurrent fan-out over the source registry and ordered merge.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::error::AggregatorError;
use crate::invoker::{InvocationResult, SourceInvoker};
use crate::rotation::{fingerprint, CredentialPool, KeyPolicy};
use crate::sources::{JobRecord, SourceDescriptor};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "aggregate_requests_total",
            "Aggregation runs started, including failed ones."
        );
        describe_counter!(
            "source_records_total",
            "Records contributed per source after filtering."
        );
        describe_counter!("source_errors_total", "Failed upstream calls per source.");
        describe_histogram!("source_fetch_ms", "Upstream call time in milliseconds.");
        describe_histogram!(
            "aggregate_duration_ms",
            "End-to-end aggregation time in milliseconds."
        );
    });
}

/// What one source contributed to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub name: String,
    pub records: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AggregateOutcome {
    /// Merged records, registry order then upstream order.
    pub records: Vec<JobRecord>,
    /// Credential(s) that served the request, for the audit sheet.
    pub credential: String,
    pub sources: Vec<SourceSummary>,
}

pub struct Aggregator {
    registry: Vec<SourceDescriptor>,
    pool: Arc<CredentialPool>,
    invoker: Arc<dyn SourceInvoker>,
    policy: KeyPolicy,
}

impl Aggregator {
    pub fn new(
        registry: Vec<SourceDescriptor>,
        pool: Arc<CredentialPool>,
        invoker: Arc<dyn SourceInvoker>,
        policy: KeyPolicy,
    ) -> Self {
        Self {
            registry,
            pool,
            invoker,
            policy,
        }
    }

    pub fn registry(&self) -> &[SourceDescriptor] {
        &self.registry
    }

    /// Call every source concurrently and concatenate their records.
    ///
    /// Only an empty credential pool fails the call; per-source failures
    /// contribute zero records.
    pub async fn aggregate(&self) -> Result<AggregateOutcome, AggregatorError> {
        ensure_metrics_described();
        counter!("aggregate_requests_total").increment(1);
        let t0 = Instant::now();

        let (keys, credential) = self.draw_keys()?;
        let key_tags: Vec<String> = keys.iter().map(|k| fingerprint(k)).collect();

        let calls = self
            .registry
            .iter()
            .zip(keys.iter())
            .map(|(source, key)| self.invoker.invoke(source, key));
        let results: Vec<InvocationResult> = join_all(calls).await;

        let outcome = merge(results, credential);

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("aggregate_duration_ms").record(ms);
        tracing::info!(
            sources = self.registry.len(),
            failed = outcome.sources.iter().filter(|s| s.error.is_some()).count(),
            records = outcome.records.len(),
            keys = ?key_tags,
            elapsed_ms = ms as u64,
            "aggregation finished"
        );
        Ok(outcome)
    }

    /// One key per source slot, drawn before dispatch, plus the audit label.
    fn draw_keys(&self) -> Result<(Vec<String>, String), AggregatorError> {
        match self.policy {
            KeyPolicy::PerRequest => {
                let key = self.pool.next_key()?;
                Ok((vec![key.clone(); self.registry.len()], key))
            }
            KeyPolicy::PerSource => {
                if self.pool.is_empty() {
                    return Err(AggregatorError::Configuration(
                        "credential pool is empty".to_string(),
                    ));
                }
                let keys = self
                    .registry
                    .iter()
                    .map(|_| self.pool.next_key())
                    .collect::<Result<Vec<_>, _>>()?;
                let label = audit_credential(&keys);
                Ok((keys, label))
            }
        }
    }
}

/// Concatenate results in the order given; failed sources add nothing.
pub fn merge(results: Vec<InvocationResult>, credential: String) -> AggregateOutcome {
    let mut records = Vec::new();
    let mut sources = Vec::with_capacity(results.len());
    for r in results {
        sources.push(SourceSummary {
            name: r.source.clone(),
            records: r.record_count(),
            error: r.error(),
        });
        records.extend(r.into_records());
    }
    AggregateOutcome {
        records,
        credential,
        sources,
    }
}

/// Distinct keys in first-use order, comma-separated.
fn audit_credential(keys: &[String]) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for k in keys {
        if !seen.contains(&k.as_str()) {
            seen.push(k);
        }
    }
    seen.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_credential_dedups_in_order() {
        let keys = vec!["b".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(audit_credential(&keys), "b, a");
        assert_eq!(audit_credential(&[]), "");
    }
}
