// src/invoker.rs
//! One HTTP call per source descriptor, with failures absorbed locally.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use metrics::{counter, histogram};
use serde_json::Value;

use crate::clock::Clock;
use crate::error::SourceError;
use crate::rotation::fingerprint;
use crate::sources::{JobRecord, SourceDescriptor, SourceRequest};

pub const API_KEY_HEADER: &str = "x-rapidapi-key";
pub const API_HOST_HEADER: &str = "x-rapidapi-host";

/// Outcome of calling one source for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationResult {
    pub source: String,
    pub outcome: Result<Vec<JobRecord>, SourceError>,
}

impl InvocationResult {
    pub fn error(&self) -> Option<String> {
        self.outcome.as_ref().err().map(|e| e.to_string())
    }

    pub fn record_count(&self) -> usize {
        self.outcome.as_ref().map(Vec::len).unwrap_or(0)
    }

    /// Records on success, empty on failure.
    pub fn into_records(self) -> Vec<JobRecord> {
        self.outcome.unwrap_or_default()
    }
}

#[async_trait]
pub trait SourceInvoker: Send + Sync {
    /// Never fails: transport and decode errors come back inside the result.
    async fn invoke(&self, source: &SourceDescriptor, credential: &str) -> InvocationResult;
}

/// reqwest-backed invoker used in production.
pub struct HttpInvoker {
    client: reqwest::Client,
    clock: Arc<dyn Clock>,
}

impl HttpInvoker {
    pub fn new(clock: Arc<dyn Clock>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("job-aggregator/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5));
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().context("building http client")?;
        Ok(Self { client, clock })
    }

    async fn fetch(&self, source: &SourceDescriptor, credential: &str) -> Result<Value, SourceError> {
        let host = host_header(&source.endpoint)?;
        let req = match &source.request {
            SourceRequest::Get { params } => self.client.get(&source.endpoint).query(params),
            SourceRequest::Post { body } => self
                .client
                .post(&source.endpoint)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .json(body),
        };

        let resp = req
            .header(API_KEY_HEADER, credential)
            .header(API_HOST_HEADER, host)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
            });
        }

        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| SourceError::Body(e.to_string()))
    }
}

#[async_trait]
impl SourceInvoker for HttpInvoker {
    async fn invoke(&self, source: &SourceDescriptor, credential: &str) -> InvocationResult {
        let t0 = Instant::now();
        let outcome = self
            .fetch(source, credential)
            .await
            .map(|body| process_body(source, body, self.clock.today()));

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("source_fetch_ms", "source" => source.name.clone()).record(ms);

        match &outcome {
            Ok(records) => {
                counter!("source_records_total", "source" => source.name.clone())
                    .increment(records.len() as u64);
                tracing::debug!(
                    source = %source.name,
                    records = records.len(),
                    elapsed_ms = ms as u64,
                    "source fetched"
                );
            }
            Err(e) => {
                counter!("source_errors_total", "source" => source.name.clone()).increment(1);
                tracing::warn!(
                    source = %source.name,
                    key = %fingerprint(credential),
                    error = %e,
                    "source call failed"
                );
            }
        }

        InvocationResult {
            source: source.name.clone(),
            outcome,
        }
    }
}

/// `https://jsearch.p.rapidapi.com/search` → `jsearch.p.rapidapi.com`
/// (the port is kept when the URL carries one).
pub fn host_header(endpoint: &str) -> Result<String, SourceError> {
    let url = reqwest::Url::parse(endpoint)
        .map_err(|e| SourceError::Transport(format!("invalid endpoint '{endpoint}': {e}")))?;
    let host = url
        .host_str()
        .ok_or_else(|| SourceError::Transport(format!("endpoint '{endpoint}' has no host")))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Envelope extraction, optional filter, then normalization.
pub fn process_body(source: &SourceDescriptor, body: Value, today: NaiveDate) -> Vec<JobRecord> {
    let mut raw = (source.extract)(body);
    if let Some(filter) = source.filter {
        let before = raw.len();
        raw = filter(raw, today);
        tracing::debug!(
            source = %source.name,
            before,
            after = raw.len(),
            %today,
            "source filter applied"
        );
    }
    raw.iter()
        .map(|item| {
            let mut rec = (source.normalize)(item);
            if rec.source.is_empty() {
                rec.source = "Unknown".to_string();
            }
            rec
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{data_envelope, filters, text, FilterFn};
    use serde_json::json;

    fn anonymous(job: &Value) -> JobRecord {
        JobRecord {
            id: text(job, "id"),
            ..Default::default()
        }
    }

    fn descriptor(filter: bool) -> SourceDescriptor {
        SourceDescriptor {
            name: "Test".into(),
            endpoint: "http://127.0.0.1:9/jobs".into(),
            request: SourceRequest::Get { params: vec![] },
            extract: data_envelope,
            normalize: anonymous,
            filter: if filter {
                Some(filters::posted_today_or_yesterday as FilterFn)
            } else {
                None
            },
        }
    }

    #[test]
    fn host_header_keeps_explicit_port() {
        assert_eq!(
            host_header("https://jsearch.p.rapidapi.com/search").unwrap(),
            "jsearch.p.rapidapi.com"
        );
        assert_eq!(host_header("http://127.0.0.1:8080/x").unwrap(), "127.0.0.1:8080");
        assert!(host_header("not a url").is_err());
    }

    #[test]
    fn missing_source_falls_back_to_unknown() {
        let body = json!({ "data": [{ "id": "1" }] });
        let today = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let out = process_body(&descriptor(false), body, today);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source, "Unknown");
    }

    #[test]
    fn filter_runs_before_normalization() {
        let body = json!([
            { "id": "a", "posted_date": "2024-01-02T10:00:00Z" },
            { "id": "b", "posted_date": "2023-06-01T10:00:00Z" }
        ]);
        let today = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let out = process_body(&descriptor(true), body, today);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "a");
    }

    #[test]
    fn failed_result_yields_no_records() {
        let r = InvocationResult {
            source: "Test".into(),
            outcome: Err(SourceError::Status { status: 503 }),
        };
        assert_eq!(r.error().as_deref(), Some("upstream returned HTTP 503"));
        assert_eq!(r.record_count(), 0);
        assert!(r.into_records().is_empty());
    }
}
