// src/sources/mod.rs
//! Source descriptors: how to call one upstream listing API and how to turn
//! its response into `JobRecord`s.

pub mod catalog;
pub mod filters;

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use catalog::{build_registry, catalog, DEFAULT_SOURCES};

/// Common record shape every source is normalized into.
///
/// Empty string means "not provided". `source` is always populated by the
/// invoker, falling back to `"Unknown"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub title: String,
    pub organization: String,
    pub location: String,
    pub url: String,
    pub description: String,
    pub date_posted: String,
    pub employment_type: String,
    pub salary: String,
    pub category: String,
    pub remote_onsite: String,
    pub contact_email: String,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Request shape of a source; parameters are fixed when the descriptor is built.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceRequest {
    Get { params: Vec<(String, String)> },
    Post { body: Value },
}

/// Pulls the raw job list out of a response envelope.
pub type ExtractFn = fn(Value) -> Vec<Value>;
/// Maps one raw upstream record into the common shape.
pub type NormalizeFn = fn(&Value) -> JobRecord;
/// Drops raw records before normalization; receives today's date.
pub type FilterFn = fn(Vec<Value>, NaiveDate) -> Vec<Value>;

#[derive(Clone)]
pub struct SourceDescriptor {
    pub name: String,
    pub endpoint: String,
    pub request: SourceRequest,
    pub extract: ExtractFn,
    pub normalize: NormalizeFn,
    pub filter: Option<FilterFn>,
}

impl SourceDescriptor {
    pub fn method(&self) -> HttpMethod {
        match self.request {
            SourceRequest::Get { .. } => HttpMethod::Get,
            SourceRequest::Post { .. } => HttpMethod::Post,
        }
    }
}

impl fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDescriptor")
            .field("name", &self.name)
            .field("method", &self.method())
            .field("endpoint", &self.endpoint)
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

/// Generic envelope: `data` field, else the whole body, else nothing.
pub fn data_envelope(body: Value) -> Vec<Value> {
    let list = match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(v) if !v.is_null() => v,
            _ => Value::Object(map),
        },
        other => other,
    };
    into_list(list)
}

/// Legacy envelope with the list under `jobs`; falls back to [`data_envelope`].
pub fn jobs_envelope(body: Value) -> Vec<Value> {
    match body {
        Value::Object(mut map) => match map.remove("jobs") {
            Some(v) if !v.is_null() => into_list(v),
            _ => data_envelope(Value::Object(map)),
        },
        other => data_envelope(other),
    }
}

fn into_list(v: Value) -> Vec<Value> {
    match v {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

/// Lenient field read: strings as-is, scalars rendered, string arrays joined
/// with ", ", anything else empty.
pub fn text(raw: &Value, key: &str) -> String {
    render(raw.get(key))
}

/// Like [`text`] but substitutes `fallback` when the field is empty.
pub fn text_or(raw: &Value, key: &str, fallback: &str) -> String {
    let s = text(raw, key);
    if s.is_empty() {
        fallback.to_string()
    } else {
        s
    }
}

fn render(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|it| render(Some(it)))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    }
}
