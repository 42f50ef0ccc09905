// tests/common/mod.rs
//
// Shared helpers: in-process fake upstream APIs served on an ephemeral port.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::Value;
use std::collections::HashMap;

use job_aggregator::sources::{data_envelope, filters, text, JobRecord, SourceDescriptor, SourceRequest};

/// What a fake upstream saw.
#[derive(Debug, Clone, Default)]
pub struct Seen {
    pub method: String,
    pub path: String,
    pub api_key: Option<String>,
    pub host: Option<String>,
    pub content_type: Option<String>,
    pub query: HashMap<String, String>,
    pub body: Option<Value>,
}

pub type SeenLog = Arc<Mutex<Vec<Seen>>>;

#[derive(Clone)]
struct Upstream {
    log: SeenLog,
    reply: Arc<dyn Fn(&str) -> (StatusCode, String) + Send + Sync>,
}

fn header(h: &HeaderMap, name: &str) -> Option<String> {
    h.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

async fn on_get(
    State(up): State<Upstream>,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let path = uri.path().to_string();
    up.log.lock().unwrap().push(Seen {
        method: "GET".into(),
        path: path.clone(),
        api_key: header(&headers, "x-rapidapi-key"),
        host: header(&headers, "x-rapidapi-host"),
        content_type: header(&headers, "content-type"),
        query,
        body: None,
    });
    (up.reply)(&path)
}

async fn on_post(
    State(up): State<Upstream>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let path = uri.path().to_string();
    up.log.lock().unwrap().push(Seen {
        method: "POST".into(),
        path: path.clone(),
        api_key: header(&headers, "x-rapidapi-key"),
        host: header(&headers, "x-rapidapi-host"),
        content_type: header(&headers, "content-type"),
        query: HashMap::new(),
        body: Some(body),
    });
    (up.reply)(&path)
}

/// Serve `/{name}` for GET and POST; `reply(path)` picks status and raw body.
pub async fn spawn_upstream<F>(reply: F) -> (SocketAddr, SeenLog)
where
    F: Fn(&str) -> (StatusCode, String) + Send + Sync + 'static,
{
    let log: SeenLog = Arc::new(Mutex::new(Vec::new()));
    let state = Upstream {
        log: log.clone(),
        reply: Arc::new(reply),
    };
    let app = Router::new()
        .route("/{name}", get(on_get).post(on_post))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake upstream");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake upstream");
    });
    (addr, log)
}

pub fn tagged_a(job: &Value) -> JobRecord {
    JobRecord {
        id: text(job, "id"),
        title: text(job, "title"),
        date_posted: text(job, "posted_date"),
        source: "SourceA".into(),
        ..Default::default()
    }
}

pub fn tagged_b(job: &Value) -> JobRecord {
    JobRecord {
        id: text(job, "id"),
        source: "SourceB".into(),
        ..Default::default()
    }
}

/// GET source at `http://{addr}/{path}` with the posted-date filter.
pub fn filtered_source(name: &str, addr: SocketAddr, path: &str) -> SourceDescriptor {
    SourceDescriptor {
        name: name.into(),
        endpoint: format!("http://{addr}/{path}"),
        request: SourceRequest::Get {
            params: vec![("limit".into(), "50".into())],
        },
        extract: data_envelope,
        normalize: tagged_a,
        filter: Some(filters::posted_today_or_yesterday),
    }
}

pub fn plain_source(name: &str, addr: SocketAddr, path: &str) -> SourceDescriptor {
    SourceDescriptor {
        name: name.into(),
        endpoint: format!("http://{addr}/{path}"),
        request: SourceRequest::Get { params: vec![] },
        extract: data_envelope,
        normalize: tagged_b,
        filter: None,
    }
}
