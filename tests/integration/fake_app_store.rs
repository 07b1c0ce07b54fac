use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use receiptkit::IAPConfig;
use serde_json::Value;
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

/// A local stand-in for a verifyReceipt endpoint. Replies are served in
/// order; the last one repeats once the list is exhausted.
#[derive(Clone)]
pub struct FakeAppStore {
    pub url: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<(String, Value)>>>,
}

#[derive(Clone)]
struct FakeState {
    replies: Arc<Vec<(StatusCode, String)>>,
    delay: Duration,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<(String, Value)>>>,
}

impl FakeAppStore {
    pub async fn start(replies: Vec<Value>) -> Self {
        Self::start_raw(
            replies
                .into_iter()
                .map(|reply| (StatusCode::OK, reply.to_string()))
                .collect(),
            Duration::ZERO,
        )
        .await
    }

    pub async fn start_raw(replies: Vec<(StatusCode, String)>, delay: Duration) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = FakeState {
            replies: Arc::new(replies),
            delay,
            hits: Arc::clone(&hits),
            requests: Arc::clone(&requests),
        };

        let app = Router::new()
            .route("/verifyReceipt", post(verify_receipt))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake App Store");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}/verifyReceipt", addr),
            hits,
            requests,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// (content type, JSON body) of every request received so far
    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().unwrap().clone()
    }
}

async fn verify_receipt(
    State(state): State<FakeState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, [(axum::http::HeaderName, &'static str); 1], String) {
    let index = state.hits.fetch_add(1, Ordering::SeqCst);
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.requests.lock().unwrap().push((content_type, body));

    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    let (status, reply) = state.replies[index.min(state.replies.len() - 1)].clone();
    (status, [(CONTENT_TYPE, "application/json")], reply)
}

pub fn test_config(production: &FakeAppStore, sandbox: &FakeAppStore) -> IAPConfig {
    IAPConfig {
        production_url: production.url.clone(),
        sandbox_url: sandbox.url.clone(),
        request_timeout_ms: 5_000,
        ..IAPConfig::new("test-shared-secret")
    }
}

/// Millisecond epoch string `offset_days` away from now.
pub fn ms_from_now(offset_days: i64) -> String {
    let at = time::OffsetDateTime::now_utc() + time::Duration::days(offset_days);
    (at.unix_timestamp_nanos() / 1_000_000).to_string()
}
