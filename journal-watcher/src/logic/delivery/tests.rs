use super::*;
use crate::logic::journal::JournalEntry;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Stub {
    calls: AtomicUsize,
    bodies: Mutex<Vec<Value>>,
}

impl Stub {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

async fn score(State(stub): State<Arc<Stub>>, Json(body): Json<Value>) -> Json<Value> {
    stub.calls.fetch_add(1, Ordering::SeqCst);
    let fraude = body["localisation"] == "NG";
    stub.bodies.lock().unwrap().push(body);
    Json(json!({ "fraude": fraude }))
}

async fn reject(State(stub): State<Arc<Stub>>) -> (StatusCode, Json<Value>) {
    stub.calls.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "Missing or null columns: localisation" })),
    )
}

async fn fail(State(stub): State<Arc<Stub>>) -> (StatusCode, Json<Value>) {
    stub.calls.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "classifier failure: boom" })),
    )
}

async fn unavailable(State(stub): State<Arc<Stub>>) -> StatusCode {
    stub.calls.fetch_add(1, Ordering::SeqCst);
    StatusCode::SERVICE_UNAVAILABLE
}

async fn stall(State(stub): State<Arc<Stub>>) -> Json<Value> {
    stub.calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(500)).await;
    Json(json!({ "fraude": false }))
}

async fn garbage() -> &'static str {
    "ok"
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "version": "0.1.0", "timestamp": 1 }))
}

/// Serve `predict` at /predict on an ephemeral port
async fn spawn_stub<H, T>(predict: H) -> (String, Arc<Stub>)
where
    H: axum::handler::Handler<T, Arc<Stub>>,
    T: 'static,
{
    let stub = Arc::new(Stub::default());
    let app = Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), stub)
}

fn client(url: &str, max_retries: u32) -> DeliveryClient {
    DeliveryClient::new(DeliveryConfig {
        scoring_url: url.to_string(),
        timeout: Duration::from_millis(200),
        max_retries,
        retry_base_delay: Duration::from_millis(1),
        retry_max_delay: Duration::from_millis(5),
    })
    .unwrap()
}

fn record(location: &str) -> crate::logic::journal::FeatureRecord {
    let mut record = JournalEntry::sample(1).to_features().unwrap();
    record.location = location.to_string();
    record
}

#[tokio::test]
async fn test_send_returns_verdict_and_posts_all_columns() {
    let (url, stub) = spawn_stub(score).await;
    let client = client(&url, 2);

    assert_eq!(client.send(&record("FR")).await.unwrap(), Verdict { is_fraud: false });
    assert_eq!(client.send(&record("NG")).await.unwrap(), Verdict { is_fraud: true });
    assert_eq!(stub.calls(), 2);

    let bodies = stub.bodies.lock().unwrap();
    let first = bodies[0].as_object().unwrap();
    assert_eq!(first.len(), 10);
    assert_eq!(first["anciennete_jours"], 400);
    assert_eq!(first["minutes_depuis_chg_mdp"], 9999);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let (url, stub) = spawn_stub(reject).await;
    let client = client(&url, 3);

    let err = client.send(&record("FR")).await.unwrap_err();
    assert_eq!(
        err,
        DeliveryError::Rejected {
            status: 400,
            message: "Missing or null columns: localisation".to_string(),
        }
    );
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn test_classifier_failure_is_not_retried() {
    let (url, stub) = spawn_stub(fail).await;
    let client = client(&url, 2);

    let err = client.send(&record("FR")).await.unwrap_err();
    assert!(matches!(err, DeliveryError::Rejected { status: 500, .. }));
    assert!(err.to_string().contains("classifier failure"));
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn test_unavailable_endpoint_is_retried_then_reported() {
    let (url, stub) = spawn_stub(unavailable).await;
    let client = client(&url, 2);

    let err = client.send(&record("FR")).await.unwrap_err();
    assert!(matches!(err, DeliveryError::Rejected { status: 503, .. }));
    assert_eq!(stub.calls(), 3);
}

#[tokio::test]
async fn test_zero_retries_means_single_attempt() {
    let (url, stub) = spawn_stub(unavailable).await;
    let client = client(&url, 0);

    assert!(client.send(&record("FR")).await.is_err());
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn test_hung_endpoint_times_out() {
    let (url, _stub) = spawn_stub(stall).await;
    let client = client(&url, 0);

    let err = client.send(&record("FR")).await.unwrap_err();
    assert!(matches!(err, DeliveryError::NetworkError(_)));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(&format!("http://{}", addr), 1);
    let err = client.send(&record("FR")).await.unwrap_err();
    assert!(matches!(err, DeliveryError::NetworkError(_)));
}

#[tokio::test]
async fn test_unexpected_success_body_is_parse_error() {
    let (url, _stub) = spawn_stub(garbage).await;
    let client = client(&url, 0);

    let err = client.send(&record("FR")).await.unwrap_err();
    assert!(matches!(err, DeliveryError::ParseError(_)));
}

#[tokio::test]
async fn test_health_check() {
    let (url, _stub) = spawn_stub(score).await;
    let client = client(&format!("{}/", url), 0);

    let health = client.health_check().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.version, "0.1.0");
}

#[tokio::test]
async fn test_truncated_error_body_keeps_read_failure() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // Promises 100 bytes of body, sends 7, then hangs up
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        // Drain the whole request (its JSON body ends with '}') so closing
        // does not reset the connection
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        while !request.ends_with(b"}") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let _ = socket
            .write_all(b"HTTP/1.1 400 Bad Request\r\ncontent-length: 100\r\n\r\npartial")
            .await;
    });

    let client = client(&format!("http://{}", addr), 0);
    match client.send(&record("FR")).await.unwrap_err() {
        DeliveryError::Rejected { status, message } => {
            assert_eq!(status, 400);
            assert!(message.starts_with("unreadable response body"), "{}", message);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
