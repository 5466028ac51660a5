use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

use crate::classifier::{self, Classifier, ClassifierError, ModelInfo};
use crate::config::Config;
use crate::models::{Column, FeatureRecord};
use crate::{create_router, AppState};

/// Returns a fixed verdict and counts calls
struct Recording {
    verdict: bool,
    calls: AtomicUsize,
}

impl Recording {
    fn new(verdict: bool) -> Arc<Self> {
        Arc::new(Self { verdict, calls: AtomicUsize::new(0) })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for Recording {
    fn predict(&self, _record: &FeatureRecord) -> Result<bool, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.verdict)
    }
}

/// Fails on one location token, legit otherwise
struct FailsOn(&'static str);

impl Classifier for FailsOn {
    fn predict(&self, record: &FeatureRecord) -> Result<bool, ClassifierError> {
        if record.location == self.0 {
            Err(ClassifierError("feature encoder has no slot for location".to_string()))
        } else {
            Ok(false)
        }
    }
}

fn app_with(classifier: Arc<dyn Classifier>) -> Router {
    create_router(AppState {
        classifier,
        model: ModelInfo {
            kind: "stub",
            fingerprint: "0".repeat(64),
        },
        config: Config::default(),
    })
}

fn sample() -> Value {
    json!({
        "anciennete_jours": 400,
        "montant": 50.0,
        "heure": 14,
        "nouveau_beneficiaire": false,
        "solde_avant": 1000.0,
        "nb_virements_1h": 1,
        "changement_mdp": false,
        "minutes_depuis_chg_mdp": 9999,
        "localisation": "FR",
        "nb_virements_vers_benef": 5
    })
}

async fn post_raw(app: &Router, body: &str, content_type: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method("POST").uri("/predict");
    if let Some(ct) = content_type {
        builder = builder.header("content-type", ct);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_json(app: &Router, body: &Value) -> (StatusCode, Value) {
    post_raw(app, &body.to_string(), Some("application/json")).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_index_serves_welcome_html() {
    let app = app_with(Recording::new(false));
    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<code>/predict</code>"));
}

#[tokio::test]
async fn test_health_reports_model() {
    let app = app_with(Recording::new(false));
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model"]["kind"], "stub");
}

#[tokio::test]
async fn test_complete_record_returns_verdict() {
    let classifier = Recording::new(false);
    let app = app_with(classifier.clone());

    let (status, body) = post_json(&app, &sample()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "fraude": false }));
    assert_eq!(classifier.calls(), 1);
}

#[tokio::test]
async fn test_fraud_verdict_is_returned() {
    let app = app_with(Recording::new(true));
    let (status, body) = post_json(&app, &sample()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fraude"], true);
}

#[tokio::test]
async fn test_each_missing_column_is_rejected_without_scoring() {
    let classifier = Recording::new(true);
    let app = app_with(classifier.clone());

    for column in Column::ALL {
        let mut body = sample();
        body.as_object_mut().unwrap().remove(column.name());

        let (status, body) = post_json(&app, &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "column {}", column);
        assert!(body["error"].as_str().unwrap().contains(column.name()));
    }

    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn test_null_column_is_rejected() {
    let classifier = Recording::new(true);
    let app = app_with(classifier.clone());

    let mut body = sample();
    body["solde_avant"] = Value::Null;

    let (status, _) = post_json(&app, &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn test_wrongly_typed_column_is_rejected() {
    let classifier = Recording::new(true);
    let app = app_with(classifier.clone());

    let mut body = sample();
    body["nouveau_beneficiaire"] = json!("oui");

    let (status, body) = post_json(&app, &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body["error"].as_str().unwrap().is_empty());
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn test_classifier_failure_is_500_and_service_keeps_serving() {
    let app = app_with(Arc::new(FailsOn("XX")));

    let mut bad = sample();
    bad["localisation"] = json!("XX");
    let (status, body) = post_json(&app, &bad).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body["error"].as_str().unwrap().is_empty());

    let (status, body) = post_json(&app, &sample()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fraude"], false);
}

#[tokio::test]
async fn test_malformed_payload_is_500() {
    let app = app_with(Recording::new(false));
    let (status, body) = post_raw(&app, "{\"montant\": ", Some("application/json")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_non_object_payload_is_500() {
    let app = app_with(Recording::new(false));
    let (status, _) = post_raw(&app, "[1, 2, 3]", Some("application/json")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_missing_content_type_is_500() {
    let app = app_with(Recording::new(false));
    let (status, _) = post_raw(&app, &sample().to_string(), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_same_record_scores_identically_with_real_model() {
    let artifact = json!({
        "model_type": "decision_tree",
        "nodes": [
            { "kind": "numeric", "feature": "nb_virements_1h", "threshold": 3.0, "left": 1, "right": 2 },
            { "kind": "leaf", "fraud": false },
            { "kind": "leaf", "fraud": true }
        ]
    });
    let (model, _) = classifier::from_bytes(artifact.to_string().as_bytes()).unwrap();
    let app = app_with(model);

    let mut burst = sample();
    burst["nb_virements_1h"] = json!(8);

    let (_, first) = post_json(&app, &burst).await;
    let (_, second) = post_json(&app, &burst).await;
    assert_eq!(first, second);
    assert_eq!(first["fraude"], true);

    let (_, calm) = post_json(&app, &sample()).await;
    assert_eq!(calm["fraude"], false);
}
