//! Scoring API Client
//!
//! HTTP client for the FraudGuard scoring endpoint.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{
    default_on_request_failure, policies::ExponentialBackoff, Retryable, RetryableStrategy,
    RetryTransientMiddleware,
};
use serde::Deserialize;
use std::time::Duration;

use crate::logic::journal::FeatureRecord;

/// Scoring endpoint configuration
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    pub scoring_url: String,
    pub timeout: Duration,
    /// Retries after the first attempt; 0 disables retrying
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            scoring_url: "http://localhost:5050".to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(250),
            retry_max_delay: Duration::from_secs(2),
        }
    }
}

/// Fraud verdict for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Verdict {
    #[serde(rename = "fraude")]
    pub is_fraud: bool,
}

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Anything that turns a feature record into a verdict
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, record: &FeatureRecord) -> Result<Verdict, DeliveryError>;
}

/// Retries only what a later attempt can change: connect failures,
/// timeouts, gateway errors, 408 and 429. A 500 from the endpoint is a
/// classifier or payload failure and repeats on every attempt.
pub struct ScoringRetryStrategy;

impl RetryableStrategy for ScoringRetryStrategy {
    fn handle(&self, res: &Result<reqwest::Response, reqwest_middleware::Error>) -> Option<Retryable> {
        match res {
            Ok(response) => match response.status() {
                status if status.is_success() => None,
                StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
                | StatusCode::REQUEST_TIMEOUT
                | StatusCode::TOO_MANY_REQUESTS => Some(Retryable::Transient),
                _ => Some(Retryable::Fatal),
            },
            Err(error) => default_on_request_failure(error),
        }
    }
}

/// Scoring API client
pub struct DeliveryClient {
    config: DeliveryConfig,
    http_client: ClientWithMiddleware,
}

impl DeliveryClient {
    pub fn new(config: DeliveryConfig) -> Result<Self, DeliveryError> {
        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(
                config.retry_base_delay,
                config.retry_max_delay.max(config.retry_base_delay),
            )
            .build_with_max_retries(config.max_retries);

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DeliveryError::ClientError(e.to_string()))?;

        let http_client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy_and_strategy(
                retry_policy,
                ScoringRetryStrategy,
            ))
            .build();

        Ok(Self {
            config,
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.scoring_url.trim_end_matches('/'), path)
    }

    /// Check scoring endpoint health
    pub async fn health_check(&self) -> Result<HealthResponse, DeliveryError> {
        let response = self.http_client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|e| DeliveryError::NetworkError(e.to_string()))?;

        if response.status().is_success() {
            response.json().await
                .map_err(|e| DeliveryError::ParseError(e.to_string()))
        } else {
            Err(DeliveryError::Rejected {
                status: response.status().as_u16(),
                message: String::new(),
            })
        }
    }

    /// Send one record for scoring
    pub async fn send(&self, record: &FeatureRecord) -> Result<Verdict, DeliveryError> {
        let response = self.http_client
            .post(self.url("/predict"))
            .json(record)
            .send()
            .await
            .map_err(|e| DeliveryError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response.json().await
                .map_err(|e| DeliveryError::ParseError(e.to_string()));
        }

        let message = match response.text().await {
            Ok(body) => serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body),
            Err(e) => format!("unreadable response body: {}", e),
        };

        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl Scorer for DeliveryClient {
    async fn score(&self, record: &FeatureRecord) -> Result<Verdict, DeliveryError> {
        self.send(record).await
    }
}

/// Delivery errors
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryError {
    /// Connect failure or timeout, after retries
    NetworkError(String),
    /// Non-2xx answer from the endpoint
    Rejected { status: u16, message: String },
    ParseError(String),
    ClientError(String),
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NetworkError(e) => write!(f, "Network error: {}", e),
            Self::Rejected { status, message } if message.is_empty() => {
                write!(f, "Scoring endpoint returned {}", status)
            }
            Self::Rejected { status, message } => {
                write!(f, "Scoring endpoint returned {}: {}", status, message)
            }
            Self::ParseError(e) => write!(f, "Parse error: {}", e),
            Self::ClientError(e) => write!(f, "HTTP client error: {}", e),
        }
    }
}

impl std::error::Error for DeliveryError {}
