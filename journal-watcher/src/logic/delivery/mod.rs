//! Delivery Module - Watcher to Scoring Endpoint Communication
//!
//! One synchronous request per record. Transient failures (connect
//! errors, timeouts, 5xx) are retried with exponential backoff inside
//! the client; a 4xx answer is final.

pub mod client;

pub use client::{DeliveryClient, DeliveryConfig, DeliveryError, Scorer, Verdict};

#[cfg(test)]
mod tests;
