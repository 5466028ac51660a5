//! Journal Watcher
//!
//! Polls the journal store, validates new entries and forwards complete
//! ones to the scoring endpoint, one record in flight at a time.
//!
//! The cursor is the id of the last entry handled. It moves past every
//! entry the watcher looks at, whether that entry was incomplete, scored
//! or failed to deliver: each entry gets at most one delivery attempt
//! (retries inside the client aside). It stays put when the store query
//! itself fails.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::logic::delivery::{Scorer, Verdict};
use crate::logic::journal::{JournalEntry, JournalStore, StoreError};

/// Which entries a poll cycle looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchPolicy {
    /// Only the newest entry; anything inserted between two polls except
    /// the last one is never seen
    #[default]
    LatestOnly,
    /// Every entry after the cursor, oldest first, in batches
    Drain,
}

impl FromStr for WatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "latest-only" | "latest" => Ok(Self::LatestOnly),
            "drain" | "drain-all" => Ok(Self::Drain),
            other => Err(format!("unknown watch policy {:?} (expected latest-only or drain)", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub poll_interval: Duration,
    pub policy: WatchPolicy,
    /// Max entries per cycle in drain mode
    pub batch_limit: i64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            policy: WatchPolicy::LatestOnly,
            batch_limit: 100,
        }
    }
}

/// What one poll cycle did
#[derive(Debug, Default, PartialEq)]
pub struct CycleReport {
    pub dispatched: Vec<(i64, Verdict)>,
    pub incomplete: Vec<(i64, Vec<&'static str>)>,
    pub failed: Vec<i64>,
    pub store_error: bool,
}

impl CycleReport {
    pub fn is_idle(&self) -> bool {
        self.dispatched.is_empty()
            && self.incomplete.is_empty()
            && self.failed.is_empty()
            && !self.store_error
    }
}

pub struct Watcher {
    store: Arc<dyn JournalStore>,
    scorer: Arc<dyn Scorer>,
    config: WatcherConfig,
    cursor: Option<i64>,
}

impl Watcher {
    pub fn new(store: Arc<dyn JournalStore>, scorer: Arc<dyn Scorer>, config: WatcherConfig) -> Self {
        Self {
            store,
            scorer,
            config,
            cursor: None,
        }
    }

    /// Id of the last entry handled
    pub fn cursor(&self) -> Option<i64> {
        self.cursor
    }

    /// Run one Poll -> Validate -> Dispatch cycle
    pub async fn poll_once(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        let entries = match self.fetch().await {
            Ok(entries) => entries,
            Err(e) => {
                log::error!("Failed to query journal store: {}", e);
                report.store_error = true;
                return report;
            }
        };

        for entry in entries {
            self.handle(entry, &mut report).await;
        }

        report
    }

    async fn fetch(&self) -> Result<Vec<JournalEntry>, StoreError> {
        match (self.config.policy, self.cursor) {
            (WatchPolicy::Drain, Some(cursor)) => {
                self.store.since(cursor, self.config.batch_limit).await
            }
            // Latest-only, or drain before anything was seen: history that
            // predates the process is not replayed
            _ => {
                let latest = self.store.latest().await?;
                Ok(latest
                    .filter(|entry| Some(entry.id) != self.cursor)
                    .into_iter()
                    .collect())
            }
        }
    }

    async fn handle(&mut self, entry: JournalEntry, report: &mut CycleReport) {
        match entry.to_features() {
            Err(missing) => {
                log::warn!(
                    "Journal {} incomplete, missing columns: {:?}{}",
                    entry.id,
                    missing,
                    entry.audit_context()
                );
                report.incomplete.push((entry.id, missing));
            }
            Ok(record) => {
                log::debug!("Journal {} sent for scoring: {:?}", entry.id, record);

                match self.scorer.score(&record).await {
                    Ok(verdict) if verdict.is_fraud => {
                        log::warn!(
                            "[FRAUD ALERT] Journal {}: {} from {}{}",
                            entry.id,
                            record.amount,
                            record.location,
                            entry.audit_context()
                        );
                        report.dispatched.push((entry.id, verdict));
                    }
                    Ok(verdict) => {
                        log::info!("Journal {} scored: legitimate", entry.id);
                        report.dispatched.push((entry.id, verdict));
                    }
                    Err(e) => {
                        log::error!("Journal {} could not be scored: {}", entry.id, e);
                        report.failed.push(entry.id);
                    }
                }
            }
        }

        self.cursor = Some(entry.id);
    }

    /// Poll until `shutdown` turns true or its sender is dropped.
    ///
    /// A cycle in progress always completes; the wait between cycles is
    /// cut short by the stop signal.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        log::info!(
            "Journal watcher started ({:?}, every {:?})",
            self.config.policy,
            self.config.poll_interval
        );

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            if self.poll_once().await.is_idle() {
                log::trace!("No new journal entries");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        log::info!("Journal watcher stopped (cursor: {:?})", self.cursor());
    }
}
