//! Migration orchestrator - main workflow coordinator.

use crate::config::Config;
use crate::error::{MigrateError, Result};
use crate::mapper::to_destination_input;
use crate::source::{SourceReader, WooCommerceReader};
use crate::state::{Command, MigrationOutcome, Phase, ProgressSnapshot, RunEvent, RunState};
use crate::target::{DestinationClient, Reconciler, ShopifyAdminClient};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Migration orchestrator.
///
/// Drives one run at a time: each page fetch and each record upsert is awaited
/// before the next one is issued.
pub struct Orchestrator {
    config: Config,
    source: Arc<dyn SourceReader>,
    reconciler: Reconciler,
    progress: watch::Sender<ProgressSnapshot>,
}

/// Final run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
    Cancelled,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: RunStatus,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Pages successfully fetched.
    pub pages_fetched: u32,

    /// Total pages reported by the source.
    pub total_pages: u32,

    /// Total products reported by the source.
    pub total_count: u64,

    /// Products created at the destination.
    pub created: u64,

    /// Existing destination products updated.
    pub updated: u64,

    /// Products that could not be reconciled.
    pub failed: u64,

    /// Run-level error text, verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Connectivity report for both stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub source_connected: bool,
    pub source_latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_total_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_error: Option<String>,
    pub target_connected: bool,
    pub target_latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_error: Option<String>,
    pub healthy: bool,
}

impl Orchestrator {
    /// Create an orchestrator talking to WooCommerce and Shopify.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let source = WooCommerceReader::new(config.source.clone(), config.migration.page_size)?;
        let destination = ShopifyAdminClient::new(&config.target)?;
        Ok(Self::with_clients(config, Arc::new(source), Arc::new(destination)))
    }

    /// Create an orchestrator over arbitrary source and destination implementations.
    pub fn with_clients(
        config: Config,
        source: Arc<dyn SourceReader>,
        destination: Arc<dyn DestinationClient>,
    ) -> Self {
        let reconciler = Reconciler::new(destination, config.migration.search_limit);
        let (progress, _) = watch::channel(RunState::new().snapshot());
        Self {
            config,
            source,
            reconciler,
            progress,
        }
    }

    /// Subscribe to progress snapshots. One is published after every transition.
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.progress.subscribe()
    }

    /// Latest published snapshot.
    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.borrow().clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a migration from page 1.
    ///
    /// Per-record failures are counted and skipped. A page-fetch failure ends the
    /// run and is returned as the error; the stats gathered up to that point stay
    /// in the last published snapshot. Cancelling `cancel` stops the run before
    /// its next step.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let timer = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();

        info!(
            "Starting migration run {}: {} -> {}",
            run_id,
            self.source.source_type(),
            self.reconciler.client().destination_type()
        );

        let mut state = RunState::new();
        let mut command = self.step(&mut state, RunEvent::Start)?;
        let mut fatal: Option<MigrateError> = None;
        let mut cancelled = false;

        loop {
            if cancel.is_cancelled() && command != Command::Stop {
                info!("Cancellation requested, stopping run {}", run_id);
                cancelled = true;
                break;
            }

            command = match command {
                Command::FetchPage(page_number) => {
                    info!("Fetching page {}/{}", page_number, state.total_pages());
                    match self.source.fetch_page(page_number).await {
                        Ok(page) => {
                            if state.pages_fetched() == 0 {
                                info!(
                                    "Source reports {} products across {} pages",
                                    page.total_count, page.total_pages
                                );
                            }
                            self.step(&mut state, RunEvent::PageFetched(page))?
                        }
                        Err(e) => {
                            error!("Page {} fetch failed: {}", page_number, e);
                            let event = RunEvent::PageFetchFailed(e.to_string());
                            fatal = Some(e);
                            self.step(&mut state, event)?
                        }
                    }
                }
                Command::Reconcile(record) => {
                    let input = to_destination_input(&record);
                    let outcome = MigrationOutcome::from(self.reconciler.upsert(&input).await);
                    match &outcome {
                        MigrationOutcome::Failed(reason) => {
                            warn!("{:?}: {}", record.name, reason)
                        }
                        ok => debug!("{:?}: {:?}", record.name, ok),
                    }
                    self.step(&mut state, RunEvent::RecordReconciled(outcome))?
                }
                Command::Stop => break,
            };
        }

        let completed_at = Utc::now();
        let stats = state.stats();
        let status = if cancelled {
            RunStatus::Cancelled
        } else if state.phase() == Phase::Failed {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };

        let result = MigrationResult {
            run_id,
            status,
            duration_seconds: timer.elapsed().as_secs_f64(),
            started_at,
            completed_at,
            pages_fetched: state.pages_fetched(),
            total_pages: state.total_pages(),
            total_count: state.total_count(),
            created: stats.created,
            updated: stats.updated,
            failed: stats.failed,
            error: state.last_error().map(str::to_string),
        };

        info!(
            "Migration {:?}: {} created, {} updated, {} failed ({} pages) in {:.1}s",
            result.status,
            result.created,
            result.updated,
            result.failed,
            result.pages_fetched,
            result.duration_seconds
        );

        if let Some(e) = fatal {
            return Err(e);
        }

        Ok(result)
    }

    /// Apply an event and publish the resulting snapshot.
    fn step(&self, state: &mut RunState, event: RunEvent) -> Result<Command> {
        let command = state.handle(event)?;
        self.progress.send_replace(state.snapshot());
        Ok(command)
    }

    /// Probe both stores without writing anything.
    pub async fn health_check(&self) -> Result<HealthCheckResult> {
        let started = Instant::now();
        let source = self.source.fetch_page(1).await;
        let source_latency_ms = started.elapsed().as_millis() as u64;

        let started = Instant::now();
        let target = self
            .reconciler
            .client()
            .search_by_title("catalog-migrate health check", 1)
            .await;
        let target_latency_ms = started.elapsed().as_millis() as u64;

        let result = HealthCheckResult {
            source_connected: source.is_ok(),
            source_latency_ms,
            source_total_count: source.as_ref().ok().map(|p| p.total_count),
            source_error: source.err().map(|e| e.to_string()),
            target_connected: target.is_ok(),
            target_latency_ms,
            target_error: target.err().map(|e| e.to_string()),
            healthy: false,
        };

        Ok(HealthCheckResult {
            healthy: result.source_connected && result.target_connected,
            ..result
        })
    }
}

impl MigrationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Error a caller should exit with for a run that returned normally but did
    /// not complete. Only a cancelled run has one.
    pub fn status_error(&self) -> Option<MigrateError> {
        match self.status {
            RunStatus::Cancelled => Some(MigrateError::Cancelled),
            RunStatus::Completed | RunStatus::Failed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MigrationConfig, SourceConfig, TargetConfig};
    use crate::mapper::ProductStatus;
    use crate::source::{Page, SourceRecord};
    use crate::target::testing::MemoryDestination;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn test_config() -> Config {
        Config {
            source: SourceConfig {
                url: "https://shop.example.com".to_string(),
                consumer_key: "ck_test".to_string(),
                consumer_secret: "cs_test".to_string(),
                api_version: "v3".to_string(),
                query_string_auth: true,
                timeout_seconds: 5,
            },
            target: TargetConfig {
                shop: "example.myshopify.com".to_string(),
                access_token: "shpat_test".to_string(),
                api_version: "2024-10".to_string(),
                timeout_seconds: 5,
            },
            migration: MigrationConfig::default(),
        }
    }

    /// Source serving fixed pages; pages listed in `fail` return an error.
    struct FakeSource {
        pages: Vec<Vec<SourceRecord>>,
        total_count: Option<u64>,
        fail: HashMap<u32, String>,
        fetched: Mutex<Vec<u32>>,
    }

    impl FakeSource {
        fn new(pages: Vec<Vec<SourceRecord>>) -> Self {
            Self {
                pages,
                total_count: None,
                fail: HashMap::new(),
                fetched: Mutex::new(Vec::new()),
            }
        }

        fn sized(sizes: &[usize]) -> Self {
            let pages = sizes
                .iter()
                .enumerate()
                .map(|(p, n)| {
                    (0..*n)
                        .map(|i| SourceRecord::new(format!("Product {}-{}", p + 1, i), "", "publish"))
                        .collect()
                })
                .collect();
            Self::new(pages)
        }

        fn fetched(&self) -> Vec<u32> {
            self.fetched.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SourceReader for FakeSource {
        async fn fetch_page(&self, page_number: u32) -> Result<Page> {
            self.fetched.lock().unwrap().push(page_number);
            if let Some(message) = self.fail.get(&page_number) {
                return Err(MigrateError::SourceUnreachable(message.clone()));
            }
            let records = self
                .pages
                .get(page_number as usize - 1)
                .cloned()
                .unwrap_or_default();
            let total = self
                .total_count
                .unwrap_or_else(|| self.pages.iter().map(Vec::len).sum::<usize>() as u64);
            Ok(Page {
                records,
                page_number,
                total_pages: self.pages.len().max(1) as u32,
                total_count: total,
            })
        }

        fn source_type(&self) -> &str {
            "fake"
        }
    }

    fn orchestrator(source: Arc<FakeSource>, dest: Arc<MemoryDestination>) -> Orchestrator {
        Orchestrator::with_clients(test_config(), source, dest)
    }

    #[tokio::test]
    async fn test_widgets_created_on_empty_destination() {
        let source = Arc::new(FakeSource::new(vec![vec![
            SourceRecord::new("Widget A", "<p>A</p>", "publish"),
            SourceRecord::new("Widget B", "<p>B</p>", "draft"),
        ]]));
        let dest = Arc::new(MemoryDestination::default());
        let mut orch = orchestrator(source, dest.clone());

        let result = orch.run(CancellationToken::new()).await.unwrap();

        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!((result.created, result.updated, result.failed), (2, 0, 0));
        assert!(result.status_error().is_none());

        let writes = dest.writes.lock().unwrap();
        assert_eq!(writes[0].1.title, "Widget A");
        assert_eq!(writes[0].1.status, ProductStatus::Active);
        assert_eq!(writes[1].1.title, "Widget B");
        assert_eq!(writes[1].1.status, ProductStatus::Draft);
    }

    #[tokio::test]
    async fn test_existing_title_is_updated() {
        let source = Arc::new(FakeSource::new(vec![vec![SourceRecord::new(
            "Widget A", "new", "publish",
        )]]));
        let dest = Arc::new(MemoryDestination::with_titles(&["Widget A"]));
        let mut orch = orchestrator(source, dest.clone());

        let result = orch.run(CancellationToken::new()).await.unwrap();
        assert_eq!((result.created, result.updated), (0, 1));
        assert_eq!(dest.count_titled("Widget A"), 1);
    }

    #[tokio::test]
    async fn test_pagination_fifty_fifty_ten() {
        let source = Arc::new(FakeSource::sized(&[50, 50, 10]));
        let dest = Arc::new(MemoryDestination::default());
        let mut orch = orchestrator(source.clone(), dest);

        let result = orch.run(CancellationToken::new()).await.unwrap();

        assert_eq!(source.fetched(), vec![1, 2, 3]);
        assert_eq!(result.created + result.updated + result.failed, 110);
        assert_eq!(result.pages_fetched, 3);
        assert_eq!(orch.progress().phase, Phase::Complete);
        assert_eq!(orch.progress().overall_progress(), 1.0);
    }

    #[tokio::test]
    async fn test_record_failure_counted_and_run_completes() {
        let source = Arc::new(FakeSource::new(vec![vec![
            SourceRecord::new("One", "", "publish"),
            SourceRecord::new("Two", "", "publish"),
            SourceRecord::new("Three", "", "publish"),
        ]]));
        let dest = Arc::new(MemoryDestination::default());
        dest.fail_on("Two");
        let mut orch = orchestrator(source, dest.clone());

        let result = orch.run(CancellationToken::new()).await.unwrap();
        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!((result.created, result.failed), (2, 1));
        assert_eq!(dest.count_titled("Three"), 1);
    }

    #[tokio::test]
    async fn test_page_failure_keeps_prior_stats() {
        let mut fake = FakeSource::sized(&[3, 3, 3]);
        fake.fail.insert(2, "connection reset by peer".to_string());
        let source = Arc::new(fake);
        let dest = Arc::new(MemoryDestination::default());
        let mut orch = orchestrator(source.clone(), dest);

        let err = orch.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, MigrateError::SourceUnreachable(_)));
        assert_eq!(source.fetched(), vec![1, 2]);

        let snapshot = orch.progress();
        assert_eq!(snapshot.phase, Phase::Failed);
        assert_eq!(snapshot.stats.created, 3);
        assert!(snapshot
            .last_error
            .as_deref()
            .unwrap()
            .contains("connection reset by peer"));
    }

    #[tokio::test]
    async fn test_second_run_only_updates() {
        let source = Arc::new(FakeSource::sized(&[4, 2]));
        let dest = Arc::new(MemoryDestination::default());
        let mut orch = orchestrator(source, dest.clone());

        let first = orch.run(CancellationToken::new()).await.unwrap();
        assert_eq!((first.created, first.updated), (6, 0));

        let second = orch.run(CancellationToken::new()).await.unwrap();
        assert_eq!((second.created, second.updated), (0, 6));
        assert_ne!(first.run_id, second.run_id);
        assert_eq!(dest.products.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_does_nothing() {
        let source = Arc::new(FakeSource::sized(&[2]));
        let dest = Arc::new(MemoryDestination::default());
        let mut orch = orchestrator(source.clone(), dest.clone());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = orch.run(cancel).await.unwrap();

        assert_eq!(result.status, RunStatus::Cancelled);
        assert!(source.fetched().is_empty());
        assert!(dest.writes.lock().unwrap().is_empty());

        let err = result.status_error().unwrap();
        assert!(matches!(err, MigrateError::Cancelled));
        assert_eq!(err.exit_code(), 130);
    }

    #[tokio::test]
    async fn test_snapshots_published_per_transition() {
        let source = Arc::new(FakeSource::sized(&[2]));
        let dest = Arc::new(MemoryDestination::default());
        let mut orch = orchestrator(source, dest);
        let mut rx = orch.subscribe();

        orch.run(CancellationToken::new()).await.unwrap();

        assert!(rx.has_changed().unwrap());
        let last = rx.borrow_and_update().clone();
        assert_eq!(last.phase, Phase::Complete);
        assert_eq!(last.stats.created, 2);
        assert_eq!(last.total_count, 2);
    }

    #[tokio::test]
    async fn test_progress_uses_reported_total() {
        let mut fake = FakeSource::sized(&[2]);
        fake.total_count = Some(8);
        let mut orch = orchestrator(Arc::new(fake), Arc::new(MemoryDestination::default()));

        orch.run(CancellationToken::new()).await.unwrap();
        assert_eq!(orch.progress().overall_progress(), 0.25);
    }

    #[tokio::test]
    async fn test_health_check_reports_both_sides() {
        let mut fake = FakeSource::sized(&[1]);
        fake.fail.insert(1, "401 Unauthorized".to_string());
        let orch = orchestrator(Arc::new(fake), Arc::new(MemoryDestination::default()));

        let health = orch.health_check().await.unwrap();
        assert!(!health.source_connected);
        assert!(health.source_error.unwrap().contains("401"));
        assert!(health.target_connected);
        assert!(!health.healthy);
    }

    #[test]
    fn test_result_to_json() {
        let result = MigrationResult {
            run_id: "run-1".to_string(),
            status: RunStatus::Failed,
            duration_seconds: 1.5,
            started_at: Utc::now(),
            completed_at: Utc::now(),
            pages_fetched: 1,
            total_pages: 3,
            total_count: 120,
            created: 40,
            updated: 9,
            failed: 1,
            error: Some("Source unreachable: page 2: HTTP 503".to_string()),
        };
        let json = result.to_json().unwrap();
        assert!(json.contains("\"status\": \"failed\""));
        assert!(json.contains("HTTP 503"));
    }
}
