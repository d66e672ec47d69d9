//! End-to-end runs of the assembled pipeline with in-process sources.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use quarry_analytics::{AnalyticsError, MemorySink, ResultRecord, ResultSink};
use quarry_config::QuarryConfig;
use quarry_core::SourceDataset;
use quarry_pipeline::{DailySchedule, PipelineError, Scheduler, Service, Settlement};
use quarry_queue::QueueStats;
use quarry_store::DurableStore;
use quarry_sync::{
    ApiSource, FetchOutcome, FetchedFile, Fetcher, FileSource, RemoteFile, SyncError, Validators,
};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

const SERIES: &str = "series_id        \tyear\tperiod\t       value\tfootnote_codes\n\
PRS30006032        \t2017\tQ01\t          0.7\t\n\
PRS30006032        \t2018\tQ01\t          1.9\t\n";

// ── Fakes ──────────────────────────────────────────────────────────

/// Index listing the primary series file, or nothing.
struct FakeIndex {
    files: Vec<(&'static str, &'static str)>,
}

impl FakeIndex {
    fn with_series() -> Arc<Self> {
        Arc::new(Self {
            files: vec![("pr.data.0.Current", SERIES)],
        })
    }

    fn empty() -> Arc<Self> {
        Arc::new(Self { files: Vec::new() })
    }
}

#[async_trait]
impl FileSource for FakeIndex {
    async fn list(&self) -> Result<Vec<RemoteFile>, SyncError> {
        Ok(self
            .files
            .iter()
            .map(|(name, _)| RemoteFile {
                name: (*name).to_string(),
                url: format!("https://upstream.example/pr/{name}"),
                fingerprint: None,
            })
            .collect())
    }

    async fn fetch(
        &self,
        file: &RemoteFile,
        _validators: &Validators,
    ) -> Result<FetchOutcome, SyncError> {
        let (_, body) = self
            .files
            .iter()
            .find(|(name, _)| *name == file.name)
            .ok_or_else(|| SyncError::Api {
                status: 404,
                message: "gone".into(),
            })?;
        Ok(FetchOutcome::Content(FetchedFile {
            bytes: body.as_bytes().to_vec(),
            validators: Validators::default(),
        }))
    }
}

enum ApiBehavior {
    Population,
    Fail,
    Hang,
}

struct FakeApi {
    behavior: ApiBehavior,
    calls: AtomicUsize,
}

impl FakeApi {
    fn new(behavior: ApiBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ApiSource for FakeApi {
    fn source_url(&self) -> String {
        String::from("https://api.example/population")
    }

    async fn fetch(&self) -> Result<Value, SyncError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            ApiBehavior::Population => Ok(json!({"data": [
                {"Year": "2017", "Population": 325719178},
                {"Year": "2018", "Population": 327167439}
            ]})),
            ApiBehavior::Fail => Err(SyncError::Api {
                status: 503,
                message: "unavailable".into(),
            }),
            ApiBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(7200)).await;
                Ok(json!({"data": []}))
            }
        }
    }
}

/// Sink that takes longer than any analytics budget.
struct SlowSink;

#[async_trait]
impl ResultSink for SlowSink {
    async fn emit(&self, _record: &ResultRecord) -> Result<(), AnalyticsError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

fn config() -> QuarryConfig {
    let mut config = QuarryConfig::default();
    config.schedule.enabled = false;
    config
}

fn service(files: Arc<FakeIndex>, api: Arc<FakeApi>, sink: Arc<dyn ResultSink>) -> Service {
    Service::with_parts(config(), DurableStore::in_memory(), files, api, sink).unwrap()
}

fn population_service(files: Arc<FakeIndex>, sink: Arc<dyn ResultSink>) -> Service {
    service(files, FakeApi::new(ApiBehavior::Population), sink)
}

// ── Service ────────────────────────────────────────────────────────

#[tokio::test]
async fn sync_then_drain_emits_one_result_per_snapshot_write() {
    let sink = Arc::new(MemorySink::new());
    let service = population_service(FakeIndex::with_series(), sink.clone());

    let report = service.sync(None).await.unwrap();
    assert!(report.is_success());
    // Snapshot and latest both match the default api-data/*.json rule.
    assert_eq!(service.queue().stats().await.ready, 2);

    let settled = service.drain_queue().await;

    assert_eq!(settled, vec![Settlement::Acked, Settlement::Acked]);
    let records = sink.records().await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].result, records[1].result);
    assert_eq!(records[0].result.combined.records_with_population, 2);
    assert_eq!(service.queue().stats().await, QueueStats::default());
}

#[tokio::test]
async fn moved_api_prefix_still_triggers_analytics() {
    let mut config = config();
    config.datasets.api.prefix = "snapshots".into();
    let sink = Arc::new(MemorySink::new());
    let service = Service::with_parts(
        config,
        DurableStore::in_memory(),
        FakeIndex::with_series(),
        FakeApi::new(ApiBehavior::Population),
        sink.clone(),
    )
    .unwrap();

    service.sync(None).await.unwrap();

    assert!(service.store().head("snapshots/latest.json").await.unwrap().is_some());
    assert_eq!(service.queue().stats().await.ready, 2);
    assert_eq!(service.drain_queue().await, vec![Settlement::Acked, Settlement::Acked]);
    assert_eq!(sink.records().await.len(), 2);
}

#[tokio::test]
async fn rule_missing_the_api_prefix_is_rejected_at_startup() {
    let mut config = config();
    config.datasets.api.prefix = "snapshots".into();
    config.notifications.rules = vec![quarry_config::NotificationRule {
        prefix: "bls-data/".into(),
        suffix: None,
    }];

    let result = Service::with_parts(
        config,
        DurableStore::in_memory(),
        FakeIndex::with_series(),
        FakeApi::new(ApiBehavior::Population),
        Arc::new(MemorySink::new()),
    );

    assert!(matches!(result, Err(PipelineError::Config(_))));
}

#[tokio::test]
async fn missing_website_input_nacks_and_emits_nothing() {
    let sink = Arc::new(MemorySink::new());
    let service = population_service(FakeIndex::empty(), sink.clone());

    service.sync(Some(SourceDataset::ApiSnapshot)).await.unwrap();
    let settled = service.drain_queue().await;

    assert_eq!(settled, vec![Settlement::Nacked, Settlement::Nacked]);
    assert!(sink.records().await.is_empty());
    let stats = service.queue().stats().await;
    assert_eq!((stats.ready, stats.delayed), (0, 2));
}

#[tokio::test]
async fn pending_triggers_count_unacked_messages() {
    let sink = Arc::new(MemorySink::new());
    let drained = population_service(FakeIndex::with_series(), sink);
    drained.sync(None).await.unwrap();
    assert_eq!(drained.pending_triggers().await, 2);
    drained.drain_queue().await;
    assert_eq!(drained.pending_triggers().await, 0);

    let failing = population_service(FakeIndex::empty(), Arc::new(MemorySink::new()));
    failing.sync(Some(SourceDataset::ApiSnapshot)).await.unwrap();
    failing.drain_queue().await;
    assert_eq!(failing.pending_triggers().await, 2);
}

#[tokio::test]
async fn manual_analyze_without_inputs_fails() {
    let service = population_service(FakeIndex::empty(), Arc::new(MemorySink::new()));

    let err = service.analyze().await.unwrap_err();

    assert!(matches!(err, PipelineError::Analytics(AnalyticsError::MissingInput { .. })));
}

#[tokio::test]
async fn status_reports_datasets_and_queue() {
    let service = population_service(FakeIndex::with_series(), Arc::new(MemorySink::new()));
    service.sync(None).await.unwrap();

    let status = service.status().await.unwrap();

    assert_eq!(status.datasets.len(), 2);
    assert!(status.datasets.iter().all(|d| d.latest_present));
    assert_eq!(status.queue.ready, 2);
}

#[tokio::test(start_paused = true)]
async fn overrunning_analytics_is_nacked() {
    let mut config = config();
    config.analytics.timeout_secs = 5;
    let service = Service::with_parts(
        config,
        DurableStore::in_memory(),
        FakeIndex::with_series(),
        FakeApi::new(ApiBehavior::Population),
        Arc::new(SlowSink),
    )
    .unwrap();
    service.sync(None).await.unwrap();

    let delivery = service.queue().receive().await.unwrap();
    let settlement = service.workers().process(delivery).await;

    assert_eq!(settlement, Settlement::Nacked);
    assert_eq!(service.queue().stats().await.delayed, 1);
}

#[tokio::test]
async fn run_consumes_until_cancelled() {
    let sink = Arc::new(MemorySink::new());
    let service = Arc::new(population_service(FakeIndex::with_series(), sink.clone()));
    service.sync(None).await.unwrap();

    let cancel = CancellationToken::new();
    let running = tokio::spawn({
        let service = Arc::clone(&service);
        let cancel = cancel.clone();
        async move { service.run(cancel).await }
    });

    tokio::time::timeout(Duration::from_secs(5), async {
        while sink.records().await.len() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    cancel.cancel();

    tokio::time::timeout(Duration::from_secs(5), running).await.unwrap().unwrap().unwrap();
    assert_eq!(service.queue().stats().await, QueueStats::default());
}

// ── Scheduler ──────────────────────────────────────────────────────

fn scheduler(api: Arc<FakeApi>, budget: Duration) -> (Scheduler, DurableStore) {
    let store = DurableStore::in_memory();
    let config = config();
    let layout = config.layout().unwrap();
    let notifying = quarry_store::NotifyingStore::new(
        store.clone(),
        Arc::new(quarry_queue::MemoryQueue::new(config.queue.clone())),
        config.notification_rules().unwrap(),
    );
    let fetcher = Fetcher::new(&notifying, &layout, FakeIndex::with_series(), api);
    (
        Scheduler::new(Arc::new(fetcher), DailySchedule::new(2, 0).unwrap(), budget),
        store,
    )
}

#[tokio::test(start_paused = true)]
async fn failing_runs_do_not_stop_later_fires() {
    let api = FakeApi::new(ApiBehavior::Fail);
    let (scheduler, _store) = scheduler(api.clone(), Duration::from_secs(600));
    let scheduler = Arc::new(scheduler);
    let cancel = CancellationToken::new();

    let running = tokio::spawn({
        let scheduler = Arc::clone(&scheduler);
        let cancel = cancel.clone();
        async move { scheduler.run(cancel).await }
    });
    tokio::time::sleep(Duration::from_secs(3 * 24 * 3600 + 60)).await;
    cancel.cancel();
    running.await.unwrap();

    assert!(api.calls() >= 3, "fired {} times", api.calls());
}

#[tokio::test(start_paused = true)]
async fn overrunning_sync_times_out() {
    let (scheduler, store) = scheduler(FakeApi::new(ApiBehavior::Hang), Duration::from_secs(600));

    let err = scheduler.run_once().await.unwrap_err();

    assert!(matches!(err, PipelineError::Timeout { operation: "sync", .. }));
    assert!(store.head("api-data/latest.json").await.unwrap().is_none());
}

#[tokio::test]
async fn cancelled_scheduler_never_fires() {
    let api = FakeApi::new(ApiBehavior::Population);
    let (scheduler, _store) = scheduler(api.clone(), Duration::from_secs(600));
    let cancel = CancellationToken::new();
    cancel.cancel();

    scheduler.run(cancel).await;

    assert_eq!(api.calls(), 0);
}
