//! Crawler coordinator - main crawl orchestration logic
//!
//! This module drives crawl runs end to end:
//! - Enumerating targets (active sources, or one synthetic search target)
//! - Fanning targets out over a bounded worker pool
//! - Running fetch, extract, fingerprint and store for every item
//! - Following pagination per target
//! - Enforcing the run's wall-clock limit and cancellation
//! - Recording the run's terminal status and counts

use crate::config::{Config, SearchConfig};
use crate::crawler::fetcher::{build_http_client, Fetch, HttpFetcher};
use crate::crawler::paginator::Paginator;
use crate::crawler::run::{RunHandle, RunReport, RunState};
use crate::crawler::throttle::{ThrottleSettings, Throttler};
use crate::extract::{extract_page, ExtractedItem, ItemOutcome, Layout, LayoutRegistry};
use crate::robots::{AllowAll, PermissionPolicy, RobotsPolicy};
use crate::state::{RunCounts, RunStatus};
use crate::storage::{
    ArticleOwner, DedupeGate, NewRun, SeenFingerprints, SharedStorage, SqliteStorage,
    StoreOutcome,
};
use crate::{ConfigError, FusionError};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Which family of targets a run crawls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrawlMode {
    /// Configured listing sources
    #[default]
    Sources,
    /// The configured search-results feed
    SearchFeed,
}

impl CrawlMode {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Sources => "sources",
            Self::SearchFeed => "search-feed",
        }
    }
}

/// Parameters of one crawl run
#[derive(Debug, Clone, Default)]
pub struct CrawlRequest {
    /// Filter for listing sources, query for the search feed
    pub keyword: Option<String>,
    /// Restricts a listing run to one source
    pub source_id: Option<i64>,
    pub mode: CrawlMode,
    /// When set, `start_crawl` waits up to this long before returning
    pub wait: Option<Duration>,
}

impl CrawlRequest {
    pub fn sources() -> Self {
        Self::default()
    }

    pub fn search_feed(keyword: Option<&str>) -> Self {
        Self {
            keyword: keyword.map(str::to_string),
            mode: CrawlMode::SearchFeed,
            ..Self::default()
        }
    }

    pub fn with_keyword(mut self, keyword: &str) -> Self {
        self.keyword = Some(keyword.to_string());
        self
    }

    pub fn with_source(mut self, source_id: i64) -> Self {
        self.source_id = Some(source_id);
        self
    }

    pub fn waiting(mut self, limit: Duration) -> Self {
        self.wait = Some(limit);
        self
    }
}

/// Who owns the articles found under a target
#[derive(Debug, Clone)]
enum TargetKind {
    Source { id: i64, name: String },
    /// Search feed; items are labelled by publisher, falling back to `label`
    Feed { label: String },
}

/// One entry point of a run
#[derive(Debug, Clone)]
struct Target {
    url: String,
    /// Fixed layout; None means resolve by host
    layout: Option<Arc<Layout>>,
    kind: TargetKind,
}

/// Everything a run's workers share
struct RunContext {
    state: Arc<RunState>,
    throttler: Arc<Throttler>,
    gate: DedupeGate,
    layouts: Arc<LayoutRegistry>,
    seen: SeenFingerprints,
    keyword: Option<String>,
    max_pages: u32,
}

impl RunContext {
    fn count(&self, update: impl FnOnce(&mut RunCounts)) {
        self.state.update_counts(update);
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    config_hash: String,
    storage: SharedStorage,
    gate: DedupeGate,
    throttler: Arc<Throttler>,
    layouts: Arc<LayoutRegistry>,
    workers: Arc<Semaphore>,
}

impl Coordinator {
    /// Creates a coordinator backed by the configured database and real HTTP
    ///
    /// # Arguments
    ///
    /// * `config` - A validated configuration
    /// * `config_hash` - Recorded on every run row
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(FusionError)` - Failed to open storage or build the HTTP client
    pub fn new(config: Config, config_hash: String) -> Result<Self, FusionError> {
        let storage_path = Path::new(&config.output.database_path);
        if let Some(parent) = storage_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let storage: SharedStorage = Arc::new(Mutex::new(SqliteStorage::new(storage_path)?));
        Self::with_storage(config, config_hash, storage)
    }

    /// Creates a coordinator over a throwaway in-memory database
    ///
    /// Used for planning (`--dry-run`) so that nothing is written to the
    /// configured database.
    pub fn in_memory(config: Config, config_hash: String) -> Result<Self, FusionError> {
        let storage: SharedStorage = Arc::new(Mutex::new(SqliteStorage::new_in_memory()?));
        Self::with_storage(config, config_hash, storage)
    }

    fn with_storage(
        config: Config,
        config_hash: String,
        storage: SharedStorage,
    ) -> Result<Self, FusionError> {
        let client = build_http_client(&config.user_agent, &config.crawler)?;
        let fetcher: Arc<dyn Fetch> = Arc::new(HttpFetcher::new(client.clone()));
        let permissions: Arc<dyn PermissionPolicy> = if config.crawler.obey_robots {
            Arc::new(RobotsPolicy::new(client, &config.user_agent.crawler_name))
        } else {
            tracing::warn!("robots.txt checks are disabled");
            Arc::new(AllowAll)
        };

        Self::with_parts(config, config_hash, storage, fetcher, permissions)
    }

    /// Creates a coordinator from explicit collaborators
    ///
    /// Configured sources are synced into `storage`.
    pub fn with_parts(
        config: Config,
        config_hash: String,
        storage: SharedStorage,
        fetcher: Arc<dyn Fetch>,
        permissions: Arc<dyn PermissionPolicy>,
    ) -> Result<Self, FusionError> {
        let layouts = LayoutRegistry::with_overrides(&config.layouts)?;

        {
            let mut store = storage
                .lock()
                .map_err(|_| crate::storage::StorageError::Poisoned)?;
            for source in &config.sources {
                let id = store.upsert_source(&source.name, &source.url, source.active)?;
                tracing::debug!("Synced source {} ({}) as id {}", source.name, source.url, id);
            }
        }

        let settings = ThrottleSettings::from(&config.crawler);
        let workers = Arc::new(Semaphore::new(settings.max_concurrent_requests));
        let throttler = Arc::new(Throttler::new(fetcher, permissions, settings));

        Ok(Self {
            config: Arc::new(config),
            config_hash,
            gate: DedupeGate::new(storage.clone()),
            storage,
            throttler,
            layouts: Arc::new(layouts),
            workers,
        })
    }

    pub fn storage(&self) -> SharedStorage {
        self.storage.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lists the entry URLs a request would crawl, without starting a run
    pub fn planned_targets(&self, request: &CrawlRequest) -> Result<Vec<String>, FusionError> {
        Ok(self
            .plan_targets(request)?
            .into_iter()
            .map(|target| target.url)
            .collect())
    }

    /// Starts a crawl run in the background
    ///
    /// Configuration problems are returned here, before any run exists. Once
    /// a [`RunHandle`] is returned, per-fetch and per-item failures are only
    /// counted. If `request.wait` is set, this waits up to that long for the
    /// run to finish and returns the handle either way.
    pub async fn start_crawl(&self, request: CrawlRequest) -> Result<RunHandle, FusionError> {
        let targets = self.plan_targets(&request)?;

        let run_id = {
            let mut store = self
                .storage
                .lock()
                .map_err(|_| crate::storage::StorageError::Poisoned)?;
            store.create_run(&NewRun {
                config_hash: self.config_hash.clone(),
                mode: request.mode.to_db_string().to_string(),
                keyword: request.keyword.clone(),
                source_id: request.source_id,
            })?
        };

        let state = Arc::new(RunState::new(
            run_id,
            request.keyword.clone(),
            request.source_id,
        ));
        state.transition(RunStatus::Running)?;

        let cancel = CancellationToken::new();
        let handle = RunHandle::new(state.clone(), cancel.clone());

        tracing::info!(
            "Starting crawl run {} ({} mode, {} targets)",
            run_id,
            request.mode.to_db_string(),
            targets.len()
        );

        if targets.is_empty() {
            let report = state.finish(RunStatus::Completed, None, |report| {
                persist_report(&self.storage, report)
            })?;
            tracing::info!("Nothing to crawl; {}", report);
        } else {
            let context = Arc::new(RunContext {
                state,
                throttler: self.throttler.clone(),
                gate: self.gate.clone(),
                layouts: self.layouts.clone(),
                seen: SeenFingerprints::new(),
                keyword: request.keyword.clone(),
                max_pages: self.config.crawler.max_pages_per_target,
            });
            tokio::spawn(drive_run(
                context,
                targets,
                self.workers.clone(),
                self.storage.clone(),
                cancel,
                self.config.crawler.run_timeout(),
            ));
        }

        if let Some(limit) = request.wait {
            handle.wait(Some(limit)).await;
        }

        Ok(handle)
    }

    fn plan_targets(&self, request: &CrawlRequest) -> Result<Vec<Target>, FusionError> {
        match request.mode {
            CrawlMode::Sources => {
                let store = self
                    .storage
                    .lock()
                    .map_err(|_| crate::storage::StorageError::Poisoned)?;
                let sources = store.list_active_sources(request.source_id)?;
                Ok(sources
                    .into_iter()
                    .map(|source| Target {
                        url: source.url,
                        layout: None,
                        kind: TargetKind::Source {
                            id: source.id,
                            name: source.name,
                        },
                    })
                    .collect())
            }
            CrawlMode::SearchFeed => {
                let search = self
                    .config
                    .search
                    .as_ref()
                    .ok_or(ConfigError::MissingSearchFeed)?;
                if request.source_id.is_some() {
                    return Err(ConfigError::IncompatibleRequest(
                        "a source id cannot be combined with the search feed".to_string(),
                    )
                    .into());
                }
                let layout = self
                    .layouts
                    .by_name(&search.layout)
                    .ok_or_else(|| ConfigError::UnknownLayout(search.layout.clone()))?;
                let url = search_target_url(search, request.keyword.as_deref())?;

                Ok(vec![Target {
                    url: url.to_string(),
                    layout: Some(layout),
                    kind: TargetKind::Feed {
                        label: search.source_label.clone(),
                    },
                }])
            }
        }
    }
}

/// Builds the synthetic search-feed target for `keyword`
///
/// With a keyword the query parameter comes first, followed by the fixed
/// extra parameters in key order. Without one, the trending page is used.
pub fn search_target_url(search: &SearchConfig, keyword: Option<&str>) -> Result<Url, ConfigError> {
    let keyword = keyword.map(str::trim).filter(|kw| !kw.is_empty());
    let url = match keyword {
        Some(keyword) => {
            let params = std::iter::once((search.query_param.as_str(), keyword)).chain(
                search
                    .extra_params
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str())),
            );
            Url::parse_with_params(&search.search_url, params)
        }
        None => Url::parse(&search.trending_url),
    };
    url.map_err(|e| ConfigError::InvalidUrl(e.to_string()))
}

/// Runs every target to completion, cancellation or timeout
async fn drive_run(
    context: Arc<RunContext>,
    targets: Vec<Target>,
    workers: Arc<Semaphore>,
    storage: SharedStorage,
    cancel: CancellationToken,
    run_timeout: Duration,
) {
    let total = targets.len();
    let mut tasks = JoinSet::new();

    for target in targets {
        let context = context.clone();
        let workers = workers.clone();
        tasks.spawn(async move {
            // Excess targets queue here instead of fetching
            let _worker = match workers.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return false,
            };
            crawl_target(&context, target).await
        });
    }

    let deadline = tokio::time::sleep(run_timeout);
    tokio::pin!(deadline);

    let mut reached = 0usize;
    let interrupted = loop {
        tokio::select! {
            _ = cancel.cancelled() => break Some("cancelled"),
            _ = &mut deadline => break Some("run timeout expired"),
            joined = tasks.join_next() => match joined {
                None => break None,
                Some(Ok(true)) => reached += 1,
                Some(Ok(false)) => {}
                Some(Err(e)) => {
                    tracing::error!("Crawl task failed: {}", e);
                    context.count(|c| c.errors += 1);
                }
            },
        }
    };

    let (status, failure) = match interrupted {
        Some(reason) => {
            tracing::warn!("Run {} stopping: {}", context.state.snapshot().run_id, reason);
            (RunStatus::TimedOut, None)
        }
        None if reached == 0 => (
            RunStatus::Failed,
            Some(format!("none of {} targets could be reached", total)),
        ),
        None => (RunStatus::Completed, None),
    };

    // Counts freeze here; work still in flight is abandoned afterwards
    match context
        .state
        .finish(status, failure, |report| persist_report(&storage, report))
    {
        Ok(report) => tracing::info!("Finished {}", report),
        Err(e) => tracing::error!("Could not finish run: {}", e),
    }
    tasks.shutdown().await;
}

/// Crawls one target and its pagination chain
///
/// Returns true if at least one page of the target was fetched.
async fn crawl_target(context: &RunContext, target: Target) -> bool {
    let start = match Url::parse(&target.url) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Skipping malformed target {}: {}", target.url, e);
            context.count(|c| c.errors += 1);
            return false;
        }
    };

    let layout = match target.layout.clone().or_else(|| {
        start
            .host_str()
            .and_then(|host| context.layouts.resolve(host))
    }) {
        Some(layout) => layout,
        None => {
            tracing::warn!("No layout for {}", start);
            context.count(|c| c.errors += 1);
            return false;
        }
    };

    let mut paginator = Paginator::new(&start, context.max_pages);
    let mut current = start;
    let mut reached = false;

    loop {
        let document = match context.throttler.fetch(&current).await {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!("{}", e);
                context.count(|c| c.errors += 1);
                break;
            }
        };
        reached = true;
        paginator.mark_visited(&document.url);

        let page = extract_page(&layout, &document.body, &document.url);
        tracing::debug!(
            "{} items on {} (page {})",
            page.items.len(),
            document.url,
            paginator.pages()
        );

        for outcome in page.items {
            process_item(context, &target, &layout, outcome).await;
        }

        match paginator.advance(page.next_page) {
            Ok(next) => current = next,
            Err(reason) => {
                tracing::debug!("Stopping pagination for {}: {}", target.url, reason);
                break;
            }
        }
    }

    reached
}

/// Fingerprints one item and offers it to the dedupe gate
async fn process_item(context: &RunContext, target: &Target, layout: &Layout, outcome: ItemOutcome) {
    let fields = match outcome {
        ItemOutcome::Valid(fields) => fields,
        ItemOutcome::Incomplete { missing } => {
            tracing::debug!("Dropping item without {} from {}", missing, target.url);
            context.count(|c| c.dropped += 1);
            return;
        }
    };

    let keyword = context.keyword.as_deref();
    let (item, owner) = match &target.kind {
        TargetKind::Source { id, name } => {
            let item = ExtractedItem::new(fields, keyword, layout.family.scheme());
            if let Some(keyword) = keyword {
                if !item.mentions(keyword) {
                    return;
                }
            }
            let owner = ArticleOwner::Source {
                id: *id,
                name: name.clone(),
            };
            (item, owner)
        }
        TargetKind::Feed { label } => {
            let owner = ArticleOwner::Label(fields.publisher.clone().unwrap_or_else(|| label.clone()));
            (ExtractedItem::new(fields, keyword, layout.family.scheme()), owner)
        }
    };

    context.count(|c| c.discovered += 1);

    let fingerprint = item.fingerprint;
    if context.seen.contains(&fingerprint) {
        context.count(|c| c.duplicates += 1);
        return;
    }

    // A failed store leaves the fingerprint unrecorded so a later copy retries
    let gate = context.gate.clone();
    match tokio::task::spawn_blocking(move || gate.try_store(&item, &owner)).await {
        Ok(StoreOutcome::Created) => {
            context.seen.record(&fingerprint);
            context.count(|c| c.stored += 1);
        }
        Ok(StoreOutcome::Duplicate) => {
            context.seen.record(&fingerprint);
            context.count(|c| c.duplicates += 1);
        }
        Ok(StoreOutcome::Failed(reason)) => {
            tracing::warn!("Store failed: {}", reason);
            context.count(|c| c.errors += 1);
        }
        Err(e) => {
            tracing::error!("Store task failed: {}", e);
            context.count(|c| c.errors += 1);
        }
    }
}

/// Writes a terminal report to the runs table
fn persist_report(storage: &SharedStorage, report: &RunReport) {
    let result = match storage.lock() {
        Ok(mut store) => store
            .finish_run(
                report.run_id,
                report.status,
                &report.counts,
                report.failure.as_deref(),
            )
            .map_err(|e| e.to_string()),
        Err(_) => Err("storage lock poisoned".to_string()),
    };

    if let Err(e) = result {
        tracing::error!("Failed to record run {}: {}", report.run_id, e);
    }
}
