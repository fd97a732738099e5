//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Opening the run ledger and shard writer
//! - Managing the frontier queue
//! - Gating every fetch on robots.txt
//! - Coordinating fetching, extraction and link following
//! - Flushing full batches to shard files
//! - Handling aborts

use crate::config::Config;
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::{extract_page, ExtractOptions, ExtractedPage};
use crate::crawler::{build_http_client, fetch_url, FetchResult};
use crate::output::{Batch, PageRecord, ShardInfo, ShardWriter};
use crate::robots::RobotsResolver;
use crate::state::{CrawlPhase, CrawlState, PageOutcome, StopReason};
use crate::storage::{RunStatus, SqliteStorage, Storage};
use crate::url::{canonicalize, canonicalize_url, is_within_domain};
use crate::{Result, TrawlError, UrlError};
use reqwest::Client;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use url::Url;

/// Requests a running crawl to stop
///
/// The coordinator notices the request at the next loop iteration or while
/// sleeping between fetches. The in-progress batch is still flushed.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Summary of a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub run_id: i64,
    pub phase: CrawlPhase,
    pub stop_reason: Option<StopReason>,
    pub pages_fetched: u64,
    pub skipped_disallowed: u64,
    pub fetch_failures: u64,
    pub skipped_duplicates: u64,
    pub shards: Vec<ShardInfo>,
}

/// Main crawler coordinator structure
///
/// Owns the frontier, the current batch and all counters; nothing is shared
/// with other tasks except the robots cache and the abort channel.
pub struct Coordinator {
    config: Config,
    config_hash: String,
    domain: String,
    seed: Url,
    client: Client,
    robots: RobotsResolver,
    extract: ExtractOptions,
    frontier: Frontier,
    processed: HashSet<String>,
    batch: Batch,
    state: CrawlState,
    writer: ShardWriter,
    storage: SqliteStorage,
    run_id: Option<i64>,
    shards: Vec<ShardInfo>,
    abort_tx: Arc<watch::Sender<bool>>,
    abort_rx: watch::Receiver<bool>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Opens the shard directory and the run ledger, builds the HTTP client
    /// and seeds the frontier. No request is made yet.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `config_hash` - Hash of the configuration file, stored with the run
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(TrawlError)` - Failed to initialize
    pub fn new(config: Config, config_hash: impl Into<String>) -> Result<Self> {
        let domain = config.restricted_domain().ok_or(UrlError::MissingDomain)?;
        let seed = canonicalize(&config.crawler.start_url)?;

        let seed_in_domain = seed
            .host_str()
            .is_some_and(|host| is_within_domain(host, &domain));
        if !seed_in_domain {
            return Err(TrawlError::SeedOutsideDomain {
                url: seed.to_string(),
                domain,
            });
        }

        let client = build_http_client(&config.user_agent, config.crawler.request_timeout())?;
        let robots = RobotsResolver::new(client.clone(), config.crawler.robots_failure_policy);
        let extract = ExtractOptions::new(
            &config.crawler.content_selector,
            config.crawler.content_max_chars,
        )?;

        let writer = ShardWriter::new(config.output.output_dir())?;
        let storage = SqliteStorage::new(&config.output.ledger_path())?;

        let mut state = CrawlState::new(config.crawler.max_pages);
        state.next_shard_index = writer.next_free_index()?;
        if state.next_shard_index > 1 {
            tracing::warn!(
                "{} already holds shards; numbering continues at data_{}.json",
                writer.dir().display(),
                state.next_shard_index
            );
        }

        let (abort_tx, abort_rx) = watch::channel(false);

        Ok(Self {
            batch: Batch::new(config.crawler.batch_size),
            frontier: Frontier::with_seed(seed.clone()),
            config_hash: config_hash.into(),
            config,
            domain,
            seed,
            client,
            robots,
            extract,
            processed: HashSet::new(),
            state,
            writer,
            storage,
            run_id: None,
            shards: Vec::new(),
            abort_tx: Arc::new(abort_tx),
            abort_rx,
        })
    }

    /// Returns a handle that stops the crawl when triggered
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            tx: Arc::clone(&self.abort_tx),
        }
    }

    /// Domain the crawl is confined to
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Runs the crawl until the frontier is empty, the page ceiling is hit,
    /// or an abort is requested
    ///
    /// The partially filled batch is flushed exactly once on the way out,
    /// also when the crawl stops on an error. A persistence failure stops the
    /// crawl, marks the run `failed` and is returned as an error.
    pub async fn run(&mut self) -> Result<CrawlReport> {
        let run_id = self.storage.create_run(&self.config_hash)?;
        self.run_id = Some(run_id);

        tracing::info!(
            "Starting crawl run {} from {} (domain {}, max {} pages)",
            run_id,
            self.seed,
            self.domain,
            self.config.crawler.max_pages
        );
        let start_time = Instant::now();

        let outcome = match self.crawl_loop().await {
            Ok(()) => self.flush_batch(),
            Err(e) => {
                let pending = self.batch.len();
                if let Err(flush_error) = self.flush_batch() {
                    tracing::error!("Could not flush {} pending records: {}", pending, flush_error);
                }
                Err(e)
            }
        };

        if let Err(e) = outcome {
            tracing::error!("Crawl run {} failed: {}", run_id, e);
            if let Err(ledger_error) = self.storage.finish_run(
                run_id,
                RunStatus::Failed,
                self.state.pages_fetched,
                self.state.batches_flushed,
            ) {
                tracing::error!("Could not mark run {} as failed: {}", run_id, ledger_error);
            }
            return Err(e);
        }

        let status = match self.state.stop_reason {
            Some(StopReason::Aborted) => RunStatus::Interrupted,
            _ => RunStatus::Completed,
        };
        self.storage.finish_run(
            run_id,
            status,
            self.state.pages_fetched,
            self.state.batches_flushed,
        )?;

        tracing::info!(
            "Crawl {}: {} pages fetched, {} disallowed, {} failed, {} shards in {:?}",
            status.to_db_string(),
            self.state.pages_fetched,
            self.state.skipped_disallowed,
            self.state.fetch_failures,
            self.state.batches_flushed,
            start_time.elapsed()
        );

        Ok(self.report(run_id))
    }

    async fn crawl_loop(&mut self) -> Result<()> {
        if !self.robots.is_allowed(&self.seed).await {
            return Err(TrawlError::SeedDisallowed {
                url: self.seed.to_string(),
            });
        }

        while self.state.is_running() {
            if *self.abort_rx.borrow() {
                tracing::info!("Abort requested, stopping crawl");
                self.state.finish(StopReason::Aborted);
                break;
            }

            if self.state.page_limit_reached() {
                tracing::info!("Reached max-pages ({})", self.config.crawler.max_pages);
                self.state.finish(StopReason::PageLimitReached);
                break;
            }

            let Some(url) = self.frontier.dequeue() else {
                tracing::info!("Frontier is empty, crawl complete");
                self.state.finish(StopReason::FrontierExhausted);
                break;
            };

            self.process_url(url).await?;
        }

        Ok(())
    }

    /// Processes a single dequeued URL
    ///
    /// This method:
    /// 1. Skips URLs already fetched under another name
    /// 2. Checks robots.txt
    /// 3. Fetches the page
    /// 4. Extracts links and content and queues new outlinks
    /// 5. Appends the record, flushing the batch when full
    /// 6. Waits out the request delay
    async fn process_url(&mut self, url: Url) -> Result<()> {
        if self.processed.contains(url.as_str()) {
            tracing::debug!("Already processed {}, skipping", url);
            return self.record(&url, PageOutcome::Skipped, None, None);
        }

        if !self.robots.is_allowed(&url).await {
            tracing::debug!("URL {} disallowed by robots.txt", url);
            return self.record(&url, PageOutcome::Disallowed, None, None);
        }

        self.processed.insert(url.to_string());

        match fetch_url(&self.client, url.as_str()).await {
            FetchResult::Success {
                final_url,
                status_code,
                body,
                ..
            } => {
                let base = self.follow_redirect(&url, &final_url);
                let mut page = extract_page(&body, &base, &self.domain, &self.extract);
                if base != url {
                    page.outlinks.remove(url.as_str());
                }

                self.enqueue_outlinks(&page);
                self.record(&url, PageOutcome::Fetched, Some(status_code), None)?;

                tracing::info!(
                    "Fetched {} ({} outlinks, {} attachments) [{}/{}]",
                    url,
                    page.outlinks.len(),
                    page.attachments.len(),
                    self.state.pages_fetched,
                    self.config.crawler.max_pages
                );

                self.batch.push(page_record(&url, page, body));
                if self.batch.is_full() {
                    self.flush_batch()?;
                }
            }
            failure => {
                let message = failure.failure_message().unwrap_or_default();
                tracing::warn!("Failed to fetch {}: {}", url, message);
                self.record(
                    &url,
                    PageOutcome::FetchFailed,
                    failure.status_code(),
                    Some(&message),
                )?;
            }
        }

        if !self.state.page_limit_reached() && !self.frontier.is_empty() {
            self.pause().await;
        }

        Ok(())
    }

    /// Marks a redirect target seen and returns the URL links resolve against
    fn follow_redirect(&mut self, requested: &Url, final_url: &str) -> Url {
        let Some(target) = Url::parse(final_url)
            .ok()
            .and_then(|u| canonicalize_url(u).ok())
        else {
            return requested.clone();
        };

        if target != *requested {
            tracing::debug!("{} redirected to {}", requested, target);
            self.frontier.mark_seen(&target);
            self.processed.insert(target.to_string());
        }
        target
    }

    fn enqueue_outlinks(&mut self, page: &ExtractedPage) {
        for link in &page.outlinks {
            match Url::parse(link) {
                Ok(url) => {
                    if self.frontier.enqueue(url) {
                        tracing::trace!("Queued {}", link);
                    }
                }
                Err(e) => tracing::trace!("Dropping outlink {}: {}", link, e),
            }
        }
    }

    /// Updates the counters and writes the outcome to the ledger
    fn record(
        &mut self,
        url: &Url,
        outcome: PageOutcome,
        status_code: Option<u16>,
        message: Option<&str>,
    ) -> Result<()> {
        self.state.record(outcome);
        if let Some(run_id) = self.run_id {
            self.storage
                .record_fetch(run_id, url.as_str(), outcome, status_code, message)?;
        }
        Ok(())
    }

    /// Writes the current batch to the next shard, if it holds anything
    fn flush_batch(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }

        let records = self.batch.take();
        let index = self.state.take_shard_index();
        let info = self.writer.flush(&records, index)?;
        self.shards.push(info.clone());

        if let Some(run_id) = self.run_id {
            self.storage.record_shard(
                run_id,
                info.index,
                &info.path.to_string_lossy(),
                info.records,
            )?;
        }

        Ok(())
    }

    /// Sleeps for the request delay, waking early on abort
    async fn pause(&mut self) {
        let delay = self.config.crawler.request_delay();
        if delay.is_zero() {
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = self.abort_rx.changed() => {}
        }
    }

    fn report(&self, run_id: i64) -> CrawlReport {
        CrawlReport {
            run_id,
            phase: self.state.phase,
            stop_reason: self.state.stop_reason,
            pages_fetched: self.state.pages_fetched,
            skipped_disallowed: self.state.skipped_disallowed,
            fetch_failures: self.state.fetch_failures,
            skipped_duplicates: self.state.skipped_duplicates,
            shards: self.shards.clone(),
        }
    }
}

fn page_record(url: &Url, page: ExtractedPage, raw_html: String) -> PageRecord {
    PageRecord {
        url: url.to_string(),
        title: page.title,
        anchor_texts: page.anchor_texts,
        content: page.content,
        outlinks: page.outlinks,
        attachments: page.attachments,
        raw_html,
    }
}

/// Runs a complete crawl operation
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash of the configuration file
///
/// # Example
///
/// ```no_run
/// use sumi_trawl::config::load_config_with_hash;
/// use sumi_trawl::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("config.toml"))?;
/// let report = run_crawl(config, hash).await?;
/// println!("{} pages fetched", report.pages_fetched);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, config_hash: String) -> Result<CrawlReport> {
    let mut coordinator = Coordinator::new(config, config_hash)?;
    coordinator.run().await
}
