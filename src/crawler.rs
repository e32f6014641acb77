use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::SourceRegistry;
use crate::fetcher::{fetch_articles, FeedFetcher};
use crate::report::CrawlOutcome;

/// Snapshot emitted after every finished source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub eta: Duration,
}

impl Progress {
    /// Moving-average estimate: mean time per finished source times sources left.
    pub fn estimate(elapsed: Duration, completed: usize, total: usize) -> Self {
        let remaining = total.saturating_sub(completed);
        let eta = if completed == 0 {
            Duration::ZERO
        } else {
            elapsed.mul_f64(remaining as f64 / completed as f64)
        };

        Self {
            completed,
            total,
            eta,
        }
    }

    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, progress: Progress);
}

impl<F> ProgressSink for F
where
    F: Fn(Progress) + Send + Sync,
{
    fn on_progress(&self, progress: Progress) {
        self(progress)
    }
}

pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _progress: Progress) {}
}

pub struct Crawler<F> {
    fetcher: Arc<F>,
    max_articles_per_source: usize,
    limiter: Option<Arc<Semaphore>>,
}

impl<F: FeedFetcher> Crawler<F> {
    pub fn new(fetcher: Arc<F>, max_articles_per_source: usize) -> Self {
        Self {
            fetcher,
            max_articles_per_source,
            limiter: None,
        }
    }

    /// Cap the number of fetches in flight at once.
    pub fn with_concurrency_limit(mut self, limit: Option<usize>) -> Self {
        self.limiter = limit.map(|n| Arc::new(Semaphore::new(n.max(1))));
        self
    }

    /// Sweep every source once and wait for all of them to finish.
    ///
    /// Each source ends up in exactly one of the success or fail lists, even
    /// when its task panics. Completion order is not deterministic.
    pub async fn crawl(&self, registry: &SourceRegistry, sink: &dyn ProgressSink) -> CrawlOutcome {
        let start = Instant::now();
        let total = registry.len();
        info!("Crawling {} sources", total);

        let mut tasks = JoinSet::new();
        for source in registry.iter() {
            let fetcher = self.fetcher.clone();
            let limiter = self.limiter.clone();
            let name = source.name.clone();
            let url = source.url.clone();
            let limit = self.max_articles_per_source;

            tasks.spawn(async move {
                let _permit = match limiter {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                let result = fetch_articles(fetcher.as_ref(), &name, &url, limit).await;
                (name, result)
            });
        }

        let mut outcome = CrawlOutcome::default();
        let mut completed = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(articles))) => {
                    info!("Fetched {} articles from '{}'", articles.len(), name);
                    outcome.record_success(name, articles);
                }
                Ok((name, Err(e))) => {
                    warn!("Failed to fetch '{}': {}", name, e);
                    outcome.record_failure(name);
                }
                Err(e) => {
                    error!("Fetch task aborted: {}", e);
                }
            }

            completed += 1;
            sink.on_progress(Progress::estimate(start.elapsed(), completed, total));
        }

        // A panicked task cannot report its own name.
        if outcome.completed() < total {
            let seen: HashSet<String> = outcome
                .success_sources
                .iter()
                .chain(outcome.fail_sources.iter())
                .cloned()
                .collect();
            for name in registry.names() {
                if !seen.contains(name) {
                    outcome.record_failure(name.to_string());
                }
            }
        }

        info!(
            "Crawl finished in {:?}: {} ok, {} failed, {} articles",
            start.elapsed(),
            outcome.success_sources.len(),
            outcome.fail_sources.len(),
            outcome.articles.len()
        );
        outcome
    }
}
