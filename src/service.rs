use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{error, info};

use crate::config::{Config, SourceRegistry};
use crate::crawler::{Crawler, NoProgress, ProgressSink};
use crate::error::ServiceError;
use crate::fetcher::{FeedFetcher, HttpFetcher};
use crate::overlay::{begin_overlay, ManualReport};
use crate::report::{CurrentReport, Report};
use crate::store::ReportStore;

/// Owns the registry, the current-report slot and the overlay store, and
/// exposes the operations the menu and the web layer call.
pub struct Aggregator<F> {
    crawler: Crawler<F>,
    registry: SourceRegistry,
    current: CurrentReport,
    store: ReportStore<ManualReport>,
    refreshing: Arc<RwLock<bool>>,
}

impl Aggregator<HttpFetcher> {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::new(
            Duration::from_secs(config.fetch_timeout_secs),
            &config.user_agent,
        )?;
        let crawler = Crawler::new(Arc::new(fetcher), config.max_articles_per_source)
            .with_concurrency_limit(config.max_concurrent_fetches);

        Ok(Self::new(
            crawler,
            config.registry()?,
            ReportStore::new(config.report_path.clone()),
        ))
    }
}

impl<F: FeedFetcher> Aggregator<F> {
    pub fn new(
        crawler: Crawler<F>,
        registry: SourceRegistry,
        store: ReportStore<ManualReport>,
    ) -> Self {
        Self {
            crawler,
            registry,
            current: CurrentReport::new(),
            store,
            refreshing: Arc::new(RwLock::new(false)),
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn store(&self) -> &ReportStore<ManualReport> {
        &self.store
    }

    pub async fn is_refreshing(&self) -> bool {
        *self.refreshing.read().await
    }

    /// Sweep all sources and publish the result as the current report.
    pub async fn run_crawl(&self, sink: &dyn ProgressSink) -> Result<Arc<Report>, ServiceError> {
        // Check if already refreshing
        {
            let mut refreshing = self.refreshing.write().await;
            if *refreshing {
                info!("Crawl already in progress, skipping");
                return Err(ServiceError::CrawlInProgress);
            }
            *refreshing = true;
        }

        let outcome = self.crawler.crawl(&self.registry, sink).await;
        let report = self.current.replace(Report::from_outcome(outcome)).await;

        {
            let mut refreshing = self.refreshing.write().await;
            *refreshing = false;
        }

        Ok(report)
    }

    pub async fn current_report(&self) -> Result<Arc<Report>, ServiceError> {
        Ok(self.current.get().await?)
    }

    /// A blank overlay over the current report. Nothing from an earlier session carries over.
    pub async fn start_manual_overlay(&self) -> Result<ManualReport, ServiceError> {
        let report = self.current.get().await?;
        Ok(begin_overlay(&report))
    }

    pub async fn save_manual_report(&self, manual: &ManualReport) -> Result<(), ServiceError> {
        self.store.save(manual).await?;
        Ok(())
    }

    pub async fn load_manual_report(&self) -> Result<ManualReport, ServiceError> {
        Ok(self.store.load().await?)
    }
}

pub async fn start_background_refresh<F: FeedFetcher>(
    aggregator: Arc<Aggregator<F>>,
    interval_minutes: u64,
) {
    let interval = Duration::from_secs(interval_minutes * 60);

    // Do initial fetch
    info!("Starting initial crawl");
    if let Err(e) = aggregator.run_crawl(&NoProgress).await {
        error!("Initial crawl failed: {}", e);
    }

    // Then schedule periodic refreshes
    loop {
        tokio::time::sleep(interval).await;
        info!("Starting scheduled crawl");
        if let Err(e) = aggregator.run_crawl(&NoProgress).await {
            error!("Scheduled crawl failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;
    use crate::error::{FetchError, ReportError, StoreError};
    use feed_rs::model::Feed;

    const RSS: &str = r#"<rss version="2.0"><channel><title>T</title><link>https://example.com</link><description>T</description>
        <item><title>One</title><link>https://example.com/1</link><description>First</description></item>
        <item><title>Two</title><link>https://example.com/2</link><description>Second</description></item>
        </channel></rss>"#;

    /// Serves [`RSS`] for `ok` URLs and fails everything else.
    struct FixedFetcher;

    impl FeedFetcher for FixedFetcher {
        async fn fetch_feed(&self, url: &str) -> Result<Feed, FetchError> {
            if url.starts_with("ok") {
                Ok(feed_rs::parser::parse(RSS.as_bytes())?)
            } else {
                Err(FetchError::Status(502))
            }
        }
    }

    fn aggregator(dir: &tempfile::TempDir) -> Aggregator<FixedFetcher> {
        let registry = SourceRegistry::new(vec![
            SourceConfig {
                name: "Good".to_string(),
                url: "ok://good".to_string(),
            },
            SourceConfig {
                name: "Bad".to_string(),
                url: "down://bad".to_string(),
            },
        ])
        .unwrap();
        Aggregator::new(
            Crawler::new(Arc::new(FixedFetcher), 5),
            registry,
            ReportStore::new(dir.path().join("manual.json")),
        )
    }

    #[tokio::test]
    async fn test_from_config_uses_configured_path() {
        let config = Config::default();
        let aggregator = Aggregator::from_config(&config).unwrap();
        assert_eq!(aggregator.store().path(), config.report_path.as_path());
        assert_eq!(aggregator.registry().len(), 11);
    }

    mod empty_state_tests {
        use super::*;

        #[tokio::test]
        async fn test_current_report_before_crawl() {
            let dir = tempfile::tempdir().unwrap();
            let result = aggregator(&dir).current_report().await;
            assert!(matches!(
                result,
                Err(ServiceError::Report(ReportError::NoReportYet))
            ));
        }

        #[tokio::test]
        async fn test_overlay_before_crawl() {
            let dir = tempfile::tempdir().unwrap();
            let result = aggregator(&dir).start_manual_overlay().await;
            assert!(matches!(
                result,
                Err(ServiceError::Report(ReportError::NoReportYet))
            ));
        }

        #[tokio::test]
        async fn test_load_manual_before_save() {
            let dir = tempfile::tempdir().unwrap();
            let result = aggregator(&dir).load_manual_report().await;
            assert!(matches!(
                result,
                Err(ServiceError::Store(StoreError::NotFound { .. }))
            ));
        }
    }

    mod crawl_tests {
        use super::*;

        #[tokio::test]
        async fn test_crawl_publishes_current_report() {
            let dir = tempfile::tempdir().unwrap();
            let aggregator = aggregator(&dir);

            let report = aggregator.run_crawl(&NoProgress).await.unwrap();
            let current = aggregator.current_report().await.unwrap();

            assert_eq!(report, current);
            assert_eq!(current.success_sources, vec!["Good"]);
            assert_eq!(current.fail_sources, vec!["Bad"]);
            assert_eq!(current.articles.len(), 2);
            assert!(!aggregator.is_refreshing().await);
        }

        #[tokio::test]
        async fn test_overlapping_crawl_rejected() {
            let dir = tempfile::tempdir().unwrap();
            let aggregator = aggregator(&dir);
            *aggregator.refreshing.write().await = true;

            let result = aggregator.run_crawl(&NoProgress).await;
            assert!(matches!(result, Err(ServiceError::CrawlInProgress)));
        }
    }

    mod overlay_tests {
        use super::*;

        #[tokio::test]
        async fn test_overlay_save_and_reload() {
            let dir = tempfile::tempdir().unwrap();
            let aggregator = aggregator(&dir);
            aggregator.run_crawl(&NoProgress).await.unwrap();

            let mut manual = aggregator.start_manual_overlay().await.unwrap();
            manual
                .annotate(1, "x".to_string(), "y".to_string())
                .unwrap();
            aggregator.save_manual_report(&manual).await.unwrap();

            let loaded = aggregator.load_manual_report().await.unwrap();
            assert_eq!(loaded, manual);
            assert_eq!(loaded.articles[1].manual_summary(), Some("x"));
            assert_eq!(loaded.articles[0].manual_summary(), None);
        }

        #[tokio::test]
        async fn test_new_session_starts_blank() {
            let dir = tempfile::tempdir().unwrap();
            let aggregator = aggregator(&dir);
            aggregator.run_crawl(&NoProgress).await.unwrap();

            let mut first = aggregator.start_manual_overlay().await.unwrap();
            first
                .annotate(0, "x".to_string(), "y".to_string())
                .unwrap();
            aggregator.save_manual_report(&first).await.unwrap();

            let second = aggregator.start_manual_overlay().await.unwrap();
            assert!(second.articles.iter().all(|a| a.manual_summary.is_none()));
        }
    }
}
