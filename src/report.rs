use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::ReportError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub source: String,
    pub title: String,
    pub url: String,
    pub summary: String,
}

/// Result of one sweep over the registry, before it is stamped into a [`Report`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlOutcome {
    pub success_sources: Vec<String>,
    pub fail_sources: Vec<String>,
    pub articles: Vec<Article>,
}

impl CrawlOutcome {
    pub fn record_success(&mut self, source: String, articles: Vec<Article>) {
        self.success_sources.push(source);
        self.articles.extend(articles);
    }

    pub fn record_failure(&mut self, source: String) {
        self.fail_sources.push(source);
    }

    pub fn completed(&self) -> usize {
        self.success_sources.len() + self.fail_sources.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub timestamp: DateTime<Utc>,
    pub success_sources: Vec<String>,
    pub fail_sources: Vec<String>,
    pub articles: Vec<Article>,
}

impl Report {
    pub fn new(outcome: CrawlOutcome, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            success_sources: outcome.success_sources,
            fail_sources: outcome.fail_sources,
            articles: outcome.articles,
        }
    }

    /// Stamp an outcome with the current instant.
    pub fn from_outcome(outcome: CrawlOutcome) -> Self {
        Self::new(outcome, Utc::now())
    }
}

/// The process-wide "latest report" slot.
///
/// Starts empty and is replaced wholesale after every crawl. Readers get a
/// shared snapshot, so a display in progress never observes a half-built report.
#[derive(Debug, Clone, Default)]
pub struct CurrentReport {
    inner: Arc<RwLock<Option<Arc<Report>>>>,
}

impl CurrentReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn replace(&self, report: Report) -> Arc<Report> {
        let report = Arc::new(report);
        let mut slot = self.inner.write().await;
        *slot = Some(report.clone());
        info!(
            "Current report replaced ({} ok, {} failed, {} articles)",
            report.success_sources.len(),
            report.fail_sources.len(),
            report.articles.len()
        );
        report
    }

    pub async fn get(&self) -> Result<Arc<Report>, ReportError> {
        self.inner.read().await.clone().ok_or(ReportError::NoReportYet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(source: &str, title: &str) -> Article {
        Article {
            source: source.to_string(),
            title: title.to_string(),
            url: format!("https://{}.example.com/{}", source.to_lowercase(), title),
            summary: String::new(),
        }
    }

    mod outcome_tests {
        use super::*;

        #[test]
        fn test_success_appends_articles() {
            let mut outcome = CrawlOutcome::default();
            outcome.record_success("A".to_string(), vec![article("A", "1"), article("A", "2")]);
            outcome.record_success("B".to_string(), vec![article("B", "1")]);

            assert_eq!(outcome.success_sources, vec!["A", "B"]);
            assert_eq!(outcome.articles.len(), 3);
            assert_eq!(outcome.completed(), 2);
        }

        #[test]
        fn test_failure_adds_no_articles() {
            let mut outcome = CrawlOutcome::default();
            outcome.record_failure("C".to_string());

            assert_eq!(outcome.fail_sources, vec!["C"]);
            assert!(outcome.success_sources.is_empty());
            assert!(outcome.articles.is_empty());
            assert_eq!(outcome.completed(), 1);
        }
    }

    mod report_tests {
        use super::*;

        #[test]
        fn test_report_keeps_outcome_fields() {
            let mut outcome = CrawlOutcome::default();
            outcome.record_success("A".to_string(), vec![article("A", "1")]);
            outcome.record_failure("B".to_string());

            let timestamp = Utc::now();
            let report = Report::new(outcome, timestamp);

            assert_eq!(report.timestamp, timestamp);
            assert_eq!(report.success_sources, vec!["A"]);
            assert_eq!(report.fail_sources, vec!["B"]);
            assert_eq!(report.articles, vec![article("A", "1")]);
        }

        #[test]
        fn test_report_json_field_names() {
            let report = Report::new(CrawlOutcome::default(), Utc::now());
            let json = serde_json::to_value(&report).unwrap();

            assert!(json.get("timestamp").is_some());
            assert!(json.get("successSources").is_some());
            assert!(json.get("failSources").is_some());
            assert!(json.get("articles").is_some());
        }
    }

    mod current_report_tests {
        use super::*;

        #[tokio::test]
        async fn test_empty_slot_reports_no_report_yet() {
            let current = CurrentReport::new();
            assert_eq!(current.get().await.unwrap_err(), ReportError::NoReportYet);
        }

        #[tokio::test]
        async fn test_replace_is_wholesale() {
            let current = CurrentReport::new();

            let mut first = CrawlOutcome::default();
            first.record_success("A".to_string(), vec![article("A", "1")]);
            current.replace(Report::from_outcome(first)).await;

            let mut second = CrawlOutcome::default();
            second.record_failure("A".to_string());
            current.replace(Report::from_outcome(second)).await;

            let report = current.get().await.unwrap();
            assert!(report.success_sources.is_empty());
            assert_eq!(report.fail_sources, vec!["A"]);
            assert!(report.articles.is_empty());
        }

        #[tokio::test]
        async fn test_snapshot_survives_replacement() {
            let current = CurrentReport::new();

            let mut first = CrawlOutcome::default();
            first.record_success("A".to_string(), vec![article("A", "1")]);
            current.replace(Report::from_outcome(first)).await;
            let snapshot = current.get().await.unwrap();

            current
                .replace(Report::from_outcome(CrawlOutcome::default()))
                .await;

            assert_eq!(snapshot.articles.len(), 1);
            assert!(current.get().await.unwrap().articles.is_empty());
        }
    }
}
