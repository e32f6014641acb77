use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SelectionError;
use crate::report::{Article, Report};

/// An article plus the operator's own summary and opinion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualArticle {
    #[serde(flatten)]
    pub article: Article,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "manualSummary")]
    pub manual_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "manualOpinion")]
    pub manual_opinion: Option<String>,
}

impl ManualArticle {
    pub fn new(article: Article) -> Self {
        Self {
            article,
            manual_summary: None,
            manual_opinion: None,
        }
    }

    /// Manual summary when one was written, else `None`. An empty string counts as absent.
    pub fn manual_summary(&self) -> Option<&str> {
        non_empty(self.manual_summary.as_deref())
    }

    pub fn manual_opinion(&self) -> Option<&str> {
        non_empty(self.manual_opinion.as_deref())
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualReport {
    pub timestamp: DateTime<Utc>,
    pub success_sources: Vec<String>,
    pub fail_sources: Vec<String>,
    pub articles: Vec<ManualArticle>,
}

/// Start a fresh overlay: one blank [`ManualArticle`] per article of `report`.
pub fn begin_overlay(report: &Report) -> ManualReport {
    ManualReport {
        timestamp: report.timestamp,
        success_sources: report.success_sources.clone(),
        fail_sources: report.fail_sources.clone(),
        articles: report
            .articles
            .iter()
            .cloned()
            .map(ManualArticle::new)
            .collect(),
    }
}

/// Parse a 1-based menu selection.
///
/// `Ok(None)` means the operator typed `0` to leave; `Ok(Some(i))` is the zero-based index.
pub fn parse_selection(input: &str, len: usize) -> Result<Option<usize>, SelectionError> {
    let input = input.trim();
    let index: usize = input
        .parse()
        .map_err(|_| SelectionError::NotANumber(input.to_string()))?;

    match index {
        0 => Ok(None),
        i if i <= len => Ok(Some(i - 1)),
        i => Err(SelectionError::OutOfRange { index: i, len }),
    }
}

impl ManualReport {
    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn select(&self, input: &str) -> Result<Option<usize>, SelectionError> {
        parse_selection(input, self.len())
    }

    /// Replace both overlay fields of the article at zero-based `index`.
    pub fn annotate(
        &mut self,
        index: usize,
        summary: String,
        opinion: String,
    ) -> Result<&ManualArticle, SelectionError> {
        let len = self.len();
        let article = self
            .articles
            .get_mut(index)
            .ok_or(SelectionError::OutOfRange {
                index: index + 1,
                len,
            })?;

        article.manual_summary = Some(summary).filter(|s| !s.is_empty());
        article.manual_opinion = Some(opinion).filter(|s| !s.is_empty());
        Ok(article)
    }
}
