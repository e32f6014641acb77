use std::sync::Arc;

use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::crawler::NoProgress;
use crate::display::{trim_summary, COMMENTARY, NO_MANUAL_OPINION, SUMMARY_LIMIT};
use crate::error::{ServiceError, StoreError};
use crate::fetcher::FeedFetcher;
use crate::overlay::{ManualArticle, ManualReport};
use crate::report::{Article, Report};
use crate::service::Aggregator;

pub struct AppState<F> {
    pub aggregator: Arc<Aggregator<F>>,
}

pub fn router<F: FeedFetcher>(state: Arc<AppState<F>>) -> Router {
    Router::new()
        .route("/", get(index::<F>))
        .route("/manual", get(manual::<F>))
        .route("/crawl", post(crawl::<F>))
        .route("/crawl/status", get(crawl_status::<F>))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Template structs
#[derive(Template)]
#[template(path = "report.html")]
pub struct ReportTemplate {
    pub refreshing: bool,
    pub stats: Option<Stats>,
    pub articles: Vec<ArticleRow>,
    pub empty_message: String,
}

#[derive(Template)]
#[template(path = "crawl_button.html")]
pub struct CrawlButtonTemplate {
    pub refreshing: bool,
}

pub struct Stats {
    pub timestamp: String,
    pub success_count: usize,
    pub fail_count: usize,
    pub success_sources: String,
    pub fail_sources: String,
}

impl Stats {
    fn new(timestamp: chrono::DateTime<chrono::Utc>, success: &[String], fail: &[String]) -> Self {
        Self {
            timestamp: timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            success_count: success.len(),
            fail_count: fail.len(),
            success_sources: success.join(", "),
            fail_sources: fail.join(", "),
        }
    }
}

pub struct ArticleRow {
    pub number: usize,
    pub source: String,
    pub title: String,
    pub url: String,
    pub summary_label: &'static str,
    pub summary: String,
    pub opinion_label: &'static str,
    pub opinion: Vec<String>,
}

impl ArticleRow {
    fn from_article(number: usize, article: &Article) -> Self {
        Self {
            number,
            source: article.source.clone(),
            title: article.title.clone(),
            url: article.url.clone(),
            summary_label: "Tóm tắt ngắn gọn",
            summary: trim_summary(&article.summary, SUMMARY_LIMIT),
            opinion_label: "Nhận định",
            opinion: COMMENTARY.iter().map(|line| line.to_string()).collect(),
        }
    }

    fn from_manual(number: usize, manual: &ManualArticle) -> Self {
        let mut row = Self::from_article(number, &manual.article);
        if let Some(summary) = manual.manual_summary() {
            row.summary_label = "Tóm tắt ngắn gọn (thủ công)";
            row.summary = trim_summary(summary, SUMMARY_LIMIT);
        }
        match manual.manual_opinion() {
            Some(opinion) => {
                row.opinion_label = "Nhận định (thủ công)";
                row.opinion = opinion.lines().map(str::to_string).collect();
            }
            None => row.opinion = vec![NO_MANUAL_OPINION.to_string()],
        }
        row
    }
}

impl ReportTemplate {
    fn from_report(report: &Report, refreshing: bool) -> Self {
        Self {
            refreshing,
            stats: Some(Stats::new(
                report.timestamp,
                &report.success_sources,
                &report.fail_sources,
            )),
            articles: report
                .articles
                .iter()
                .enumerate()
                .map(|(i, a)| ArticleRow::from_article(i + 1, a))
                .collect(),
            empty_message: String::new(),
        }
    }

    fn from_manual(manual: &ManualReport, refreshing: bool) -> Self {
        Self {
            refreshing,
            stats: Some(Stats::new(
                manual.timestamp,
                &manual.success_sources,
                &manual.fail_sources,
            )),
            articles: manual
                .articles
                .iter()
                .enumerate()
                .map(|(i, a)| ArticleRow::from_manual(i + 1, a))
                .collect(),
            empty_message: String::new(),
        }
    }

    fn empty(message: &str, refreshing: bool) -> Self {
        Self {
            refreshing,
            stats: None,
            articles: Vec::new(),
            empty_message: message.to_string(),
        }
    }
}

// Wrapper for HTML responses
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

// Custom error type
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error: {}", self.0),
        )
            .into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

// Route handlers
pub async fn index<F: FeedFetcher>(
    State(state): State<Arc<AppState<F>>>,
) -> Result<impl IntoResponse, AppError> {
    let refreshing = state.aggregator.is_refreshing().await;
    let template = match state.aggregator.current_report().await {
        Ok(report) => ReportTemplate::from_report(&report, refreshing),
        Err(ServiceError::Report(e)) => ReportTemplate::empty(&e.to_string(), refreshing),
        Err(e) => return Err(e.into()),
    };
    Ok(HtmlTemplate(template))
}

pub async fn manual<F: FeedFetcher>(
    State(state): State<Arc<AppState<F>>>,
) -> Result<Response, AppError> {
    let refreshing = state.aggregator.is_refreshing().await;
    let response = match state.aggregator.load_manual_report().await {
        Ok(manual) => HtmlTemplate(ReportTemplate::from_manual(&manual, refreshing)).into_response(),
        Err(ServiceError::Store(e @ StoreError::NotFound { .. })) => (
            StatusCode::NOT_FOUND,
            HtmlTemplate(ReportTemplate::empty(&e.to_string(), refreshing)),
        )
            .into_response(),
        Err(e) => return Err(e.into()),
    };
    Ok(response)
}

pub async fn crawl<F: FeedFetcher>(
    State(state): State<Arc<AppState<F>>>,
) -> Result<impl IntoResponse, AppError> {
    // Spawn the crawl task
    let aggregator = state.aggregator.clone();
    tokio::spawn(async move {
        let _ = aggregator.run_crawl(&NoProgress).await;
    });

    // Return crawling state immediately
    Ok(HtmlTemplate(CrawlButtonTemplate { refreshing: true }))
}

pub async fn crawl_status<F: FeedFetcher>(
    State(state): State<Arc<AppState<F>>>,
) -> Result<impl IntoResponse, AppError> {
    let refreshing = state.aggregator.is_refreshing().await;
    Ok(HtmlTemplate(CrawlButtonTemplate { refreshing }))
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
