use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::error;

use crate::config::Config;
use crate::db::{Article, ArticleStore};
use crate::error::FeedError;
use crate::feed::{
    fetch_feed_page, fetch_news_page, DateGroup, ErrorResponse, FeedQuery, FeedResponse,
    Pagination,
};

pub struct AppState {
    pub store: Arc<dyn ArticleStore>,
    pub config: Config,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/news", get(news))
        .route("/api/news/feed", get(feed))
        .route("/health", get(health))
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Template structs
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub groups: Vec<DateGroup>,
    pub total: i64,
    pub has_more: bool,
    pub next_offset: i64,
    /// Page size the client requests after the first page
    pub limit: i64,
    /// Empty when unfiltered
    pub category: String,
    pub scroll_threshold: u32,
}

// Wrapper for HTML responses
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => {
                error!("Failed to render template: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to render template: {}", err),
                )
                    .into_response()
            }
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub message: String,
}

fn status_and_message(err: &FeedError) -> (StatusCode, String) {
    match err {
        FeedError::InvalidParameter(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        FeedError::StorageUnavailable(err) => {
            error!("Storage error: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "server error".to_string())
        }
    }
}

/// API handler error, rendered as `{ success: false, message }`.
#[derive(Debug)]
pub struct AppError(FeedError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = status_and_message(&self.0);

        let body = Json(ErrorResponse {
            success: false,
            message,
        });

        (status, body).into_response()
    }
}

impl From<FeedError> for AppError {
    fn from(err: FeedError) -> Self {
        AppError(err)
    }
}

/// Page handler error, rendered as an HTML error page.
#[derive(Debug)]
pub struct PageError(FeedError);

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let (status, message) = status_and_message(&self.0);
        let page = HtmlTemplate(ErrorTemplate {
            status: status.as_u16(),
            message,
        });

        (status, page).into_response()
    }
}

impl From<FeedError> for PageError {
    fn from(err: FeedError) -> Self {
        PageError(err)
    }
}

/// Parse an integer query parameter; absent or blank means `default`.
fn parse_param(name: &str, value: Option<&str>, default: i64) -> Result<i64, FeedError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| {
            FeedError::InvalidParameter(format!("{} must be an integer, got {:?}", name, raw))
        }),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct IndexParams {
    pub blog_type: Option<String>,
}

// Route handlers
pub async fn index(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IndexParams>,
) -> Result<impl IntoResponse, PageError> {
    let query = FeedQuery::new(0, state.config.initial_page_size, params.blog_type)?;
    let page = fetch_feed_page(state.store.as_ref(), &query).await?;

    Ok(HtmlTemplate(IndexTemplate {
        groups: page.groups,
        total: page.total,
        has_more: page.has_more,
        next_offset: page.next_offset,
        limit: state.config.page_size,
        category: query.category.unwrap_or_default(),
        scroll_threshold: state.config.scroll_threshold,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    pub offset: Option<String>,
    pub limit: Option<String>,
    pub blog_type: Option<String>,
}

pub async fn feed(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FeedParams>,
) -> Result<Json<FeedResponse>, AppError> {
    let offset = parse_param("offset", params.offset.as_deref(), 0)?;
    let limit = parse_param("limit", params.limit.as_deref(), state.config.page_size)?;

    let query = FeedQuery::new(offset, limit, params.blog_type)?
        .clamp_limit(state.config.max_page_size);
    let page = fetch_feed_page(state.store.as_ref(), &query).await?;

    Ok(Json(page.into()))
}

#[derive(Debug, Default, Deserialize)]
pub struct NewsParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub blog_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NewsResponse {
    pub success: bool,
    pub data: Vec<Article>,
    pub pagination: Pagination,
}

pub async fn news(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NewsParams>,
) -> Result<Json<NewsResponse>, AppError> {
    let page = parse_param("page", params.page.as_deref(), 1)?;
    let limit = parse_param("limit", params.limit.as_deref(), state.config.page_size)?
        .min(state.config.max_page_size);

    let result = fetch_news_page(state.store.as_ref(), page, limit, params.blog_type).await?;

    Ok(Json(NewsResponse {
        success: true,
        data: result.articles,
        pagination: result.pagination,
    }))
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
