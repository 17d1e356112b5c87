//! Feed client controller
//!
//! Walks `GET /api/news/feed` one page at a time and accumulates the
//! returned date groups into a [`Timeline`]. A single `loading` flag keeps
//! at most one fetch in flight: triggers that arrive while a fetch is
//! outstanding, or after the feed is exhausted, are ignored.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::default_scroll_threshold;
use crate::error::ClientError;
use crate::feed::{DateGroup, ErrorResponse, FeedPage, FeedResponse};

#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_page(
        &self,
        offset: i64,
        limit: i64,
        category: Option<&str>,
    ) -> Result<FeedPage, ClientError>;
}

/// [`FeedSource`] backed by the server's JSON feed endpoint.
pub struct HttpFeedSource {
    client: Client,
    base_url: String,
}

impl HttpFeedSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("NewsTimeline/1.0 (Feed Client)")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_page(
        &self,
        offset: i64,
        limit: i64,
        category: Option<&str>,
    ) -> Result<FeedPage, ClientError> {
        let url = format!("{}/api/news/feed", self.base_url);
        let mut params = vec![("offset", offset.to_string()), ("limit", limit.to_string())];
        if let Some(category) = category {
            params.push(("blog_type", category.to_string()));
        }

        let response = self.client.get(&url).query(&params).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = match response.json::<ErrorResponse>().await {
                Ok(body) => body.message,
                Err(_) => status.to_string(),
            };
            return Err(ClientError::NetworkFailure(format!(
                "feed request failed with {}: {}",
                status.as_u16(),
                message
            )));
        }

        let body: FeedResponse = response.json().await?;
        if !body.success {
            return Err(ClientError::NetworkFailure(
                "feed request was not successful".to_string(),
            ));
        }

        Ok(body.into())
    }
}

/// Paging cursor for one client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedState {
    pub offset: i64,
    pub limit: i64,
    pub has_more: bool,
    pub loading: bool,
}

impl FeedState {
    /// State matching a server-rendered first page: `offset` is that page's
    /// `next_offset`.
    pub fn seeded(offset: i64, limit: i64, has_more: bool) -> Self {
        Self {
            offset,
            limit,
            has_more,
            loading: false,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.loading {
            Phase::Fetching
        } else if !self.has_more {
            Phase::Exhausted
        } else {
            Phase::Idle
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Fetching,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The trigger was ignored: a fetch is in flight, the feed is
    /// exhausted, or the viewport is not near the bottom.
    Skipped,
    /// A page was appended to the timeline.
    Appended { articles: usize, has_more: bool },
    /// The server returned an empty page.
    Exhausted,
}

/// Rendered date groups, oldest day last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    groups: Vec<DateGroup>,
}

impl Timeline {
    pub fn new(groups: Vec<DateGroup>) -> Self {
        Self { groups }
    }

    /// Append groups from the next page. A group for the same day as the
    /// last rendered group continues that group instead of starting a new one.
    pub fn append(&mut self, groups: Vec<DateGroup>) {
        for group in groups {
            match self.groups.last_mut() {
                Some(last) if last.full_date == group.full_date => {
                    last.articles.extend(group.articles)
                }
                _ => self.groups.push(group),
            }
        }
    }

    pub fn groups(&self) -> &[DateGroup] {
        &self.groups
    }

    pub fn article_count(&self) -> usize {
        self.groups.iter().map(|g| g.articles.len()).sum()
    }
}

/// Viewport position sampled on a scroll event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub viewport_height: f64,
    pub document_height: f64,
}

impl ScrollMetrics {
    pub fn is_near_bottom(&self, threshold: f64) -> bool {
        self.scroll_top + self.viewport_height >= self.document_height - threshold
    }
}

// Both locks are only held between awaits, never across one.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a fetch as in flight. If the fetch future is dropped before it
/// completes, the guard clears `loading` so the next trigger can retry.
struct InFlight<'a> {
    state: &'a Mutex<FeedState>,
    completed: bool,
}

impl<'a> InFlight<'a> {
    fn start(state: &'a Mutex<FeedState>) -> Self {
        Self {
            state,
            completed: false,
        }
    }

    /// Lock the state to apply the result; `loading` is already cleared.
    fn complete(mut self) -> MutexGuard<'a, FeedState> {
        self.completed = true;
        let mut state = lock(self.state);
        state.loading = false;
        state
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.completed {
            let mut state = lock(self.state);
            state.loading = false;
            warn!(offset = state.offset, "Feed fetch cancelled");
        }
    }
}

pub struct FeedController<S> {
    source: S,
    category: Option<String>,
    scroll_threshold: f64,
    state: Mutex<FeedState>,
    timeline: Mutex<Timeline>,
}

impl<S: FeedSource> FeedController<S> {
    pub fn new(source: S, state: FeedState) -> Self {
        Self {
            source,
            category: None,
            scroll_threshold: f64::from(default_scroll_threshold()),
            state: Mutex::new(state),
            timeline: Mutex::new(Timeline::default()),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Near-bottom distance in pixels, as configured by `scroll_threshold`.
    pub fn with_scroll_threshold(mut self, threshold: u32) -> Self {
        self.scroll_threshold = f64::from(threshold);
        self
    }

    /// Start from groups that are already rendered.
    pub fn with_timeline(mut self, groups: Vec<DateGroup>) -> Self {
        self.timeline = Mutex::new(Timeline::new(groups));
        self
    }

    pub fn state(&self) -> FeedState {
        *lock(&self.state)
    }

    pub fn phase(&self) -> Phase {
        lock(&self.state).phase()
    }

    pub fn timeline(&self) -> Timeline {
        lock(&self.timeline).clone()
    }

    /// Whether the manual "load more" trigger should be offered.
    pub fn show_load_more(&self) -> bool {
        self.phase() == Phase::Idle
    }

    /// Fetch and append the next page.
    ///
    /// On failure, or if the returned future is dropped mid-fetch, the cursor
    /// is left untouched and the controller returns to idle, so the next
    /// trigger retries the same offset.
    pub async fn load_more(&self) -> Result<LoadOutcome, ClientError> {
        let (offset, limit) = {
            let mut state = lock(&self.state);
            if state.phase() != Phase::Idle {
                debug!(phase = ?state.phase(), "Ignoring load trigger");
                return Ok(LoadOutcome::Skipped);
            }
            state.loading = true;
            (state.offset, state.limit)
        };
        let in_flight = InFlight::start(&self.state);

        let result = self
            .source
            .fetch_page(offset, limit, self.category.as_deref())
            .await;

        let mut state = in_flight.complete();

        match result {
            Ok(page) if page.article_count() > 0 => {
                let articles = page.article_count();
                lock(&self.timeline).append(page.groups);
                state.offset = page.next_offset;
                state.has_more = page.has_more;
                info!(
                    articles,
                    next_offset = page.next_offset,
                    has_more = page.has_more,
                    "Appended feed page"
                );
                Ok(LoadOutcome::Appended {
                    articles,
                    has_more: page.has_more,
                })
            }
            Ok(_) => {
                state.has_more = false;
                info!(offset, "Feed exhausted");
                Ok(LoadOutcome::Exhausted)
            }
            Err(err) => {
                warn!(offset, "Failed to load more articles: {}", err);
                Err(err)
            }
        }
    }

    /// Scroll-proximity trigger.
    pub async fn on_scroll(&self, metrics: ScrollMetrics) -> Result<LoadOutcome, ClientError> {
        if !metrics.is_near_bottom(self.scroll_threshold) {
            return Ok(LoadOutcome::Skipped);
        }
        self.load_more().await
    }
}
