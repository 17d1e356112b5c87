//! Feed query service
//!
//! Turns an offset/limit/category request into a page of articles grouped
//! by publish date, along with the cursor the client should send next.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::{Article, ArticleStore};
use crate::error::FeedError;

/// Articles published on one calendar day, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateGroup {
    /// Display label, `MM-DD`
    pub date: String,
    /// Day key
    pub full_date: NaiveDate,
    pub articles: Vec<Article>,
}

impl DateGroup {
    pub fn new(full_date: NaiveDate) -> Self {
        Self {
            date: full_date.format("%m-%d").to_string(),
            full_date,
            articles: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedQuery {
    pub offset: i64,
    pub limit: i64,
    pub category: Option<String>,
}

impl FeedQuery {
    /// Validate raw paging parameters. A blank category means "no filter".
    pub fn new(offset: i64, limit: i64, category: Option<String>) -> Result<Self, FeedError> {
        if offset < 0 {
            return Err(FeedError::InvalidParameter(format!(
                "offset must not be negative, got {}",
                offset
            )));
        }
        if limit < 1 {
            return Err(FeedError::InvalidParameter(format!(
                "limit must be positive, got {}",
                limit
            )));
        }

        let category = category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        Ok(Self {
            offset,
            limit,
            category,
        })
    }

    pub fn clamp_limit(mut self, max: i64) -> Self {
        self.limit = self.limit.min(max);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
    pub groups: Vec<DateGroup>,
    pub has_more: bool,
    pub total: i64,
    pub next_offset: i64,
}

impl FeedPage {
    pub fn article_count(&self) -> usize {
        self.groups.iter().map(|g| g.articles.len()).sum()
    }
}

/// Wire shape of `GET /api/news/feed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub success: bool,
    pub data: Vec<DateGroup>,
    pub has_more: bool,
    pub total: i64,
    pub next_offset: i64,
}

/// Body of every failed JSON response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

impl From<FeedPage> for FeedResponse {
    fn from(page: FeedPage) -> Self {
        Self {
            success: true,
            data: page.groups,
            has_more: page.has_more,
            total: page.total,
            next_offset: page.next_offset,
        }
    }
}

impl From<FeedResponse> for FeedPage {
    fn from(response: FeedResponse) -> Self {
        Self {
            groups: response.data,
            has_more: response.has_more,
            total: response.total,
            next_offset: response.next_offset,
        }
    }
}

/// Group articles by publish day.
///
/// Input must already be sorted newest first; groups come out in the same
/// (descending) day order and each keeps its articles in input order.
pub fn group_by_date(articles: Vec<Article>) -> Vec<DateGroup> {
    let mut groups: Vec<DateGroup> = Vec::new();

    for article in articles {
        let day = article.publish_date.date();
        match groups.last_mut() {
            Some(group) if group.full_date == day => group.articles.push(article),
            _ => {
                let mut group = DateGroup::new(day);
                group.articles.push(article);
                groups.push(group);
            }
        }
    }

    groups
}

pub async fn fetch_feed_page(
    store: &dyn ArticleStore,
    query: &FeedQuery,
) -> Result<FeedPage, FeedError> {
    let category = query.category.as_deref();

    let articles = store
        .find_articles(category, query.limit, query.offset)
        .await?;
    let total = store.count_articles(category).await?;

    let returned = articles.len() as i64;
    let next_offset = query.offset + returned;
    let has_more = next_offset < total;

    debug!(
        offset = query.offset,
        limit = query.limit,
        category = ?category,
        returned,
        total,
        "Fetched feed page"
    );

    Ok(FeedPage {
        groups: group_by_date(articles),
        has_more,
        total,
        next_offset,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewsPage {
    pub articles: Vec<Article>,
    pub pagination: Pagination,
}

/// Page-numbered listing: page `n` skips `(n - 1) * limit` articles.
pub async fn fetch_news_page(
    store: &dyn ArticleStore,
    page: i64,
    limit: i64,
    category: Option<String>,
) -> Result<NewsPage, FeedError> {
    if page < 1 {
        return Err(FeedError::InvalidParameter(format!(
            "page must be at least 1, got {}",
            page
        )));
    }
    let offset = (page - 1).checked_mul(limit).ok_or_else(|| {
        FeedError::InvalidParameter(format!("page {} is out of range", page))
    })?;
    let query = FeedQuery::new(offset, limit, category)?;
    let category = query.category.as_deref();

    let articles = store
        .find_articles(category, query.limit, query.offset)
        .await?;
    let total = store.count_articles(category).await?;
    let total_pages = (total + query.limit - 1) / query.limit;

    Ok(NewsPage {
        articles,
        pagination: Pagination {
            page,
            limit: query.limit,
            total,
            total_pages,
        },
    })
}
