use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePoolOptions, FromRow, SqlitePool};

use crate::error::FeedError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub author: String,
    pub blog_type: String,
    pub publish_date: NaiveDateTime,
    pub ai_summary: Option<String>,
    pub article_link: Option<String>,
}

/// Read access to the article collection.
///
/// Implementations must order matches by `publish_date` descending with a
/// stable tie-break, so that the same query against an unchanged store
/// always yields the same page.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Fetch up to `limit` articles after skipping `offset`, optionally
    /// filtered by exact `blog_type`.
    async fn find_articles(
        &self,
        category: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Article>, FeedError>;

    /// Count all articles matching the filter, ignoring pagination.
    async fn count_articles(&self, category: Option<&str>) -> Result<i64, FeedError>;
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Every connection to `sqlite::memory:` opens its own empty database
        let options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = options.connect(database_url).await?;

        Ok(Self { pool })
    }

    pub async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id TEXT PRIMARY KEY NOT NULL,
                title TEXT NOT NULL,
                author TEXT NOT NULL DEFAULT '',
                blog_type TEXT NOT NULL DEFAULT '',
                publish_date TEXT NOT NULL,
                ai_summary TEXT,
                article_link TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_articles_publish_date
            ON articles(publish_date DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_articles_type_publish_date
            ON articles(blog_type, publish_date DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Store an article. Articles are immutable once stored, so an id that
    /// already exists is left untouched. Returns whether a row was inserted.
    pub async fn insert_article(&self, article: &Article) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO articles (id, title, author, blog_type, publish_date, ai_summary, article_link)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&article.id)
        .bind(&article.title)
        .bind(&article.author)
        .bind(&article.blog_type)
        .bind(article.publish_date)
        .bind(&article.ai_summary)
        .bind(&article.article_link)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl ArticleStore for Database {
    async fn find_articles(
        &self,
        category: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Article>, FeedError> {
        let articles = sqlx::query_as::<_, Article>(
            r#"
            SELECT id, title, author, blog_type, publish_date, ai_summary, article_link
            FROM articles
            WHERE (?1 IS NULL OR blog_type = ?1)
            ORDER BY publish_date DESC, rowid ASC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(category)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(articles)
    }

    async fn count_articles(&self, category: Option<&str>) -> Result<i64, FeedError> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM articles WHERE (?1 IS NULL OR blog_type = ?1)")
                .bind(category)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0)
    }
}
