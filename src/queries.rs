//! Typed content queries used by the page renderers.
//!
//! Every query here is fail-soft: a store error is logged and the empty value
//! is returned so a page renders with degraded content instead of aborting
//! the build.

use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::backend::{Backend, Direction, Query, Rows};
use crate::model::{Article, ArticleStatus, Category, ContentCounts, Event, EventStatus, Page, Tag};
use crate::policy::fail_soft;

pub const NEWS: &str = "news";
pub const EVENTS: &str = "events";
pub const CATEGORIES: &str = "categories";
pub const TAGS: &str = "tags";

const ARTICLE_SELECT: &str = "*,category:categories(*),tags:news_tags(tag:tags(*))";
const EVENT_SELECT: &str = "*,category:categories(*),tags:event_tags(tag:tags(*))";
// Inner-joined embeds restrict the parent rows; the second `news_tags` embed
// exists only to filter so the article keeps its full tag list.
const ARTICLE_BY_CATEGORY_SELECT: &str =
    "*,category:categories!inner(*),tags:news_tags(tag:tags(*))";
const ARTICLE_BY_TAG_SELECT: &str =
    "*,category:categories(*),tags:news_tags(tag:tags(*)),tag_match:news_tags!inner(tag:tags!inner(slug))";

#[derive(Deserialize)]
struct TagLink {
    #[serde(default)]
    tag: Option<Tag>,
}

#[derive(Deserialize)]
struct ArticleRecord {
    #[serde(flatten)]
    article: Article,
    #[serde(default)]
    tags: Option<Vec<TagLink>>,
}

#[derive(Deserialize)]
struct EventRecord {
    #[serde(flatten)]
    event: Event,
    #[serde(default)]
    tags: Option<Vec<TagLink>>,
}

fn flatten_tags(links: Option<Vec<TagLink>>) -> Vec<Tag> {
    links
        .unwrap_or_default()
        .into_iter()
        .filter_map(|link| link.tag)
        .collect()
}

impl From<ArticleRecord> for Article {
    fn from(record: ArticleRecord) -> Self {
        let mut article = record.article;
        article.tags = flatten_tags(record.tags);
        article
    }
}

impl From<EventRecord> for Event {
    fn from(record: EventRecord) -> Self {
        let mut event = record.event;
        event.tags = flatten_tags(record.tags);
        event
    }
}

/// First and last row index (inclusive) of a 1-based page.
pub fn page_window(page: u64, limit: u64) -> Result<(u64, u64)> {
    let page = page.max(1);
    let limit = limit.max(1);
    let offset = (page - 1)
        .checked_mul(limit)
        .ok_or_else(|| anyhow!("page {} of size {} is out of range", page, limit))?;
    let last = offset
        .checked_add(limit - 1)
        .ok_or_else(|| anyhow!("page {} of size {} is out of range", page, limit))?;
    Ok((offset, last))
}

/// Inclusive start and exclusive end of a calendar month.
pub fn month_window(year: &str, month: &str) -> Result<(NaiveDate, NaiveDate)> {
    let y: i32 = year
        .trim()
        .parse()
        .with_context(|| format!("invalid archive year {:?}", year))?;
    let m: u32 = month
        .trim()
        .parse()
        .with_context(|| format!("invalid archive month {:?}", month))?;
    let start = NaiveDate::from_ymd_opt(y, m, 1)
        .ok_or_else(|| anyhow!("invalid archive month {}-{}", year, month))?;
    let (ny, nm) = if start.month() == 12 {
        (y + 1, 1)
    } else {
        (y, m + 1)
    };
    let end = NaiveDate::from_ymd_opt(ny, nm, 1)
        .ok_or_else(|| anyhow!("archive month {}-{} out of range", year, month))?;
    Ok((start, end))
}

/// Content queries over an injected store backend.
#[derive(Clone)]
pub struct ContentQueries {
    backend: Arc<dyn Backend>,
}

impl ContentQueries {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    async fn fetch(&self, query: Query) -> Result<Rows> {
        self.backend.fetch(&query).await
    }

    async fn fetch_articles(&self, query: Query) -> Result<Vec<Article>> {
        let records: Vec<ArticleRecord> = self.fetch(query).await?.decode_each();
        Ok(records.into_iter().map(Article::from).collect())
    }

    async fn fetch_events(&self, query: Query) -> Result<Vec<Event>> {
        let records: Vec<EventRecord> = self.fetch(query).await?.decode_each();
        Ok(records.into_iter().map(Event::from).collect())
    }

    async fn fetch_article_page(&self, query: Query, page: u64, limit: u64) -> Result<Page<Article>> {
        let (offset, last) = page_window(page, limit)?;
        let rows = self.fetch(query.exact_count().range(offset, last)).await?;
        let total = rows.count.unwrap_or(0);
        let records: Vec<ArticleRecord> = rows.decode_each();
        let items = records.into_iter().map(Article::from).collect();
        Ok(Page::new(items, total, offset))
    }

    fn published_articles(select: &str) -> Query {
        Query::table(NEWS)
            .select(select)
            .eq("status", ArticleStatus::Published.as_str())
    }

    fn published_events() -> Query {
        Query::table(EVENTS)
            .select(EVENT_SELECT)
            .eq("status", EventStatus::Published.as_str())
    }

    /// Most recently published articles.
    #[instrument(skip(self))]
    pub async fn featured_news(&self, limit: u64) -> Vec<Article> {
        let query = Self::published_articles(ARTICLE_SELECT)
            .order("published_at", Direction::Desc)
            .limit(limit);
        fail_soft("featured_news", self.fetch_articles(query)).await
    }

    /// Published events starting today or later, soonest first.
    pub async fn upcoming_events(&self, limit: Option<u64>) -> Vec<Event> {
        self.upcoming_events_from(Utc::now().date_naive(), limit)
            .await
    }

    #[instrument(skip(self))]
    pub async fn upcoming_events_from(&self, today: NaiveDate, limit: Option<u64>) -> Vec<Event> {
        let mut query = Self::published_events()
            .gte("start_date", today)
            .order("start_date", Direction::Asc);
        if let Some(limit) = limit.filter(|&n| n > 0) {
            query = query.limit(limit);
        }
        fail_soft("upcoming_events", self.fetch_events(query)).await
    }

    /// Active categories by name, with the placeholder count set to 0.
    #[instrument(skip(self))]
    pub async fn active_categories(&self) -> Vec<Category> {
        let query = Query::table(CATEGORIES)
            .eq("is_active", true)
            .order("name", Direction::Asc);
        fail_soft("active_categories", async {
            let categories: Vec<Category> = self.fetch(query).await?.decode_each();
            Ok::<_, anyhow::Error>(
                categories
                    .into_iter()
                    .map(|c| Category {
                        count: Some(0),
                        ..c
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn article_by_slug(&self, slug: &str) -> Option<Article> {
        let query = Self::published_articles(ARTICLE_SELECT)
            .eq("slug", slug)
            .single();
        fail_soft("article_by_slug", async {
            let articles = self
                .fetch_articles(query)
                .await
                .with_context(|| format!("article with slug {:?}", slug))?;
            Ok::<_, anyhow::Error>(articles.into_iter().next())
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn event_by_slug(&self, slug: &str) -> Option<Event> {
        let query = Self::published_events().eq("slug", slug).single();
        fail_soft("event_by_slug", async {
            let events = self
                .fetch_events(query)
                .await
                .with_context(|| format!("event with slug {:?}", slug))?;
            Ok::<_, anyhow::Error>(events.into_iter().next())
        })
        .await
    }

    /// Other published articles, optionally from the same category, newest first.
    #[instrument(skip(self))]
    pub async fn related_articles(
        &self,
        current_slug: &str,
        category_id: Option<i64>,
        limit: u64,
    ) -> Vec<Article> {
        let mut query = Self::published_articles(ARTICLE_SELECT).neq("slug", current_slug);
        if let Some(id) = category_id {
            query = query.eq("category_id", id);
        }
        let query = query
            .order("published_at", Direction::Desc)
            .limit(limit);
        fail_soft("related_articles", self.fetch_articles(query)).await
    }

    /// Other published events, optionally from the same category, soonest first.
    #[instrument(skip(self))]
    pub async fn related_events(
        &self,
        current_slug: &str,
        category_id: Option<i64>,
        limit: u64,
    ) -> Vec<Event> {
        let mut query = Self::published_events().neq("slug", current_slug);
        if let Some(id) = category_id {
            query = query.eq("category_id", id);
        }
        let query = query.order("start_date", Direction::Asc).limit(limit);
        fail_soft("related_events", self.fetch_events(query)).await
    }

    #[instrument(skip(self))]
    pub async fn news_by_category(&self, category_slug: &str, page: u64, limit: u64) -> Page<Article> {
        let query = Self::published_articles(ARTICLE_BY_CATEGORY_SELECT)
            .eq("category.slug", category_slug)
            .order("published_at", Direction::Desc);
        fail_soft("news_by_category", async {
            self.fetch_article_page(query, page, limit)
                .await
                .with_context(|| format!("category {:?}", category_slug))
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn news_by_tag(&self, tag_slug: &str, page: u64, limit: u64) -> Page<Article> {
        let query = Self::published_articles(ARTICLE_BY_TAG_SELECT)
            .eq("tag_match.tag.slug", tag_slug)
            .order("published_at", Direction::Desc);
        fail_soft("news_by_tag", async {
            self.fetch_article_page(query, page, limit)
                .await
                .with_context(|| format!("tag {:?}", tag_slug))
        })
        .await
    }

    /// Articles published within one calendar month, newest first.
    #[instrument(skip(self))]
    pub async fn news_by_date_archive(&self, year: &str, month: &str) -> Vec<Article> {
        fail_soft("news_by_date_archive", async {
            let (start, end) = month_window(year, month)?;
            let query = Self::published_articles(ARTICLE_SELECT)
                .gte("published_at", start)
                .lt("published_at", end)
                .order("published_at", Direction::Desc);
            self.fetch_articles(query)
                .await
                .with_context(|| format!("archive {}-{}", year, month))
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn news_archive(&self, page: u64, limit: u64) -> Page<Article> {
        let query = Self::published_articles(ARTICLE_SELECT).order("published_at", Direction::Desc);
        fail_soft("news_archive", self.fetch_article_page(query, page, limit)).await
    }

    /// True when the store answers a trivial query.
    pub async fn check_health(&self) -> bool {
        let query = Query::table(CATEGORIES).select("id").limit(1);
        match self.fetch(query).await {
            Ok(_) => true,
            Err(err) => {
                warn!(?err, "store health check failed");
                false
            }
        }
    }

    /// Published news/events and active categories. Each count settles on its
    /// own; a failed count reads as 0.
    #[instrument(skip(self))]
    pub async fn content_counts(&self) -> ContentCounts {
        let news = Query::table(NEWS)
            .eq("status", ArticleStatus::Published.as_str())
            .head();
        let events = Query::table(EVENTS)
            .eq("status", EventStatus::Published.as_str())
            .head();
        let categories = Query::table(CATEGORIES).eq("is_active", true).head();
        let (news, events, categories) = futures::join!(
            self.count(news),
            self.count(events),
            self.count(categories)
        );
        ContentCounts {
            news,
            events,
            categories,
        }
    }

    async fn count(&self, query: Query) -> u64 {
        let table = query.table.clone();
        match self.fetch(query).await {
            Ok(rows) => rows.count.unwrap_or(0),
            Err(err) => {
                warn!(?err, %table, "count query failed");
                0
            }
        }
    }
}
