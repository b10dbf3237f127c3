//! Build-time route enumeration for the page renderer and the sitemap.
//!
//! Slug enumeration is fail-hard: without the full route set the deployed
//! site would silently miss pages, so store errors abort the build. The date
//! archive enumeration is fail-soft and skips records it cannot parse.

use anyhow::Result;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::backend::{Backend, Query};
use crate::model::{
    is_url_safe_slug, parse_timestamp, ArchiveParams, ArticleStatus, EventStatus, SlugParams,
    StaticPath,
};
use crate::policy::{fail_hard, fail_soft, BuildFailed};
use crate::queries::{CATEGORIES, EVENTS, NEWS, TAGS};

pub const NEWS_ARCHIVE_URL: &str = "/news/archive";

/// A routable collection keyed by slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugSource {
    Articles,
    Events,
    Categories,
    Tags,
}

impl SlugSource {
    pub fn table(self) -> &'static str {
        match self {
            SlugSource::Articles => NEWS,
            SlugSource::Events => EVENTS,
            SlugSource::Categories => CATEGORIES,
            SlugSource::Tags => TAGS,
        }
    }

    /// Column and value that mark a row as publicly visible.
    fn visibility(self) -> (&'static str, &'static str) {
        match self {
            SlugSource::Articles => ("status", ArticleStatus::Published.as_str()),
            SlugSource::Events => ("status", EventStatus::Published.as_str()),
            SlugSource::Categories | SlugSource::Tags => ("is_active", "true"),
        }
    }

    fn query_name(self) -> &'static str {
        match self {
            SlugSource::Articles => "all_article_slugs",
            SlugSource::Events => "all_event_slugs",
            SlugSource::Categories => "all_category_slugs",
            SlugSource::Tags => "all_tag_slugs",
        }
    }

    pub fn url_for(self, slug: &str) -> String {
        match self {
            SlugSource::Articles => format!("/news/{}", slug),
            SlugSource::Events => format!("/events/{}", slug),
            SlugSource::Categories => format!("/news/category/{}", slug),
            SlugSource::Tags => format!("/news/tag/{}", slug),
        }
    }
}

#[derive(Deserialize)]
struct SlugRow {
    slug: String,
}

/// Every dynamic route, grouped by page template.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RouteSet {
    pub articles: Vec<StaticPath<SlugParams>>,
    pub events: Vec<StaticPath<SlugParams>>,
    pub categories: Vec<StaticPath<SlugParams>>,
    pub tags: Vec<StaticPath<SlugParams>>,
    pub archives: Vec<StaticPath<ArchiveParams>>,
}

fn slug_paths(slugs: Vec<String>) -> Vec<StaticPath<SlugParams>> {
    slugs
        .into_iter()
        .map(|slug| StaticPath {
            params: SlugParams { slug },
        })
        .collect()
}

/// Distinct `{year, month}` pairs (UTC), newest first. Unparseable
/// timestamps are skipped.
pub fn group_archive_months<'a, I>(timestamps: I) -> Vec<StaticPath<ArchiveParams>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut months = BTreeSet::new();
    for raw in timestamps {
        match parse_timestamp(raw) {
            Some(ts) => {
                months.insert((ts.year(), ts.month()));
            }
            None => warn!(value = %raw, "invalid published_at; skipped"),
        }
    }
    months
        .into_iter()
        .rev()
        .map(|(year, month)| StaticPath {
            params: ArchiveParams::new(year, month),
        })
        .collect()
}

#[derive(Clone)]
pub struct PathEnumerator {
    backend: Arc<dyn Backend>,
}

impl PathEnumerator {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    #[instrument(skip(self))]
    async fn fetch_slugs(&self, source: SlugSource) -> Result<Vec<String>> {
        let (column, value) = source.visibility();
        let query = Query::table(source.table()).select("slug").eq(column, value);
        let rows: Vec<SlugRow> = self.backend.fetch(&query).await?.decode()?;
        let slugs: Vec<String> = rows.into_iter().map(|r| r.slug).collect();
        for slug in slugs.iter().filter(|s| !is_url_safe_slug(s)) {
            warn!(table = source.table(), %slug, "slug is not URL-safe");
        }
        Ok(slugs)
    }

    pub async fn slugs(&self, source: SlugSource) -> Result<Vec<StaticPath<SlugParams>>, BuildFailed> {
        fail_hard(source.query_name(), self.fetch_slugs(source))
            .await
            .map(slug_paths)
    }

    pub async fn all_article_slugs(&self) -> Result<Vec<StaticPath<SlugParams>>, BuildFailed> {
        self.slugs(SlugSource::Articles).await
    }

    pub async fn all_event_slugs(&self) -> Result<Vec<StaticPath<SlugParams>>, BuildFailed> {
        self.slugs(SlugSource::Events).await
    }

    pub async fn all_category_slugs(&self) -> Result<Vec<StaticPath<SlugParams>>, BuildFailed> {
        self.slugs(SlugSource::Categories).await
    }

    pub async fn all_tag_slugs(&self) -> Result<Vec<StaticPath<SlugParams>>, BuildFailed> {
        self.slugs(SlugSource::Tags).await
    }

    /// Month archive routes derived from published articles.
    pub async fn all_date_archive_paths(&self) -> Vec<StaticPath<ArchiveParams>> {
        fail_soft("all_date_archive_paths", self.fetch_archive_months()).await
    }

    #[instrument(skip(self))]
    async fn fetch_archive_months(&self) -> Result<Vec<StaticPath<ArchiveParams>>> {
        let query = Query::table(NEWS)
            .select("published_at")
            .eq("status", ArticleStatus::Published.as_str())
            .not_null("published_at");
        let rows = self.backend.fetch(&query).await?;
        let timestamps = rows
            .rows
            .iter()
            .filter_map(|row| match row.get("published_at") {
                Some(Value::String(s)) => Some(s.as_str()),
                None | Some(Value::Null) => None,
                Some(other) => {
                    warn!(value = %other, "published_at is not a string; skipped");
                    None
                }
            });
        Ok(group_archive_months(timestamps))
    }

    async fn slug_urls(&self, source: SlugSource) -> Vec<String> {
        match self.fetch_slugs(source).await {
            Ok(slugs) => slugs.iter().map(|s| source.url_for(s)).collect(),
            Err(err) => {
                warn!(?err, table = source.table(), "url source failed; skipped");
                Vec::new()
            }
        }
    }

    /// Every dynamic page URL for the sitemap. Sources are fetched
    /// concurrently; a failed source contributes nothing. The result holds
    /// each URL once, in first-seen order, and ends with the news archive.
    #[instrument(skip(self))]
    pub async fn all_dynamic_urls(&self) -> Vec<String> {
        let (articles, events, categories, tags, archives) = futures::join!(
            self.slug_urls(SlugSource::Articles),
            self.slug_urls(SlugSource::Events),
            self.slug_urls(SlugSource::Categories),
            self.slug_urls(SlugSource::Tags),
            self.all_date_archive_paths(),
        );
        let archive_urls = archives
            .into_iter()
            .map(|p| format!("/news/{}/{}", p.params.year, p.params.month));

        let mut seen = HashSet::new();
        articles
            .into_iter()
            .chain(events)
            .chain(categories)
            .chain(tags)
            .chain(archive_urls)
            .chain(std::iter::once(NEWS_ARCHIVE_URL.to_string()))
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }

    /// All route parameters for the renderer. Fails if any slug source fails.
    #[instrument(skip(self))]
    pub async fn all_static_paths(&self) -> Result<RouteSet, BuildFailed> {
        let (articles, events, categories, tags, archives) = futures::join!(
            self.all_article_slugs(),
            self.all_event_slugs(),
            self.all_category_slugs(),
            self.all_tag_slugs(),
            self.all_date_archive_paths(),
        );
        Ok(RouteSet {
            articles: articles?,
            events: events?,
            categories: categories?,
            tags: tags?,
            archives,
        })
    }
}
