//! Cached variants of the queries served on demand rather than at build time.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::RuntimeCache;
use crate::config;
use crate::model::{Article, Category, Event};
use crate::queries::ContentQueries;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub featured_news: Duration,
    pub upcoming_events: Duration,
    pub categories: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self::from(&config::Cache::default())
    }
}

impl From<&config::Cache> for CacheTtls {
    fn from(cfg: &config::Cache) -> Self {
        Self {
            featured_news: cfg.featured_news_ttl(),
            upcoming_events: cfg.upcoming_events_ttl(),
            categories: cfg.categories_ttl(),
        }
    }
}

#[derive(Clone)]
pub struct RuntimeQueries {
    queries: ContentQueries,
    cache: Arc<RuntimeCache>,
    ttls: CacheTtls,
}

impl RuntimeQueries {
    pub fn new(queries: ContentQueries, cache: Arc<RuntimeCache>, ttls: CacheTtls) -> Self {
        Self {
            queries,
            cache,
            ttls,
        }
    }

    pub async fn featured_news(&self, limit: u64) -> Vec<Article> {
        let key = format!("featured-news-{}", limit);
        self.cache
            .get_or_populate(&key, self.ttls.featured_news, || {
                self.queries.featured_news(limit)
            })
            .await
    }

    pub async fn upcoming_events(&self, limit: Option<u64>) -> Vec<Event> {
        let limit = limit.filter(|&n| n > 0);
        let key = match limit {
            Some(n) => format!("upcoming-events-{}", n),
            None => "upcoming-events-all".to_string(),
        };
        self.cache
            .get_or_populate(&key, self.ttls.upcoming_events, || {
                self.queries.upcoming_events(limit)
            })
            .await
    }

    pub async fn active_categories(&self) -> Vec<Category> {
        self.cache
            .get_or_populate("active-categories", self.ttls.categories, || {
                self.queries.active_categories()
            })
            .await
    }
}
