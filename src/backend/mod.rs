use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_RANGE};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use tracing::{debug, instrument, warn};

use crate::config::Config;

pub mod query;

pub use query::{Direction, Filter, Query};

const REST_PATH: &str = "rest/v1/";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Rows returned by one query, plus the exact total when it was requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    pub rows: Vec<Value>,
    pub count: Option<u64>,
}

impl Rows {
    pub fn decode<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        self.rows
            .into_iter()
            .map(|row| serde_json::from_value(row).context("unexpected row shape"))
            .collect()
    }

    /// Decode row by row, skipping rows that do not fit `T`.
    pub fn decode_each<T: DeserializeOwned>(self) -> Vec<T> {
        self.rows
            .into_iter()
            .enumerate()
            .filter_map(|(index, row)| match serde_json::from_value(row) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(?err, index, "skipping row with unexpected shape");
                    None
                }
            })
            .collect()
    }
}

/// Read access to the remote store.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn fetch(&self, query: &Query) -> Result<Rows>;
}

/// PostgREST client authenticated with the project's anonymous key.
#[derive(Clone)]
pub struct RestBackend {
    http: Client,
    base_url: Url,
    anon_key: String,
}

impl fmt::Debug for RestBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestBackend")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RestBackend {
    pub fn new(mut base_url: Url, anon_key: String) -> Result<Self> {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = Client::builder()
            .user_agent("school-site/0.1")
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url,
            anon_key,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let base_url = Url::parse(&cfg.remote.url)
            .with_context(|| format!("invalid remote url: {}", cfg.remote.url))?;
        Self::new(base_url, cfg.remote.anon_key.clone())
    }

    pub fn build_request(&self, query: &Query) -> Result<reqwest::Request> {
        let endpoint = self
            .base_url
            .join(REST_PATH)
            .and_then(|u| u.join(&query.table))
            .context("invalid remote base URL")?;
        let method = if query.head { Method::HEAD } else { Method::GET };
        let mut builder = self
            .http
            .request(method, endpoint)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
            .query(&query.to_query_pairs());
        if query.exact_count {
            builder = builder.header("Prefer", "count=exact");
        }
        if query.single {
            builder = builder.header("Accept", SINGLE_OBJECT);
        }
        builder.build().context("failed to build store request")
    }

    #[instrument(skip_all, fields(table = %query.table))]
    async fn execute(&self, query: &Query) -> Result<Rows> {
        let request = self.build_request(query)?;
        debug!(url = %request.url(), "store request");

        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach store")?;
        let status = res.status();

        // PostgREST answers 406 when a single-row request matched nothing.
        if query.single && status == StatusCode::NOT_ACCEPTABLE {
            debug!("single-row query matched no rows");
            return Ok(Rows::default());
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(%status, %body, "store error");
            return Err(anyhow!("store error {} on {}: {}", status, query.table, body));
        }

        let count = if query.exact_count {
            total_from_headers(res.headers())
        } else {
            None
        };
        if query.head {
            return Ok(Rows {
                rows: Vec::new(),
                count,
            });
        }

        let body = res.text().await.context("failed to read store response")?;
        let rows = if query.single {
            let row: Value =
                serde_json::from_str(&body).context("invalid store response JSON")?;
            vec![row]
        } else {
            serde_json::from_str::<Vec<Value>>(&body).context("invalid store response JSON")?
        };
        debug!(rows = rows.len(), ?count, "store response");
        Ok(Rows { rows, count })
    }
}

#[async_trait]
impl Backend for RestBackend {
    async fn fetch(&self, query: &Query) -> Result<Rows> {
        self.execute(query).await
    }
}

fn total_from_headers(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_range)
}

/// Total from a `Content-Range` value such as `0-9/42` or `*/42`.
pub fn parse_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.parse().ok()
}
