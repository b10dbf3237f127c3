//! The two error policies used by store-facing calls.
//!
//! Presentation queries are fail-soft: errors are logged and the empty value
//! of the result type is returned so rendering continues. Route enumeration
//! is fail-hard: errors abort the build with a `BuildFailed`.

use std::future::Future;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
#[error("BUILD FAILED: query '{query}' failed: {source:#}")]
pub struct BuildFailed {
    pub query: &'static str,
    pub source: anyhow::Error,
}

/// Await `fut`; on error log it under `query` and return `T::default()`.
pub async fn fail_soft<T, F>(query: &'static str, fut: F) -> T
where
    T: Default,
    F: Future<Output = anyhow::Result<T>>,
{
    match fut.await {
        Ok(value) => value,
        Err(err) => {
            error!(query, error = %format!("{err:#}"), "query failed; rendering with empty result");
            T::default()
        }
    }
}

/// Await `fut`; on error log a build failure under `query` and return it.
pub async fn fail_hard<T, F>(query: &'static str, fut: F) -> Result<T, BuildFailed>
where
    F: Future<Output = anyhow::Result<T>>,
{
    fut.await.map_err(|source| {
        error!("BUILD FAILED: Query '{}' failed: {:#}", query, source);
        BuildFailed { query, source }
    })
}
