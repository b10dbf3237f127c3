//! Content layer for the school website build.
//!
//! Reads news, events, categories and tags from the hosted PostgREST store,
//! enumerates the static routes the page renderer needs and writes the sitemap.

pub mod backend;
pub mod cache;
pub mod config;
pub mod model;
pub mod paths;
pub mod policy;
pub mod queries;
pub mod runtime;
pub mod sitemap;
