#![allow(dead_code)]

use anyhow::{anyhow, Result};
use school_site::backend::{Backend, Query, Rows};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
enum TableResponse {
    Rows(Vec<Value>, Option<u64>),
    Fail(String),
}

/// Serves canned rows per table and records every query it receives.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    tables: HashMap<String, TableResponse>,
    calls: Arc<Mutex<Vec<Query>>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(mut self, table: &str, rows: Vec<Value>) -> Self {
        self.tables
            .insert(table.to_string(), TableResponse::Rows(rows, None));
        self
    }

    pub fn counted(mut self, table: &str, rows: Vec<Value>, total: u64) -> Self {
        self.tables
            .insert(table.to_string(), TableResponse::Rows(rows, Some(total)));
        self
    }

    pub fn failing(mut self, table: &str) -> Self {
        self.tables.insert(
            table.to_string(),
            TableResponse::Fail(format!("connection to {} refused", table)),
        );
        self
    }

    pub async fn calls(&self) -> Vec<Query> {
        self.calls.lock().await.clone()
    }

    pub async fn calls_for(&self, table: &str) -> Vec<Query> {
        self.calls()
            .await
            .into_iter()
            .filter(|q| q.table == table)
            .collect()
    }
}

#[async_trait::async_trait]
impl Backend for RecordingBackend {
    async fn fetch(&self, query: &Query) -> Result<Rows> {
        self.calls.lock().await.push(query.clone());
        match self.tables.get(&query.table) {
            Some(TableResponse::Rows(rows, count)) => Ok(Rows {
                rows: if query.head { Vec::new() } else { rows.clone() },
                count: if query.exact_count {
                    Some(count.unwrap_or(rows.len() as u64))
                } else {
                    None
                },
            }),
            Some(TableResponse::Fail(msg)) => Err(anyhow!(msg.clone())),
            None => Ok(Rows::default()),
        }
    }
}

/// Wrap a recording backend so tests keep a handle to inspect its calls.
pub fn shared(backend: RecordingBackend) -> (Arc<RecordingBackend>, Arc<dyn Backend>) {
    let recording = Arc::new(backend);
    let dyn_backend: Arc<dyn Backend> = recording.clone();
    (recording, dyn_backend)
}

pub fn category_row(id: i64, slug: &str) -> Value {
    json!({
        "id": id,
        "name": slug.replace('-', " "),
        "slug": slug,
        "type": "news",
        "color": "#336699",
        "is_active": true,
        "created_at": "2025-01-01T00:00:00+00:00",
        "updated_at": "2025-01-01T00:00:00+00:00"
    })
}

pub fn tag_row(id: i64, slug: &str) -> Value {
    json!({ "id": id, "name": slug, "slug": slug, "is_active": true })
}

pub fn article_row(id: i64, slug: &str, published_at: &str, tags: &[Value]) -> Value {
    let links: Vec<Value> = tags.iter().map(|t| json!({ "tag": t })).collect();
    json!({
        "id": id,
        "title": format!("Article {}", id),
        "slug": slug,
        "content": "Body",
        "excerpt": "Short",
        "status": "published",
        "published_at": published_at,
        "category_id": 1,
        "category": category_row(1, "school-news"),
        "tags": links,
        "is_featured": false,
        "created_at": published_at,
        "updated_at": published_at
    })
}

pub fn event_row(id: i64, slug: &str, start_date: &str) -> Value {
    json!({
        "id": id,
        "title": format!("Event {}", id),
        "slug": slug,
        "description": "Come along",
        "start_date": start_date,
        "end_date": start_date,
        "start_time": "10:00:00",
        "end_time": "12:00:00",
        "location": "Main Hall",
        "is_all_day": false,
        "is_recurring": false,
        "status": "published",
        "category_id": 2,
        "category": category_row(2, "school-events"),
        "tags": [],
        "is_featured": true
    })
}

pub fn slug_rows(slugs: &[&str]) -> Vec<Value> {
    slugs.iter().map(|s| json!({ "slug": s })).collect()
}
