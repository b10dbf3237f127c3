mod common;

use chrono::NaiveDate;
use common::{article_row, category_row, event_row, shared, tag_row, RecordingBackend};
use school_site::backend::{Direction, Filter};
use school_site::model::{ArticleStatus, ContentCounts, EventStatus, Page};
use school_site::queries::ContentQueries;

fn eq(col: &str, val: &str) -> Filter {
    Filter::Eq(col.into(), val.into())
}

#[tokio::test]
async fn featured_news_filters_published_and_flattens_tags() {
    let backend = RecordingBackend::new().rows(
        "news",
        vec![
            article_row(1, "spring-fair", "2025-03-01T09:00:00Z", &[tag_row(1, "community"), tag_row(2, "students")]),
            article_row(2, "science-week", "2025-02-10T09:00:00Z", &[]),
        ],
    );
    let (recording, backend) = shared(backend);
    let queries = ContentQueries::new(backend);

    let articles = queries.featured_news(5).await;

    assert_eq!(articles.len(), 2);
    assert!(articles.iter().all(|a| a.status == ArticleStatus::Published));
    let tags: Vec<_> = articles[0].tags.iter().map(|t| t.slug.as_str()).collect();
    assert_eq!(tags, vec!["community", "students"]);
    assert_eq!(articles[0].category.as_ref().unwrap().slug, "school-news");

    let calls = recording.calls_for("news").await;
    assert_eq!(calls.len(), 1);
    let q = &calls[0];
    assert!(q.has_filter(&eq("status", "published")));
    assert_eq!(q.order, vec![("published_at".to_string(), Direction::Desc)]);
    assert_eq!(q.limit, Some(5));
    assert!(q.select.contains("tags:news_tags(tag:tags(*))"));
}

#[tokio::test]
async fn upcoming_events_start_today_soonest_first() {
    let backend = RecordingBackend::new().rows("events", vec![event_row(1, "open-day", "2025-05-10")]);
    let (recording, backend) = shared(backend);
    let queries = ContentQueries::new(backend);
    let today = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();

    let events = queries.upcoming_events_from(today, None).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, EventStatus::Published);
    assert_eq!(events[0].location.as_deref(), Some("Main Hall"));

    let q = &recording.calls_for("events").await[0];
    assert!(q.has_filter(&eq("status", "published")));
    assert!(q.has_filter(&Filter::Gte("start_date".into(), "2025-05-01".into())));
    assert_eq!(q.order, vec![("start_date".to_string(), Direction::Asc)]);
    assert_eq!(q.limit, None);

    queries.upcoming_events_from(today, Some(3)).await;
    assert_eq!(recording.calls_for("events").await[1].limit, Some(3));

    // Zero means no limit.
    queries.upcoming_events_from(today, Some(0)).await;
    assert_eq!(recording.calls_for("events").await[2].limit, None);
}

#[tokio::test]
async fn active_categories_are_active_with_zero_count() {
    let backend = RecordingBackend::new().rows(
        "categories",
        vec![category_row(1, "arts"), category_row(2, "sports")],
    );
    let (recording, backend) = shared(backend);
    let queries = ContentQueries::new(backend);

    let categories = queries.active_categories().await;
    assert_eq!(categories.len(), 2);
    assert!(categories.iter().all(|c| c.is_active));
    assert!(categories.iter().all(|c| c.count == Some(0)));

    let q = &recording.calls_for("categories").await[0];
    assert!(q.has_filter(&eq("is_active", "true")));
    assert_eq!(q.order, vec![("name".to_string(), Direction::Asc)]);
}

#[tokio::test]
async fn by_slug_uses_single_row_mode() {
    let backend = RecordingBackend::new()
        .rows("news", vec![article_row(9, "spring-fair", "2025-03-01T09:00:00Z", &[])])
        .rows("events", vec![]);
    let (recording, backend) = shared(backend);
    let queries = ContentQueries::new(backend);

    let article = queries.article_by_slug("spring-fair").await.unwrap();
    assert_eq!(article.id, 9);
    assert!(queries.event_by_slug("missing").await.is_none());

    let q = &recording.calls_for("news").await[0];
    assert!(q.single);
    assert!(q.has_filter(&eq("slug", "spring-fair")));
    assert!(q.has_filter(&eq("status", "published")));
}

#[tokio::test]
async fn related_queries_exclude_current_slug() {
    let backend = RecordingBackend::new();
    let (recording, backend) = shared(backend);
    let queries = ContentQueries::new(backend);

    queries.related_articles("spring-fair", Some(4), 3).await;
    queries.related_events("open-day", None, 3).await;

    let news = &recording.calls_for("news").await[0];
    assert!(news.has_filter(&Filter::Neq("slug".into(), "spring-fair".into())));
    assert!(news.has_filter(&eq("category_id", "4")));
    assert_eq!(news.limit, Some(3));

    let events = &recording.calls_for("events").await[0];
    assert!(events.has_filter(&Filter::Neq("slug".into(), "open-day".into())));
    assert!(!events.filters.iter().any(|f| f.column() == "category_id"));
    assert_eq!(events.order, vec![("start_date".to_string(), Direction::Asc)]);
}

#[tokio::test]
async fn paginated_envelope_reports_has_more() {
    let rows = vec![
        article_row(11, "a", "2025-03-01T09:00:00Z", &[]),
        article_row(12, "b", "2025-02-01T09:00:00Z", &[]),
    ];
    let backend = RecordingBackend::new().counted("news", rows, 12);
    let (recording, backend) = shared(backend);
    let queries = ContentQueries::new(backend);

    let page = queries.news_archive(2, 2).await;
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total, 12);
    assert_eq!(page.has_more, 12 > 2 + 2);

    let q = &recording.calls_for("news").await[0];
    assert!(q.exact_count);
    assert_eq!(q.range, Some((2, 3)));

    let last = queries.news_archive(6, 2).await;
    assert_eq!(last.total, 12);
    assert!(!last.has_more);
}

#[tokio::test]
async fn out_of_range_page_is_empty_without_query() {
    let backend = RecordingBackend::new().counted("news", vec![article_row(1, "a", "2025-03-01T09:00:00Z", &[])], 1);
    let (recording, backend) = shared(backend);
    let queries = ContentQueries::new(backend);

    assert_eq!(queries.news_archive(u64::MAX / 2, 10).await, Page::default());
    assert_eq!(queries.news_by_category("sports", u64::MAX / 2, 10).await, Page::default());
    assert_eq!(queries.news_by_tag("music", u64::MAX / 2, 10).await, Page::default());
    assert!(recording.calls().await.is_empty());
}

#[tokio::test]
async fn category_and_tag_listings_filter_embedded_slug() {
    let backend = RecordingBackend::new().counted(
        "news",
        vec![article_row(1, "a", "2025-03-01T09:00:00Z", &[tag_row(3, "music")])],
        1,
    );
    let (recording, backend) = shared(backend);
    let queries = ContentQueries::new(backend);

    let by_category = queries.news_by_category("sports", 1, 10).await;
    assert_eq!(by_category.total, 1);
    assert!(!by_category.has_more);
    let by_tag = queries.news_by_tag("music", 1, 10).await;
    assert_eq!(by_tag.items[0].tags[0].slug, "music");

    let calls = recording.calls_for("news").await;
    assert!(calls[0].has_filter(&eq("category.slug", "sports")));
    assert!(calls[0].select.contains("categories!inner"));
    assert!(calls[1].has_filter(&eq("tag_match.tag.slug", "music")));
    assert!(calls[1].select.contains("tags:news_tags(tag:tags(*))"));
    assert_eq!(calls[1].range, Some((0, 9)));
}

#[tokio::test]
async fn date_archive_uses_calendar_month_bounds() {
    let backend = RecordingBackend::new();
    let (recording, backend) = shared(backend);
    let queries = ContentQueries::new(backend);

    queries.news_by_date_archive("2025", "2").await;
    let q = &recording.calls_for("news").await[0];
    assert!(q.has_filter(&Filter::Gte("published_at".into(), "2025-02-01".into())));
    assert!(q.has_filter(&Filter::Lt("published_at".into(), "2025-03-01".into())));
    assert_eq!(q.order, vec![("published_at".to_string(), Direction::Desc)]);
}

#[tokio::test]
async fn invalid_archive_month_is_empty_without_query() {
    let (recording, backend) = shared(RecordingBackend::new());
    let queries = ContentQueries::new(backend);
    assert!(queries.news_by_date_archive("2025", "13").await.is_empty());
    assert!(recording.calls().await.is_empty());
}

#[tokio::test]
async fn fail_soft_queries_return_empty_values() {
    let backend = RecordingBackend::new()
        .failing("news")
        .failing("events")
        .failing("categories");
    let (_, backend) = shared(backend);
    let queries = ContentQueries::new(backend);

    assert!(queries.featured_news(5).await.is_empty());
    assert!(queries.upcoming_events(None).await.is_empty());
    assert!(queries.active_categories().await.is_empty());
    assert!(queries.article_by_slug("x").await.is_none());
    assert!(queries.event_by_slug("x").await.is_none());
    assert!(queries.related_articles("x", None, 3).await.is_empty());
    assert!(queries.related_events("x", None, 3).await.is_empty());
    assert!(queries.news_by_date_archive("2025", "01").await.is_empty());
    assert_eq!(queries.news_by_category("x", 1, 10).await, Page::default());
    assert_eq!(queries.news_by_tag("x", 1, 10).await, Page::default());

    let page = queries.news_archive(1, 10).await;
    assert!(page.items.is_empty());
    assert_eq!(page.total, 0);
    assert!(!page.has_more);

    assert!(!queries.check_health().await);
    assert_eq!(queries.content_counts().await, ContentCounts::default());
}

#[tokio::test]
async fn bad_rows_are_skipped_not_the_listing() {
    let mut null_content = article_row(1, "no-body", "2025-03-01T09:00:00Z", &[]);
    null_content["content"] = serde_json::Value::Null;
    let backend = RecordingBackend::new()
        .rows(
            "news",
            vec![
                null_content,
                serde_json::json!({ "id": "not-a-number" }),
                article_row(2, "science-week", "2025-02-10T09:00:00Z", &[]),
            ],
        )
        .rows(
            "events",
            vec![
                {
                    let mut row = event_row(1, "open-day", "2025-05-10");
                    row["is_all_day"] = serde_json::Value::Null;
                    row
                },
                serde_json::json!({ "id": 9, "title": "missing start", "slug": "x" }),
            ],
        );
    let (_, backend) = shared(backend);
    let queries = ContentQueries::new(backend);

    let articles = queries.featured_news(5).await;
    let slugs: Vec<_> = articles.iter().map(|a| a.slug.as_str()).collect();
    assert_eq!(slugs, vec!["no-body", "science-week"]);
    assert_eq!(articles[0].content, "");

    let today = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
    let events = queries.upcoming_events_from(today, None).await;
    assert_eq!(events.len(), 1);
    assert!(!events[0].is_all_day);
}

#[tokio::test]
async fn malformed_rows_are_fail_soft() {
    let backend = RecordingBackend::new().rows("news", vec![serde_json::json!({ "unexpected": true })]);
    let (_, backend) = shared(backend);
    let queries = ContentQueries::new(backend);
    assert!(queries.featured_news(5).await.is_empty());
}

#[tokio::test]
async fn content_counts_settle_independently() {
    let backend = RecordingBackend::new()
        .counted("news", vec![], 42)
        .failing("events")
        .counted("categories", vec![], 6);
    let (recording, backend) = shared(backend);
    let queries = ContentQueries::new(backend);

    let counts = queries.content_counts().await;
    assert_eq!(
        counts,
        ContentCounts {
            news: 42,
            events: 0,
            categories: 6
        }
    );
    assert!(recording.calls().await.iter().all(|q| q.head && q.exact_count));
}

#[tokio::test]
async fn health_check_probes_categories() {
    let (recording, backend) = shared(RecordingBackend::new());
    let queries = ContentQueries::new(backend);
    assert!(queries.check_health().await);
    let q = &recording.calls().await[0];
    assert_eq!(q.table, "categories");
    assert_eq!(q.limit, Some(1));
}
