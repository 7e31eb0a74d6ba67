// tests/metrics.rs
mod common;

use common::*;
use feedpics::ingest::source::SourceKind;
use feedpics::metrics::Metrics;
use feedpics::run_task;
use std::sync::Arc;

// Single test: the recorder is process-global and can only be installed once.
#[tokio::test]
async fn textfile_contains_pipeline_series() {
    let metrics = Metrics::init().expect("recorder installs once per test binary");

    let tmp = tempfile::tempdir().unwrap();
    let url = "https://hub/telegram/channel/m";
    let mut feeds = FakeFeeds::default();
    feeds.feeds.insert(
        url.into(),
        vec![item(r#"<img src="http://x/m.jpg" referrerpolicy="no-referrer">"#)],
    );
    let mut fetcher = FakeFetcher::default();
    fetcher
        .assets
        .insert("http://x/m.jpg".into(), Asset::Body(tiny_jpeg(3, 4)));
    let ctx = context(tmp.path(), Arc::new(feeds), Arc::new(fetcher));
    run_task(&ctx, &task(SourceKind::TelegramChannel, "m", "tg", url)).await;

    let out = tmp.path().join("metrics/feedpics.prom");
    metrics.write_textfile(&out).unwrap();
    let body = std::fs::read_to_string(&out).unwrap();

    for series in ["ingest_tasks_total", "ingest_items_total", "ingest_published_total", "ingest_task_ms"] {
        assert!(body.contains(series), "missing {series} in:\n{body}");
    }
    assert!(!tmp.path().join("metrics/feedpics.prom.tmp").exists());
}
