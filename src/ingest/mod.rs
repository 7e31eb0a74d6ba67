// src/ingest/mod.rs
//! Per-task pipeline: feed fetch, adapter parse, and for every download
//! index check -> fetch -> embed -> publish. Failures stay inside one item.

pub mod adapters;
pub mod config;
pub mod feed;
pub mod scheduler;
pub mod source;
pub mod types;

use anyhow::Result;
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use std::ops::AddAssign;
use std::time::Instant;

use crate::context::PipelineContext;
use crate::embed::FileKind;
use crate::ingest::types::{Download, FetchTask};
use crate::store::{identity_hash, PublishOutcome};

/// One-time metrics registration (so series show up in the exposition).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_tasks_total", "Feed tasks processed.");
        describe_counter!("ingest_feed_errors_total", "Feed fetch/parse failures.");
        describe_counter!("ingest_items_total", "Feed items seen.");
        describe_counter!("ingest_downloads_total", "Download descriptors produced by adapters.");
        describe_counter!("ingest_already_done_total", "Descriptors skipped by the identity index.");
        describe_counter!("ingest_published_total", "Assets promoted or replaced.");
        describe_counter!("ingest_discarded_total", "Payloads dropped by the publish conflict rules.");
        describe_counter!("ingest_item_errors_total", "Item failures (fetch, embed, publish).");
        describe_counter!("scheduler_task_panics_total", "Tasks that panicked inside a worker.");
        describe_counter!("fetch_soft_miss_total", "Asset responses other than 200.");
        describe_counter!("fetch_bytes_total", "Asset bytes downloaded.");
        describe_histogram!("fetch_ms", "Asset fetch time in milliseconds.");
        describe_histogram!("feed_parse_ms", "Feed parse time in milliseconds.");
        describe_histogram!("ingest_task_ms", "Whole feed task time in milliseconds.");
    });
}

/// What happened to one download descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    AlreadyDone,
    /// Non-200 response; nothing to publish.
    NoContent,
    Published(PublishOutcome),
}

/// Counters for one task; summed across workers for the run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskReport {
    pub tasks: usize,
    pub feed_failures: usize,
    pub items: usize,
    pub downloads: usize,
    pub already_done: usize,
    pub no_content: usize,
    pub published: usize,
    pub discarded: usize,
    pub failed: usize,
    /// Tasks that panicked; their partial counts are lost.
    pub crashed: usize,
}

impl AddAssign for TaskReport {
    fn add_assign(&mut self, o: Self) {
        self.tasks += o.tasks;
        self.feed_failures += o.feed_failures;
        self.items += o.items;
        self.downloads += o.downloads;
        self.already_done += o.already_done;
        self.no_content += o.no_content;
        self.published += o.published;
        self.discarded += o.discarded;
        self.failed += o.failed;
        self.crashed += o.crashed;
    }
}

impl TaskReport {
    fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::AlreadyDone => self.already_done += 1,
            ItemOutcome::NoContent => self.no_content += 1,
            ItemOutcome::Published(p) if p.is_published() => self.published += 1,
            ItemOutcome::Published(_) => self.discarded += 1,
        }
    }
}

/// Drain one feed. A feed failure ends the task; item failures are logged and skipped.
pub async fn run_task(ctx: &PipelineContext, task: &FetchTask) -> TaskReport {
    ensure_metrics_described();
    let t0 = Instant::now();
    let mut report = TaskReport {
        tasks: 1,
        ..Default::default()
    };
    counter!("ingest_tasks_total").increment(1);

    let items = match ctx
        .feeds
        .fetch_feed(&task.feed_url, &ctx.user_agent, task.feed_route)
        .await
    {
        Ok(items) => items,
        Err(e) => {
            tracing::error!(
                target: "ingest",
                error = %format!("{e:#}"),
                source = %task.kind,
                seed = %task.seed,
                url = %task.feed_url,
                "feed fetch failed, skipping task"
            );
            counter!("ingest_feed_errors_total").increment(1);
            report.feed_failures = 1;
            return report;
        }
    };
    tracing::info!(
        target: "ingest",
        source = %task.kind,
        seed = %task.seed,
        items = items.len(),
        ms = t0.elapsed().as_millis() as u64,
        "feed fetched"
    );

    let adapter = task.kind.adapter();
    for item in &items {
        report.items += 1;
        counter!("ingest_items_total").increment(1);

        for dl in adapter.parse(item, &task.seed) {
            report.downloads += 1;
            counter!("ingest_downloads_total").increment(1);

            match process_download(ctx, task, &dl).await {
                Ok(outcome) => report.record(&outcome),
                Err(e) => {
                    report.failed += 1;
                    counter!("ingest_item_errors_total").increment(1);
                    tracing::warn!(
                        target: "ingest",
                        error = %format!("{e:#}"),
                        source = %task.kind,
                        seed = %task.seed,
                        url = %dl.url,
                        desc = %snippet(&dl.provenance, 80),
                        "item failed"
                    );
                }
            }
        }
    }

    metrics::histogram!("ingest_task_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    tracing::info!(
        target: "ingest",
        source = %task.kind,
        seed = %task.seed,
        published = report.published,
        skipped = report.already_done,
        failed = report.failed,
        ms = t0.elapsed().as_millis() as u64,
        "task done"
    );
    report
}

/// Index check -> fetch -> embed -> publish for one descriptor.
pub async fn process_download(
    ctx: &PipelineContext,
    task: &FetchTask,
    dl: &Download,
) -> Result<ItemOutcome> {
    let identity = dl.identity();

    // 1) seen before? (check-then-act; concurrent duplicates are settled by the publisher)
    if ctx.index.exists(identity).await? {
        tracing::debug!(target: "ingest", url = %dl.url, "already downloaded");
        counter!("ingest_already_done_total").increment(1);
        return Ok(ItemOutcome::AlreadyDone);
    }

    // 2) fetch
    let t0 = Instant::now();
    let Some(bytes) = ctx.fetcher.fetch(task.content_route, &dl.url).await? else {
        return Ok(ItemOutcome::NoContent);
    };

    // 3) stamp provenance
    let kind = FileKind::sniff(&bytes);
    let bytes = if task.no_desc {
        bytes
    } else {
        ctx.embedder.embed(kind, bytes, &dl.provenance)?
    };

    // 4) publish
    let (name, ext) = target_name(task, dl, kind);
    let dir = ctx.pics_dir.join(&task.folder);
    let outcome = ctx
        .publisher
        .publish(&bytes, &dir, &name, &ext, identity)
        .await?;

    if outcome.is_published() {
        counter!("ingest_published_total").increment(1);
    } else {
        counter!("ingest_discarded_total").increment(1);
    }
    tracing::info!(
        target: "ingest",
        url = %dl.url,
        file = %outcome.path().display(),
        ?outcome,
        bytes = bytes.len(),
        ms = t0.elapsed().as_millis() as u64,
        "done one"
    );
    Ok(ItemOutcome::Published(outcome))
}

/// `(name, ext)`: the forced file name split at its last dot, otherwise
/// `<seed-without-slashes>_<identity-hash>` plus the sniffed extension.
pub fn target_name(task: &FetchTask, dl: &Download, kind: FileKind) -> (String, String) {
    if let Some(forced) = dl.file_name.as_deref() {
        return match forced.rfind('.') {
            Some(i) if i > 0 => (forced[..i].to_string(), forced[i..].to_string()),
            _ => (forced.to_string(), String::new()),
        };
    }
    let seed = task.seed.replace('/', "");
    (
        format!("{seed}_{}", identity_hash(dl.identity())),
        kind.extension().to_string(),
    )
}

/// Decoded, tag-stripped, single-line prefix of a description for log context.
pub fn snippet(s: &str, max_chars: usize) -> String {
    static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("tags regex"));
    static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex"));

    let decoded = html_escape::decode_html_entities(s);
    let stripped = RE_TAGS.replace_all(&decoded, " ");
    let collapsed = RE_WS.replace_all(&stripped, " ");
    let trimmed = collapsed.trim();
    if trimmed.chars().count() > max_chars {
        let mut out: String = trimmed.chars().take(max_chars).collect();
        out.push('…');
        out
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Route;
    use crate::ingest::source::SourceKind;
    use std::path::PathBuf;

    fn task(seed: &str) -> FetchTask {
        FetchTask {
            kind: SourceKind::TelegramChannel,
            seed: seed.into(),
            folder: PathBuf::from("tg"),
            feed_url: "https://hub/telegram/channel/x".into(),
            feed_route: Route::Direct,
            content_route: Route::Direct,
            no_desc: false,
        }
    }

    #[test]
    fn derived_name_uses_seed_without_slashes_and_hash() {
        let dl = Download::new("http://x/a.jpg", "d");
        let (name, ext) = target_name(&task("a/b"), &dl, FileKind::Jpeg);
        assert_eq!(name, format!("ab_{}", identity_hash("http://x/a.jpg")));
        assert_eq!(ext, ".jpg");

        let (_, ext) = target_name(&task("a"), &dl, FileKind::Png);
        assert_eq!(ext, ".png");
    }

    #[test]
    fn forced_name_wins_verbatim() {
        let dl = Download::new("http://v/1", "d").with_file_name("xyz12_my title.mp4");
        let (name, ext) = target_name(&task("seed"), &dl, FileKind::Other);
        assert_eq!(name, "xyz12_my title");
        assert_eq!(ext, ".mp4");
    }

    #[test]
    fn report_sums_and_classifies() {
        let mut r = TaskReport::default();
        r.record(&ItemOutcome::AlreadyDone);
        r.record(&ItemOutcome::Published(PublishOutcome::Promoted("a".into())));
        r.record(&ItemOutcome::Published(PublishOutcome::KeptExisting("a".into())));
        let mut total = TaskReport::default();
        total += r;
        total += r;
        assert_eq!(total.already_done, 2);
        assert_eq!(total.published, 2);
        assert_eq!(total.discarded, 2);
    }

    #[test]
    fn snippet_strips_markup() {
        let s = snippet("<p>Hello&nbsp;<b>world</b></p>\n<img src=\"x\">", 80);
        assert_eq!(s, "Hello world");
        assert_eq!(snippet("abcdef", 3), "abc…");
    }
}
