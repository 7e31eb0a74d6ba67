// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod context;
pub mod embed;
pub mod fetch;
pub mod ingest;
pub mod metrics;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::context::PipelineContext;
pub use crate::ingest::config::{Account, Conf};
pub use crate::ingest::scheduler::{expand_tasks, run_pool, SchedulerCfg};
pub use crate::ingest::{run_task, ItemOutcome, TaskReport};

use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// One archival pass over every configured account.
///
/// Only setup problems (bad account types, unbuildable HTTP clients) are
/// returned as errors; feed and item failures end up in the report.
pub async fn run_archive(conf: &Conf) -> anyhow::Result<TaskReport> {
    let t0 = Instant::now();
    let date = ingest::scheduler::today();
    let tasks = expand_tasks(conf, &date)?;
    let ctx = Arc::new(PipelineContext::from_conf(conf)?);

    info!(
        target: "scheduler",
        tasks = tasks.len(),
        workers = conf.pipeline.workers,
        root = %conf.photo_dir.display(),
        "archive run starting"
    );
    let report = run_pool(ctx, tasks, SchedulerCfg::from(&conf.pipeline)).await;
    info!(
        target: "scheduler",
        tasks = report.tasks,
        feed_failures = report.feed_failures,
        published = report.published,
        already_done = report.already_done,
        discarded = report.discarded,
        failed = report.failed,
        crashed = report.crashed,
        ms = t0.elapsed().as_millis() as u64,
        "archive run finished"
    );
    Ok(report)
}
