// src/ingest/scheduler.rs
use anyhow::Result;
use metrics::{counter, gauge};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

use crate::context::PipelineContext;
use crate::ingest::config::{Conf, PipelineSettings};
use crate::ingest::types::FetchTask;
use crate::ingest::{run_task, TaskReport};

/// Pool shape and producer throttle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerCfg {
    pub workers: usize,
    pub queue_capacity: usize,
    pub throttle_every: usize,
    pub throttle_pause: Duration,
}

impl From<&PipelineSettings> for SchedulerCfg {
    fn from(s: &PipelineSettings) -> Self {
        Self {
            workers: s.workers.max(1),
            queue_capacity: s.queue_capacity.max(1),
            throttle_every: s.throttle_every,
            throttle_pause: Duration::from_millis(s.throttle_pause_ms),
        }
    }
}

/// Local date used for the daily folder partition, fixed once per run.
pub fn today() -> String {
    chrono::Local::now().format("%Y%m%d").to_string()
}

/// Account x seed x endpoint variant, in config order.
pub fn expand_tasks(conf: &Conf, date: &str) -> Result<Vec<FetchTask>> {
    let mut out = Vec::new();
    for account in &conf.accounts {
        let kind = account.kind()?;

        let mut folder = PathBuf::from(&account.dir);
        if kind.date_partitioned() && !account.no_date {
            folder.push(date);
        }

        let fallback = [kind.tag().to_string()];
        let seeds: &[String] = if account.seeds.is_empty() && !kind.is_seeded() {
            &fallback
        } else {
            &account.seeds
        };

        for seed in seeds {
            for variant in kind.variants() {
                out.push(FetchTask {
                    kind,
                    seed: seed.clone(),
                    folder: folder.clone(),
                    feed_url: kind.feed_url(&account.url, &conf.rsshub_url, seed, variant),
                    feed_route: kind.feed_route(account),
                    content_route: kind.content_route(account),
                    no_desc: account.no_desc,
                });
            }
        }
    }
    Ok(out)
}

/// Feed `tasks` through a bounded queue to a fixed set of workers and sum their reports.
///
/// The producer blocks when the queue is full and additionally sleeps after
/// every `throttle_every` enqueues so the feed gateway is not hit in bursts.
pub async fn run_pool(
    ctx: Arc<PipelineContext>,
    tasks: Vec<FetchTask>,
    cfg: SchedulerCfg,
) -> TaskReport {
    let total = tasks.len();
    let (tx, rx) = mpsc::channel::<FetchTask>(cfg.queue_capacity.max(1));
    let rx = Arc::new(Mutex::new(rx));

    let producer = tokio::spawn(async move {
        for (i, task) in tasks.into_iter().enumerate() {
            if tx.send(task).await.is_err() {
                tracing::warn!(target: "scheduler", "all workers gone, stop enqueueing");
                break;
            }
            gauge!("scheduler_enqueued").set((i + 1) as f64);
            if cfg.throttle_every > 0 && (i + 1) % cfg.throttle_every == 0 && i + 1 < total {
                tokio::time::sleep(cfg.throttle_pause).await;
            }
        }
        // dropping tx closes the queue
    });

    let mut workers = Vec::with_capacity(cfg.workers);
    for id in 0..cfg.workers.max(1) {
        let rx = Arc::clone(&rx);
        let ctx = Arc::clone(&ctx);
        workers.push(tokio::spawn(async move {
            let mut report = TaskReport::default();
            loop {
                // lock only for the dequeue, never across a task
                let next = rx.lock().await.recv().await;
                let Some(task) = next else { break };
                tracing::debug!(target: "scheduler", worker = id, url = %task.feed_url, "picked task");
                report += run_isolated(Arc::clone(&ctx), task).await;
            }
            report
        }));
    }
    // workers hold the only receivers now; if they all exit, `send` fails instead of blocking
    drop(rx);

    if let Err(e) = producer.await {
        tracing::error!(target: "scheduler", "producer panicked: {e}");
    }

    let mut summary = TaskReport::default();
    for w in workers {
        match w.await {
            Ok(r) => summary += r,
            Err(e) => tracing::error!(target: "scheduler", "worker panicked: {e}"),
        }
    }
    summary
}

/// Runs one task on its own tokio task so a panic costs that task only.
async fn run_isolated(ctx: Arc<PipelineContext>, task: FetchTask) -> TaskReport {
    let kind = task.kind;
    let url = task.feed_url.clone();
    match tokio::spawn(async move { run_task(&ctx, &task).await }).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(target: "scheduler", source = %kind, %url, "task panicked: {e}");
            counter!("scheduler_task_panics_total").increment(1);
            TaskReport {
                tasks: 1,
                crashed: 1,
                ..Default::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Route;
    use crate::ingest::config::Account;
    use crate::ingest::source::SourceKind;

    fn conf(accounts: Vec<Account>) -> Conf {
        Conf {
            accounts,
            ..Default::default()
        }
    }

    #[test]
    fn twitter_seeds_expand_to_both_endpoints_with_date() {
        let c = conf(vec![Account {
            dir: "tw".into(),
            seeds: vec!["a".into(), "b".into()],
            r#type: "twitter".into(),
            ..Default::default()
        }]);
        let tasks = expand_tasks(&c, "20240102").unwrap();
        let urls: Vec<_> = tasks.iter().map(|t| t.feed_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://rsshub.rssforever.com/twitter/media/a",
                "https://rsshub.rssforever.com/twitter/user/a",
                "https://rsshub.rssforever.com/twitter/media/b",
                "https://rsshub.rssforever.com/twitter/user/b",
            ]
        );
        assert!(tasks.iter().all(|t| t.folder == PathBuf::from("tw/20240102")));
        assert!(tasks.iter().all(|t| t.content_route == Route::Proxied));
    }

    #[test]
    fn no_date_and_seedless_sources() {
        let c = conf(vec![
            Account {
                dir: "tg".into(),
                seeds: vec!["chan".into()],
                r#type: "telegramchannel".into(),
                no_date: true,
                ..Default::default()
            },
            Account {
                dir: "art".into(),
                r#type: "dailyart".into(),
                ..Default::default()
            },
            Account {
                dir: "dy".into(),
                r#type: "douyin".into(),
                ..Default::default()
            },
        ]);
        let tasks = expand_tasks(&c, "20240102").unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].folder, PathBuf::from("tg"));
        assert_eq!(tasks[1].kind, SourceKind::DailyArt);
        assert_eq!(tasks[1].seed, "dailyart");
        assert_eq!(tasks[1].folder, PathBuf::from("art"));
    }

    #[test]
    fn unknown_type_is_an_error() {
        let c = conf(vec![Account {
            dir: "x".into(),
            r#type: "friendster".into(),
            ..Default::default()
        }]);
        assert!(expand_tasks(&c, "20240102").is_err());
    }

    #[test]
    fn settings_are_clamped() {
        let s = PipelineSettings {
            workers: 0,
            queue_capacity: 0,
            ..Default::default()
        };
        let cfg = SchedulerCfg::from(&s);
        assert_eq!(cfg.workers, 1);
        assert_eq!(cfg.queue_capacity, 1);
    }
}
