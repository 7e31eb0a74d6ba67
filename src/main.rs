//! feedpics binary entrypoint.
//! Loads the account config, then runs one archival pass (or reformats the config).

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedpics::ingest::config::{format_conf, resolve_config_path, ENV_CONFIG_PATH};
use feedpics::metrics::Metrics;
use feedpics::Conf;

#[derive(Debug, Parser)]
#[command(name = "feedpics", version, about = "Archive media referenced by syndication feeds")]
struct Cli {
    /// Config file (YAML, TOML or JSON).
    #[arg(short, long, env = ENV_CONFIG_PATH)]
    config: Option<PathBuf>,

    /// Override `photo_dir` from the config.
    #[arg(long)]
    root: Option<PathBuf>,

    /// Sort every account's seeds, rewrite the config file and exit.
    #[arg(long)]
    format: bool,
}

/// Compact human logs by default; JSON lines when FEEDPICS_LOG_JSON=1.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper_util=warn,reqwest=warn"));
    let json = std::env::var("FEEDPICS_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry
            .with(fmt::layer().compact().with_file(true).with_line_number(true))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env in local setups; no-op otherwise.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let path = resolve_config_path(cli.config.as_deref())?;

    if cli.format {
        let conf = format_conf(&path)?;
        tracing::info!(path = %path.display(), accounts = conf.accounts.len(), "config formatted");
        return Ok(());
    }

    let mut conf = Conf::load_from(&path)?;
    if let Some(root) = cli.root {
        conf.photo_dir = root;
    }
    conf.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;

    let metrics = Metrics::init()?;
    let report = feedpics::run_archive(&conf).await?;

    if let Some(p) = conf.pipeline.metrics_textfile.as_deref() {
        if let Err(e) = metrics.write_textfile(p) {
            tracing::warn!("metrics textfile: {e:#}");
        }
    }
    tracing::debug!(?report, "summary");
    Ok(())
}
