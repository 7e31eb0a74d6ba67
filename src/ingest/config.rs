// src/ingest/config.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::source::SourceKind;

pub const ENV_CONFIG_PATH: &str = "FEEDPICS_CONFIG";
const FALLBACK_PATHS: [&str; 3] = ["conf.yaml", "config/feedpics.yaml", "config/feedpics.toml"];

/// A configured source: where it lands on disk, which seeds to poll and how.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub dir: String,
    #[serde(default)]
    pub seeds: Vec<String>,
    pub r#type: String,
    /// Skip provenance embedding.
    #[serde(default)]
    pub no_desc: bool,
    /// Skip the `YYYYMMDD` folder partition.
    #[serde(default)]
    pub no_date: bool,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub feed_use_proxy: bool,
    #[serde(default)]
    pub content_use_proxy: bool,
}

impl Account {
    pub fn kind(&self) -> Result<SourceKind> {
        self.r#type
            .parse()
            .with_context(|| format!("account `{}`", self.dir))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpProxy {
    #[serde(default)]
    pub use_proxy: bool,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    /// "http" | "https" | "socks5" | "socks5h"
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
}

impl HttpProxy {
    pub fn url(&self) -> String {
        let scheme = if self.protocol.trim().is_empty() {
            "http"
        } else {
            self.protocol.trim()
        };
        format!("{}://{}:{}", scheme.to_ascii_lowercase(), self.host.trim(), self.port)
    }
}

fn default_workers() -> usize {
    8
}
fn default_queue_capacity() -> usize {
    16
}
fn default_throttle_every() -> usize {
    10
}
fn default_throttle_pause_ms() -> u64 {
    1_000
}
fn default_timeout_secs() -> u64 {
    45
}
fn default_user_agent() -> String {
    concat!("Mozilla/5.0 (compatible; feedpics/", env!("CARGO_PKG_VERSION"), ")").to_string()
}

/// Knobs of the worker pool and HTTP clients. All optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Pause the producer after this many enqueues.
    #[serde(default = "default_throttle_every")]
    pub throttle_every: usize,
    #[serde(default = "default_throttle_pause_ms")]
    pub throttle_pause_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    /// Prometheus textfile written after each run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_textfile: Option<PathBuf>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            throttle_every: default_throttle_every(),
            throttle_pause_ms: default_throttle_pause_ms(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            accept_invalid_certs: false,
            metrics_textfile: None,
        }
    }
}

fn default_photo_dir() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conf {
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub http_proxy: HttpProxy,
    #[serde(default)]
    pub rsshub_url: String,
    #[serde(default = "default_photo_dir")]
    pub photo_dir: PathBuf,
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

impl Default for Conf {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            http_proxy: HttpProxy::default(),
            rsshub_url: String::new(),
            photo_dir: default_photo_dir(),
            pipeline: PipelineSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Toml,
    Json,
}

impl Format {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(Format::Yaml),
            "toml" => Some(Format::Toml),
            "json" => Some(Format::Json),
            _ => None,
        }
    }

    fn parse(self, s: &str) -> Result<Conf> {
        Ok(match self {
            Format::Yaml => serde_yaml::from_str(s)?,
            Format::Toml => toml::from_str(s)?,
            Format::Json => serde_json::from_str(s)?,
        })
    }

    fn render(self, conf: &Conf) -> Result<String> {
        Ok(match self {
            Format::Yaml => serde_yaml::to_string(conf)?,
            Format::Toml => toml::to_string_pretty(conf)?,
            Format::Json => serde_json::to_string_pretty(conf)?,
        })
    }
}

impl Conf {
    /// Load from an explicit path. YAML, TOML or JSON, chosen by extension.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        parse_conf(&content, Format::from_path(path))
            .with_context(|| format!("parsing config {}", path.display()))
    }

    /// Fail fast on anything that would otherwise surface mid-run.
    pub fn validate(&self) -> Result<()> {
        for a in &self.accounts {
            a.kind()?;
            if a.dir.trim().is_empty() {
                bail!("account of type `{}` has an empty dir", a.r#type);
            }
        }

        let p = &self.http_proxy;
        if p.use_proxy {
            if p.host.trim().is_empty() {
                bail!("http_proxy.use_proxy is set but http_proxy.host is empty");
            }
            let proto = p.protocol.trim().to_ascii_lowercase();
            if !matches!(proto.as_str(), "" | "http" | "https" | "socks5" | "socks5h") {
                bail!("unsupported http_proxy.protocol `{proto}`");
            }
        }

        if self.pipeline.workers == 0 {
            bail!("pipeline.workers must be at least 1");
        }
        Ok(())
    }
}

fn parse_conf(s: &str, hint: Option<Format>) -> Result<Conf> {
    if let Some(f) = hint {
        return f.parse(s);
    }
    // Unknown extension: YAML is a superset of JSON, so try it first.
    for f in [Format::Yaml, Format::Toml] {
        if let Ok(c) = f.parse(s) {
            return Ok(c);
        }
    }
    Err(anyhow!("unsupported config format"))
}

/// Config path resolution:
/// 1) explicit path (CLI)
/// 2) $FEEDPICS_CONFIG
/// 3) conf.yaml, config/feedpics.yaml, config/feedpics.toml
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = explicit {
        return Ok(p.to_path_buf());
    }
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Ok(pb);
        }
        return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
    }
    FALLBACK_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| anyhow!("no config file found (tried {})", FALLBACK_PATHS.join(", ")))
}

/// Rewrite the config with every account's seeds sorted. Offline maintenance, not part of a run.
pub fn format_conf(path: &Path) -> Result<Conf> {
    let mut conf = Conf::load_from(path)?;
    for a in conf.accounts.iter_mut() {
        a.seeds.sort();
    }

    let out = Format::from_path(path).unwrap_or(Format::Yaml).render(&conf)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, out).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(conf)
}
