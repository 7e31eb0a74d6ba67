// src/ingest/types.rs
use anyhow::Result;
use std::path::PathBuf;

use crate::fetch::Route;
use crate::ingest::source::SourceKind;

/// One entry of a syndication feed, as handed over by the feed source.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub description: String,
    pub guid: String,
    pub link: Option<String>,
}

/// What an adapter wants fetched for one feed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub url: String,
    /// Text stamped into the image metadata (description, usually plus `@seed`).
    pub provenance: String,
    /// Dedup key; falls back to `url`.
    pub identity: Option<String>,
    /// Full file name (with extension) overriding the hash-derived one.
    pub file_name: Option<String>,
}

impl Download {
    pub fn new(url: impl Into<String>, provenance: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            provenance: provenance.into(),
            identity: None,
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn identity(&self) -> &str {
        self.identity.as_deref().unwrap_or(&self.url)
    }
}

/// One feed URL to drain, produced by the scheduler and consumed by exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTask {
    pub kind: SourceKind,
    pub seed: String,
    /// Relative to `<root>/pics`, e.g. `twitter/20240101`.
    pub folder: PathBuf,
    pub feed_url: String,
    pub feed_route: Route,
    pub content_route: Route,
    pub no_desc: bool,
}

/// Turns a feed URL into structured items (RSS/Atom parsing lives behind this seam).
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_feed(&self, url: &str, user_agent: &str, route: Route) -> Result<Vec<FeedItem>>;
}
