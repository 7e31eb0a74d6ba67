// src/context.rs
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use crate::embed::{CommentEmbedder, ProvenanceEmbedder};
use crate::fetch::{Clients, Fetcher, HttpFetcher};
use crate::ingest::config::Conf;
use crate::ingest::feed::HttpFeedSource;
use crate::ingest::types::FeedSource;
use crate::store::{IdentityIndex, Publisher};

/// Everything a worker needs, built once per run and shared read-only.
#[derive(Clone)]
pub struct PipelineContext {
    /// `<root>/pics`
    pub pics_dir: PathBuf,
    pub user_agent: String,
    pub feeds: Arc<dyn FeedSource>,
    pub fetcher: Arc<dyn Fetcher>,
    pub embedder: Arc<dyn CommentEmbedder>,
    pub index: IdentityIndex,
    pub publisher: Publisher,
}

impl PipelineContext {
    /// HTTP-backed context for a real run.
    pub fn from_conf(conf: &Conf) -> Result<Self> {
        let clients = Clients::build(&conf.http_proxy, &conf.pipeline)?;
        Ok(Self::new(
            conf.photo_dir.clone(),
            conf.pipeline.user_agent.clone(),
            Arc::new(HttpFeedSource::new(clients.clone())),
            Arc::new(HttpFetcher::new(clients)),
        ))
    }

    /// Context rooted at `root` (holding `pics/` and `libpics/`) with the given collaborators.
    pub fn new(
        root: PathBuf,
        user_agent: String,
        feeds: Arc<dyn FeedSource>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        let index = IdentityIndex::new(root.join("libpics"));
        Self {
            pics_dir: root.join("pics"),
            user_agent,
            feeds,
            fetcher,
            embedder: Arc::new(ProvenanceEmbedder),
            publisher: Publisher::new(index.clone()),
            index,
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn CommentEmbedder>) -> Self {
        self.embedder = embedder;
        self
    }
}
