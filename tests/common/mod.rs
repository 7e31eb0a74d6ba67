// tests/common/mod.rs
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use feedpics::fetch::{Fetcher, Route};
use feedpics::ingest::source::SourceKind;
use feedpics::ingest::types::{FeedItem, FeedSource, FetchTask};
use feedpics::PipelineContext;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Feed URL -> items; unknown URLs fail like an unreachable gateway and
/// URLs under `/explode/` panic inside the task.
#[derive(Default)]
pub struct FakeFeeds {
    pub feeds: HashMap<String, Vec<FeedItem>>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl FeedSource for FakeFeeds {
    async fn fetch_feed(&self, url: &str, _ua: &str, _route: Route) -> Result<Vec<FeedItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if url.contains("/explode/") {
            panic!("feed handler blew up on {url}");
        }
        self.feeds
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("502 Bad Gateway for {url}"))
    }
}

pub enum Asset {
    Body(Vec<u8>),
    NotFound,
    Broken,
}

/// Asset URL -> canned response, with a log of every fetch.
#[derive(Default)]
pub struct FakeFetcher {
    pub assets: HashMap<String, Asset>,
    pub fetched: Mutex<Vec<(Route, String)>>,
}

impl FakeFetcher {
    pub fn calls(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, route: Route, url: &str) -> Result<Option<Vec<u8>>> {
        self.fetched.lock().unwrap().push((route, url.to_string()));
        match self.assets.get(url) {
            Some(Asset::Body(b)) => Ok(Some(b.clone())),
            Some(Asset::NotFound) => Ok(None),
            Some(Asset::Broken) | None => Err(anyhow!("connection reset fetching {url}")),
        }
    }
}

/// Smallest stream the JPEG embedder accepts: SOI, APP0, SOS, data, EOI.
pub fn tiny_jpeg(fill: u8, len: usize) -> Vec<u8> {
    let mut j = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    j.extend_from_slice(b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0");
    j.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x04, 0x01, 0x02]);
    j.extend(std::iter::repeat(fill).take(len));
    j.extend_from_slice(&[0xFF, 0xD9]);
    j
}

pub fn item(description: &str) -> FeedItem {
    FeedItem {
        description: description.to_string(),
        ..Default::default()
    }
}

pub fn task(kind: SourceKind, seed: &str, folder: &str, feed_url: &str) -> FetchTask {
    FetchTask {
        kind,
        seed: seed.to_string(),
        folder: PathBuf::from(folder),
        feed_url: feed_url.to_string(),
        feed_route: Route::Direct,
        content_route: Route::Direct,
        no_desc: false,
    }
}

pub fn context(root: &Path, feeds: Arc<FakeFeeds>, fetcher: Arc<FakeFetcher>) -> PipelineContext {
    PipelineContext::new(root.to_path_buf(), "feedpics-test".into(), feeds, fetcher)
}

/// Every regular file under `dir`, relative, sorted.
pub fn files_under(dir: &Path) -> Vec<PathBuf> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<PathBuf>) {
        let Ok(rd) = std::fs::read_dir(dir) else { return };
        for e in rd.flatten() {
            let p = e.path();
            if p.is_dir() {
                walk(base, &p, out);
            } else {
                out.push(p.strip_prefix(base).unwrap().to_path_buf());
            }
        }
    }
    let mut out = Vec::new();
    walk(dir, dir, &mut out);
    out.sort();
    out
}
