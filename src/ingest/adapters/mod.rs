// src/ingest/adapters/mod.rs
//! Site adapters: each one knows how a source family embeds media references
//! in its feed item bodies. Adapters are pure: no I/O, no panics on odd markup,
//! and an empty result when nothing matches.

pub mod common;
pub mod daily_art;
pub mod douyin;
pub mod telegram;
pub mod twitter;
pub mod wiki;

use crate::ingest::types::{Download, FeedItem};

pub trait SiteAdapter: Send + Sync {
    fn parse(&self, item: &FeedItem, seed: &str) -> Vec<Download>;
}

/// Feeds escape `&` inside attribute values; the fetchable URL needs it raw.
pub(crate) fn decode_amp(url: &str) -> String {
    url.replace("&amp;", "&")
}

/// Provenance text with the seed appended, e.g. `"<p>..</p>@channel"`.
pub(crate) fn tagged(description: &str, seed: &str) -> String {
    format!("{description}@{seed}")
}

/// Collects the single capture group of every match whose group count is exactly `arity`.
pub(crate) fn captures_with_arity(re: &regex::Regex, haystack: &str, arity: usize) -> Vec<String> {
    re.captures_iter(haystack)
        .filter(|c| c.len() == arity)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}
