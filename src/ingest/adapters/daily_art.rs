// src/ingest/adapters/daily_art.rs
use super::{decode_amp, tagged, SiteAdapter};
use crate::ingest::types::{Download, FeedItem};

/// The item GUID is the artwork image itself; the body is not parsed.
pub struct GuidLink;

impl SiteAdapter for GuidLink {
    fn parse(&self, item: &FeedItem, seed: &str) -> Vec<Download> {
        let guid = item.guid.trim();
        if guid.is_empty() {
            return Vec::new();
        }
        vec![Download::new(decode_amp(guid), tagged(&item.description, seed))]
    }
}
