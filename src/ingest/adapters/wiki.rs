// src/ingest/adapters/wiki.rs
use once_cell::sync::Lazy;
use regex::Regex;

use super::{captures_with_arity, decode_amp, SiteAdapter};
use crate::ingest::types::{Download, FeedItem};

static RE_THUMB_IMG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#".*<img.*?src="(//.*?.jpg)/+"#).expect("thumb img regex"));

/// Protocol-relative thumbnail URLs; dropping the `/thumb/` segment yields the full-size file.
pub struct ThumbnailImage;

impl SiteAdapter for ThumbnailImage {
    fn parse(&self, item: &FeedItem, _seed: &str) -> Vec<Download> {
        let des = &item.description;
        captures_with_arity(&RE_THUMB_IMG, des, 2)
            .into_iter()
            .map(|u| {
                let full = decode_amp(&u).replace("/thumb/", "/");
                Download::new(format!("https:{full}"), des.clone())
            })
            .collect()
    }
}
