// src/ingest/adapters/common.rs
use once_cell::sync::Lazy;
use regex::Regex;

use super::{captures_with_arity, decode_amp, SiteAdapter};
use crate::ingest::types::{Download, FeedItem};

static RE_PLAIN_IMG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#".*?<img src="(.*?://.*?.jpg)".*?>+"#).expect("plain img regex"));

/// Generic `<img src="scheme://....jpg">` galleries.
pub struct PlainImage;

impl SiteAdapter for PlainImage {
    fn parse(&self, item: &FeedItem, _seed: &str) -> Vec<Download> {
        let des = &item.description;
        captures_with_arity(&RE_PLAIN_IMG, des, 2)
            .into_iter()
            .map(|u| Download::new(decode_amp(&u), des.clone()))
            .collect()
    }
}
