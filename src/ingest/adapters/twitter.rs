// src/ingest/adapters/twitter.rs
use once_cell::sync::Lazy;
use regex::Regex;

use super::{captures_with_arity, decode_amp, tagged, SiteAdapter};
use crate::ingest::types::{Download, FeedItem};

static RE_STYLED_IMG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<img style.*? src="(.*?=orig)"+"#).expect("styled img regex"));

/// Inline `<img style=... src="...=orig">` tags pointing at original-size media.
pub struct StyledImage;

impl SiteAdapter for StyledImage {
    fn parse(&self, item: &FeedItem, seed: &str) -> Vec<Download> {
        let des = &item.description;
        captures_with_arity(&RE_STYLED_IMG, des, 2)
            .into_iter()
            .map(|u| Download::new(decode_amp(&u), tagged(des, seed)))
            .collect()
    }
}
