// src/ingest/adapters/telegram.rs
use once_cell::sync::Lazy;
use regex::Regex;

use super::{captures_with_arity, decode_amp, tagged, SiteAdapter};
use crate::ingest::types::{Download, FeedItem};

static RE_REFERRER_IMG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<img src="(.*?\.(jpg|png))" referrerpolicy="no-referrer">+"#)
        .expect("referrer img regex")
});

/// `<img src="...jpg|png" referrerpolicy="no-referrer">` as rendered for channels and 35photo.
pub struct ReferrerPolicyImage;

impl SiteAdapter for ReferrerPolicyImage {
    fn parse(&self, item: &FeedItem, seed: &str) -> Vec<Download> {
        let des = &item.description;
        // whole match + url + extension
        captures_with_arity(&RE_REFERRER_IMG, des, 3)
            .into_iter()
            .map(|u| Download::new(decode_amp(&u), tagged(des, seed)))
            .collect()
    }
}
