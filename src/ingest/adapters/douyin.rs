// src/ingest/adapters/douyin.rs
use once_cell::sync::Lazy;
use regex::Regex;

use super::{decode_amp, SiteAdapter};
use crate::ingest::types::{Download, FeedItem};

static RE_DIRECT_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#".*<a href="(.*)" rel="noreferrer">视频直链</a>"#).expect("direct link regex")
});

const UNSAFE_CHARS: &[char] = &[
    '!', '@', '#', '$', '%', '^', '*', '&', '.', ',', '\\', '/', '|', '~', '?', ']', '[', '{',
    '}', '<', '>', ':', '"',
];

/// One "direct link" anchor per post. Video identities are URL-hashed but the
/// file is named after the post title so it stays readable on disk.
pub struct DirectVideoLink;

impl SiteAdapter for DirectVideoLink {
    fn parse(&self, item: &FeedItem, seed: &str) -> Vec<Download> {
        let des = &item.description;
        let mut caps = RE_DIRECT_LINK.captures_iter(des);
        let (Some(only), None) = (caps.next(), caps.next()) else {
            return Vec::new();
        };
        let Some(url) = only.get(1).filter(|_| only.len() == 2) else {
            return Vec::new();
        };

        let name = format!("{}_{}.mp4", seed_suffix(seed, 5), sanitize_title(&item.title));
        vec![Download::new(decode_amp(url.as_str()), des.clone()).with_file_name(name)]
    }
}

/// Replaces characters that are unsafe in file names with `_`.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Trailing `n` characters of the seed, or the whole seed if shorter.
fn seed_suffix(seed: &str, n: usize) -> &str {
    let count = seed.chars().count();
    if count <= n {
        return seed;
    }
    match seed.char_indices().nth(count - n) {
        Some((i, _)) => &seed[i..],
        None => seed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, des: &str) -> FeedItem {
        FeedItem {
            title: title.into(),
            description: des.into(),
            ..Default::default()
        }
    }

    #[test]
    fn builds_forced_name_from_title_and_seed_suffix() {
        let it = item(
            "hello/world? #1",
            r#"<video></video><a href="https://v.example/play?id=1&amp;r=2" rel="noreferrer">视频直链</a>"#,
        );
        let out = DirectVideoLink.parse(&it, "MS4wLjABAAAAxyz12");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url, "https://v.example/play?id=1&r=2");
        assert_eq!(out[0].file_name.as_deref(), Some("xyz12_hello_world_ _1.mp4"));
        assert_eq!(out[0].identity(), "https://v.example/play?id=1&r=2");
    }

    #[test]
    fn short_seed_is_used_whole() {
        let it = item("t", r#"<a href="https://v/1" rel="noreferrer">视频直链</a>"#);
        let out = DirectVideoLink.parse(&it, "ab");
        assert_eq!(out[0].file_name.as_deref(), Some("ab_t.mp4"));
    }

    #[test]
    fn no_anchor_means_no_download() {
        let it = item("t", r#"<a href="https://v/1">open</a>"#);
        assert!(DirectVideoLink.parse(&it, "seed").is_empty());
    }

    #[test]
    fn seed_suffix_respects_char_boundaries() {
        assert_eq!(seed_suffix("抖音用户名字很长", 5), "户名字很长");
        assert_eq!(seed_suffix("abcdef", 5), "bcdef");
    }
}
