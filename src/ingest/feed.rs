// src/ingest/feed.rs
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use once_cell::sync::Lazy;
use quick_xml::de::from_str;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::borrow::Cow;

use crate::fetch::{Clients, Route};
use crate::ingest::types::{FeedItem, FeedSource};

/// Element text, tolerant of attributes (`<guid isPermaLink="false">`, `<title type="html">`).
#[derive(Debug, Default, Deserialize)]
struct Text {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<Text>,
    link: Option<Text>,
    guid: Option<Text>,
    description: Option<Text>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: Option<Text>,
    title: Option<Text>,
    summary: Option<Text>,
    content: Option<Text>,
    #[serde(default)]
    link: Vec<AtomLink>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
}

fn text(t: Option<Text>) -> String {
    t.map(|t| t.value.trim().to_string()).unwrap_or_default()
}

/// Parses an RSS 2.0 or Atom document into feed items.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>> {
    let t0 = std::time::Instant::now();
    let xml = scrub_html_entities_for_xml(xml);

    let items = if is_atom(&xml) {
        let feed: AtomFeed = from_str(&xml).context("parsing atom xml")?;
        feed.entry
            .into_iter()
            .map(|e| {
                let summary = text(e.summary);
                FeedItem {
                    title: text(e.title),
                    description: if summary.is_empty() { text(e.content) } else { summary },
                    guid: text(e.id),
                    link: e.link.into_iter().find_map(|l| l.href),
                }
            })
            .collect()
    } else {
        let rss: Rss = from_str(&xml).context("parsing rss xml")?;
        rss.channel
            .item
            .into_iter()
            .map(|it| {
                let link = text(it.link);
                FeedItem {
                    title: text(it.title),
                    description: text(it.description),
                    guid: text(it.guid),
                    link: (!link.is_empty()).then_some(link),
                }
            })
            .collect()
    };

    histogram!("feed_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(items)
}

fn is_atom(xml: &str) -> bool {
    let mut end = xml.len().min(1024);
    while !xml.is_char_boundary(end) {
        end -= 1;
    }
    let head = &xml[..end];
    match (head.find("<feed"), head.find("<rss")) {
        (Some(_), None) => true,
        (Some(f), Some(r)) => f < r,
        _ => false,
    }
}

static RE_NAMED_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").expect("named entity regex"));

/// Resolves HTML named entities that XML does not define (`&hellip;`, `&copy;`, ...).
/// The five XML entities are left alone; anything that decodes to markup is re-escaped.
fn scrub_html_entities_for_xml(s: &str) -> Cow<'_, str> {
    RE_NAMED_ENTITY.replace_all(s, |c: &Captures| {
        let name = &c[1];
        if matches!(name, "lt" | "gt" | "amp" | "quot" | "apos") {
            return c[0].to_string();
        }
        if name == "nbsp" {
            return " ".to_string();
        }
        let decoded = html_escape::decode_html_entities(&c[0]);
        html_escape::encode_quoted_attribute(&decoded).into_owned()
    })
}

/// Fetches feeds over HTTP with the route-selected client.
pub struct HttpFeedSource {
    clients: Clients,
}

impl HttpFeedSource {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_feed(&self, url: &str, user_agent: &str, route: Route) -> Result<Vec<FeedItem>> {
        let resp = self
            .clients
            .get(route)
            .get(url)
            .header(reqwest::header::USER_AGENT, user_agent)
            .send()
            .await
            .with_context(|| format!("feed GET {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            bail!("feed {url} returned {status}");
        }
        let body = resp
            .text()
            .await
            .with_context(|| format!("reading feed body of {url}"))?;
        parse_feed(&body).with_context(|| format!("feed {url}"))
    }
}
