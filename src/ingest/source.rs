// src/ingest/source.rs
//! Source families known to the archiver and their per-source policy:
//! which adapter parses them, where their feed lives, whether content goes
//! through the proxy and whether their folder is partitioned by day.

use anyhow::{anyhow, Result};
use std::fmt;
use std::str::FromStr;

use crate::fetch::Route;
use crate::ingest::adapters::{self, SiteAdapter};
use crate::ingest::config::Account;

pub const DEFAULT_RSSHUB_URL: &str = "https://rsshub.rssforever.com";
pub const DOUYIN_RSSHUB_URL: &str = "https://rsshub.codefine.site:6870";
pub const WALLPAPER_RSSHUB_URL: &str = "https://rsshub.app";
pub const WIKI_POTD_URL: &str =
    "https://zh.wikipedia.org/w/api.php?action=featuredfeed&feed=potd&feedformat=atom";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Twitter,
    TelegramChannel,
    ThirtyFivePhoto,
    WikiDailyPhoto,
    DailyArt,
    Douyin,
    Cnu,
    MmFan,
    WallPaper,
}

impl SourceKind {
    pub const ALL: [SourceKind; 9] = [
        SourceKind::Twitter,
        SourceKind::TelegramChannel,
        SourceKind::ThirtyFivePhoto,
        SourceKind::WikiDailyPhoto,
        SourceKind::DailyArt,
        SourceKind::Douyin,
        SourceKind::Cnu,
        SourceKind::MmFan,
        SourceKind::WallPaper,
    ];

    /// Tag used in the `type` field of an account.
    pub fn tag(self) -> &'static str {
        match self {
            SourceKind::Twitter => "twitter",
            SourceKind::TelegramChannel => "telegramchannel",
            SourceKind::ThirtyFivePhoto => "35photo",
            SourceKind::WikiDailyPhoto => "wikidailyphotorss",
            SourceKind::DailyArt => "dailyart",
            SourceKind::Douyin => "douyin",
            SourceKind::Cnu => "cnu",
            SourceKind::MmFan => "mmfan",
            SourceKind::WallPaper => "wallpaper",
        }
    }

    pub fn adapter(self) -> &'static dyn SiteAdapter {
        match self {
            SourceKind::Twitter => &adapters::twitter::StyledImage,
            SourceKind::TelegramChannel | SourceKind::ThirtyFivePhoto => {
                &adapters::telegram::ReferrerPolicyImage
            }
            SourceKind::WikiDailyPhoto => &adapters::wiki::ThumbnailImage,
            SourceKind::DailyArt => &adapters::daily_art::GuidLink,
            SourceKind::Douyin => &adapters::douyin::DirectVideoLink,
            SourceKind::Cnu | SourceKind::MmFan | SourceKind::WallPaper => {
                &adapters::common::PlainImage
            }
        }
    }

    /// Sub-endpoints polled per seed. Most sources have exactly one.
    pub fn variants(self) -> &'static [&'static str] {
        match self {
            SourceKind::Twitter => &["media", "user"],
            _ => &[""],
        }
    }

    /// Whether the feed URL carries the seed. Seedless feeds are polled once per seed entry.
    pub fn is_seeded(self) -> bool {
        matches!(
            self,
            SourceKind::Twitter
                | SourceKind::TelegramChannel
                | SourceKind::ThirtyFivePhoto
                | SourceKind::Douyin
        )
    }

    pub fn date_partitioned(self) -> bool {
        matches!(
            self,
            SourceKind::Twitter | SourceKind::TelegramChannel | SourceKind::ThirtyFivePhoto
        )
    }

    /// Hosts reachable only without the proxy.
    pub fn direct_only(self) -> bool {
        matches!(self, SourceKind::Douyin | SourceKind::Cnu | SourceKind::MmFan)
    }

    fn proxies_content_by_default(self) -> bool {
        matches!(
            self,
            SourceKind::Twitter | SourceKind::TelegramChannel | SourceKind::ThirtyFivePhoto
        )
    }

    pub fn feed_route(self, account: &Account) -> Route {
        if !self.direct_only() && account.feed_use_proxy {
            Route::Proxied
        } else {
            Route::Direct
        }
    }

    pub fn content_route(self, account: &Account) -> Route {
        if self.direct_only() {
            Route::Direct
        } else if account.content_use_proxy || self.proxies_content_by_default() {
            Route::Proxied
        } else {
            Route::Direct
        }
    }

    fn default_base(self) -> &'static str {
        match self {
            SourceKind::Douyin => DOUYIN_RSSHUB_URL,
            SourceKind::WallPaper => WALLPAPER_RSSHUB_URL,
            _ => DEFAULT_RSSHUB_URL,
        }
    }

    /// Builds the feed URL. The account `url` wins over the configured RSSHub
    /// instance; empty strings mean "not set".
    pub fn feed_url(self, account_url: &str, rsshub_url: &str, seed: &str, variant: &str) -> String {
        let base = if !account_url.is_empty() {
            account_url
        } else if !rsshub_url.is_empty() {
            rsshub_url
        } else {
            self.default_base()
        };
        let base = base.trim_end_matches('/');

        match self {
            // Not an RSSHub route: an override replaces the whole URL.
            SourceKind::WikiDailyPhoto if account_url.is_empty() => WIKI_POTD_URL.to_string(),
            SourceKind::WikiDailyPhoto => account_url.to_string(),
            SourceKind::Twitter => format!("{base}/twitter/{variant}/{seed}"),
            SourceKind::TelegramChannel => format!("{base}/telegram/channel/{seed}"),
            SourceKind::ThirtyFivePhoto => format!("{base}/35photo/{seed}"),
            SourceKind::Douyin => format!("{base}/douyin/user/{seed}"),
            SourceKind::DailyArt => format!("{base}/dailyart/zh"),
            SourceKind::Cnu => format!("{base}/cnu/selected"),
            SourceKind::MmFan => format!("{base}/95mm/tab/热门"),
            SourceKind::WallPaper => format!("{base}/konachan/post/popular_recent/1w"),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let t = s.trim();
        SourceKind::ALL
            .into_iter()
            .find(|k| k.tag().eq_ignore_ascii_case(t))
            .ok_or_else(|| anyhow!("unknown source type `{t}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(kind: &str) -> Account {
        Account {
            dir: "d".into(),
            r#type: kind.into(),
            ..Default::default()
        }
    }

    #[test]
    fn tags_round_trip_through_from_str() {
        for k in SourceKind::ALL {
            assert_eq!(k.tag().parse::<SourceKind>().unwrap(), k);
        }
        assert_eq!("Twitter".parse::<SourceKind>().unwrap(), SourceKind::Twitter);
        assert!("myspace".parse::<SourceKind>().is_err());
    }

    #[test]
    fn direct_only_sources_ignore_proxy_flags() {
        let mut a = account("douyin");
        a.feed_use_proxy = true;
        a.content_use_proxy = true;
        assert_eq!(SourceKind::Douyin.feed_route(&a), Route::Direct);
        assert_eq!(SourceKind::Douyin.content_route(&a), Route::Direct);
    }

    #[test]
    fn stages_are_routed_independently() {
        let mut a = account("twitter");
        assert_eq!(SourceKind::Twitter.feed_route(&a), Route::Direct);
        assert_eq!(SourceKind::Twitter.content_route(&a), Route::Proxied);

        a.feed_use_proxy = true;
        assert_eq!(SourceKind::Twitter.feed_route(&a), Route::Proxied);

        let mut w = account("wallpaper");
        assert_eq!(SourceKind::WallPaper.content_route(&w), Route::Direct);
        w.content_use_proxy = true;
        assert_eq!(SourceKind::WallPaper.content_route(&w), Route::Proxied);
    }

    #[test]
    fn feed_url_precedence() {
        let k = SourceKind::TelegramChannel;
        assert_eq!(
            k.feed_url("", "", "chan", ""),
            "https://rsshub.rssforever.com/telegram/channel/chan"
        );
        assert_eq!(
            k.feed_url("", "https://hub.local/", "chan", ""),
            "https://hub.local/telegram/channel/chan"
        );
        assert_eq!(
            k.feed_url("https://mine.example", "https://hub.local", "chan", ""),
            "https://mine.example/telegram/channel/chan"
        );
        assert_eq!(
            SourceKind::Twitter.feed_url("", "", "bob", "media"),
            "https://rsshub.rssforever.com/twitter/media/bob"
        );
        assert_eq!(SourceKind::WikiDailyPhoto.feed_url("", "x", "s", ""), WIKI_POTD_URL);
    }
}
