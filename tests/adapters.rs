// tests/adapters.rs
use feedpics::ingest::source::SourceKind;
use feedpics::ingest::types::FeedItem;

fn item(title: &str, description: &str, guid: &str) -> FeedItem {
    FeedItem {
        title: title.into(),
        description: description.into(),
        guid: guid.into(),
        link: None,
    }
}

/// One realistic item per source family.
fn sample(kind: SourceKind) -> FeedItem {
    match kind {
        SourceKind::Twitter => item(
            "",
            r#"<img style="width:100%" src="https://pbs.example/media/A?format=jpg&amp;name=orig"><br><img style="" src="https://pbs.example/media/B?format=png&amp;name=orig">"#,
            "",
        ),
        SourceKind::TelegramChannel | SourceKind::ThirtyFivePhoto => item(
            "",
            r#"<p>hi</p><img src="https://cdn.example/a.jpg?x=1&amp;y=2.jpg" referrerpolicy="no-referrer">"#,
            "",
        ),
        SourceKind::WikiDailyPhoto => item(
            "Potd",
            r#"<img alt="x" src="//upload.example/wikipedia/commons/thumb/a/ab/Pic.jpg/800px-Pic.jpg" width="800">"#,
            "",
        ),
        SourceKind::DailyArt => item("", "", "https://art.example/img.jpg?a=1&amp;b=2"),
        SourceKind::Douyin => item(
            "a/b title",
            r#"<video></video><a href="https://v.example/play?id=1&amp;ratio=1080p" rel="noreferrer">视频直链</a>"#,
            "",
        ),
        SourceKind::Cnu | SourceKind::MmFan | SourceKind::WallPaper => item(
            "",
            r#"<img src="https://img.example/full/1.jpg" alt=""><img src="https://img.example/full/2.jpg">"#,
            "",
        ),
    }
}

#[test]
fn every_source_extracts_something_from_its_own_markup() {
    for kind in SourceKind::ALL {
        let out = kind.adapter().parse(&sample(kind), "seed_12345");
        assert!(!out.is_empty(), "{kind} produced nothing");
        for dl in &out {
            assert!(!dl.url.contains("&amp;"), "{kind}: {}", dl.url);
            assert!(dl.url.starts_with("https://"), "{kind}: {}", dl.url);
        }
    }
}

#[test]
fn parsing_is_deterministic() {
    for kind in SourceKind::ALL {
        let it = sample(kind);
        let a = kind.adapter().parse(&it, "s");
        let b = kind.adapter().parse(&it, "s");
        assert_eq!(a, b, "{kind}");
    }
}

#[test]
fn hostile_markup_yields_nothing_without_panicking() {
    let junk = [
        "",
        "<img",
        r#"<img src=""#,
        "\u{0}\u{FFFD}<a href=\"",
        "&amp;&amp;&amp;",
        "视频直链",
    ];
    for kind in SourceKind::ALL {
        for j in junk {
            let out = kind.adapter().parse(&item(j, j, ""), "s");
            assert!(out.is_empty(), "{kind} matched {j:?}: {out:?}");
        }
    }
}

#[test]
fn seeded_sources_tag_provenance_with_the_seed() {
    for kind in [
        SourceKind::Twitter,
        SourceKind::TelegramChannel,
        SourceKind::ThirtyFivePhoto,
        SourceKind::DailyArt,
    ] {
        let out = kind.adapter().parse(&sample(kind), "who");
        assert!(out.iter().all(|d| d.provenance.ends_with("@who")), "{kind}");
    }
}

#[test]
fn wiki_thumbnail_is_rewritten_to_the_full_image() {
    let out = SourceKind::WikiDailyPhoto
        .adapter()
        .parse(&sample(SourceKind::WikiDailyPhoto), "wikidailyphoto");
    assert_eq!(out.len(), 1);
    assert_eq!(
        out[0].url,
        "https://upload.example/wikipedia/commons/a/ab/Pic.jpg"
    );
}

#[test]
fn douyin_names_the_file_after_the_title() {
    let out = SourceKind::Douyin
        .adapter()
        .parse(&sample(SourceKind::Douyin), "seed_12345");
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].url, "https://v.example/play?id=1&ratio=1080p");
    assert_eq!(out[0].file_name.as_deref(), Some("12345_a_b title.mp4"));
}
