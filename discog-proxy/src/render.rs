//! Builds the crawler-facing page for a resolved track.

use serde_json::{json, Map, Value};

use crate::catalog::{Album, Song};
use crate::config::{ArtistImage, ArtistProfile, Config};
use crate::detail::{LyricLine, TrackDetail};
use crate::document::{Block, Document, Link, MetaTag};
use crate::resolver::ResolvedTrack;
use crate::slug;

const COVER_WIDTH: u32 = 300;

/// `{site}/albums/{album-slug}`, if the album title yields a slug.
pub fn album_url(config: &Config, album: &Album) -> Option<String> {
    let album_slug = slug::encode(&album.title);
    (!album_slug.is_empty()).then(|| format!("{}/albums/{album_slug}", config.site_url))
}

/// Slug form when both titles yield slugs, the player's `?track=` form otherwise.
pub fn song_url(config: &Config, album: &Album, song: &Song) -> String {
    let song_slug = slug::encode(&song.title);
    match album_url(config, album) {
        Some(base) if !song_slug.is_empty() => format!("{base}/{song_slug}"),
        _ => format!("{}{}?track={}", config.site_url, config.player_path, song.id),
    }
}

/// Lyric block text: `[timestamp] line`, followed by an annotation dump when
/// the line carries any. Blank lines are skipped.
pub fn lyric_lines(lyrics: &[LyricLine]) -> Vec<String> {
    let mut lines = Vec::with_capacity(lyrics.len());
    for lyric in lyrics.iter().filter(|l| !l.line.is_empty()) {
        match &lyric.timestamp {
            Some(ts) => lines.push(format!("[{ts}] {}", lyric.line)),
            None => lines.push(lyric.line.clone()),
        }
        if !lyric.annotations.is_empty() {
            let dump = serde_json::to_string(&lyric.annotations).unwrap_or_default();
            lines.push(format!("Annotations: {dump}"));
        }
    }
    lines
}

pub fn render(
    resolved: &ResolvedTrack<'_>,
    detail: &TrackDetail,
    request_url: &str,
    config: &Config,
) -> Document {
    let album = resolved.album;
    let song = resolved.song;
    let artist = &config.artist;

    let title = if song.title.trim().is_empty() {
        detail.song_title.clone().unwrap_or_default()
    } else {
        song.title.clone()
    };
    let released = if detail.release_date.is_empty() {
        album.release_date.clone()
    } else {
        detail.release_date.clone()
    };
    let canonical_url = song_url(config, album, song);
    let album_page = album_url(config, album).unwrap_or_else(|| canonical_url.clone());
    let cover = album
        .cover
        .clone()
        .or_else(|| config.cover_url(album.id, song.id));
    let audio = config.audio_url(album.id, song.id);
    let muse = song
        .muse
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .map(slug::humanize_tag);

    let description = format!(
        "Lyrics and cover for {title} by {} from {}. Released {released}.",
        artist.name, album.title
    );

    let structured_data = structured_data(&StructuredInput {
        resolved,
        detail,
        config,
        title: &title,
        released: &released,
        canonical_url: &canonical_url,
        album_page: &album_page,
        request_url,
        cover: cover.as_deref(),
        audio: &audio,
        muse: muse.as_deref(),
        description: &description,
    });

    let mut meta = vec![
        MetaTag::name("description", description.clone()),
        MetaTag::name("robots", "index,follow"),
        MetaTag::property("og:title", format!("{title} by {}", artist.name)),
        MetaTag::property("og:type", "music.song"),
        MetaTag::property("og:url", canonical_url.clone()),
        MetaTag::property("og:description", description.clone()),
        MetaTag::property("og:audio", audio.clone()),
        MetaTag::property("music:musician", artist.name.clone()),
        MetaTag::property("music:album", album_page.clone()),
        MetaTag::property("music:album:track", (resolved.index + 1).to_string()),
        MetaTag::name("twitter:card", "summary_large_image"),
        MetaTag::name("twitter:title", format!("{title} by {}", artist.name)),
        MetaTag::name("twitter:description", description),
    ];
    if let Some(ref cover) = cover {
        meta.push(MetaTag::property("og:image", cover.clone()));
        meta.push(MetaTag::name("twitter:image", cover.clone()));
    }
    if detail.duration > 0 {
        meta.push(MetaTag::property(
            "music:duration",
            detail.duration.to_string(),
        ));
    }

    let mut body = vec![
        Block::Nav {
            label: "Breadcrumb".to_string(),
            links: vec![
                Link {
                    href: format!("{}/", config.site_url),
                    text: "Home".to_string(),
                    rel: None,
                },
                Link {
                    href: album_page.clone(),
                    text: album.title.clone(),
                    rel: Some("up"),
                },
                Link {
                    href: canonical_url.clone(),
                    text: title.clone(),
                    rel: None,
                },
            ],
        },
        Block::Heading {
            level: 1,
            text: format!("{title} by {}", artist.name),
        },
        Block::Paragraph(format!(
            "From album: {} ({}) | Track {} of {} | Released: {released} | Duration: {} seconds",
            album.title,
            album.release_date,
            resolved.index + 1,
            album.songs.len(),
            detail.duration
        )),
    ];
    if let Some(about) = song.about.as_deref().filter(|a| !a.trim().is_empty()) {
        body.push(Block::Paragraph(about.to_string()));
    }
    if let Some(ref muse) = muse {
        body.push(Block::Paragraph(format!("Muse: {muse}")));
    }
    if !detail.writer.is_empty() {
        body.push(Block::Paragraph(format!("Written by {}", detail.writer)));
    }
    if let Some(ref cover) = cover {
        body.push(Block::Image {
            src: cover.clone(),
            alt: format!("Cover for {title} by {}", artist.name),
            width: COVER_WIDTH,
        });
    }
    body.push(Block::Heading {
        level: 2,
        text: "Lyrics".to_string(),
    });
    body.push(Block::Preformatted(lyric_lines(&detail.lyrics)));
    body.push(Block::Audio {
        src: audio,
        mime: "audio/mpeg",
    });

    let mut sequence = Vec::new();
    if let Some(previous) = resolved.previous {
        sequence.push(Link {
            href: song_url(config, album, previous),
            text: format!("Previous: {}", previous.title),
            rel: Some("prev"),
        });
    }
    if let Some(next) = resolved.next {
        sequence.push(Link {
            href: song_url(config, album, next),
            text: format!("Next: {}", next.title),
            rel: Some("next"),
        });
    }
    if !sequence.is_empty() {
        body.push(Block::Nav {
            label: "Track navigation".to_string(),
            links: sequence,
        });
    }

    body.push(Block::Heading {
        level: 2,
        text: format!("More from {}", album.title),
    });
    body.push(Block::Nav {
        label: "Album tracks".to_string(),
        links: album
            .songs
            .iter()
            .map(|s| Link {
                href: song_url(config, album, s),
                text: s.title.clone(),
                rel: None,
            })
            .collect(),
    });

    Document {
        lang: "en".to_string(),
        title: format!("{title} by {}", artist.name),
        canonical_url,
        meta,
        structured_data,
        seo_body: body,
        player_element_id: config.player_element_id.clone(),
    }
}

struct StructuredInput<'a> {
    resolved: &'a ResolvedTrack<'a>,
    detail: &'a TrackDetail,
    config: &'a Config,
    title: &'a str,
    released: &'a str,
    canonical_url: &'a str,
    album_page: &'a str,
    request_url: &'a str,
    cover: Option<&'a str>,
    audio: &'a str,
    muse: Option<&'a str>,
    description: &'a str,
}

fn structured_data(input: &StructuredInput<'_>) -> Value {
    let album = input.resolved.album;
    let song = input.resolved.song;
    let config = input.config;
    let artist = artist_json(&config.artist);

    let track_list: Vec<Value> = album
        .songs
        .iter()
        .enumerate()
        .map(|(i, s)| {
            json!({
                "@type": "ListItem",
                "position": i + 1,
                "item": {
                    "@type": "MusicRecording",
                    "name": s.title,
                    "url": song_url(config, album, s),
                },
            })
        })
        .collect();

    let mut album_node = json!({
        "@type": "MusicAlbum",
        "@id": format!("{}#album", input.album_page),
        "name": album.title,
        "url": input.album_page,
        "datePublished": album.release_date,
        "numTracks": album.songs.len(),
        "byArtist": artist,
        "track": {
            "@type": "ItemList",
            "numberOfItems": album.songs.len(),
            "itemListElement": track_list,
        },
    });
    if let Some(cover) = album.cover.as_deref() {
        album_node["image"] = json!(cover);
    }
    if let Some(link) = album.payment_link.as_deref() {
        album_node["offers"] = json!({
            "@type": "Offer",
            "url": link,
            "availability": "https://schema.org/InStock",
        });
    }

    // The song's own blurb beats the generated meta sentence.
    let description = song
        .about
        .as_deref()
        .filter(|a| !a.trim().is_empty())
        .unwrap_or(input.description);

    let mut recording = json!({
        "@type": "MusicRecording",
        "@id": format!("{}#recording", input.canonical_url),
        "name": input.title,
        "url": input.canonical_url,
        "mainEntityOfPage": { "@type": "WebPage", "@id": input.request_url },
        "position": input.resolved.index + 1,
        "duration": input.detail.iso_duration(),
        "datePublished": input.released,
        "description": description,
        "audio": {
            "@type": "AudioObject",
            "contentUrl": input.audio,
            "encodingFormat": "audio/mpeg",
        },
        "inAlbum": {
            "@id": format!("{}#album", input.album_page),
            "@type": "MusicAlbum",
            "name": album.title,
            "datePublished": album.release_date,
        },
        "byArtist": artist_json(&config.artist),
        "interactionStatistic": {
            "@type": "InteractionCounter",
            "interactionType": "https://schema.org/ListenAction",
            "userInteractionCount": 0,
        },
        "recordingOf": {
            "@type": "MusicComposition",
            "name": input.title,
            "lyrics": { "@type": "CreativeWork", "text": input.detail.lyrics_text() },
            "lyricist": { "@type": "Person", "name": input.detail.writer },
        },
    });
    if let Some(cover) = input.cover {
        recording["image"] = json!(cover);
    }
    if let Some(muse) = input.muse {
        recording["keywords"] = json!(muse);
    }

    let breadcrumbs = json!({
        "@type": "BreadcrumbList",
        "itemListElement": [
            { "@type": "ListItem", "position": 1, "name": "Home", "item": format!("{}/", config.site_url) },
            { "@type": "ListItem", "position": 2, "name": album.title, "item": input.album_page },
            { "@type": "ListItem", "position": 3, "name": input.title, "item": input.canonical_url },
        ],
    });

    json!({
        "@context": "https://schema.org",
        "@graph": [album_node, recording, breadcrumbs],
    })
}

fn artist_json(artist: &ArtistProfile) -> Value {
    let mut node = Map::new();
    node.insert("@type".to_string(), json!("Person"));
    node.insert("name".to_string(), json!(artist.name));
    if let Some(ref alternate) = artist.alternate_name {
        node.insert("alternateName".to_string(), json!(alternate));
    }
    if let Some(ref url) = artist.url {
        node.insert("url".to_string(), json!(url));
    }
    if let Some(ref description) = artist.description {
        node.insert("description".to_string(), json!(description));
    }
    if let Some(ref place) = artist.birth_place {
        node.insert("birthPlace".to_string(), json!(place));
    }
    if let Some(ref job) = artist.job_title {
        node.insert("jobTitle".to_string(), json!(job));
    }
    if let Some(ref country) = artist.nationality {
        node.insert(
            "nationality".to_string(),
            json!({ "@type": "Country", "name": country }),
        );
    }
    if !artist.images.is_empty() {
        let images: Vec<Value> = artist
            .images
            .iter()
            .map(|image| image_json(artist, image))
            .collect();
        node.insert("image".to_string(), Value::Array(images));
    }
    if !artist.same_as.is_empty() {
        node.insert("sameAs".to_string(), json!(artist.same_as));
    }
    if let Some(ref contact) = artist.contact {
        node.insert(
            "contactPoint".to_string(),
            json!({
                "@type": "ContactPoint",
                "email": contact.email,
                "contactType": contact.contact_type,
            }),
        );
    }
    if let Some(ref org) = artist.works_for {
        let mut works_for = json!({ "@type": "Organization", "name": org.name });
        if let Some(ref url) = org.url {
            works_for["url"] = json!(url);
        }
        node.insert("worksFor".to_string(), works_for);
    }
    Value::Object(node)
}

fn image_json(artist: &ArtistProfile, image: &ArtistImage) -> Value {
    let mut node = json!({
        "@type": "ImageObject",
        "url": image.url,
        "contentUrl": image.url,
        "creator": { "@type": "Person", "name": artist.name },
    });
    if let Some(ref caption) = image.caption {
        node["caption"] = json!(caption);
    }
    if let Some(width) = image.width {
        node["width"] = json!(width);
    }
    if let Some(height) = image.height {
        node["height"] = json!(height);
    }
    if let Some(ref license) = artist.image_license {
        node["license"] = json!(license.license);
        if let Some(ref page) = license.acquire_license_page {
            node["acquireLicensePage"] = json!(page);
        }
        if let Some(ref credit) = license.credit_text {
            node["creditText"] = json!(credit);
        }
        if let Some(ref notice) = license.copyright_notice {
            node["copyrightNotice"] = json!(notice);
        }
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample_catalog;
    use crate::config::tests::sample_config;
    use crate::detail::tests::sample_detail;
    use crate::resolver::{resolve, RequestLocator, TrackId};

    fn resolve_id(catalog: &crate::catalog::Catalog, id: u32) -> ResolvedTrack<'_> {
        let id = TrackId::new(id, 452).unwrap();
        resolve(&RequestLocator::ById(id), catalog).unwrap()
    }

    fn graph_node<'a>(data: &'a Value, kind: &str) -> &'a Value {
        data["@graph"]
            .as_array()
            .unwrap()
            .iter()
            .find(|n| n["@type"] == kind)
            .unwrap()
    }

    #[test]
    fn canonical_url_prefers_slugs() {
        let config = sample_config();
        let catalog = sample_catalog();
        let album = &catalog.albums[0];
        assert_eq!(
            song_url(&config, album, &album.songs[0]),
            "https://music.example.com/albums/screen-time/opener"
        );
        assert_eq!(
            album_url(&config, album).as_deref(),
            Some("https://music.example.com/albums/screen-time")
        );
    }

    #[test]
    fn canonical_url_falls_back_to_track_query() {
        let config = sample_config();
        let mut catalog = sample_catalog();
        catalog.albums[0].songs[0].title = "???".to_string();
        let album = &catalog.albums[0];
        assert_eq!(
            song_url(&config, album, &album.songs[0]),
            "https://music.example.com/pages/freshPlayer.html?track=92"
        );

        catalog.albums[0].title = String::new();
        let album = &catalog.albums[0];
        assert!(album_url(&config, album).is_none());
        assert_eq!(
            song_url(&config, album, &album.songs[1]),
            "https://music.example.com/pages/freshPlayer.html?track=93"
        );
    }

    #[test]
    fn lyric_lines_include_timestamps_and_annotations() {
        let detail = sample_detail();
        assert_eq!(
            lyric_lines(&detail.lyrics),
            vec![
                "[00:01] Lights on \"low\"".to_string(),
                "[12] Screens </script> glow".to_string(),
                r#"Annotations: {"meaning":"blue light"}"#.to_string(),
                "We stay awake".to_string(),
            ]
        );
    }

    #[test]
    fn first_song_links_only_forward() {
        let config = sample_config();
        let catalog = sample_catalog();
        let resolved = resolve_id(&catalog, 92);
        let doc = render(&resolved, &sample_detail(), "https://music.example.com/albums/screen-time/opener", &config);

        assert_eq!(
            doc.canonical_url,
            "https://music.example.com/albums/screen-time/opener"
        );
        let html = doc.to_html();
        assert!(!html.contains("rel=\"prev\""));
        assert!(html.contains(
            r#"<a href="https://music.example.com/albums/screen-time/bridge" rel="next">Next: Bridge</a>"#
        ));
    }

    #[test]
    fn last_song_links_only_back() {
        let config = sample_config();
        let catalog = sample_catalog();
        let resolved = resolve_id(&catalog, 94);
        let html = render(&resolved, &sample_detail(), "https://x", &config).to_html();
        assert!(html.contains(
            r#"<a href="https://music.example.com/albums/screen-time/bridge" rel="prev">Previous: Bridge</a>"#
        ));
        assert!(!html.contains("rel=\"next\""));
    }

    #[test]
    fn single_song_album_has_no_sequence_links() {
        let config = sample_config();
        let catalog = sample_catalog();
        let resolved = resolve_id(&catalog, 207);
        let html = render(&resolved, &sample_detail(), "https://x", &config).to_html();
        assert!(!html.contains("rel=\"prev\""));
        assert!(!html.contains("rel=\"next\""));
        assert!(!html.contains("Track navigation"));
    }

    #[test]
    fn structured_data_describes_album_and_song() {
        let config = sample_config();
        let catalog = sample_catalog();
        let resolved = resolve_id(&catalog, 92);
        let doc = render(&resolved, &sample_detail(), "https://music.example.com/pages/freshPlayer.html?track=92", &config);
        let data = &doc.structured_data;

        let album = graph_node(data, "MusicAlbum");
        assert_eq!(album["name"], "screen time");
        assert_eq!(album["track"]["numberOfItems"], 3);
        let items = album["track"]["itemListElement"].as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1]["position"], 2);
        assert_eq!(
            items[1]["item"]["url"],
            "https://music.example.com/albums/screen-time/bridge"
        );
        assert_eq!(album["offers"]["url"], "https://store.example.com/screen-time");

        let song = graph_node(data, "MusicRecording");
        assert_eq!(song["name"], "Opener");
        assert_eq!(song["duration"], "PT3M7S");
        assert_eq!(song["keywords"], "late Night Drive");
        assert_eq!(song["description"], "The first one.");
        assert!(song.get("abstract").is_none());
        assert_eq!(song["byArtist"]["name"], "Frith Hilton");
        assert_eq!(song["byArtist"]["alternateName"], "Howard Frith Hilton");
        assert_eq!(song["interactionStatistic"]["userInteractionCount"], 0);
        assert_eq!(
            song["mainEntityOfPage"]["@id"],
            "https://music.example.com/pages/freshPlayer.html?track=92"
        );
        assert_eq!(
            song["recordingOf"]["lyrics"]["text"],
            "Lights on \"low\"\n\nScreens </script> glow\nWe stay awake"
        );
        assert_eq!(song["recordingOf"]["lyricist"]["name"], "Frith Hilton");
        assert_eq!(song["image"], "https://data.example.com/albums/5.jpg");

        let crumbs = graph_node(data, "BreadcrumbList");
        assert_eq!(crumbs["itemListElement"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn recording_description_falls_back_to_summary() {
        let config = sample_config();
        let catalog = sample_catalog();
        let resolved = resolve_id(&catalog, 93);
        let doc = render(&resolved, &sample_detail(), "https://x", &config);
        let song = graph_node(&doc.structured_data, "MusicRecording");
        assert_eq!(
            song["description"],
            "Lyrics and cover for Bridge by Frith Hilton from screen time. Released September 19, 2022."
        );
    }

    #[test]
    fn artist_profile_is_fully_described() {
        let config = sample_config();
        let catalog = sample_catalog();
        let resolved = resolve_id(&catalog, 92);
        let doc = render(&resolved, &sample_detail(), "https://x", &config);
        let artist = &graph_node(&doc.structured_data, "MusicRecording")["byArtist"];

        assert_eq!(artist["@type"], "Person");
        assert_eq!(artist["birthPlace"], "Ogun State, Nigeria");
        assert_eq!(artist["jobTitle"], "Poet, Musical artist");
        assert_eq!(artist["nationality"]["@type"], "Country");
        assert_eq!(artist["nationality"]["name"], "Nigeria");
        assert_eq!(artist["contactPoint"]["email"], "hello@music.example.com");
        assert_eq!(artist["contactPoint"]["contactType"], "Professional Contact");
        assert_eq!(artist["worksFor"]["@type"], "Organization");
        assert_eq!(artist["worksFor"]["url"], "https://enterprises.example.com");

        let images = artist["image"].as_array().unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0]["@type"], "ImageObject");
        assert_eq!(images[0]["contentUrl"], "https://music.example.com/images/portrait.jpg");
        assert_eq!(images[0]["width"], 720);
        assert_eq!(images[0]["height"], 900);
        assert_eq!(images[0]["creator"]["name"], "Frith Hilton");
        assert_eq!(images[0]["license"], "https://creativecommons.org/licenses/by/4.0/");
        assert_eq!(images[1]["creditText"], "Frith Hilton");
        assert!(images[1].get("caption").is_none());
        assert!(images[1].get("width").is_none());
        assert!(images[1].get("acquireLicensePage").is_none());

        let album = graph_node(&doc.structured_data, "MusicAlbum");
        assert_eq!(album["byArtist"], *artist);
    }

    #[test]
    fn sparse_artist_profile_omits_extras() {
        let mut config = sample_config();
        config.artist.birth_place = None;
        config.artist.nationality = None;
        config.artist.contact = None;
        config.artist.works_for = None;
        config.artist.images.clear();
        let catalog = sample_catalog();
        let resolved = resolve_id(&catalog, 92);
        let doc = render(&resolved, &sample_detail(), "https://x", &config);
        let artist = &graph_node(&doc.structured_data, "MusicRecording")["byArtist"];

        for key in ["birthPlace", "nationality", "contactPoint", "worksFor", "image"] {
            assert!(artist.get(key).is_none(), "{key}");
        }
        assert_eq!(artist["jobTitle"], "Poet, Musical artist");
    }

    #[test]
    fn cover_falls_back_to_template() {
        let config = sample_config();
        let catalog = sample_catalog();
        let resolved = resolve_id(&catalog, 207);
        let doc = render(&resolved, &sample_detail(), "https://x", &config);
        let song = graph_node(&doc.structured_data, "MusicRecording");
        assert_eq!(song["image"], "https://data.example.com/cover/9/207.jpg");
        assert!(graph_node(&doc.structured_data, "MusicAlbum")
            .get("image")
            .is_none());
    }

    #[test]
    fn quotes_in_titles_keep_block_valid() {
        let config = sample_config();
        let catalog = sample_catalog();
        let resolved = resolve_id(&catalog, 94);
        let html = render(&resolved, &sample_detail(), "https://x", &config).to_html();

        let start = html.find("<script type=\"application/ld+json\">").unwrap()
            + "<script type=\"application/ld+json\">".len();
        let end = html[start..].find("</script>").unwrap() + start;
        let block: Value = serde_json::from_str(&html[start..end]).unwrap();
        let song = graph_node(&block, "MusicRecording");
        assert_eq!(song["name"], "Closer \"Live\"");
        assert!(html.contains("<h1>Closer &quot;Live&quot; by Frith Hilton</h1>"));
    }

    #[test]
    fn body_carries_lyrics_audio_and_breadcrumbs() {
        let config = sample_config();
        let catalog = sample_catalog();
        let resolved = resolve_id(&catalog, 93);
        let html = render(&resolved, &sample_detail(), "https://x", &config).to_html();

        assert!(html.contains("<title>Bridge by Frith Hilton</title>"));
        assert!(html.contains("[12] Screens &lt;/script&gt; glow\n"));
        assert!(html.contains("Annotations: {&quot;meaning&quot;:&quot;blue light&quot;}"));
        assert!(html.contains(
            r#"<source src="https://data.example.com/audio/5/93.mp3" type="audio/mpeg">"#
        ));
        assert!(html.contains(r#"<nav aria-label="Breadcrumb"><a href="https://music.example.com/">Home</a>"#));
        assert!(html.contains(r#"<a href="https://music.example.com/albums/screen-time" rel="up">screen time</a>"#));
        assert!(html.contains("Track 2 of 3"));
        assert!(html.contains(r#"<meta name="robots" content="index,follow">"#));
    }
}
