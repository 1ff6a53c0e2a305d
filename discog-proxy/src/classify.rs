//! Caller classification and locator extraction.
//!
//! Crawler detection is a User-Agent heuristic. It only decides which page
//! shape to serve and is trivially spoofed, so nothing relies on it for access
//! control.

use axum::http::{HeaderMap, Uri};
use regex::{Regex, RegexBuilder};

use crate::resolver::{RequestLocator, ResolveError, TrackId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentKind {
    Crawler,
    Visitor,
}

pub struct Classifier {
    pattern: Regex,
}

impl Classifier {
    pub fn new(signatures: &[String]) -> Result<Self, String> {
        let alternation = signatures
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("|");
        if alternation.is_empty() {
            return Err("no crawler signatures configured".to_string());
        }
        let pattern = RegexBuilder::new(&alternation)
            .case_insensitive(true)
            .build()
            .map_err(|e| format!("compile crawler signatures: {e}"))?;
        Ok(Self { pattern })
    }

    pub fn classify(&self, user_agent: &str) -> AgentKind {
        if self.pattern.is_match(user_agent) {
            AgentKind::Crawler
        } else {
            AgentKind::Visitor
        }
    }

    pub fn classify_headers(&self, headers: &HeaderMap) -> AgentKind {
        let user_agent = headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        self.classify(user_agent)
    }
}

/// Pull a locator out of the request URI.
///
/// `/albums/<album>/<song>` wins over `?track=<id>`, which is only honoured on
/// `player_path`. `Ok(None)` means the URL names no track at all;
/// `Err(InvalidLocator)` means it tried to and the id is malformed or out of
/// range.
pub fn extract_locator(
    uri: &Uri,
    player_path: &str,
    max_track_id: u32,
) -> Result<Option<RequestLocator>, ResolveError> {
    if let Some(locator) = slug_locator(uri.path()) {
        return Ok(Some(locator));
    }
    if uri.path() != player_path {
        return Ok(None);
    }

    let Some(query) = uri.query() else {
        return Ok(None);
    };
    let raw = query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (key == "track").then_some(value)
    });
    match raw {
        Some(raw) => {
            let decoded = urlencoding::decode(raw)
                .map_err(|_| ResolveError::InvalidLocator(format!("track id {raw:?} is not UTF-8")))?;
            TrackId::parse(&decoded, max_track_id).map(|id| Some(RequestLocator::ById(id)))
        }
        None => Ok(None),
    }
}

fn slug_locator(path: &str) -> Option<RequestLocator> {
    let rest = path.strip_prefix("/albums/")?;
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    let mut segments = rest.split('/');
    let album = segments.next()?;
    let song = segments.next()?;
    if segments.next().is_some() || album.is_empty() || song.is_empty() {
        return None;
    }

    let album = urlencoding::decode(album).ok()?.to_lowercase();
    let song = urlencoding::decode(song).ok()?.to_lowercase();
    Some(RequestLocator::BySlug { album, song })
}
