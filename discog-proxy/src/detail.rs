//! Per-track lyric and metadata records.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum DetailError {
    #[error("track detail unavailable: {0}")]
    Unavailable(String),
    #[error("track detail malformed: {0}")]
    Malformed(String),
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TrackDetail {
    /// Title as recorded in the detail store. The catalog title wins when both exist.
    #[serde(default)]
    pub song_title: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub lyrics: Vec<LyricLine>,
    /// Seconds.
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub release_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub writer: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LyricLine {
    #[serde(default, deserialize_with = "null_as_default")]
    pub line: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub annotations: BTreeMap<String, serde_json::Value>,
}

/// Reads an explicit `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) if !s.trim().is_empty() => Some(s),
        Some(Raw::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl TrackDetail {
    pub fn from_json(bytes: &[u8]) -> Result<Self, DetailError> {
        serde_json::from_slice(bytes)
            .map_err(|e| DetailError::Malformed(format!("parse track detail: {e}")))
    }

    /// Lyric text with one line per entry. Blank entries stay as stanza breaks.
    pub fn lyrics_text(&self) -> String {
        self.lyrics
            .iter()
            .map(|l| l.line.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// ISO-8601 duration, e.g. `PT3M7S`.
    pub fn iso_duration(&self) -> String {
        format!("PT{}M{}S", self.duration / 60, self.duration % 60)
    }
}

#[async_trait]
pub trait DetailSource: Send + Sync {
    async fn fetch_detail(&self, album_id: u32, track_id: u32)
        -> Result<TrackDetail, DetailError>;
}

pub struct HttpDetailSource {
    config: Config,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpDetailSource {
    pub fn new(config: Config, client: reqwest::Client) -> Self {
        let timeout = config.fetch_timeout();
        Self {
            config,
            client,
            timeout,
        }
    }
}

#[async_trait]
impl DetailSource for HttpDetailSource {
    async fn fetch_detail(
        &self,
        album_id: u32,
        track_id: u32,
    ) -> Result<TrackDetail, DetailError> {
        let url = self.config.detail_url(album_id, track_id);
        debug!("fetching track detail from {url}");

        let resp = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| DetailError::Unavailable(format!("GET {url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("track detail {album_id}/{track_id} returned {status}: {body}");
            return Err(DetailError::Unavailable(format!(
                "GET {url} returned {status}"
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| DetailError::Unavailable(format!("read detail body: {e}")))?;

        TrackDetail::from_json(&bytes)
    }
}
