//! Album/song index fetched from the catalog store.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::detail::null_as_default;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
    #[error("catalog malformed: {0}")]
    Malformed(String),
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Album {
    pub id: u32,
    #[serde(alias = "name", alias = "album_title")]
    pub title: String,
    #[serde(default, alias = "cover_url", alias = "coverUrl")]
    pub cover: Option<String>,
    #[serde(
        default,
        alias = "releaseDate",
        alias = "date",
        deserialize_with = "null_as_default"
    )]
    pub release_date: String,
    #[serde(default, alias = "paymentLink", alias = "buy_link")]
    pub payment_link: Option<String>,
    /// Track order. Previous/next navigation walks this sequence.
    #[serde(default, deserialize_with = "null_as_default")]
    pub songs: Vec<Song>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Song {
    pub id: u32,
    #[serde(
        default,
        alias = "track_number",
        alias = "trackNumber",
        deserialize_with = "null_as_default"
    )]
    pub track: u32,
    #[serde(alias = "song_title", alias = "name")]
    pub title: String,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub muse: Option<String>,
}

/// The whole discography, in album order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Catalog {
    pub albums: Vec<Album>,
}

/// The store publishes either a bare array or an object wrapping it.
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogPayload {
    Bare(Vec<Album>),
    Wrapped { albums: Vec<Album> },
}

impl Catalog {
    pub fn from_json(bytes: &[u8]) -> Result<Self, CatalogError> {
        let payload: CatalogPayload = serde_json::from_slice(bytes)
            .map_err(|e| CatalogError::Malformed(format!("parse catalog: {e}")))?;
        let albums = match payload {
            CatalogPayload::Bare(albums) => albums,
            CatalogPayload::Wrapped { albums } => albums,
        };
        Ok(Self { albums })
    }

    pub fn song_count(&self) -> usize {
        self.albums.iter().map(|a| a.songs.len()).sum()
    }
}

/// Where the catalog comes from. One attempt per call, no caching.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_catalog(&self) -> Result<Catalog, CatalogError>;
}

pub struct HttpCatalogSource {
    url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpCatalogSource {
    pub fn new(url: String, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            url,
            client,
            timeout,
        }
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch_catalog(&self) -> Result<Catalog, CatalogError> {
        debug!("fetching catalog from {}", self.url);

        let resp = self
            .client
            .get(&self.url)
            .header("accept", "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable(format!("GET {}: {e}", self.url)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("catalog returned {status}: {body}");
            return Err(CatalogError::Unavailable(format!(
                "GET {} returned {status}",
                self.url
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| CatalogError::Unavailable(format!("read catalog body: {e}")))?;

        let catalog = Catalog::from_json(&bytes)?;
        debug!(
            "catalog has {} albums, {} songs",
            catalog.albums.len(),
            catalog.song_count()
        );
        Ok(catalog)
    }
}
