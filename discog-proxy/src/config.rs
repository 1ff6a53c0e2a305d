use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Placeholder for the album id in URL templates.
pub const ALBUM_ID_PLACEHOLDER: &str = "{album_id}";
/// Placeholder for the track id in URL templates.
pub const TRACK_ID_PLACEHOLDER: &str = "{track_id}";

const DEFAULT_CRAWLER_SIGNATURES: &[&str] = &[
    "Googlebot",
    "Bingbot",
    "Slurp",
    "DuckDuckBot",
    "Baiduspider",
    "YandexBot",
    "facebookexternalhit",
    "Twitterbot",
    "LinkedInBot",
    "Pinterestbot",
    "Applebot",
    "SemrushBot",
    "AhrefsBot",
];

/// Everything the proxy needs to know about its upstreams, loaded once at startup.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Public base URL of the site, used for canonical and breadcrumb links.
    pub site_url: String,
    /// Base URL requests are forwarded to.
    pub origin_url: String,
    /// JSON document holding every album and its songs.
    pub catalog_url: String,
    /// Per-track detail JSON, with `{album_id}` and `{track_id}` placeholders.
    pub detail_url_template: String,
    pub audio_url_template: String,
    /// Used when an album has no cover of its own.
    #[serde(default)]
    pub cover_url_template: Option<String>,
    #[serde(default = "default_player_path")]
    pub player_path: String,
    #[serde(default = "default_player_element_id")]
    pub player_element_id: String,
    #[serde(default = "default_max_track_id")]
    pub max_track_id: u32,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default = "default_crawler_signatures")]
    pub crawler_signatures: Vec<String>,
    pub artist: ArtistProfile,
}

/// The `Person` every page is attributed to.
#[derive(Clone, Debug, Deserialize)]
pub struct ArtistProfile {
    pub name: String,
    #[serde(default)]
    pub alternate_name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub birth_place: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    /// Country name.
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub contact: Option<ContactPoint>,
    #[serde(default)]
    pub works_for: Option<Organization>,
    /// Portrait gallery, emitted in order.
    #[serde(default)]
    pub images: Vec<ArtistImage>,
    /// Licence terms shared by every image in the gallery.
    #[serde(default)]
    pub image_license: Option<ImageLicense>,
    #[serde(default)]
    pub same_as: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ContactPoint {
    pub email: String,
    #[serde(default = "default_contact_type")]
    pub contact_type: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Organization {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ArtistImage {
    pub url: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ImageLicense {
    pub license: String,
    #[serde(default)]
    pub acquire_license_page: Option<String>,
    #[serde(default)]
    pub credit_text: Option<String>,
    #[serde(default)]
    pub copyright_notice: Option<String>,
}

fn default_contact_type() -> String {
    "Professional Contact".to_string()
}

fn default_player_path() -> String {
    "/pages/freshPlayer.html".to_string()
}

fn default_player_element_id() -> String {
    "app".to_string()
}

fn default_max_track_id() -> u32 {
    452
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_max_body_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_crawler_signatures() -> Vec<String> {
    DEFAULT_CRAWLER_SIGNATURES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path).map_err(|e| format!("read config: {e}"))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, String> {
        let mut config: Config =
            serde_yaml::from_str(content).map_err(|e| format!("parse config: {e}"))?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    fn normalize(&mut self) {
        self.site_url = self.site_url.trim_end_matches('/').to_string();
        self.origin_url = self.origin_url.trim_end_matches('/').to_string();
        if !self.player_path.starts_with('/') {
            self.player_path.insert(0, '/');
        }
    }

    fn validate(&self) -> Result<(), String> {
        let required = [
            ("site_url", &self.site_url),
            ("origin_url", &self.origin_url),
            ("catalog_url", &self.catalog_url),
            ("detail_url_template", &self.detail_url_template),
            ("audio_url_template", &self.audio_url_template),
            ("artist.name", &self.artist.name),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(format!("config field `{field}` must not be empty"));
            }
        }

        if let Some(i) = self.artist.images.iter().position(|img| img.url.trim().is_empty()) {
            return Err(format!("config field `artist.images[{i}].url` must not be empty"));
        }

        for (field, template) in [
            ("detail_url_template", Some(&self.detail_url_template)),
            ("audio_url_template", Some(&self.audio_url_template)),
            ("cover_url_template", self.cover_url_template.as_ref()),
        ] {
            let Some(template) = template else { continue };
            if !template.contains(ALBUM_ID_PLACEHOLDER) || !template.contains(TRACK_ID_PLACEHOLDER)
            {
                return Err(format!(
                    "config field `{field}` must contain {ALBUM_ID_PLACEHOLDER} and {TRACK_ID_PLACEHOLDER}"
                ));
            }
        }

        if self.max_track_id == 0 {
            return Err("config field `max_track_id` must be at least 1".to_string());
        }
        if self.crawler_signatures.iter().all(|s| s.trim().is_empty()) {
            return Err("config field `crawler_signatures` must not be empty".to_string());
        }

        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn detail_url(&self, album_id: u32, track_id: u32) -> String {
        expand_template(&self.detail_url_template, album_id, track_id)
    }

    pub fn audio_url(&self, album_id: u32, track_id: u32) -> String {
        expand_template(&self.audio_url_template, album_id, track_id)
    }

    pub fn cover_url(&self, album_id: u32, track_id: u32) -> Option<String> {
        self.cover_url_template
            .as_deref()
            .map(|t| expand_template(t, album_id, track_id))
    }
}

fn expand_template(template: &str, album_id: u32, track_id: u32) -> String {
    template
        .replace(ALBUM_ID_PLACEHOLDER, &album_id.to_string())
        .replace(TRACK_ID_PLACEHOLDER, &track_id.to_string())
}
