//! Turns a request locator into a song within the catalog.

use std::fmt;

use crate::catalog::{Album, Catalog, Song};
use crate::slug;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("invalid locator: {0}")]
    InvalidLocator(String),
    #[error("no song matches {0}")]
    NotFound(String),
}

/// A track id known to lie within `1..=max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackId(u32);

impl TrackId {
    pub fn parse(raw: &str, max: u32) -> Result<Self, ResolveError> {
        let id: u32 = raw
            .trim()
            .parse()
            .map_err(|_| ResolveError::InvalidLocator(format!("track id {raw:?} is not a number")))?;
        Self::new(id, max)
    }

    pub fn new(id: u32, max: u32) -> Result<Self, ResolveError> {
        if id == 0 || id > max {
            return Err(ResolveError::InvalidLocator(format!(
                "track id {id} outside 1..={max}"
            )));
        }
        Ok(Self(id))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestLocator {
    ById(TrackId),
    BySlug { album: String, song: String },
}

impl fmt::Display for RequestLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestLocator::ById(id) => write!(f, "track {}", id.get()),
            RequestLocator::BySlug { album, song } => write!(f, "/albums/{album}/{song}"),
        }
    }
}

/// A song located in the catalog, with its album and sequence neighbours.
#[derive(Clone, Copy, Debug)]
pub struct ResolvedTrack<'a> {
    pub album: &'a Album,
    pub song: &'a Song,
    pub index: usize,
    pub previous: Option<&'a Song>,
    pub next: Option<&'a Song>,
}

impl<'a> ResolvedTrack<'a> {
    fn at(album: &'a Album, index: usize) -> Self {
        let songs = &album.songs;
        Self {
            album,
            song: &songs[index],
            index,
            previous: index.checked_sub(1).and_then(|i| songs.get(i)),
            next: songs.get(index + 1),
        }
    }
}

pub fn resolve<'a>(
    locator: &RequestLocator,
    catalog: &'a Catalog,
) -> Result<ResolvedTrack<'a>, ResolveError> {
    let found = match locator {
        RequestLocator::ById(id) => find_by_id(catalog, id.get()),
        RequestLocator::BySlug { album, song } => find_by_slug(catalog, album, song),
    };
    found.ok_or_else(|| ResolveError::NotFound(locator.to_string()))
}

fn find_by_id(catalog: &Catalog, id: u32) -> Option<ResolvedTrack<'_>> {
    catalog.albums.iter().find_map(|album| {
        album
            .songs
            .iter()
            .position(|s| s.id == id)
            .map(|index| ResolvedTrack::at(album, index))
    })
}

fn find_by_slug<'a>(
    catalog: &'a Catalog,
    album_slug: &str,
    song_slug: &str,
) -> Option<ResolvedTrack<'a>> {
    let album_slug = slug::encode(album_slug);
    let song_slug = slug::encode(song_slug);
    if album_slug.is_empty() || song_slug.is_empty() {
        return None;
    }

    let album = catalog
        .albums
        .iter()
        .find(|a| slug::encode(&a.title) == album_slug)?;
    let index = album
        .songs
        .iter()
        .position(|s| slug::encode(&s.title) == song_slug)?;
    Some(ResolvedTrack::at(album, index))
}
