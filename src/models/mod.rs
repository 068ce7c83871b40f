use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod descriptor;

pub use descriptor::{DescriptorRecord, FeatureVector, FEATURE_COUNT, FEATURE_KEYS};

/// Artist credit attached to tracks and albums
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtistRef {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

/// Cover art
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Album as returned to the client in album mode
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Album {
    pub id: String,
    pub name: String,
    pub artists: Vec<ArtistRef>,
    pub images: Vec<Image>,
    pub release_date: Option<String>,
    pub total_tracks: Option<u32>,
    pub external_url: Option<String>,
}

/// Track as returned to the client in track mode
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artists: Vec<ArtistRef>,
    /// Containing album; absent when the catalog omitted it
    pub album: Option<Album>,
    pub duration_ms: Option<u64>,
    pub preview_url: Option<String>,
    pub external_url: Option<String>,
}

/// Recommendation mode selected per request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    Track,
    Album,
}

impl SearchType {
    /// Catalog name of the item type
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Track => "track",
            SearchType::Album => "album",
        }
    }
}

/// One item of the user's selection; display fields sent by the client are ignored
#[derive(Debug, Clone, Deserialize)]
pub struct SelectedItem {
    pub id: String,
}

/// Body of `POST /recommend`
#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    #[serde(default)]
    pub selected_items: Vec<SelectedItem>,
    #[serde(default)]
    pub search_type: SearchType,
}

impl RecommendRequest {
    pub fn selected_ids(&self) -> Vec<String> {
        self.selected_items.iter().map(|item| item.id.clone()).collect()
    }
}

/// Results returned by `GET /search` when the client omits `limit`
pub const DEFAULT_SEARCH_LIMIT: usize = 50;

/// Query string of `GET /search`
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default, rename = "type")]
    pub search_type: SearchType,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Catalog search hits; only the list matching the requested type is filled
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SearchResults {
    pub tracks: Vec<Track>,
    pub albums: Vec<Album>,
}

/// A single recommended item, serialized as the bare track or album object
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Recommendation {
    Track(Track),
    Album(Album),
}

impl Recommendation {
    pub fn id(&self) -> &str {
        match self {
            Recommendation::Track(track) => &track.id,
            Recommendation::Album(album) => &album.id,
        }
    }
}

// ============================================================================
// Spotify Web API Types
// ============================================================================

/// Artist object (simplified)
#[derive(Debug, Clone, Deserialize)]
pub struct ApiArtist {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

impl From<ApiArtist> for ArtistRef {
    fn from(artist: ApiArtist) -> Self {
        ArtistRef {
            id: artist.id,
            name: artist.name,
        }
    }
}

/// Album object; the `tracks` page of the full album resource is read separately
#[derive(Debug, Clone, Deserialize)]
pub struct ApiAlbum {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ApiArtist>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub total_tracks: Option<u32>,
    #[serde(default)]
    pub external_urls: HashMap<String, String>,
}

impl From<ApiAlbum> for Album {
    fn from(album: ApiAlbum) -> Self {
        Album {
            id: album.id,
            name: album.name,
            artists: album.artists.into_iter().map(ArtistRef::from).collect(),
            images: album.images,
            release_date: album.release_date,
            total_tracks: album.total_tracks,
            external_url: album.external_urls.get("spotify").cloned(),
        }
    }
}

/// Track object; simplified tracks (album track listings) carry no `album`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ApiArtist>,
    #[serde(default)]
    pub album: Option<ApiAlbum>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub external_urls: HashMap<String, String>,
}

impl From<ApiTrack> for Track {
    fn from(track: ApiTrack) -> Self {
        Track {
            id: track.id,
            name: track.name,
            artists: track.artists.into_iter().map(ArtistRef::from).collect(),
            album: track.album.map(Album::from),
            duration_ms: track.duration_ms,
            preview_url: track.preview_url,
            external_url: track.external_urls.get("spotify").cloned(),
        }
    }
}

/// Client-credentials token response
#[derive(Debug, Clone, Deserialize)]
pub struct ApiTokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}
