/// Music catalog abstraction
///
/// The recommendation engine needs a handful of catalog operations: credentials,
/// track metadata, audio descriptors, album expansion and a "similar tracks"
/// query. Clients also search the catalog to find the ids they select. Implementations wrap a concrete service (Spotify Web API) behind this
/// trait so the engine can be driven by a mock in tests.
use std::collections::HashMap;

use crate::{
    error::AppResult,
    models::{DescriptorRecord, SearchResults, SearchType, Track},
};

pub mod spotify;

pub use spotify::SpotifyGateway;

/// Bearer token for catalog calls, acquired once per request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken(pub String);

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Outcome of a catalog call that reached the service
///
/// `ShapeError` carries the raw body of a response that lacked the expected
/// field. Transport and status failures are reported as `Err` instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Items(T),
    ShapeError(String),
}

/// Descriptors keyed by track id; `None` when the catalog has no analysis for the track
pub type DescriptorMap = HashMap<String, Option<DescriptorRecord>>;

/// Trait for music catalog gateways
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Acquires a short-lived access token
    ///
    /// Failure here is fatal for the request (`AppError::Auth`).
    async fn access_token(&self) -> AppResult<AccessToken>;

    /// Fetches full track objects for `ids`, in request order
    async fn get_tracks(&self, token: &AccessToken, ids: &[String])
        -> AppResult<Fetched<Vec<Track>>>;

    /// Fetches audio descriptors for `ids`
    async fn get_descriptors(
        &self,
        token: &AccessToken,
        ids: &[String],
    ) -> AppResult<Fetched<DescriptorMap>>;

    /// Expands an album into its tracks, each carrying a reference to the album
    async fn get_album_tracks(
        &self,
        token: &AccessToken,
        album_id: &str,
    ) -> AppResult<Fetched<Vec<Track>>>;

    /// Fetches up to `limit` tracks similar to the seed tracks
    async fn get_similar(
        &self,
        token: &AccessToken,
        seed_ids: &[String],
        limit: usize,
    ) -> AppResult<Fetched<Vec<Track>>>;

    /// Searches the catalog for up to `limit` tracks or albums matching `query`
    async fn search(
        &self,
        token: &AccessToken,
        query: &str,
        search_type: SearchType,
        limit: usize,
    ) -> AppResult<Fetched<SearchResults>>;

    /// Gateway name for logging
    fn name(&self) -> &'static str;
}
