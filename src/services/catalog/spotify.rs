/// Spotify Web API gateway
///
/// API Flow:
/// 1. Token: POST accounts `/api/token` (client credentials, basic auth)
/// 2. Tracks: `/tracks?ids=` → `tracks`
/// 3. Descriptors: `/audio-features?ids=` → `audio_features` (entries may be null)
/// 4. Album expansion: `/albums/{id}` → album object with the first `tracks` page,
///    then every `tracks.next` page until `next` is null
/// 5. Similar tracks: `/recommendations?seed_tracks=&limit=` → `tracks`
/// 6. Search: `/search?q=&type=&limit=` → `tracks.items` or `albums.items`
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client as HttpClient, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{
        Album, ApiAlbum, ApiTokenResponse, ApiTrack, DescriptorRecord, SearchResults,
        SearchType, Track,
    },
    services::catalog::{AccessToken, CatalogGateway, DescriptorMap, Fetched},
};

/// Tokens are refreshed this long before the catalog says they expire
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;
/// `/recommendations` accepts a limit in 1..=100
const MAX_SIMILAR_LIMIT: usize = 100;
/// `/search` accepts a limit in 1..=50
const MAX_SEARCH_LIMIT: usize = 50;
/// Upper bound on `next` pages followed for one album
const MAX_ALBUM_PAGES: usize = 100;
const RAW_EXCERPT_LEN: usize = 500;

#[derive(Debug, Clone)]
struct CachedToken {
    token: AccessToken,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now + chrono::Duration::seconds(TOKEN_EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Clone)]
pub struct SpotifyGateway {
    http_client: HttpClient,
    client_id: String,
    client_secret: String,
    api_url: String,
    auth_url: String,
    max_retries: u32,
    retry_backoff: Duration,
    token_cache: Arc<Mutex<Option<CachedToken>>>,
}

impl SpotifyGateway {
    /// Creates a gateway whose HTTP client enforces the configured timeout
    pub fn new(config: &Config) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            client_id: config.spotify_client_id.clone(),
            client_secret: config.spotify_client_secret.clone(),
            api_url: config.spotify_api_url.trim_end_matches('/').to_string(),
            auth_url: config.spotify_auth_url.clone(),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            token_cache: Arc::new(Mutex::new(None)),
        })
    }

    /// Sends a request, retrying timeouts, connect errors, 429 and 5xx with exponential backoff
    async fn send_with_retry(&self, request: RequestBuilder) -> AppResult<Response> {
        let mut attempt = 0;

        loop {
            let Some(current) = request.try_clone() else {
                return Ok(request.send().await?);
            };

            let transient = match current.send().await {
                Ok(response) if is_transient_status(response.status()) => {
                    format!("status {}", response.status())
                }
                Ok(response) => return Ok(response),
                Err(e) if e.is_timeout() || e.is_connect() => e.to_string(),
                Err(e) => return Err(e.into()),
            };

            if attempt >= self.max_retries {
                return Err(AppError::ExternalApi(format!(
                    "Spotify request failed after {} attempts: {}",
                    attempt + 1,
                    transient
                )));
            }

            let delay = self.retry_backoff * 2u32.saturating_pow(attempt);
            tracing::warn!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                reason = %transient,
                "Transient Spotify failure, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// GETs a catalog resource relative to the API base URL
    async fn get_json(
        &self,
        token: &AccessToken,
        path: &str,
        query: &[(&str, String)],
    ) -> AppResult<Value> {
        let url = format!("{}{}", self.api_url, path);
        self.get_json_url(token, &url, query).await
    }

    /// GETs an absolute catalog URL and returns its JSON body
    ///
    /// A 401 evicts the cached token so the next request acquires a fresh one.
    async fn get_json_url(
        &self,
        token: &AccessToken,
        url: &str,
        query: &[(&str, String)],
    ) -> AppResult<Value> {
        let request = self
            .http_client
            .get(url)
            .bearer_auth(token.as_str())
            .query(query);

        let response = self.send_with_retry(request).await?;

        if !response.status().is_success() {
            let status = response.status();
            if status == StatusCode::UNAUTHORIZED {
                // a revoked token must not be served from cache again
                self.token_cache.lock().await.take();
            }
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Spotify API returned status {}: {}",
                status, body
            )));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(error = %e, url = %url, "Failed to parse Spotify response");
            AppError::GatewayShape(excerpt(&text))
        })
    }

    async fn request_token(&self) -> AppResult<CachedToken> {
        let response = self
            .http_client
            .post(&self.auth_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Auth(format!(
                "Token endpoint returned status {}: {}",
                status, body
            )));
        }

        let body: ApiTokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Auth(format!("Invalid token response: {}", e)))?;

        parse_token(body, Utc::now())
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn excerpt(raw: &str) -> String {
    raw.chars().take(RAW_EXCERPT_LEN).collect()
}

fn parse_token(body: ApiTokenResponse, now: DateTime<Utc>) -> AppResult<CachedToken> {
    let token = body
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Auth("Token response missing access_token".to_string()))?;

    let lifetime = body.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);

    Ok(CachedToken {
        token: AccessToken(token),
        expires_at: now + chrono::Duration::seconds(lifetime),
    })
}

/// Reads `field` as an array of (nullable) track objects
fn parse_tracks(body: &Value, field: &str) -> Fetched<Vec<Track>> {
    let Some(items) = body.get(field).and_then(Value::as_array) else {
        return Fetched::ShapeError(excerpt(&body.to_string()));
    };

    let tracks = items
        .iter()
        .filter(|item| !item.is_null())
        .filter_map(|item| match serde_json::from_value::<ApiTrack>(item.clone()) {
            Ok(track) => Some(Track::from(track)),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unparseable track");
                None
            }
        })
        .collect();

    Fetched::Items(tracks)
}

/// Pairs the `audio_features` array with the requested ids
fn parse_descriptors(ids: &[String], body: &Value) -> Fetched<DescriptorMap> {
    let Some(items) = body.get("audio_features").and_then(Value::as_array) else {
        return Fetched::ShapeError(excerpt(&body.to_string()));
    };

    let descriptors = ids
        .iter()
        .zip(items.iter())
        .map(|(id, item)| {
            let record = if item.is_null() {
                None
            } else {
                serde_json::from_value::<DescriptorRecord>(item.clone())
                    .map_err(|e| {
                        tracing::debug!(track_id = %id, error = %e, "Incomplete audio features");
                    })
                    .ok()
            };
            (id.clone(), record)
        })
        .collect();

    Fetched::Items(descriptors)
}

/// One page of an album's track listing
#[derive(Debug, Clone, PartialEq)]
struct TrackPage {
    tracks: Vec<Track>,
    next: Option<String>,
}

/// Reads a paging object of tracks: `items` plus the `next` page URL
fn parse_track_page(page: &Value) -> Fetched<TrackPage> {
    match parse_tracks(page, "items") {
        Fetched::Items(tracks) => Fetched::Items(TrackPage {
            tracks,
            next: page
                .get("next")
                .and_then(Value::as_str)
                .map(str::to_string),
        }),
        Fetched::ShapeError(raw) => Fetched::ShapeError(raw),
    }
}

/// Reads an album resource: the album itself and the first page of its tracks
fn parse_album(body: &Value) -> Fetched<(Album, TrackPage)> {
    let album = match serde_json::from_value::<ApiAlbum>(body.clone()) {
        Ok(album) => Album::from(album),
        Err(_) => return Fetched::ShapeError(excerpt(&body.to_string())),
    };

    match body.get("tracks").map(parse_track_page) {
        Some(Fetched::Items(page)) => Fetched::Items((album, page)),
        _ => Fetched::ShapeError(excerpt(&body.to_string())),
    }
}

/// Reads the paging object of a search response for `search_type`
fn parse_search(body: &Value, search_type: SearchType) -> Fetched<SearchResults> {
    match search_type {
        SearchType::Track => {
            let Some(page) = body.get("tracks") else {
                return Fetched::ShapeError(excerpt(&body.to_string()));
            };
            match parse_tracks(page, "items") {
                Fetched::Items(tracks) => Fetched::Items(SearchResults {
                    tracks,
                    ..Default::default()
                }),
                Fetched::ShapeError(_) => Fetched::ShapeError(excerpt(&body.to_string())),
            }
        }
        SearchType::Album => {
            let Some(items) = body
                .get("albums")
                .and_then(|page| page.get("items"))
                .and_then(Value::as_array)
            else {
                return Fetched::ShapeError(excerpt(&body.to_string()));
            };

            let albums = items
                .iter()
                .filter(|item| !item.is_null())
                .filter_map(|item| serde_json::from_value::<ApiAlbum>(item.clone()).ok())
                .map(Album::from)
                .collect();

            Fetched::Items(SearchResults {
                albums,
                ..Default::default()
            })
        }
    }
}

#[async_trait::async_trait]
impl CatalogGateway for SpotifyGateway {
    async fn access_token(&self) -> AppResult<AccessToken> {
        let mut cache = self.token_cache.lock().await;

        if let Some(cached) = cache.as_ref() {
            if cached.is_valid_at(Utc::now()) {
                return Ok(cached.token.clone());
            }
        }

        let fresh = self.request_token().await?;
        tracing::info!(expires_at = %fresh.expires_at, "Spotify access token acquired");

        let token = fresh.token.clone();
        *cache = Some(fresh);
        Ok(token)
    }

    async fn get_tracks(
        &self,
        token: &AccessToken,
        ids: &[String],
    ) -> AppResult<Fetched<Vec<Track>>> {
        if ids.is_empty() {
            return Ok(Fetched::Items(Vec::new()));
        }

        let body = self
            .get_json(token, "/tracks", &[("ids", ids.join(","))])
            .await?;
        let tracks = parse_tracks(&body, "tracks");

        if let Fetched::Items(items) = &tracks {
            tracing::debug!(requested = ids.len(), fetched = items.len(), "Tracks fetched");
        }

        Ok(tracks)
    }

    async fn get_descriptors(
        &self,
        token: &AccessToken,
        ids: &[String],
    ) -> AppResult<Fetched<DescriptorMap>> {
        if ids.is_empty() {
            return Ok(Fetched::Items(DescriptorMap::new()));
        }

        let body = self
            .get_json(token, "/audio-features", &[("ids", ids.join(","))])
            .await?;

        Ok(parse_descriptors(ids, &body))
    }

    async fn get_album_tracks(
        &self,
        token: &AccessToken,
        album_id: &str,
    ) -> AppResult<Fetched<Vec<Track>>> {
        let body = self
            .get_json(token, &format!("/albums/{}", album_id), &[])
            .await?;

        let (album, first_page) = match parse_album(&body) {
            Fetched::Items(parsed) => parsed,
            Fetched::ShapeError(raw) => return Ok(Fetched::ShapeError(raw)),
        };

        let mut tracks = first_page.tracks;
        let mut next = first_page.next;
        let mut pages = 1;

        while let Some(url) = next.take() {
            if pages >= MAX_ALBUM_PAGES {
                tracing::warn!(album_id = %album_id, pages, "Album track listing truncated");
                break;
            }

            let body = self.get_json_url(token, &url, &[]).await?;
            match parse_track_page(&body) {
                Fetched::Items(page) => {
                    tracks.extend(page.tracks);
                    next = page.next;
                }
                Fetched::ShapeError(raw) => {
                    tracing::warn!(album_id = %album_id, raw = %raw, "Unexpected album tracks page");
                    break;
                }
            }
            pages += 1;
        }

        for track in tracks.iter_mut() {
            track.album = Some(album.clone());
        }

        tracing::debug!(album_id = %album_id, tracks = tracks.len(), pages, "Album expanded");

        Ok(Fetched::Items(tracks))
    }

    async fn get_similar(
        &self,
        token: &AccessToken,
        seed_ids: &[String],
        limit: usize,
    ) -> AppResult<Fetched<Vec<Track>>> {
        if seed_ids.is_empty() || limit == 0 {
            return Ok(Fetched::Items(Vec::new()));
        }

        let limit = limit.min(MAX_SIMILAR_LIMIT);
        let body = self
            .get_json(
                token,
                "/recommendations",
                &[
                    ("seed_tracks", seed_ids.join(",")),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        Ok(parse_tracks(&body, "tracks"))
    }

    async fn search(
        &self,
        token: &AccessToken,
        query: &str,
        search_type: SearchType,
        limit: usize,
    ) -> AppResult<Fetched<SearchResults>> {
        if query.trim().is_empty() || limit == 0 {
            return Ok(Fetched::Items(SearchResults::default()));
        }

        let body = self
            .get_json(
                token,
                "/search",
                &[
                    ("q", query.to_string()),
                    ("type", search_type.as_str().to_string()),
                    ("limit", limit.min(MAX_SEARCH_LIMIT).to_string()),
                ],
            )
            .await?;

        Ok(parse_search(&body, search_type))
    }

    fn name(&self) -> &'static str {
        "spotify"
    }
}
