use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{Album, DescriptorRecord, Recommendation, SearchType, Track},
    services::{
        batching::accumulate_batches,
        catalog::{AccessToken, CatalogGateway, DescriptorMap, Fetched},
        features::extract_features,
        neighbors::NeighborIndex,
    },
};

/// Tunables for the recommendation engine
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub similar_batch_size: usize,
    pub similar_per_call_limit: usize,
    pub pool_target_size: usize,
    pub track_lookup_batch_size: usize,
    pub descriptor_batch_size: usize,
    pub track_neighbors: usize,
    pub album_neighbors: usize,
    pub dedup_albums: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            similar_batch_size: 5,
            similar_per_call_limit: 50,
            pool_target_size: 150,
            track_lookup_batch_size: 50,
            descriptor_batch_size: 100,
            track_neighbors: 10,
            album_neighbors: 30,
            dedup_albums: false,
        }
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            similar_batch_size: config.similar_batch_size,
            similar_per_call_limit: config.similar_per_call_limit,
            pool_target_size: config.pool_target_size,
            track_lookup_batch_size: config.track_lookup_batch_size,
            descriptor_batch_size: config.descriptor_batch_size,
            track_neighbors: config.track_neighbors,
            album_neighbors: config.album_neighbors,
            dedup_albums: config.dedup_albums,
        }
    }
}

/// One pool entry: a track, its raw descriptors if any, and whether it came from the selection
#[derive(Debug, Clone)]
struct Candidate {
    track: Track,
    descriptor: Option<DescriptorRecord>,
    seed: bool,
}

/// Recommends tracks or albums close to a user's selection
///
/// Holds no per-request state: every call fetches its own pool, standardizes
/// it, fits its own neighbor index and drops all of it on return.
#[derive(Clone)]
pub struct RecommendationEngine {
    gateway: Arc<dyn CatalogGateway>,
    settings: EngineSettings,
}

impl RecommendationEngine {
    pub fn new(gateway: Arc<dyn CatalogGateway>, settings: EngineSettings) -> Self {
        Self { gateway, settings }
    }

    /// Returns recommendations for `selection`, nearest to the selection's centroid first
    ///
    /// `selection` holds track ids in track mode and album ids in album mode.
    /// Fails with `NoUsableFeatures` when no descriptor survives extraction and
    /// with `Auth` when no token can be acquired; every other catalog failure
    /// only shrinks the pool.
    pub async fn recommend(
        &self,
        selection: &[String],
        mode: SearchType,
    ) -> AppResult<Vec<Recommendation>> {
        let start = Instant::now();

        if selection.is_empty() {
            tracing::info!("Empty selection, nothing to recommend");
            return Ok(Vec::new());
        }

        tracing::info!(
            selected = selection.len(),
            mode = ?mode,
            gateway = self.gateway.name(),
            "Starting recommendation"
        );

        let token = self.gateway.access_token().await?;

        // 1. Seeds and similarity pool
        let seed_tracks = match mode {
            SearchType::Track => self.lookup_tracks(&token, selection).await?,
            SearchType::Album => self.expand_albums(&token, selection).await?,
        };
        let seed_track_ids: Vec<String> = match mode {
            SearchType::Track => selection.to_vec(),
            SearchType::Album => seed_tracks.iter().map(|t| t.id.clone()).collect(),
        };
        let similar_tracks = self.collect_similar(&token, &seed_track_ids).await?;

        // 2. Descriptors for seeds + pool
        let mut tracks: Vec<(Track, bool)> = seed_tracks.into_iter().map(|t| (t, true)).collect();
        tracks.extend(similar_tracks.into_iter().map(|t| (t, false)));

        let ids: Vec<String> = tracks.iter().map(|(t, _)| t.id.clone()).collect();
        let descriptors = self.lookup_descriptors(&token, &ids).await?;

        let pool: Vec<Candidate> = tracks
            .into_iter()
            .map(|(track, seed)| {
                let descriptor = descriptors.get(&track.id).copied().flatten();
                Candidate {
                    track,
                    descriptor,
                    seed,
                }
            })
            .collect();

        // 3. Nearest tracks to the seed centroid
        let k = match mode {
            SearchType::Track => self.settings.track_neighbors,
            SearchType::Album => self.settings.album_neighbors,
        };
        let excluded: HashSet<&str> = selection.iter().map(String::as_str).collect();
        let nearest = nearest_tracks(&pool, k, &excluded)?;

        // 4. Shape the response for the mode
        let recommendations: Vec<Recommendation> = match mode {
            SearchType::Track => nearest
                .into_iter()
                .map(|track| Recommendation::Track(track.clone()))
                .collect(),
            SearchType::Album => {
                project_to_albums(nearest, &excluded, self.settings.dedup_albums)
                    .into_iter()
                    .map(Recommendation::Album)
                    .collect()
            }
        };

        tracing::info!(
            pool_size = pool.len(),
            recommendations = recommendations.len(),
            processing_time_ms = start.elapsed().as_millis() as u64,
            "Recommendation completed"
        );

        Ok(recommendations)
    }

    /// Track metadata for the selected track ids, batched to the lookup limit
    async fn lookup_tracks(&self, token: &AccessToken, ids: &[String]) -> AppResult<Vec<Track>> {
        let mut tracks = Vec::new();
        for chunk in ids.chunks(self.settings.track_lookup_batch_size.max(1)) {
            let result = self.gateway.get_tracks(token, chunk).await;
            tracks.extend(absorb("get_tracks", result)?);
        }
        Ok(tracks)
    }

    /// All tracks of every selected album, in album order
    async fn expand_albums(
        &self,
        token: &AccessToken,
        album_ids: &[String],
    ) -> AppResult<Vec<Track>> {
        let mut tracks = Vec::new();
        for album_id in album_ids {
            let result = self.gateway.get_album_tracks(token, album_id).await;
            let album_tracks = absorb("get_album_tracks", result)?;
            if album_tracks.is_empty() {
                tracing::warn!(album_id = %album_id, "No tracks found for album");
            }
            tracks.extend(album_tracks);
        }
        Ok(tracks)
    }

    /// Similar tracks for the seeds, batched by the catalog's seed limit
    async fn collect_similar(
        &self,
        token: &AccessToken,
        seed_ids: &[String],
    ) -> AppResult<Vec<Track>> {
        if seed_ids.is_empty() {
            tracing::warn!("No seed tracks to query similar tracks with");
            return Ok(Vec::new());
        }

        let target = self.settings.pool_target_size;
        let limit = self.settings.similar_per_call_limit.min(target);

        let tracks = accumulate_batches(
            seed_ids,
            self.settings.similar_batch_size,
            target,
            |batch| {
                let gateway = self.gateway.clone();
                let token = token.clone();
                async move {
                    let result = gateway.get_similar(&token, &batch, limit).await;
                    absorb("get_similar", result)
                }
            },
        )
        .await?;

        tracing::info!(seeds = seed_ids.len(), pool = tracks.len(), "Similar tracks collected");
        Ok(tracks)
    }

    /// Descriptors for `ids`; duplicates are requested once
    async fn lookup_descriptors(
        &self,
        token: &AccessToken,
        ids: &[String],
    ) -> AppResult<DescriptorMap> {
        let mut seen = HashSet::new();
        let unique: Vec<String> = ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();

        let mut descriptors = DescriptorMap::new();
        for chunk in unique.chunks(self.settings.descriptor_batch_size.max(1)) {
            let result = self.gateway.get_descriptors(token, chunk).await;
            descriptors.extend(absorb("get_descriptors", result)?);
        }
        Ok(descriptors)
    }
}

/// Folds a catalog call into its items, degrading shape and transport errors to "no items"
fn absorb<T: Default>(call: &'static str, result: AppResult<Fetched<T>>) -> AppResult<T> {
    match result {
        Ok(Fetched::Items(items)) => Ok(items),
        Ok(Fetched::ShapeError(raw)) => {
            tracing::warn!(call = call, response = %raw, "Unexpected catalog response shape");
            Ok(T::default())
        }
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            tracing::warn!(call = call, error = %e, "Catalog call failed, continuing without it");
            Ok(T::default())
        }
    }
}

/// Nearest pool tracks to the seed centroid, excluding ids in `excluded`
///
/// Seeds and pool are standardized together so the centroid lives in the
/// same space as the index.
fn nearest_tracks<'p>(
    pool: &'p [Candidate],
    k: usize,
    excluded: &HashSet<&str>,
) -> AppResult<Vec<&'p Track>> {
    let records: Vec<Option<DescriptorRecord>> = pool.iter().map(|c| c.descriptor).collect();
    let matrix = extract_features(&records);

    if matrix.is_empty() {
        tracing::warn!(pool_size = pool.len(), "No usable audio features in pool");
        return Err(AppError::NoUsableFeatures);
    }

    let index = NeighborIndex::fit(&matrix, k)?;

    let seed_rows: Vec<usize> = (0..matrix.len())
        .filter(|&row| {
            matrix
                .source_index(row)
                .map(|source| pool[source].seed)
                .unwrap_or(false)
        })
        .collect();

    let centroid = match matrix.centroid(&seed_rows) {
        Some(centroid) => centroid,
        None => {
            tracing::warn!("No seed has audio features, querying with the pool centroid");
            matrix.mean_row().ok_or(AppError::NoUsableFeatures)?
        }
    };

    let neighbors = index.query(&centroid)?;

    tracing::debug!(
        rows = matrix.len(),
        seed_rows = seed_rows.len(),
        k = index.k(),
        nearest_distance = neighbors.first().map(|n| n.distance),
        "Neighbors queried"
    );

    Ok(neighbors
        .iter()
        .filter_map(|n| matrix.source_index(n.row))
        .map(|source| &pool[source].track)
        .filter(|track| !excluded.contains(track.id.as_str()))
        .collect())
}

/// Maps tracks to their parent albums, dropping selected albums
///
/// Repeated albums are kept unless `dedup` is set, in which case the first
/// (closest) occurrence wins.
fn project_to_albums(tracks: Vec<&Track>, excluded: &HashSet<&str>, dedup: bool) -> Vec<Album> {
    let mut seen = HashSet::new();

    tracks
        .into_iter()
        .filter_map(|track| {
            if track.album.is_none() {
                tracing::debug!(track_id = %track.id, "Track has no album reference");
            }
            track.album.as_ref()
        })
        .filter(|album| !excluded.contains(album.id.as_str()))
        .filter(|album| !dedup || seen.insert(album.id.clone()))
        .cloned()
        .collect()
}
