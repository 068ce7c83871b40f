use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Spotify client-credentials id
    pub spotify_client_id: String,

    /// Spotify client-credentials secret
    pub spotify_client_secret: String,

    /// Spotify Web API base URL
    #[serde(default = "default_spotify_api_url")]
    pub spotify_api_url: String,

    /// Spotify token endpoint
    #[serde(default = "default_spotify_auth_url")]
    pub spotify_auth_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Timeout applied to every catalog call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Retries for transient catalog failures (0 disables retrying)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Seeds per similarity query; the catalog rejects more than 5
    #[serde(default = "default_similar_batch_size")]
    pub similar_batch_size: usize,

    #[serde(default = "default_similar_per_call_limit")]
    pub similar_per_call_limit: usize,

    /// Size the similarity pool is truncated to
    #[serde(default = "default_pool_target_size")]
    pub pool_target_size: usize,

    #[serde(default = "default_track_lookup_batch_size")]
    pub track_lookup_batch_size: usize,

    #[serde(default = "default_descriptor_batch_size")]
    pub descriptor_batch_size: usize,

    /// Neighbor count in track mode
    #[serde(default = "default_track_neighbors")]
    pub track_neighbors: usize,

    /// Neighbor count in album mode
    #[serde(default = "default_album_neighbors")]
    pub album_neighbors: usize,

    /// Collapse repeated parent albums in album mode
    #[serde(default)]
    pub dedup_albums: bool,
}

fn default_spotify_api_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_spotify_auth_url() -> String {
    "https://accounts.spotify.com/api/token".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    250
}

fn default_similar_batch_size() -> usize {
    5
}

fn default_similar_per_call_limit() -> usize {
    50
}

fn default_pool_target_size() -> usize {
    150
}

fn default_track_lookup_batch_size() -> usize {
    50
}

fn default_descriptor_batch_size() -> usize {
    100
}

fn default_track_neighbors() -> usize {
    10
}

fn default_album_neighbors() -> usize {
    30
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied_when_only_credentials_set() {
        let vars = vec![
            ("SPOTIFY_CLIENT_ID".to_string(), "id".to_string()),
            ("SPOTIFY_CLIENT_SECRET".to_string(), "secret".to_string()),
        ];

        let config: Config = envy::from_iter(vars).unwrap();

        assert_eq!(config.port, 5000);
        assert_eq!(config.similar_batch_size, 5);
        assert_eq!(config.pool_target_size, 150);
        assert_eq!(config.track_neighbors, 10);
        assert!(config.album_neighbors > config.track_neighbors);
        assert!(!config.dedup_albums);
    }

    #[test]
    fn test_missing_credentials_fail() {
        let vars: Vec<(String, String)> = vec![("PORT".to_string(), "8080".to_string())];
        assert!(envy::from_iter::<_, Config>(vars).is_err());
    }

    #[test]
    fn test_overrides_are_parsed() {
        let vars = vec![
            ("SPOTIFY_CLIENT_ID".to_string(), "id".to_string()),
            ("SPOTIFY_CLIENT_SECRET".to_string(), "secret".to_string()),
            ("DEDUP_ALBUMS".to_string(), "true".to_string()),
            ("ALBUM_NEIGHBORS".to_string(), "50".to_string()),
        ];

        let config: Config = envy::from_iter(vars).unwrap();
        assert!(config.dedup_albums);
        assert_eq!(config.album_neighbors, 50);
    }
}
