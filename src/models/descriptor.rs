use serde::{Deserialize, Serialize};

/// Number of audio descriptors used per track
pub const FEATURE_COUNT: usize = 9;

/// Canonical column order of the feature matrix
pub const FEATURE_KEYS: [&str; FEATURE_COUNT] = [
    "danceability",
    "energy",
    "valence",
    "tempo",
    "loudness",
    "speechiness",
    "acousticness",
    "instrumentalness",
    "liveness",
];

/// One standardized (or raw) row of the feature matrix
pub type FeatureVector = [f64; FEATURE_COUNT];

/// Raw audio descriptors of a single track as reported by the catalog
///
/// Values are in the catalog's own ranges: most are 0..1, `tempo` is BPM and
/// `loudness` is dB (typically -60..0). Unknown fields in the payload are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DescriptorRecord {
    pub danceability: f64,
    pub energy: f64,
    pub valence: f64,
    pub tempo: f64,
    pub loudness: f64,
    pub speechiness: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
}

impl DescriptorRecord {
    /// Values in `FEATURE_KEYS` order
    pub fn to_vector(&self) -> FeatureVector {
        [
            self.danceability,
            self.energy,
            self.valence,
            self.tempo,
            self.loudness,
            self.speechiness,
            self.acousticness,
            self.instrumentalness,
            self.liveness,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_follows_canonical_order() {
        let record = DescriptorRecord {
            danceability: 0.1,
            energy: 0.2,
            valence: 0.3,
            tempo: 120.0,
            loudness: -5.0,
            speechiness: 0.6,
            acousticness: 0.7,
            instrumentalness: 0.8,
            liveness: 0.9,
        };

        let vector = record.to_vector();
        assert_eq!(vector[FEATURE_KEYS.iter().position(|k| *k == "tempo").unwrap()], 120.0);
        assert_eq!(vector[FEATURE_KEYS.iter().position(|k| *k == "loudness").unwrap()], -5.0);
        assert_eq!(vector[0], 0.1);
        assert_eq!(vector[8], 0.9);
    }

    #[test]
    fn test_deserialize_ignores_extra_fields() {
        let json = r#"{
            "danceability": 0.735,
            "energy": 0.578,
            "key": 5,
            "loudness": -11.84,
            "mode": 0,
            "speechiness": 0.0461,
            "acousticness": 0.514,
            "instrumentalness": 0.0902,
            "liveness": 0.159,
            "valence": 0.624,
            "tempo": 98.002,
            "type": "audio_features",
            "id": "06AKEBrKUckW0KREUWRnvT"
        }"#;

        let record: DescriptorRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.tempo, 98.002);
        assert_eq!(record.loudness, -11.84);
    }

    #[test]
    fn test_deserialize_missing_field_fails() {
        let json = r#"{"danceability": 0.5, "energy": 0.5}"#;
        assert!(serde_json::from_str::<DescriptorRecord>(json).is_err());
    }
}
