use crate::models::{DescriptorRecord, FeatureVector, FEATURE_COUNT, FEATURE_KEYS};

/// Standard deviations at or below this (relative to the column mean) count as zero variance
const ZERO_VARIANCE_TOLERANCE: f64 = 1e-12;

/// Z-score standardized descriptor rows for one request
///
/// Every row was scaled with the same per-column mean and standard deviation,
/// computed over this matrix only. Rows keep the relative order of the records
/// they came from; `source_index` maps a row back to its input position.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: Vec<FeatureVector>,
    source_rows: Vec<usize>,
}

impl FeatureMatrix {
    /// A matrix with no rows and dimension 0
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            source_rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Columns per row; 0 for an empty matrix
    pub fn dimension(&self) -> usize {
        if self.rows.is_empty() {
            0
        } else {
            FEATURE_COUNT
        }
    }

    pub fn rows(&self) -> &[FeatureVector] {
        &self.rows
    }

    /// Position in the extractor input that produced `row`
    pub fn source_index(&self, row: usize) -> Option<usize> {
        self.source_rows.get(row).copied()
    }

    /// Column-wise mean of the given rows, `None` if no valid row is given
    pub fn centroid(&self, rows: &[usize]) -> Option<FeatureVector> {
        let selected: Vec<&FeatureVector> = rows.iter().filter_map(|&i| self.rows.get(i)).collect();
        if selected.is_empty() {
            return None;
        }

        let mut centroid = [0.0; FEATURE_COUNT];
        for row in &selected {
            for (acc, value) in centroid.iter_mut().zip(row.iter()) {
                *acc += value;
            }
        }

        let n = selected.len() as f64;
        for value in centroid.iter_mut() {
            *value /= n;
        }

        Some(centroid)
    }

    /// Column-wise mean of every row
    pub fn mean_row(&self) -> Option<FeatureVector> {
        let all: Vec<usize> = (0..self.rows.len()).collect();
        self.centroid(&all)
    }
}

/// Builds a standardized feature matrix from descriptor records
///
/// Missing records are dropped. Columns follow `FEATURE_KEYS`; a column with
/// zero variance standardizes to all zeros.
pub fn extract_features(records: &[Option<DescriptorRecord>]) -> FeatureMatrix {
    let (source_rows, mut rows): (Vec<usize>, Vec<FeatureVector>) = records
        .iter()
        .enumerate()
        .filter_map(|(i, record)| record.as_ref().map(|r| (i, r.to_vector())))
        .unzip();

    if rows.is_empty() {
        tracing::debug!(input = records.len(), "No descriptor records to extract");
        return FeatureMatrix::empty();
    }

    standardize(&mut rows);

    tracing::debug!(
        input = records.len(),
        rows = rows.len(),
        dropped = records.len() - rows.len(),
        "Feature matrix extracted"
    );

    FeatureMatrix { rows, source_rows }
}

/// Per-column z-score using population statistics
fn standardize(rows: &mut [FeatureVector]) {
    let n = rows.len() as f64;

    for column in 0..FEATURE_COUNT {
        let mean = rows.iter().map(|row| row[column]).sum::<f64>() / n;
        let variance = rows
            .iter()
            .map(|row| (row[column] - mean).powi(2))
            .sum::<f64>()
            / n;
        let std = variance.sqrt();

        let degenerate = std <= ZERO_VARIANCE_TOLERANCE * mean.abs().max(1.0);
        if degenerate {
            tracing::debug!(feature = FEATURE_KEYS[column], mean, "Zero-variance feature column");
        }
        for row in rows.iter_mut() {
            row[column] = if degenerate {
                0.0
            } else {
                (row[column] - mean) / std
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(seed: f64) -> DescriptorRecord {
        DescriptorRecord {
            danceability: 0.1 * seed,
            energy: 0.9 - 0.05 * seed,
            valence: (seed * 0.37) % 1.0,
            tempo: 80.0 + 11.0 * seed,
            loudness: -20.0 + seed,
            speechiness: 0.03 * seed,
            acousticness: 1.0 / (seed + 1.0),
            instrumentalness: 0.5,
            liveness: 0.02 * seed * seed,
        }
    }

    fn column(matrix: &FeatureMatrix, c: usize) -> Vec<f64> {
        matrix.rows().iter().map(|row| row[c]).collect()
    }

    #[test]
    fn test_drops_missing_records_and_keeps_order() {
        let records = vec![
            Some(record(1.0)),
            None,
            Some(record(2.0)),
            None,
            Some(record(3.0)),
        ];

        let matrix = extract_features(&records);

        assert_eq!(matrix.len(), 3);
        assert_eq!(matrix.dimension(), FEATURE_COUNT);
        assert_eq!(matrix.source_index(0), Some(0));
        assert_eq!(matrix.source_index(1), Some(2));
        assert_eq!(matrix.source_index(2), Some(4));
        assert_eq!(matrix.source_index(3), None);
        // tempo grows with seed, so standardized tempo must stay increasing
        let tempo = column(&matrix, 3);
        assert!(tempo[0] < tempo[1] && tempo[1] < tempo[2]);
    }

    #[test]
    fn test_all_missing_yields_empty_matrix() {
        let matrix = extract_features(&[None, None, None]);
        assert!(matrix.is_empty());
        assert_eq!(matrix.dimension(), 0);
        assert_eq!(matrix.mean_row(), None);

        let matrix = extract_features(&[]);
        assert!(matrix.is_empty());
    }

    #[test]
    fn test_columns_have_zero_mean_unit_std() {
        let records: Vec<Option<DescriptorRecord>> =
            (0..12).map(|i| Some(record(i as f64))).collect();
        let matrix = extract_features(&records);

        for c in 0..FEATURE_COUNT {
            let values = column(&matrix, c);
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();

            assert!(mean.abs() < 1e-9, "column {} mean {}", c, mean);
            if c == 7 {
                // instrumentalness is constant in the fixture
                assert!(values.iter().all(|v| *v == 0.0));
            } else {
                assert!((std - 1.0).abs() < 1e-9, "column {} std {}", c, std);
            }
        }
    }

    #[test]
    fn test_zero_variance_column_is_zero_not_nan() {
        let mut a = record(1.0);
        let mut b = record(2.0);
        a.valence = 0.1;
        b.valence = 0.1;

        let matrix = extract_features(&[Some(a), Some(b), Some(a)]);

        for row in matrix.rows() {
            assert_eq!(row[2], 0.0);
            assert!(row.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_single_row_standardizes_to_zeros() {
        let matrix = extract_features(&[Some(record(4.0))]);
        assert_eq!(matrix.len(), 1);
        assert!(matrix.rows()[0].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_statistics_are_local_to_each_call() {
        let first = extract_features(&[Some(record(1.0)), Some(record(2.0))]);
        let _other = extract_features(&[Some(record(50.0)), Some(record(90.0)), None]);
        let again = extract_features(&[Some(record(1.0)), Some(record(2.0))]);

        assert_eq!(first, again);
    }

    #[test]
    fn test_centroid_of_selected_rows() {
        let records: Vec<Option<DescriptorRecord>> =
            (0..4).map(|i| Some(record(i as f64))).collect();
        let matrix = extract_features(&records);

        let centroid = matrix.centroid(&[0, 2]).unwrap();
        for c in 0..FEATURE_COUNT {
            let expected = (matrix.rows()[0][c] + matrix.rows()[2][c]) / 2.0;
            assert!((centroid[c] - expected).abs() < 1e-12);
        }

        // mean of all standardized rows is the origin
        let mean = matrix.mean_row().unwrap();
        assert!(mean.iter().all(|v| v.abs() < 1e-9));

        assert_eq!(matrix.centroid(&[]), None);
        assert_eq!(matrix.centroid(&[99]), None);
    }
}
