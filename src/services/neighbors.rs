use crate::{
    error::{AppError, AppResult},
    models::FeatureVector,
    services::features::FeatureMatrix,
};

/// A matched row and its Euclidean distance to the query point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub row: usize,
    pub distance: f64,
}

/// Exact k-nearest-neighbor index over one request's feature matrix
///
/// Pools are a few hundred rows at most, so queries scan every row. The index
/// borrows the matrix it was fitted on and has no update operation; a new
/// request fits a new index.
#[derive(Debug)]
pub struct NeighborIndex<'a> {
    matrix: &'a FeatureMatrix,
    k: usize,
}

impl<'a> NeighborIndex<'a> {
    /// Fits an index returning at most `k_requested` neighbors
    ///
    /// The effective neighbor count is clamped to the number of rows.
    pub fn fit(matrix: &'a FeatureMatrix, k_requested: usize) -> AppResult<Self> {
        if matrix.is_empty() {
            return Err(AppError::InsufficientData(
                "Cannot fit a neighbor index on an empty matrix".to_string(),
            ));
        }

        let k = k_requested.min(matrix.len());

        tracing::debug!(
            rows = matrix.len(),
            k_requested = k_requested,
            k = k,
            "Neighbor index fitted"
        );

        Ok(Self { matrix, k })
    }

    /// Effective neighbor count
    pub fn k(&self) -> usize {
        self.k
    }

    /// Returns the `k` closest rows, nearest first
    ///
    /// Equal distances keep row order, so the earlier row wins.
    pub fn query(&self, point: &[f64]) -> AppResult<Vec<Neighbor>> {
        if point.len() != self.matrix.dimension() {
            return Err(AppError::InvalidInput(format!(
                "Query has dimension {}, index has {}",
                point.len(),
                self.matrix.dimension()
            )));
        }

        let mut neighbors: Vec<Neighbor> = self
            .matrix
            .rows()
            .iter()
            .enumerate()
            .map(|(row, values)| Neighbor {
                row,
                distance: euclidean(values, point),
            })
            .collect();

        // sort_by is stable: ties stay in row order
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors.truncate(self.k);

        Ok(neighbors)
    }
}

fn euclidean(row: &FeatureVector, point: &[f64]) -> f64 {
    row.iter()
        .zip(point.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        .sqrt()
}
