//! Distance matrix and its provider-backed builder.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::traits::DistanceProvider;

/// A dense n×n distance matrix in kilometers, stored in row-major order.
///
/// The diagonal is zero, entries are never negative and unreachable pairs are
/// `f64::INFINITY`. Entries may be asymmetric.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    data: Vec<f64>,
    size: usize,
}

impl DistanceMatrix {
    /// Creates a distance matrix of the given size, initialized to zero.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0.0; size * size],
            size,
        }
    }

    /// Creates a matrix from explicit rows.
    ///
    /// Returns `None` if the rows are not square, the diagonal is not zero,
    /// or any entry is negative or NaN.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Option<Self> {
        let size = rows.len();
        let mut data = Vec::with_capacity(size * size);

        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != size || row[i] != 0.0 {
                return None;
            }
            if row.iter().any(|value| value.is_nan() || *value < 0.0) {
                return None;
            }
            data.extend(row);
        }

        Some(Self { data, size })
    }

    /// Returns the distance from `from` to `to`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.data[from * self.size + to]
    }

    fn set(&mut self, from: usize, to: usize, distance: f64) {
        self.data[from * self.size + to] = distance;
    }

    /// Number of locations in this matrix.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_reachable(&self, from: usize, to: usize) -> bool {
        self.get(from, to).is_finite()
    }

    /// Sum of the arcs along `path`. Infinite if any arc is unreachable.
    pub fn path_distance(&self, path: &[usize]) -> f64 {
        path.windows(2).map(|arc| self.get(arc[0], arc[1])).sum()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks(self.size.max(1))
    }
}

/// A pair whose lookup failed and was replaced by a synthetic estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct DegradedPair {
    pub from: usize,
    pub to: usize,
    pub estimate_km: f64,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct MatrixBuild {
    pub matrix: DistanceMatrix,
    pub degraded: Vec<DegradedPair>,
}

/// Builds distance matrices by fanning pairwise lookups out over a bounded
/// worker pool.
pub struct MatrixBuilder<P> {
    provider: P,
    pool: rayon::ThreadPool,
    fallback_km_per_step: f64,
}

impl<P: DistanceProvider> MatrixBuilder<P> {
    pub fn new(
        provider: P,
        max_concurrent_lookups: usize,
        fallback_km_per_step: f64,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_concurrent_lookups)
            .thread_name(|index| format!("distance-lookup-{}", index))
            .build()?;

        Ok(Self {
            provider,
            pool,
            fallback_km_per_step,
        })
    }

    /// Synthetic distance used when the provider fails for `(from, to)`.
    pub fn fallback_estimate(&self, from: usize, to: usize) -> f64 {
        from.abs_diff(to) as f64 * self.fallback_km_per_step
    }

    /// Build the matrix for `coordinates` (lat, lng) in the given order.
    pub fn build(&self, coordinates: &[(f64, f64)]) -> MatrixBuild {
        let n = coordinates.len();
        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|from| (0..n).filter(move |&to| to != from).map(move |to| (from, to)))
            .collect();

        // Every lookup completes before any cell is written.
        let lookups: Vec<((usize, usize), Result<Option<f64>, ProviderError>)> = self.pool.install(|| {
            pairs
                .par_iter()
                .map(|&(from, to)| {
                    let result = self
                        .provider
                        .distance_meters(coordinates[from], coordinates[to])
                        .and_then(check_meters);
                    ((from, to), result)
                })
                .collect()
        });

        let mut matrix = DistanceMatrix::new(n);
        let mut degraded = Vec::new();

        for ((from, to), result) in lookups {
            match result {
                Ok(Some(meters)) => matrix.set(from, to, meters / 1000.0),
                Ok(None) => matrix.set(from, to, f64::INFINITY),
                Err(err) => {
                    let estimate_km = self.fallback_estimate(from, to);
                    warn!(from, to, estimate_km, error = %err, "distance lookup failed, using fallback estimate");
                    matrix.set(from, to, estimate_km);
                    degraded.push(DegradedPair {
                        from,
                        to,
                        estimate_km,
                        reason: err.to_string(),
                    });
                }
            }
        }

        debug!(size = n, lookups = pairs.len(), degraded = degraded.len(), "distance matrix built");

        MatrixBuild { matrix, degraded }
    }
}

fn check_meters(meters: Option<f64>) -> Result<Option<f64>, ProviderError> {
    match meters {
        Some(value) if value.is_nan() || value < 0.0 => Err(ProviderError::InvalidDistance(value)),
        Some(value) if value.is_infinite() => Ok(None),
        other => Ok(other),
    }
}
