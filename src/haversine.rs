//! Haversine distance provider (fallback when no routing service is available).
//!
//! Uses great-circle distance scaled by a detour factor.
//! Less accurate than road routing but always available.

use crate::error::ProviderError;
use crate::traits::DistanceProvider;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Straight-line distance provider.
#[derive(Debug, Clone)]
pub struct HaversineDistance {
    /// Multiplier applied to the great-circle distance to approximate roads.
    pub detour_factor: f64,
}

impl Default for HaversineDistance {
    fn default() -> Self {
        Self { detour_factor: 1.0 }
    }
}

impl HaversineDistance {
    pub fn new(detour_factor: f64) -> Self {
        Self { detour_factor }
    }

    /// Calculate haversine distance between two points in kilometers.
    pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
        let (lat1, lng1) = from;
        let (lat2, lng2) = to;

        let lat1_rad = lat1.to_radians();
        let lat2_rad = lat2.to_radians();
        let delta_lat = (lat2 - lat1).to_radians();
        let delta_lng = (lng2 - lng1).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }
}

impl DistanceProvider for HaversineDistance {
    fn distance_meters(&self, from: (f64, f64), to: (f64, f64)) -> Result<Option<f64>, ProviderError> {
        Ok(Some(Self::haversine_km(from, to) * 1000.0 * self.detour_factor))
    }
}
