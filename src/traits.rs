//! Core seams of the planner.
//!
//! The planner never talks to a routing service directly; it asks a
//! [`DistanceProvider`] for one directed pair at a time. Concrete providers
//! (OSRM, haversine, test doubles, caches) implement this trait.

use std::sync::Arc;

use crate::error::ProviderError;

/// Provides the directed travel distance between two coordinates.
///
/// Coordinates are `(lat, lng)` pairs. Lookups are issued from worker threads,
/// so implementations must be thread-safe.
pub trait DistanceProvider: Send + Sync {
    /// Travel distance in meters from `from` to `to`.
    ///
    /// Returns `Ok(None)` when the provider knows there is no viable path.
    fn distance_meters(&self, from: (f64, f64), to: (f64, f64)) -> Result<Option<f64>, ProviderError>;
}

impl<P: DistanceProvider + ?Sized> DistanceProvider for &P {
    fn distance_meters(&self, from: (f64, f64), to: (f64, f64)) -> Result<Option<f64>, ProviderError> {
        (**self).distance_meters(from, to)
    }
}

impl<P: DistanceProvider + ?Sized> DistanceProvider for Box<P> {
    fn distance_meters(&self, from: (f64, f64), to: (f64, f64)) -> Result<Option<f64>, ProviderError> {
        (**self).distance_meters(from, to)
    }
}

impl<P: DistanceProvider + ?Sized> DistanceProvider for Arc<P> {
    fn distance_meters(&self, from: (f64, f64), to: (f64, f64)) -> Result<Option<f64>, ProviderError> {
        (**self).distance_meters(from, to)
    }
}
