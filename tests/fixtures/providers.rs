//! Distance providers with predictable behavior.

use std::sync::atomic::{AtomicUsize, Ordering};

use bin_route_planner::error::ProviderError;
use bin_route_planner::traits::DistanceProvider;

/// Manhattan distance in degrees, 1 degree = 100 km.
pub struct ManhattanProvider;

impl DistanceProvider for ManhattanProvider {
    fn distance_meters(&self, from: (f64, f64), to: (f64, f64)) -> Result<Option<f64>, ProviderError> {
        let degrees = (from.0 - to.0).abs() + (from.1 - to.1).abs();
        Ok(Some(degrees * 100_000.0))
    }
}

/// Every lookup fails as if the service were down.
pub struct DownProvider;

impl DistanceProvider for DownProvider {
    fn distance_meters(&self, _from: (f64, f64), _to: (f64, f64)) -> Result<Option<f64>, ProviderError> {
        Err(ProviderError::Service {
            code: "Unavailable".to_string(),
            message: "service down".to_string(),
        })
    }
}

/// Wraps a provider and fails lookups leaving one coordinate.
pub struct FailFrom<P> {
    pub inner: P,
    pub origin: (f64, f64),
}

impl<P: DistanceProvider> DistanceProvider for FailFrom<P> {
    fn distance_meters(&self, from: (f64, f64), to: (f64, f64)) -> Result<Option<f64>, ProviderError> {
        if from == self.origin {
            Err(ProviderError::InvalidDistance(f64::NAN))
        } else {
            self.inner.distance_meters(from, to)
        }
    }
}

/// Wraps a provider and reports no route into one coordinate.
pub struct NoRouteTo<P> {
    pub inner: P,
    pub target: (f64, f64),
}

impl<P: DistanceProvider> DistanceProvider for NoRouteTo<P> {
    fn distance_meters(&self, from: (f64, f64), to: (f64, f64)) -> Result<Option<f64>, ProviderError> {
        if to == self.target {
            Ok(None)
        } else {
            self.inner.distance_meters(from, to)
        }
    }
}

/// Counts lookups, delegating to the Manhattan provider.
#[derive(Default)]
pub struct CountingProvider {
    pub calls: AtomicUsize,
}

impl CountingProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DistanceProvider for CountingProvider {
    fn distance_meters(&self, from: (f64, f64), to: (f64, f64)) -> Result<Option<f64>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ManhattanProvider.distance_meters(from, to)
    }
}

/// Two one-way rings of seven stops, indexed by latitude in hundredths.
/// The bridge 3 → 7 and the return 10 → 4 skip 11..13, so every stop can be
/// entered and left but no closed tour covers all fourteen.
pub struct TwoRingsProvider;

impl TwoRingsProvider {
    pub const STOPS: usize = 14;

    fn index(coordinate: (f64, f64)) -> usize {
        (coordinate.0 * 100.0).round() as usize
    }

    fn is_open(from: usize, to: usize) -> bool {
        let ring_next = if from < 7 { (from + 1) % 7 } else { 7 + (from - 6) % 7 };
        to == ring_next || (from, to) == (3, 7) || (from, to) == (10, 4)
    }
}

impl DistanceProvider for TwoRingsProvider {
    fn distance_meters(&self, from: (f64, f64), to: (f64, f64)) -> Result<Option<f64>, ProviderError> {
        if Self::is_open(Self::index(from), Self::index(to)) {
            Ok(Some(1000.0))
        } else {
            Ok(None)
        }
    }
}
