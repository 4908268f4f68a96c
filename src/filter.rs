//! Threshold selection of stops worth visiting.

use std::collections::HashMap;

use crate::model::Stop;

/// Keep the depot and every stop whose fill level is at least `threshold`.
///
/// Stops missing from `fill_levels` count as fill level 0. Input order is
/// preserved so matrix indices stay deterministic.
pub fn select<'a>(locations: &'a [Stop], fill_levels: &HashMap<String, u32>, threshold: u32) -> Vec<&'a Stop> {
    locations
        .iter()
        .filter(|stop| stop.is_depot || fill_levels.get(&stop.name).copied().unwrap_or(0) >= threshold)
        .collect()
}
