//! Planner configuration, loaded once per run.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigurationError;
use crate::model::{CostRates, Vehicle};
use crate::osrm::OsrmConfig;
use crate::solver::SolveOptions;

/// Constants consumed by a planning run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Minimum fill level percent for a stop to be visited.
    pub threshold: u32,
    pub fuel_price_per_liter: f64,
    pub fuel_consumption_per_km: f64,
    pub labor_hours_saved_per_km: f64,
    /// Per-vehicle solver wall-clock limit.
    pub time_limit_secs: f64,
    /// Guided local search rounds before the solver stops on its own.
    pub max_iterations: usize,
    /// Worker threads for distance lookups.
    pub max_concurrent_lookups: usize,
    /// Synthetic kilometers per index step when a lookup fails.
    pub fallback_km_per_step: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            threshold: 40,
            fuel_price_per_liter: 1.52,
            fuel_consumption_per_km: 0.3,
            labor_hours_saved_per_km: 0.05,
            time_limit_secs: 30.0,
            max_iterations: 1000,
            max_concurrent_lookups: 8,
            fallback_km_per_step: 5.0,
        }
    }
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let non_negative = [
            ("fuel_price_per_liter", self.fuel_price_per_liter),
            ("fuel_consumption_per_km", self.fuel_consumption_per_km),
            ("labor_hours_saved_per_km", self.labor_hours_saved_per_km),
            ("time_limit_secs", self.time_limit_secs),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigurationError::InvalidConstant { name, value });
            }
        }

        if !self.fallback_km_per_step.is_finite() || self.fallback_km_per_step <= 0.0 {
            return Err(ConfigurationError::InvalidConstant {
                name: "fallback_km_per_step",
                value: self.fallback_km_per_step,
            });
        }
        if self.max_concurrent_lookups == 0 {
            return Err(ConfigurationError::InvalidConstant {
                name: "max_concurrent_lookups",
                value: 0.0,
            });
        }

        Ok(())
    }

    pub fn rates(&self) -> CostRates {
        CostRates {
            fuel_price_per_liter: self.fuel_price_per_liter,
            fuel_consumption_per_km: self.fuel_consumption_per_km,
            labor_hours_saved_per_km: self.labor_hours_saved_per_km,
        }
    }

    pub fn solve_options(&self) -> SolveOptions {
        SolveOptions {
            time_limit: Duration::try_from_secs_f64(self.time_limit_secs).unwrap_or(Duration::MAX),
            max_iterations: self.max_iterations,
            ..SolveOptions::default()
        }
    }
}

/// A whole fleet: constants, routing service settings and vehicle records.
#[derive(Debug, Clone, Deserialize)]
pub struct FleetConfig {
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub osrm: OsrmConfig,
    pub vehicles: Vec<Vehicle>,
}

impl FleetConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        let config: FleetConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.planner.validate()?;
        validate_fleet(&self.vehicles)
    }
}

/// Check every vehicle record and that vehicle ids are unique.
pub fn validate_fleet(vehicles: &[Vehicle]) -> Result<(), ConfigurationError> {
    if vehicles.is_empty() {
        return Err(ConfigurationError::NoVehicles);
    }

    let mut ids = HashSet::new();
    for vehicle in vehicles {
        if !ids.insert(vehicle.id.as_str()) {
            return Err(ConfigurationError::DuplicateVehicle(vehicle.id.clone()));
        }
        vehicle.validate()?;
    }

    Ok(())
}
