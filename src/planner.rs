//! Fleet planning: filter, build matrix and solve per vehicle.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{PlannerConfig, validate_fleet};
use crate::error::{ConfigurationError, PlanError, SolveError};
use crate::filter;
use crate::matrix::MatrixBuilder;
use crate::model::{FleetSummary, Route, Stop, Vehicle};
use crate::solver;
use crate::traits::DistanceProvider;

#[derive(Debug, Clone, Serialize)]
pub struct VehiclePlan {
    pub route: Route,
    pub summary: FleetSummary,
}

/// Something that degraded or failed during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A distance lookup failed and a synthetic estimate was used.
    ProviderFallback {
        vehicle: String,
        from: String,
        to: String,
        estimate_km: f64,
        reason: String,
    },
    /// No feasible route was found; the vehicle has no plan. `proven` is
    /// false when the time limit ran out before the search could settle it.
    Infeasible {
        vehicle: String,
        reason: String,
        proven: bool,
    },
    /// The configured visiting order uses an unreachable arc, so savings
    /// are reported as zero.
    UnreachableBaseline { vehicle: String },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FleetPlan {
    pub plans: BTreeMap<String, VehiclePlan>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FleetPlan {
    pub fn get(&self, vehicle_id: &str) -> Option<&VehiclePlan> {
        self.plans.get(vehicle_id)
    }

    /// Summaries of every planned vehicle added together.
    pub fn totals(&self) -> FleetSummary {
        self.plans
            .values()
            .fold(FleetSummary::default(), |total, plan| total.combine(&plan.summary))
    }
}

struct VehicleOutcome {
    vehicle_id: String,
    plan: Option<VehiclePlan>,
    diagnostics: Vec<Diagnostic>,
}

pub struct FleetPlanner<P> {
    config: PlannerConfig,
    builder: MatrixBuilder<P>,
}

impl<P: DistanceProvider> FleetPlanner<P> {
    pub fn new(provider: P, config: PlannerConfig) -> Result<Self, PlanError> {
        config.validate()?;
        let builder = MatrixBuilder::new(provider, config.max_concurrent_lookups, config.fallback_km_per_step)?;
        Ok(Self { config, builder })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan every vehicle independently.
    ///
    /// Configuration errors abort before any lookup. Infeasible vehicles are
    /// left out of `plans` and reported in `diagnostics`.
    pub fn plan(&self, vehicles: &[Vehicle]) -> Result<FleetPlan, ConfigurationError> {
        validate_fleet(vehicles)?;

        let outcomes = vehicles
            .par_iter()
            .map(|vehicle| self.plan_vehicle(vehicle))
            .collect::<Result<Vec<_>, _>>()?;

        let mut fleet = FleetPlan::default();
        for outcome in outcomes {
            fleet.diagnostics.extend(outcome.diagnostics);
            if let Some(plan) = outcome.plan {
                fleet.plans.insert(outcome.vehicle_id, plan);
            }
        }

        Ok(fleet)
    }

    fn plan_vehicle(&self, vehicle: &Vehicle) -> Result<VehicleOutcome, ConfigurationError> {
        let selected: Vec<&Stop> = filter::select(&vehicle.locations, &vehicle.fill_levels, self.config.threshold);
        let depot = selected
            .iter()
            .position(|stop| stop.is_depot)
            .ok_or_else(|| ConfigurationError::MissingDepot {
                vehicle: vehicle.id.clone(),
            })?;

        let coordinates: Vec<(f64, f64)> = selected.iter().map(|stop| stop.coordinate).collect();
        let build = self.builder.build(&coordinates);
        let matrix = build.matrix;

        let mut outcome = VehicleOutcome {
            vehicle_id: vehicle.id.clone(),
            plan: None,
            diagnostics: build
                .degraded
                .into_iter()
                .map(|pair| Diagnostic::ProviderFallback {
                    vehicle: vehicle.id.clone(),
                    from: selected[pair.from].name.clone(),
                    to: selected[pair.to].name.clone(),
                    estimate_km: pair.estimate_km,
                    reason: pair.reason,
                })
                .collect(),
        };

        let tour = match solver::solve(&matrix, depot, &self.config.solve_options()) {
            Ok(tour) => tour,
            Err(err) => {
                warn!(vehicle = %vehicle.id, error = %err, "no feasible route, skipping vehicle");
                outcome.diagnostics.push(Diagnostic::Infeasible {
                    vehicle: vehicle.id.clone(),
                    reason: err.to_string(),
                    proven: !matches!(err, SolveError::Unproven { .. }),
                });
                return Ok(outcome);
            }
        };

        // Unoptimized baseline: the configured order, depot first and last.
        let baseline: Vec<usize> = std::iter::once(depot)
            .chain((0..selected.len()).filter(|&index| index != depot))
            .chain(std::iter::once(depot))
            .collect();
        let baseline_km = matrix.path_distance(&baseline);

        let (nodes, optimized_km) = if baseline_km < tour.distance_km {
            (baseline, baseline_km)
        } else {
            (tour.nodes, tour.distance_km)
        };

        let initial_km = if baseline_km.is_finite() {
            baseline_km
        } else {
            outcome.diagnostics.push(Diagnostic::UnreachableBaseline {
                vehicle: vehicle.id.clone(),
            });
            optimized_km
        };

        let summary = FleetSummary::from_distances(initial_km, optimized_km, &self.config.rates());
        let route = Route {
            stops: nodes.iter().map(|&index| selected[index].clone()).collect(),
            distance_km: optimized_km,
        };

        info!(
            vehicle = %vehicle.id,
            stops = selected.len() - 1,
            optimized_km,
            saved_km = summary.distance_saved,
            "vehicle planned"
        );

        outcome.plan = Some(VehiclePlan { route, summary });
        Ok(outcome)
    }
}
