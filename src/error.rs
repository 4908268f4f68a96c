//! Error taxonomy for planning runs.
//!
//! Provider failures are recoverable and handled inside the matrix builder,
//! solver infeasibility is recoverable per vehicle, configuration errors are
//! fatal and stop a run before any solving starts.

use thiserror::Error;

/// A single distance lookup failed.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("malformed provider response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("provider rejected query ({code}): {message}")]
    Service { code: String, message: String },

    #[error("provider returned invalid distance {0}")]
    InvalidDistance(f64),
}

/// Malformed vehicle, location or constant data.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("fleet has no vehicles")]
    NoVehicles,

    #[error("vehicle id {0:?} appears more than once")]
    DuplicateVehicle(String),

    #[error("vehicle {vehicle:?} has no locations")]
    NoLocations { vehicle: String },

    #[error("vehicle {vehicle:?} has no depot")]
    MissingDepot { vehicle: String },

    #[error("vehicle {vehicle:?} has {count} depots, expected exactly one")]
    MultipleDepots { vehicle: String, count: usize },

    #[error("vehicle {vehicle:?} lists stop {stop:?} more than once")]
    DuplicateStop { vehicle: String, stop: String },

    #[error("vehicle {vehicle:?} assigns a fill level to its depot {stop:?}")]
    DepotFillLevel { vehicle: String, stop: String },

    #[error("vehicle {vehicle:?} has a fill level for unknown stop {stop:?}")]
    UnknownStop { vehicle: String, stop: String },

    #[error("vehicle {vehicle:?} stop {stop:?} has invalid coordinate ({lat}, {lng})")]
    InvalidCoordinate {
        vehicle: String,
        stop: String,
        lat: f64,
        lng: f64,
    },

    #[error("invalid value {value} for {name}")]
    InvalidConstant { name: &'static str, value: f64 },

    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The solver could not produce a tour.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    /// No closed tour avoids every unreachable arc.
    ///
    /// `unreachable` lists the nodes that cannot be entered or left at all,
    /// or, when every node has some open arc, the nodes next to the
    /// unreachable arcs the construction tour needed.
    #[error("no feasible tour exists (unreachable nodes: {unreachable:?})")]
    Infeasible { unreachable: Vec<usize> },

    /// The time limit ran out before a tour avoiding every unreachable arc
    /// was found. No proof that none exists.
    #[error("no feasible tour found within the time limit over {nodes} nodes; infeasibility not proven")]
    Unproven { nodes: usize },

    #[error("depot index {depot} out of range for {size} nodes")]
    DepotOutOfRange { depot: usize, size: usize },
}

/// Fatal failure of a whole planning run.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("cannot build lookup worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}
