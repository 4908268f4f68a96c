//! bin-route-planner core
//!
//! Threshold filtering, distance matrices and single-vehicle tour solving
//! for a fleet of collection vehicles.

pub mod config;
pub mod error;
pub mod filter;
pub mod haversine;
pub mod matrix;
pub mod model;
pub mod osrm;
pub mod planner;
pub mod solver;
pub mod traits;
