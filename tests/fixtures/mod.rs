//! Test fixtures for bin-route-planner.
//!
//! Provides realistic test data including:
//! - Markham / Richmond Hill bin locations with fill levels
//! - Hand-written distance providers for deterministic matrices

#![allow(dead_code)]

pub mod providers;
pub mod york_region_locations;

pub use providers::*;
pub use york_region_locations::*;
