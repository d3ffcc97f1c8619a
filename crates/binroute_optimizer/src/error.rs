use binroute_matrix_providers::error::ProviderError;
use thiserror::Error;

use crate::problem::{amount::Amount, location::LocationIdx, vehicle::VehicleIdx};

/// Rejected input. Nothing is solved when one of these is returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputError {
    #[error("No depot was provided")]
    MissingDepot,

    #[error("No vehicles available")]
    NoVehicles,

    #[error("Pickup {id} has an invalid demand {demand}")]
    InvalidDemand { id: String, demand: f64 },

    #[error("Vehicle {id} has an invalid capacity {capacity}")]
    InvalidCapacity { id: String, capacity: f64 },

    #[error("Location {id} has invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinates {
        id: String,
        latitude: f64,
        longitude: f64,
    },

    #[error("{id} has an amount of {value} above the supported maximum of {max}")]
    AmountOutOfRange { id: String, value: f64, max: f64 },

    #[error("Pickup id {id} is used more than once")]
    DuplicatePickupId { id: String },

    #[error(
        "Pickup {id} has a demand of {demand} which exceeds the maximum vehicle capacity of {max_capacity}"
    )]
    DemandExceedsCapacity {
        id: String,
        demand: f64,
        max_capacity: f64,
    },

    #[error("Cost matrix has {actual} locations, expected {expected}")]
    MatrixDimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid cost matrix: {0}")]
    InvalidMatrix(String),

    #[error("Invalid time budget {0}")]
    InvalidTimeBudget(f64),
}

/// A solution that breaks the routing invariants. Always a bug in the solver.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("Location {location} is visited more than once")]
    DuplicateStop { location: LocationIdx },

    #[error("Location {location} is neither routed nor unassigned")]
    MissingLocation { location: LocationIdx },

    #[error("Vehicle {vehicle} visits the depot as a stop")]
    DepotAsStop { vehicle: VehicleIdx },

    #[error("Vehicle {vehicle} visits unknown location {location}")]
    UnknownLocation {
        vehicle: VehicleIdx,
        location: LocationIdx,
    },

    #[error("Vehicle {vehicle} carries {load} but its capacity is {capacity}")]
    CapacityExceeded {
        vehicle: VehicleIdx,
        load: Amount,
        capacity: Amount,
    },
}

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("Distance matrix unavailable: {0}")]
    Provider(#[from] ProviderError),

    #[error("Invalid solution: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error("Solver task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
