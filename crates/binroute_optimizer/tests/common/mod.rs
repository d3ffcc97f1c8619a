#![allow(dead_code)]

use binroute_matrix_providers::{
    cache::NoCache, distance_matrix_api::ReqwestTransport,
    travel_matrix_client::TravelMatrixClient,
};
use binroute_optimizer::{
    json::types::{JsonCostProvider, JsonDepot, JsonPickup, JsonPickupId, JsonRoutingRequest, JsonVehicle},
    routing::RoutingParams,
    solver::solver_params::SolverParams,
};
use jiff::SignedDuration;

/// Client without API key, requests must name a local cost provider.
pub fn offline_client() -> TravelMatrixClient<NoCache, ReqwestTransport> {
    TravelMatrixClient::new(None, ReqwestTransport::default(), NoCache)
}

pub fn fast_params() -> RoutingParams {
    RoutingParams {
        fallback_to_geodesic: false,
        solver: SolverParams {
            time_budget: SignedDuration::from_millis(300),
            ..SolverParams::default()
        },
        ..RoutingParams::default()
    }
}

pub fn pickup(id: i64, latitude: f64, longitude: f64, demand: f64) -> JsonPickup {
    JsonPickup {
        id: JsonPickupId::Number(id),
        latitude,
        longitude,
        demand,
    }
}

pub fn vehicles(capacities: &[f64]) -> Vec<JsonVehicle> {
    capacities
        .iter()
        .enumerate()
        .map(|(index, &capacity)| JsonVehicle {
            id: format!("truck-{}", index + 1),
            capacity,
        })
        .collect()
}

pub fn geodesic_request(pickups: Vec<JsonPickup>, capacities: &[f64]) -> JsonRoutingRequest {
    JsonRoutingRequest {
        pickups,
        depot: JsonDepot {
            latitude: 0.0,
            longitude: 0.0,
        },
        vehicles: vehicles(capacities),
        time_budget_seconds: None,
        cost_provider: Some(JsonCostProvider::Geodesic),
    }
}

pub fn stop_ids(route: &binroute_optimizer::json::types::JsonRoute) -> Vec<JsonPickupId> {
    route.stops.iter().map(|stop| stop.id.clone()).collect()
}
