use std::fmt::Display;

use binroute_matrix_providers::{
    cost_matrix::{Cost, CostMatrix},
    travel_matrix_provider::TravelMatrixProvider,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    error::{InputError, OptimizerError},
    problem::{
        location::LocationIdx,
        vehicle_routing_problem::{VehicleRoutingProblem, VehicleRoutingProblemBuilder},
    },
    solver::extract::{ExtractedRoute, ExtractedSolution},
};

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
#[serde(rename = "RoutingRequest")]
pub struct JsonRoutingRequest {
    pub pickups: Vec<JsonPickup>,
    pub depot: JsonDepot,
    pub vehicles: Vec<JsonVehicle>,

    /// Overrides the default improvement budget
    pub time_budget_seconds: Option<f64>,

    /// Overrides the configured cost provider
    pub cost_provider: Option<JsonCostProvider>,
}

/// Pickup ids are echoed back exactly as received, strings or integers.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum JsonPickupId {
    Number(i64),
    Text(String),
}

impl JsonPickupId {
    /// Distinct for distinct ids, so `1` and `"1"` stay two pickups.
    /// Text ids are quoted, numbers are not.
    pub fn key(&self) -> String {
        match self {
            JsonPickupId::Number(id) => id.to_string(),
            JsonPickupId::Text(id) => format!("{id:?}"),
        }
    }
}

impl Display for JsonPickupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsonPickupId::Number(id) => write!(f, "{id}"),
            JsonPickupId::Text(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
#[serde(deny_unknown_fields, rename = "Pickup")]
pub struct JsonPickup {
    pub id: JsonPickupId,
    pub latitude: f64,
    pub longitude: f64,

    /// Estimated weight to collect, in kilograms
    pub demand: f64,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
#[serde(deny_unknown_fields, rename = "Depot")]
pub struct JsonDepot {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
#[serde(deny_unknown_fields, rename = "Vehicle")]
pub struct JsonVehicle {
    pub id: String,
    pub capacity: f64,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", rename = "CostProvider")]
pub enum JsonCostProvider {
    Geodesic,
    DistanceMatrixApi {
        region: Option<String>,
    },
    /// Square matrix in meters, the depot first and then the pickups in request order
    Custom {
        matrix: Vec<Vec<Cost>>,
    },
}

impl JsonCostProvider {
    pub fn into_provider(self) -> Result<TravelMatrixProvider, InputError> {
        match self {
            JsonCostProvider::Geodesic => Ok(TravelMatrixProvider::Geodesic),
            JsonCostProvider::DistanceMatrixApi { region } => {
                Ok(TravelMatrixProvider::DistanceMatrixApi { region })
            }
            JsonCostProvider::Custom { matrix } => {
                let matrix = CostMatrix::try_from_rows(matrix).map_err(InputError::InvalidMatrix)?;
                Ok(TravelMatrixProvider::Custom { matrix })
            }
        }
    }
}

impl JsonRoutingRequest {
    /// Builder holding every location and vehicle of the request, without travel costs.
    pub fn problem_builder(&self) -> VehicleRoutingProblemBuilder {
        let mut builder = VehicleRoutingProblemBuilder::default();

        builder.set_depot(self.depot.latitude, self.depot.longitude);

        for pickup in &self.pickups {
            builder.add_pickup(
                pickup.id.key(),
                pickup.latitude,
                pickup.longitude,
                pickup.demand,
            );
        }

        for vehicle in &self.vehicles {
            builder.add_vehicle(vehicle.id.clone(), vehicle.capacity);
        }

        builder
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStatus {
    Success,
    SuccessNoPickups,
    ErrorDemandExceedsCapacity,
    ErrorNoSolution,
    Error,
}

impl RoutingStatus {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            RoutingStatus::ErrorDemandExceedsCapacity
                | RoutingStatus::ErrorNoSolution
                | RoutingStatus::Error
        )
    }

    pub fn from_error(error: &OptimizerError) -> Self {
        match error {
            OptimizerError::Input(InputError::DemandExceedsCapacity { .. }) => {
                RoutingStatus::ErrorDemandExceedsCapacity
            }
            OptimizerError::Input(InputError::NoVehicles) => RoutingStatus::ErrorNoSolution,
            _ => RoutingStatus::Error,
        }
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(rename = "RoutingResponse")]
pub struct JsonRoutingResponse {
    pub status: RoutingStatus,

    /// Non-empty routes only
    #[serde(default)]
    pub routes: Vec<JsonRoute>,

    /// Pickups left out of every route, present only for partial solutions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unassigned: Option<Vec<JsonPickupId>>,

    /// Sum of the route costs, in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<Cost>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(rename = "Route")]
pub struct JsonRoute {
    pub vehicle_id: String,
    pub stops: Vec<JsonStop>,
    pub total_load: f64,
    pub total_distance_km: f64,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(rename = "Stop")]
pub struct JsonStop {
    pub id: JsonPickupId,
    pub latitude: f64,
    pub longitude: f64,
    pub demand: f64,
}

impl JsonRoutingResponse {
    pub fn no_pickups() -> Self {
        JsonRoutingResponse {
            status: RoutingStatus::SuccessNoPickups,
            routes: vec![],
            unassigned: None,
            total_cost: None,
            error: None,
        }
    }

    pub fn from_error(error: &OptimizerError) -> Self {
        JsonRoutingResponse {
            status: RoutingStatus::from_error(error),
            routes: vec![],
            unassigned: None,
            total_cost: None,
            error: Some(error.to_string()),
        }
    }

    /// Converts an extracted solution, `pickups` must be the pickups the problem was built from.
    pub fn from_solution(
        pickups: &[JsonPickup],
        problem: &VehicleRoutingProblem,
        solution: &ExtractedSolution,
    ) -> Self {
        let unassigned = solution
            .unassigned
            .iter()
            .map(|&location| request_pickup(pickups, location).id.clone())
            .collect::<Vec<_>>();

        if solution.routes.is_empty() && problem.num_pickups() > 0 {
            return JsonRoutingResponse {
                status: RoutingStatus::ErrorNoSolution,
                routes: vec![],
                unassigned: Some(unassigned),
                total_cost: None,
                error: Some("No pickup could be assigned to a vehicle".to_owned()),
            };
        }

        let routes = solution
            .routes
            .iter()
            .map(|route| JsonRoute::from_route(route, problem, pickups))
            .collect();

        JsonRoutingResponse {
            status: RoutingStatus::Success,
            routes,
            unassigned: if unassigned.is_empty() {
                None
            } else {
                Some(unassigned)
            },
            total_cost: Some(solution.total_cost),
            error: None,
        }
    }
}

impl JsonRoute {
    fn from_route(
        route: &ExtractedRoute,
        problem: &VehicleRoutingProblem,
        pickups: &[JsonPickup],
    ) -> Self {
        let stops = route
            .stops
            .iter()
            .map(|&location_id| {
                let location = problem.location(location_id);
                JsonStop {
                    id: request_pickup(pickups, location_id).id.clone(),
                    latitude: location.lat(),
                    longitude: location.lon(),
                    demand: location.raw_demand(),
                }
            })
            .collect::<Vec<_>>();

        JsonRoute {
            vehicle_id: problem.vehicle(route.vehicle_id).external_id().to_owned(),
            total_load: stops.iter().map(|stop| stop.demand).sum(),
            total_distance_km: route.cost as f64 / 1000.0,
            stops,
        }
    }
}

/// Location `i` is the pickup `i - 1` of the request.
fn request_pickup(pickups: &[JsonPickup], location_id: LocationIdx) -> &JsonPickup {
    &pickups[location_id.get() - 1]
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_request() {
        let request: JsonRoutingRequest = serde_json::from_value(json!({
            "pickups": [
                { "id": 12, "latitude": 5.61, "longitude": -0.18, "demand": 40.0 },
                { "id": "req-7", "latitude": 5.62, "longitude": -0.18, "demand": 12.5 }
            ],
            "depot": { "latitude": 5.6, "longitude": -0.18 },
            "vehicles": [{ "id": "truck-1", "capacity": 100.0 }],
            "time_budget_seconds": 2.5,
            "cost_provider": { "type": "custom", "matrix": [[0, 1, 2], [1, 0, 3], [2, 3, 0]] }
        }))
        .unwrap();

        assert_eq!(request.pickups[0].id, JsonPickupId::Number(12));
        assert_eq!(request.pickups[1].id, JsonPickupId::Text("req-7".to_owned()));
        assert_eq!(request.time_budget_seconds, Some(2.5));

        let provider = request.cost_provider.clone().unwrap().into_provider().unwrap();
        assert!(matches!(provider, TravelMatrixProvider::Custom { .. }));

        let builder = request.problem_builder();
        assert_eq!(builder.num_pickups(), 2);
        assert_eq!(builder.locations().unwrap()[1].external_id(), "12");
    }

    #[test]
    fn test_number_and_text_ids_are_distinct() {
        let request: JsonRoutingRequest = serde_json::from_value(json!({
            "pickups": [
                { "id": 1, "latitude": 5.61, "longitude": -0.18, "demand": 10.0 },
                { "id": "1", "latitude": 5.62, "longitude": -0.18, "demand": 10.0 }
            ],
            "depot": { "latitude": 5.6, "longitude": -0.18 },
            "vehicles": [{ "id": "truck-1", "capacity": 100.0 }]
        }))
        .unwrap();

        assert_ne!(request.pickups[0].id.key(), request.pickups[1].id.key());
        assert!(request.problem_builder().check_input().is_ok());

        let mut duplicate = request.clone();
        duplicate.pickups[1].id = JsonPickupId::Number(1);
        assert_eq!(
            duplicate.problem_builder().check_input(),
            Err(InputError::DuplicatePickupId { id: "1".to_owned() })
        );
    }

    #[test]
    fn test_parse_cost_providers() {
        let provider: JsonCostProvider = serde_json::from_value(json!({ "type": "geodesic" })).unwrap();
        assert_eq!(provider, JsonCostProvider::Geodesic);

        let provider: JsonCostProvider =
            serde_json::from_value(json!({ "type": "distance_matrix_api", "region": "GH" })).unwrap();
        assert_eq!(
            provider.into_provider().unwrap(),
            TravelMatrixProvider::DistanceMatrixApi {
                region: Some("GH".to_owned())
            }
        );
    }

    #[test]
    fn test_ragged_custom_matrix_is_rejected() {
        let provider = JsonCostProvider::Custom {
            matrix: vec![vec![0, 1], vec![1]],
        };

        assert!(matches!(
            provider.into_provider(),
            Err(InputError::InvalidMatrix(_))
        ));
    }

    #[test]
    fn test_response_omits_empty_fields() {
        let value = serde_json::to_value(JsonRoutingResponse::no_pickups()).unwrap();
        assert_eq!(value, json!({ "status": "success_no_pickups", "routes": [] }));
    }

    #[test]
    fn test_status_from_error() {
        let error = OptimizerError::Input(InputError::DemandExceedsCapacity {
            id: "1".to_owned(),
            demand: 500.0,
            max_capacity: 100.0,
        });
        let response = JsonRoutingResponse::from_error(&error);

        assert_eq!(response.status, RoutingStatus::ErrorDemandExceedsCapacity);
        assert!(response.status.is_error());
        assert!(response.error.unwrap().contains("500"));

        assert_eq!(
            RoutingStatus::from_error(&OptimizerError::Input(InputError::NoVehicles)),
            RoutingStatus::ErrorNoSolution
        );
        assert_eq!(
            RoutingStatus::from_error(&OptimizerError::Input(InputError::MissingDepot)),
            RoutingStatus::Error
        );
    }
}
