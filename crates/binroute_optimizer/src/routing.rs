use std::sync::Arc;

use binroute_matrix_providers::{
    cache::MatricesCache, distance_matrix_api::MatrixTransport,
    travel_matrix_client::TravelMatrixClient, travel_matrix_provider::TravelMatrixProvider,
};
use jiff::SignedDuration;
use tracing::{error, info, instrument, warn};

use crate::{
    error::{InputError, OptimizerError},
    json::types::{JsonRoutingRequest, JsonRoutingResponse},
    solver::{extract::extract_solution, solver::Solver, solver_params::SolverParams},
    timer_debug,
    utils::cancellation::CancellationToken,
};

#[derive(Clone, Debug)]
pub struct RoutingParams {
    /// Used when the request does not name a cost provider
    pub provider: TravelMatrixProvider,

    /// Solve on geodesic distances when the remote provider fails instead of failing the request
    pub fallback_to_geodesic: bool,

    pub solver: SolverParams,
}

impl Default for RoutingParams {
    fn default() -> Self {
        RoutingParams {
            provider: TravelMatrixProvider::DistanceMatrixApi { region: None },
            fallback_to_geodesic: true,
            solver: SolverParams::default(),
        }
    }
}

/// Solves a routing request end to end. Every failure is reported in the response status.
pub async fn optimize_routes<C, T>(
    request: &JsonRoutingRequest,
    client: &TravelMatrixClient<C, T>,
    params: &RoutingParams,
    cancellation: CancellationToken,
) -> JsonRoutingResponse
where
    C: MatricesCache,
    T: MatrixTransport,
{
    match solve_request(request, client, params, cancellation).await {
        Ok(response) => response,
        Err(err) => {
            match &err {
                OptimizerError::Input(_) => warn!("Rejected routing request: {}", err),
                _ => error!("Routing request failed: {}", err),
            }
            JsonRoutingResponse::from_error(&err)
        }
    }
}

#[instrument(skip_all, fields(pickups = request.pickups.len(), vehicles = request.vehicles.len()))]
pub async fn solve_request<C, T>(
    request: &JsonRoutingRequest,
    client: &TravelMatrixClient<C, T>,
    params: &RoutingParams,
    cancellation: CancellationToken,
) -> Result<JsonRoutingResponse, OptimizerError>
where
    C: MatricesCache,
    T: MatrixTransport,
{
    if request.pickups.is_empty() {
        info!("No pickups to route");
        return Ok(JsonRoutingResponse::no_pickups());
    }

    let solver_params = solver_params(request, &params.solver)?;

    let mut builder = request.problem_builder();
    // Rejects infeasible requests before any matrix is fetched
    builder.check_input()?;

    let provider = match &request.cost_provider {
        Some(provider) => provider.clone().into_provider()?,
        None => params.provider.clone(),
    };

    let locations = builder.locations()?;
    let travel_costs = if params.fallback_to_geodesic && provider.is_remote() {
        client.fetch_matrix_or_geodesic(&locations, &provider).await
    } else {
        client.fetch_matrix(&locations, &provider).await?
    };

    info!("Fetched cost matrix for {} locations", travel_costs.num_locations());
    if travel_costs.has_missing_routes() {
        warn!("Cost matrix contains unreachable pairs, they are priced as no-route");
    }

    builder.set_travel_costs(travel_costs);
    let problem = Arc::new(builder.build()?);

    let solver_problem = Arc::clone(&problem);
    let extracted = tokio::task::spawn_blocking(move || {
        let solver = Solver::new(solver_problem, solver_params).with_cancellation(cancellation);
        let output = solver.solve()?;
        timer_debug!("Extraction", extract_solution(&output.solution))
    })
    .await??;

    if extracted.is_partial() {
        warn!(
            unassigned = extracted.unassigned.len(),
            "Capacity is insufficient for every pickup, returning a partial solution"
        );
    }

    Ok(JsonRoutingResponse::from_solution(
        &request.pickups,
        &problem,
        &extracted,
    ))
}

fn solver_params(
    request: &JsonRoutingRequest,
    defaults: &SolverParams,
) -> Result<SolverParams, InputError> {
    let mut params = defaults.clone();

    if let Some(seconds) = request.time_budget_seconds {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(InputError::InvalidTimeBudget(seconds));
        }

        params.time_budget = SignedDuration::try_from_secs_f64(seconds)
            .map_err(|_| InputError::InvalidTimeBudget(seconds))?;
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use binroute_matrix_providers::{
        cache::NoCache, distance_matrix_api::ReqwestTransport,
        travel_matrix_client::TravelMatrixClient,
    };
    use serde_json::json;

    use super::*;
    use crate::json::types::{JsonCostProvider, JsonPickupId, RoutingStatus};

    fn client() -> TravelMatrixClient<NoCache, ReqwestTransport> {
        TravelMatrixClient::new(None, ReqwestTransport::default(), NoCache)
    }

    fn params() -> RoutingParams {
        RoutingParams {
            solver: SolverParams {
                time_budget: SignedDuration::from_millis(500),
                ..SolverParams::default()
            },
            ..RoutingParams::default()
        }
    }

    fn request(pickups: serde_json::Value, vehicles: serde_json::Value) -> JsonRoutingRequest {
        serde_json::from_value(json!({
            "pickups": pickups,
            "depot": { "latitude": 5.6037, "longitude": -0.187 },
            "vehicles": vehicles,
        }))
        .unwrap()
    }

    #[test]
    fn test_time_budget_override() {
        let mut request = request(json!([]), json!([]));

        request.time_budget_seconds = Some(1.5);
        let params = solver_params(&request, &SolverParams::default()).unwrap();
        assert_eq!(params.time_budget, SignedDuration::from_millis(1500));

        request.time_budget_seconds = Some(-1.0);
        assert_eq!(
            solver_params(&request, &SolverParams::default()).unwrap_err(),
            InputError::InvalidTimeBudget(-1.0)
        );

        request.time_budget_seconds = Some(f64::NAN);
        assert!(solver_params(&request, &SolverParams::default()).is_err());
    }

    #[tokio::test]
    async fn test_missing_api_key_falls_back_to_geodesic() {
        let request = request(
            json!([
                { "id": 1, "latitude": 5.61, "longitude": -0.18, "demand": 20.0 },
                { "id": 2, "latitude": 5.62, "longitude": -0.19, "demand": 20.0 }
            ]),
            json!([{ "id": "truck", "capacity": 100.0 }]),
        );

        let response =
            optimize_routes(&request, &client(), &params(), CancellationToken::new()).await;

        assert_eq!(response.status, RoutingStatus::Success);
        assert_eq!(response.routes.len(), 1);
        assert_eq!(response.routes[0].stops.len(), 2);
        assert!(response.total_cost.unwrap() > 0);
    }

    #[tokio::test]
    async fn test_missing_api_key_without_fallback_is_an_error() {
        let request = request(
            json!([{ "id": 1, "latitude": 5.61, "longitude": -0.18, "demand": 20.0 }]),
            json!([{ "id": "truck", "capacity": 100.0 }]),
        );
        let params = RoutingParams {
            fallback_to_geodesic: false,
            ..params()
        };

        let response = optimize_routes(&request, &client(), &params, CancellationToken::new()).await;

        assert_eq!(response.status, RoutingStatus::Error);
        assert!(response.routes.is_empty());
        assert!(response.error.is_some());
    }

    #[tokio::test]
    async fn test_no_vehicles() {
        let request = request(
            json!([{ "id": "a", "latitude": 5.61, "longitude": -0.18, "demand": 20.0 }]),
            json!([]),
        );

        let response =
            optimize_routes(&request, &client(), &params(), CancellationToken::new()).await;

        assert_eq!(response.status, RoutingStatus::ErrorNoSolution);
    }

    #[tokio::test]
    async fn test_custom_matrix_must_match_locations() {
        let mut request = request(
            json!([{ "id": "a", "latitude": 5.61, "longitude": -0.18, "demand": 20.0 }]),
            json!([{ "id": "truck", "capacity": 100.0 }]),
        );
        request.cost_provider = Some(JsonCostProvider::Custom {
            matrix: vec![vec![0, 1, 1], vec![1, 0, 1], vec![1, 1, 0]],
        });

        let response =
            optimize_routes(&request, &client(), &params(), CancellationToken::new()).await;

        assert_eq!(response.status, RoutingStatus::Error);
        assert!(response.error.unwrap().contains("expected 2"));
    }

    #[tokio::test]
    async fn test_partial_solution_lists_unassigned() {
        let mut request = request(
            json!([
                { "id": 1, "latitude": 5.61, "longitude": -0.18, "demand": 70.0 },
                { "id": "b", "latitude": 5.62, "longitude": -0.18, "demand": 70.0 }
            ]),
            json!([{ "id": "truck", "capacity": 100.0 }]),
        );
        request.cost_provider = Some(JsonCostProvider::Geodesic);

        let response =
            optimize_routes(&request, &client(), &params(), CancellationToken::new()).await;

        assert_eq!(response.status, RoutingStatus::Success);
        assert_eq!(response.routes.len(), 1);
        assert_eq!(response.routes[0].total_load, 70.0);
        assert_eq!(response.unassigned.as_ref().map(Vec::len), Some(1));

        // The nearest pickup is served first, the second one no longer fits
        assert_eq!(response.routes[0].stops[0].id, JsonPickupId::Number(1));
        assert_eq!(
            response.unassigned.unwrap(),
            vec![JsonPickupId::Text("b".to_owned())]
        );
    }
}
