use std::{path::PathBuf, time::Duration};

use binroute_matrix_providers::{
    cache::{FileCache, MatricesCache},
    distance_matrix_api::MatrixTransport,
    travel_matrix_client::TravelMatrixClient,
};
use binroute_optimizer::{
    CancellationToken,
    json::types::{JsonRoutingRequest, JsonRoutingResponse},
    routing::{RoutingParams, optimize_routes},
    solver::solver_params::SolverParams,
};
use clap::Args;
use comfy_table::Table;
use indicatif::ProgressBar;
use tracing::info;

use crate::{
    file_utils::{read_json, write_json},
    parsers::{self, ProviderArg},
};

#[derive(Args)]
pub struct OptimizeArgs {
    /// The routing request to solve
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the JSON response, printed to stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Improvement budget (e.g., "5s", "PT1M"), the request's time_budget_seconds wins
    #[arg(short, long, value_parser = parsers::parse_duration, default_value = "5s")]
    timeout: jiff::SignedDuration,

    /// Number of search threads, 0 uses every core
    #[arg(long, default_value_t = 1)]
    threads: u8,

    /// Cost provider used when the request does not name one
    #[arg(long, value_enum, default_value_t = ProviderArg::DistanceMatrixApi)]
    provider: ProviderArg,

    /// Fail instead of solving on geodesic distances when the remote provider fails
    #[arg(long)]
    no_fallback: bool,
}

pub async fn run(args: OptimizeArgs) -> anyhow::Result<()> {
    let request: JsonRoutingRequest = read_json(&args.input)?;

    let params = RoutingParams {
        provider: args.provider.into(),
        fallback_to_geodesic: !args.no_fallback,
        solver: SolverParams {
            time_budget: args.timeout,
            search_threads: parsers::threads(args.threads),
            ..SolverParams::default()
        },
    };

    info!(
        "Optimizing {} pickups with {} vehicles",
        request.pickups.len(),
        request.vehicles.len()
    );

    let client = TravelMatrixClient::from_env();
    let response = match FileCache::from_env() {
        Ok(cache) => {
            info!("Caching matrices in {}", cache.folder().display());
            solve(&request, &client.with_cache(cache), &params).await
        }
        Err(_) => solve(&request, &client, &params).await,
    };

    print_summary(&response);

    match &args.output {
        Some(path) => write_json(path, &response)?,
        None => println!("{}", serde_json::to_string_pretty(&response)?),
    }

    if response.status.is_error() {
        anyhow::bail!(
            "Optimization failed: {}",
            response.error.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(())
}

async fn solve<C, T>(
    request: &JsonRoutingRequest,
    client: &TravelMatrixClient<C, T>,
    params: &RoutingParams,
) -> JsonRoutingResponse
where
    C: MatricesCache,
    T: MatrixTransport,
{
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!(
        "Solving ({}s budget)",
        params.solver.time_budget.as_secs()
    ));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let response = optimize_routes(request, client, params, CancellationToken::new()).await;

    spinner.finish_and_clear();
    response
}

fn summary_table(response: &JsonRoutingResponse) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Vehicle", "Stops", "Load", "Distance (km)"]);

    for route in &response.routes {
        table.add_row(vec![
            route.vehicle_id.clone(),
            route.stops.len().to_string(),
            format!("{:.1}", route.total_load),
            format!("{:.2}", route.total_distance_km),
        ]);
    }

    table
}

fn print_summary(response: &JsonRoutingResponse) {
    eprintln!("Status: {:?}", response.status);

    if !response.routes.is_empty() {
        eprintln!("{}", summary_table(response));
    }

    if let Some(unassigned) = &response.unassigned {
        let ids = unassigned
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        eprintln!("Unassigned: {ids}");
    }

    if let Some(error) = &response.error {
        eprintln!("Error: {error}");
    }
}
