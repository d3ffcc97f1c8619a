use std::path::PathBuf;

use binroute_matrix_providers::{
    cache::{FileCache, MatricesCache},
    cost_matrix::CostMatrix,
    distance_matrix_api::MatrixTransport,
    travel_matrix_client::TravelMatrixClient,
    travel_matrix_provider::TravelMatrixProvider,
};
use binroute_optimizer::json::types::JsonRoutingRequest;
use clap::Args;
use tracing::info;

use crate::{file_utils::read_json, parsers::ProviderArg};

#[derive(Args)]
pub struct GetMatrixArgs {
    /// The routing request whose depot and pickups are used
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Cost provider used when the request does not name one
    #[arg(long, value_enum, default_value_t = ProviderArg::DistanceMatrixApi)]
    provider: ProviderArg,
}

async fn fetch_matrix<C, T>(
    client: &TravelMatrixClient<C, T>,
    request: &JsonRoutingRequest,
    provider: &TravelMatrixProvider,
) -> anyhow::Result<CostMatrix>
where
    C: MatricesCache,
    T: MatrixTransport,
{
    let locations = request.problem_builder().locations()?;
    let matrix = client.fetch_matrix(&locations, provider).await?;

    info!("Fetched {}x{} matrix", matrix.num_locations(), matrix.num_locations());
    Ok(matrix)
}

pub async fn run(args: GetMatrixArgs) -> anyhow::Result<()> {
    let request: JsonRoutingRequest = read_json(&args.input)?;

    let provider = match request.cost_provider.clone() {
        Some(provider) => provider.into_provider()?,
        None => args.provider.into(),
    };

    let client = TravelMatrixClient::from_env();
    let matrix = match FileCache::from_env() {
        Ok(cache) => fetch_matrix(&client.with_cache(cache), &request, &provider).await?,
        Err(_) => fetch_matrix(&client, &request, &provider).await?,
    };

    let rows = matrix.rows().map(|row| row.to_vec()).collect::<Vec<_>>();
    println!("{}", serde_json::to_string_pretty(&rows)?);

    Ok(())
}
