use std::{future::Future, ops::Range, time::Duration};

use futures::future::try_join_all;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::{
    cost_matrix::{Cost, CostMatrix, NO_ROUTE_COST},
    error::ProviderError,
};

pub const DISTANCE_MATRIX_API_URL: &str =
    "https://maps.googleapis.com/maps/api/distancematrix/json";

pub const API_KEY_ENV_VAR: &str = "DISTANCE_MATRIX_API_KEY";
pub const REGION_ENV_VAR: &str = "DISTANCE_MATRIX_REGION";
pub const API_URL_ENV_VAR: &str = "DISTANCE_MATRIX_API_URL";

pub const DEFAULT_REGION: &str = "GH";

/// Hard limits of the Distance Matrix API for a single request.
const MAX_ORIGINS_PER_REQUEST: usize = 25;
const MAX_DESTINATIONS_PER_REQUEST: usize = 25;

#[derive(Deserialize, Debug)]
pub struct DistanceMatrixResponse {
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub rows: Vec<DistanceMatrixRow>,
}

#[derive(Deserialize, Debug)]
pub struct DistanceMatrixRow {
    pub elements: Vec<DistanceMatrixElement>,
}

#[derive(Deserialize, Debug)]
pub struct DistanceMatrixElement {
    pub status: String,
    pub distance: Option<DistanceValue>,
}

/// Distance in meters
#[derive(Deserialize, Debug)]
pub struct DistanceValue {
    pub value: u64,
}

#[derive(Clone, Debug)]
pub struct DistanceMatrixClientParams {
    pub api_key: String,
    pub region: String,
    pub base_url: String,
    /// Provider ceiling on origins x destinations per request
    pub max_elements_per_request: usize,
    pub max_concurrent_requests: usize,
    /// Minimum spacing between two requests sharing a concurrency slot
    pub min_request_interval: Duration,
}

impl DistanceMatrixClientParams {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            region: DEFAULT_REGION.to_owned(),
            base_url: DISTANCE_MATRIX_API_URL.to_owned(),
            max_elements_per_request: 100,
            max_concurrent_requests: 4,
            min_request_interval: Duration::from_millis(100),
        }
    }

    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = std::env::var(API_KEY_ENV_VAR)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or(ProviderError::MissingApiKey(API_KEY_ENV_VAR))?;

        let mut params = Self::new(api_key);

        if let Ok(region) = std::env::var(REGION_ENV_VAR) {
            params.region = region;
        }

        if let Ok(url) = std::env::var(API_URL_ENV_VAR) {
            params.base_url = url;
        }

        Ok(params)
    }
}

/// One request worth of the full matrix: the rows `origins` against the columns `destinations`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatrixBatch {
    pub origins: Range<usize>,
    pub destinations: Range<usize>,
}

impl MatrixBatch {
    pub fn elements(&self) -> usize {
        self.origins.len() * self.destinations.len()
    }
}

/// Splits an all-to-all matrix over `num_points` into requests of at most
/// `max_elements` elements each.
pub fn plan_batches(num_points: usize, max_elements: usize) -> Vec<MatrixBatch> {
    if num_points == 0 {
        return Vec::new();
    }

    let max_elements = max_elements.max(1);
    let origins_per_batch = num_points
        .min(MAX_ORIGINS_PER_REQUEST)
        .min(max_elements.isqrt())
        .max(1);
    let destinations_per_batch = num_points
        .min(MAX_DESTINATIONS_PER_REQUEST)
        .min(max_elements / origins_per_batch)
        .max(1);

    let mut batches = Vec::new();
    for origin_start in (0..num_points).step_by(origins_per_batch) {
        for destination_start in (0..num_points).step_by(destinations_per_batch) {
            batches.push(MatrixBatch {
                origins: origin_start..(origin_start + origins_per_batch).min(num_points),
                destinations: destination_start
                    ..(destination_start + destinations_per_batch).min(num_points),
            });
        }
    }

    batches
}

/// Copies one batch response into the flat `costs` of an `num_points x num_points` matrix.
///
/// Elements without a route become [`NO_ROUTE_COST`]. Returns the origins whose first
/// matrix element (destination 0) is `ZERO_RESULTS`, the caller marks those whole rows
/// unreachable once every batch is applied. A non-`OK` top-level status or a response
/// that does not match the batch shape fails the batch.
pub fn apply_batch_response(
    costs: &mut [Cost],
    num_points: usize,
    batch: &MatrixBatch,
    response: DistanceMatrixResponse,
) -> Result<Vec<usize>, ProviderError> {
    if response.status != "OK" {
        return Err(ProviderError::Status {
            status: response.status,
            message: response.error_message.unwrap_or_default(),
        });
    }

    if response.rows.len() != batch.origins.len() {
        return Err(ProviderError::Malformed(format!(
            "expected {} rows, got {}",
            batch.origins.len(),
            response.rows.len()
        )));
    }

    let mut unreachable_origins = Vec::new();

    for (origin, row) in batch.origins.clone().zip(response.rows) {
        if row.elements.len() != batch.destinations.len() {
            return Err(ProviderError::Malformed(format!(
                "expected {} elements in row {}, got {}",
                batch.destinations.len(),
                origin,
                row.elements.len()
            )));
        }

        // Only the batch holding destination 0 sees the first element of the matrix row
        if batch.destinations.start == 0
            && row
                .elements
                .first()
                .is_some_and(|element| element.status == "ZERO_RESULTS")
        {
            unreachable_origins.push(origin);
        }

        for (destination, element) in batch.destinations.clone().zip(row.elements) {
            let index = origin * num_points + destination;

            costs[index] = if origin == destination {
                0
            } else if element.status == "OK" {
                let distance = element.distance.ok_or_else(|| {
                    ProviderError::Malformed(format!(
                        "element {origin} -> {destination} is OK but has no distance"
                    ))
                })?;
                Cost::try_from(distance.value)
                    .unwrap_or(NO_ROUTE_COST)
                    .min(NO_ROUTE_COST)
            } else {
                warn!(
                    origin,
                    destination,
                    status = element.status,
                    "No route found, using no-route cost"
                );
                NO_ROUTE_COST
            };
        }
    }

    Ok(unreachable_origins)
}

/// Prices every non-diagonal element of the `origin` row as [`NO_ROUTE_COST`].
fn mark_row_unreachable(costs: &mut [Cost], num_points: usize, origin: usize) {
    warn!(
        origin,
        "Distance matrix returned ZERO_RESULTS for the row, using no-route cost"
    );

    let row = &mut costs[origin * num_points..(origin + 1) * num_points];
    for (destination, cost) in row.iter_mut().enumerate() {
        if destination != origin {
            *cost = NO_ROUTE_COST;
        }
    }
}

/// Issues a single Distance Matrix request.
pub trait MatrixTransport: Send + Sync {
    fn fetch(
        &self,
        params: &DistanceMatrixClientParams,
        origins: &[geo_types::Point],
        destinations: &[geo_types::Point],
    ) -> impl Future<Output = Result<DistanceMatrixResponse, ProviderError>> + Send;
}

impl<T: MatrixTransport> MatrixTransport for &T {
    fn fetch(
        &self,
        params: &DistanceMatrixClientParams,
        origins: &[geo_types::Point],
        destinations: &[geo_types::Point],
    ) -> impl Future<Output = Result<DistanceMatrixResponse, ProviderError>> + Send {
        (**self).fetch(params, origins, destinations)
    }
}

#[derive(Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

fn format_points(points: &[geo_types::Point]) -> String {
    points
        .iter()
        .map(|point| format!("{},{}", point.y(), point.x()))
        .collect::<Vec<_>>()
        .join("|")
}

impl MatrixTransport for ReqwestTransport {
    async fn fetch(
        &self,
        params: &DistanceMatrixClientParams,
        origins: &[geo_types::Point],
        destinations: &[geo_types::Point],
    ) -> Result<DistanceMatrixResponse, ProviderError> {
        let response = self
            .client
            .get(&params.base_url)
            .query(&[
                ("origins", format_points(origins)),
                ("destinations", format_points(destinations)),
                ("key", params.api_key.clone()),
                ("region", params.region.clone()),
                ("units", "metric".to_owned()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status, message });
        }

        Ok(response.json().await?)
    }
}

pub struct DistanceMatrixClient<T = ReqwestTransport> {
    params: DistanceMatrixClientParams,
    transport: T,
}

impl DistanceMatrixClient<ReqwestTransport> {
    pub fn new(params: DistanceMatrixClientParams) -> Self {
        Self {
            params,
            transport: ReqwestTransport::default(),
        }
    }
}

impl<T: MatrixTransport> DistanceMatrixClient<T> {
    pub fn with_transport(params: DistanceMatrixClientParams, transport: T) -> Self {
        Self { params, transport }
    }

    pub fn params(&self) -> &DistanceMatrixClientParams {
        &self.params
    }

    #[instrument(skip_all, level = "debug")]
    pub async fn fetch_matrix(
        &self,
        points: &[geo_types::Point],
    ) -> Result<CostMatrix, ProviderError> {
        let num_points = points.len();

        if num_points == 0 {
            return Ok(CostMatrix::empty());
        }

        let batches = plan_batches(num_points, self.params.max_elements_per_request);
        info!(
            "DistanceMatrixApi: fetching {}x{} matrix in {} requests",
            num_points,
            num_points,
            batches.len()
        );

        let semaphore = Semaphore::new(self.params.max_concurrent_requests.max(1));
        let responses = try_join_all(batches.iter().map(|batch| {
            let semaphore = &semaphore;
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|error| ProviderError::Malformed(error.to_string()))?;

                debug!(
                    "DistanceMatrixApi: requesting origins {:?} destinations {:?}",
                    batch.origins, batch.destinations
                );

                let response = self
                    .transport
                    .fetch(
                        &self.params,
                        &points[batch.origins.clone()],
                        &points[batch.destinations.clone()],
                    )
                    .await?;

                if !self.params.min_request_interval.is_zero() {
                    tokio::time::sleep(self.params.min_request_interval).await;
                }

                Ok::<_, ProviderError>(response)
            }
        }))
        .await?;

        let mut costs: Vec<Cost> = vec![0; num_points * num_points];
        let mut unreachable_origins = Vec::new();
        for (batch, response) in batches.iter().zip(responses) {
            unreachable_origins.extend(apply_batch_response(
                &mut costs, num_points, batch, response,
            )?);
        }

        for origin in unreachable_origins {
            mark_row_unreachable(&mut costs, num_points, origin);
        }

        Ok(CostMatrix::from_flat(costs, num_points))
    }
}
