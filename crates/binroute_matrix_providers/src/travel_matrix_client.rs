use tracing::{info, warn};

use crate::{
    cache::{MatricesCache, NoCache},
    cost_matrix::CostMatrix,
    distance_matrix_api::{
        DistanceMatrixClient, DistanceMatrixClientParams, MatrixTransport, ReqwestTransport,
    },
    error::ProviderError,
    geodesic::{geodesic_matrix, geodesic_points_matrix},
    travel_matrix_provider::TravelMatrixProvider,
};

pub struct TravelMatrixClient<C = NoCache, T = ReqwestTransport> {
    distance_matrix_params: Option<DistanceMatrixClientParams>,
    transport: T,
    cache: C,
}

impl TravelMatrixClient<NoCache, ReqwestTransport> {
    /// Reads the Distance Matrix settings from the environment. A missing key only
    /// fails the requests that need the remote provider.
    pub fn from_env() -> Self {
        let distance_matrix_params = match DistanceMatrixClientParams::from_env() {
            Ok(params) => Some(params),
            Err(error) => {
                info!("Distance matrix API disabled: {}", error);
                None
            }
        };

        Self {
            distance_matrix_params,
            transport: ReqwestTransport::default(),
            cache: NoCache,
        }
    }
}

impl<C: MatricesCache, T: MatrixTransport> TravelMatrixClient<C, T> {
    pub fn new(
        distance_matrix_params: Option<DistanceMatrixClientParams>,
        transport: T,
        cache: C,
    ) -> Self {
        Self {
            distance_matrix_params,
            transport,
            cache,
        }
    }

    pub fn with_cache<C2: MatricesCache>(self, cache: C2) -> TravelMatrixClient<C2, T> {
        TravelMatrixClient {
            distance_matrix_params: self.distance_matrix_params,
            transport: self.transport,
            cache,
        }
    }

    pub async fn fetch_matrix<P>(
        &self,
        points: &[P],
        provider: &TravelMatrixProvider,
    ) -> Result<CostMatrix, ProviderError>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        let points: Vec<geo_types::Point> = points
            .iter()
            .map(|point| {
                let point: geo_types::Point = point.into();
                point
            })
            .collect();

        match provider {
            TravelMatrixProvider::Custom { matrix } => return Ok(matrix.clone()),
            TravelMatrixProvider::Geodesic => return Ok(geodesic_points_matrix(&points)),
            TravelMatrixProvider::DistanceMatrixApi { .. } => {}
        }

        match self.cache.get(&points, provider) {
            Ok(Some(matrix)) => {
                info!("Using cached matrix for {} locations", points.len());
                return Ok(matrix);
            }
            Ok(None) => {}
            Err(error) => warn!("Failed to read matrix cache: {}", error),
        }

        let matrix = self.fetch_remote(&points, provider).await?;

        if let Err(error) = self.cache.put(&points, provider, &matrix) {
            warn!("Failed to write matrix cache: {}", error);
        }

        Ok(matrix)
    }

    /// Same as [`TravelMatrixClient::fetch_matrix`], falling back to the geodesic
    /// strategy when the provider fails.
    pub async fn fetch_matrix_or_geodesic<P>(
        &self,
        points: &[P],
        provider: &TravelMatrixProvider,
    ) -> CostMatrix
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        match self.fetch_matrix(points, provider).await {
            Ok(matrix) => matrix,
            Err(error) => {
                warn!(
                    retryable = error.is_retryable(),
                    "Matrix provider failed, falling back to geodesic distances: {}", error
                );
                geodesic_matrix(points)
            }
        }
    }

    async fn fetch_remote(
        &self,
        points: &[geo_types::Point],
        provider: &TravelMatrixProvider,
    ) -> Result<CostMatrix, ProviderError> {
        let Some(params) = &self.distance_matrix_params else {
            return Err(ProviderError::MissingApiKey(
                crate::distance_matrix_api::API_KEY_ENV_VAR,
            ));
        };

        let mut params = params.clone();
        if let TravelMatrixProvider::DistanceMatrixApi {
            region: Some(region),
        } = provider
        {
            params.region = region.clone();
        }

        DistanceMatrixClient::with_transport(params, &self.transport)
            .fetch_matrix(points)
            .await
    }
}
