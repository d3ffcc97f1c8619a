use std::{collections::HashMap, sync::Arc};

use binroute_matrix_providers::{
    cache::{MatricesCache, NoCache},
    distance_matrix_api::{MatrixTransport, ReqwestTransport},
    travel_matrix_client::TravelMatrixClient,
};
use jiff::{SignedDuration, Timestamp};
use schemars::JsonSchema;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    json::types::{JsonRoutingRequest, JsonRoutingResponse},
    routing::{RoutingParams, optimize_routes},
    utils::cancellation::CancellationToken,
};

pub type JobId = Uuid;

/// How long a finished job is kept when the caller never removes it.
pub const DEFAULT_JOB_RETENTION: SignedDuration = SignedDuration::from_hours(1);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

struct JobState {
    status: JobStatus,
    response: Option<JsonRoutingResponse>,
    finished_at: Option<Timestamp>,
}

struct Job {
    state: parking_lot::RwLock<JobState>,
    cancellation: CancellationToken,
    created_at: Timestamp,
}

impl Job {
    fn new() -> Self {
        Job {
            state: parking_lot::RwLock::new(JobState {
                status: JobStatus::Pending,
                response: None,
                finished_at: None,
            }),
            cancellation: CancellationToken::new(),
            created_at: Timestamp::now(),
        }
    }

    fn start(&self) {
        self.state.write().status = JobStatus::Running;
    }

    fn finish(&self, response: JsonRoutingResponse) {
        let status = if response.status.is_error() {
            JobStatus::Failed
        } else {
            JobStatus::Completed
        };

        let mut state = self.state.write();
        state.status = status;
        state.response = Some(response);
        state.finished_at = Some(Timestamp::now());
    }

    fn is_expired(&self, now: Timestamp, retention: SignedDuration) -> bool {
        self.state
            .read()
            .finished_at
            .is_some_and(|finished_at| now.duration_since(finished_at) >= retention)
    }
}

/// Runs routing requests in the background and keeps their results.
///
/// A finished job stays available until `remove` is called or its retention period
/// has passed, expired jobs are dropped on the next `submit`.
pub struct SolverManager<C = NoCache, T = ReqwestTransport> {
    client: Arc<TravelMatrixClient<C, T>>,
    params: RoutingParams,
    retention: SignedDuration,
    jobs: RwLock<HashMap<JobId, Arc<Job>>>,
}

impl<C, T> SolverManager<C, T>
where
    C: MatricesCache + 'static,
    T: MatrixTransport + 'static,
{
    pub fn new(client: Arc<TravelMatrixClient<C, T>>, params: RoutingParams) -> Self {
        SolverManager {
            client,
            params,
            retention: DEFAULT_JOB_RETENTION,
            jobs: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_retention(mut self, retention: SignedDuration) -> Self {
        self.retention = retention;
        self
    }

    /// Starts solving `request` on the runtime and returns immediately.
    pub async fn submit(&self, request: JsonRoutingRequest) -> JobId {
        self.evict_expired().await;

        let job_id = Uuid::new_v4();
        let job = Arc::new(Job::new());

        self.jobs.write().await.insert(job_id, Arc::clone(&job));

        let client = Arc::clone(&self.client);
        let params = self.params.clone();

        info!(%job_id, pickups = request.pickups.len(), "Submitted routing job");

        tokio::spawn(async move {
            job.start();

            let response =
                optimize_routes(&request, &client, &params, job.cancellation.clone()).await;

            info!(
                %job_id,
                status = ?response.status,
                elapsed = ?Timestamp::now().duration_since(job.created_at),
                "Routing job finished"
            );

            job.finish(response);
        });

        job_id
    }

    pub async fn status(&self, job_id: &JobId) -> Option<JobStatus> {
        self.jobs
            .read()
            .await
            .get(job_id)
            .map(|job| job.state.read().status)
    }

    /// The finished response, `None` while the job is still running.
    pub async fn response(&self, job_id: &JobId) -> Option<JsonRoutingResponse> {
        self.jobs
            .read()
            .await
            .get(job_id)
            .and_then(|job| job.state.read().response.clone())
    }

    /// Stops the search of a job, which still completes with the best solution found so far.
    pub async fn cancel(&self, job_id: &JobId) -> bool {
        match self.jobs.read().await.get(job_id) {
            Some(job) => {
                job.cancellation.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn remove(&self, job_id: &JobId) -> Option<JsonRoutingResponse> {
        let job = self.jobs.write().await.remove(job_id)?;
        job.cancellation.cancel();
        job.state.write().response.take()
    }

    /// Drops the jobs that finished more than the retention period ago.
    pub async fn evict_expired(&self) -> usize {
        let now = Timestamp::now();
        let mut jobs = self.jobs.write().await;

        let before = jobs.len();
        jobs.retain(|_, job| !job.is_expired(now, self.retention));

        let evicted = before - jobs.len();
        if evicted > 0 {
            debug!(evicted, "Evicted expired routing jobs");
        }

        evicted
    }

    pub async fn num_jobs(&self) -> usize {
        self.jobs.read().await.len()
    }
}
