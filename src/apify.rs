use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::runner::{JobRun, RawRecord, RunStatus, ScrapeJobRunner};

/// Seconds the platform may hold a run request open while the run finishes.
const WAIT_FOR_FINISH_SECS: u64 = 60;
const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    message: String,
}

/// `ScrapeJobRunner` backed by the Apify REST API.
pub struct ApifyClient {
    client: Client,
    base_url: String,
    token: String,
    page_size: usize,
}

impl ApifyClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(10))
            // Long enough to outlast a single waitForFinish hold
            .timeout(Duration::from_secs(WAIT_FOR_FINISH_SECS + 30))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.apify_base_url.trim_end_matches('/').to_string(),
            token: config.apify_token.clone(),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    async fn start_run(&self, actor_id: &str, run_input: &Value) -> Result<JobRun> {
        // "user/actor" names are addressed as "user~actor"
        let url = format!("{}/v2/acts/{}/runs", self.base_url, actor_id.replace('/', "~"));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .query(&[("waitForFinish", WAIT_FOR_FINISH_SECS)])
            .json(run_input)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => parse_run(response).await,
            StatusCode::BAD_REQUEST => Err(AppError::ConfigError(format!(
                "Actor {} rejected run input: {}",
                actor_id,
                error_message(response).await
            ))),
            _ => Err(AppError::JobFailure(format!(
                "Could not start actor {}: {}",
                actor_id,
                error_message(response).await
            ))),
        }
    }

    async fn poll_run(&self, run_id: &str) -> Result<JobRun> {
        let url = format!("{}/v2/actor-runs/{}", self.base_url, run_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("waitForFinish", WAIT_FOR_FINISH_SECS)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::JobFailure(format!(
                "Could not read run {}: {}",
                run_id,
                error_message(response).await
            )));
        }

        parse_run(response).await
    }

    async fn fetch_page(&self, dataset_id: &str, offset: usize) -> Result<Vec<RawRecord>> {
        let url = format!("{}/v2/datasets/{}/items", self.base_url, dataset_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("format", "json"), ("clean", "false")])
            .query(&[("offset", offset), ("limit", self.page_size)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::DatasetReadError(format!(
                "Dataset {} at offset {}: {}",
                dataset_id,
                offset,
                error_message(response).await
            )));
        }

        response
            .json::<Vec<RawRecord>>()
            .await
            .map_err(|e| AppError::DatasetReadError(format!("Malformed page of dataset {}: {}", dataset_id, e)))
    }

    /// One step of dataset paging. `None` offset means the previous page was
    /// the last one.
    async fn next_page(
        &self,
        dataset_id: &str,
        offset: Option<usize>,
    ) -> Result<Option<(Vec<RawRecord>, Option<usize>)>> {
        let Some(offset) = offset else {
            return Ok(None);
        };

        let page = self.fetch_page(dataset_id, offset).await?;
        debug!(dataset_id, offset, items = page.len(), "Fetched dataset page");

        // A short page is the last one
        let next = (page.len() >= self.page_size).then(|| offset + page.len());
        Ok(Some((page, next)))
    }
}

#[async_trait]
impl ScrapeJobRunner for ApifyClient {
    async fn submit_and_wait(&self, actor_id: &str, run_input: &Value) -> Result<JobRun> {
        let mut run = self.start_run(actor_id, run_input).await?;
        info!(actor_id, run_id = %run.id, status = ?run.status, "Started actor run");

        while !run.status.is_terminal() {
            debug!(run_id = %run.id, status = ?run.status, "Waiting for actor run to finish");
            run = self.poll_run(&run.id).await?;
        }

        if run.status != RunStatus::Succeeded {
            warn!(run_id = %run.id, status = ?run.status, "Actor run did not succeed");
            return Err(AppError::JobFailure(format!(
                "Actor run {} finished with status {:?}",
                run.id, run.status
            )));
        }

        info!(run_id = %run.id, dataset_id = %run.default_dataset_id, "Actor run succeeded");
        Ok(run)
    }

    fn iterate_dataset<'a>(&'a self, dataset_id: &'a str) -> BoxStream<'a, Result<RawRecord>> {
        stream::try_unfold(Some(0), move |offset| self.next_page(dataset_id, offset))
            .map_ok(|page| stream::iter(page.into_iter().map(Ok::<RawRecord, AppError>)))
            .try_flatten()
            .boxed()
    }
}

async fn parse_run(response: Response) -> Result<JobRun> {
    response
        .json::<Envelope<JobRun>>()
        .await
        .map(|envelope| envelope.data)
        .map_err(|e| AppError::JobFailure(format!("Malformed run response: {}", e)))
}

/// Best-effort description of a failed platform response.
async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ApiErrorBody>(&body) {
        Ok(ApiErrorBody { error: ApiErrorDetail { kind: Some(kind), message } }) => {
            format!("{} {}: {}", status, kind, message)
        }
        Ok(ApiErrorBody { error: ApiErrorDetail { kind: None, message } }) => {
            format!("{}: {}", status, message)
        }
        Err(_) if body.is_empty() => status.to_string(),
        Err(_) => format!("{}: {}", status, body),
    }
}
