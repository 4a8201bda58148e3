#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use events_proxy::api::routes::create_router;
use events_proxy::config::Config;
use events_proxy::error::{AppError, Result};
use events_proxy::events::EventsFetchService;
use events_proxy::runner::{JobRun, RawRecord, RunStatus, ScrapeJobRunner};
use events_proxy::AppState;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

/// Arguments captured from a submit_and_wait call
#[derive(Debug, Clone)]
pub struct Submission {
    pub actor_id: String,
    pub run_input: Value,
}

/// Stand-in ScrapeJobRunner that records what it was asked to do.
#[derive(Default)]
pub struct RecordingRunner {
    records: Vec<RawRecord>,
    submit_error: Option<String>,
    dataset_error_after: Option<usize>,
    job_delay: Option<Duration>,
    stall_dataset: bool,
    submissions: Mutex<Vec<Submission>>,
    dataset_reads: Mutex<Vec<String>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(mut self, records: Vec<RawRecord>) -> Self {
        self.records = records;
        self
    }

    /// Fail the submission as if the platform were unreachable
    pub fn failing_submit(mut self, message: &str) -> Self {
        self.submit_error = Some(message.to_string());
        self
    }

    /// Yield `count` records, then a read error
    pub fn failing_dataset_after(mut self, count: usize) -> Self {
        self.dataset_error_after = Some(count);
        self
    }

    pub fn with_job_delay(mut self, delay: Duration) -> Self {
        self.job_delay = Some(delay);
        self
    }

    /// Dataset stream that never yields
    pub fn stalling_dataset(mut self) -> Self {
        self.stall_dataset = true;
        self
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn dataset_reads(&self) -> Vec<String> {
        self.dataset_reads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScrapeJobRunner for RecordingRunner {
    async fn submit_and_wait(&self, actor_id: &str, run_input: &Value) -> Result<JobRun> {
        self.submissions.lock().unwrap().push(Submission {
            actor_id: actor_id.to_string(),
            run_input: run_input.clone(),
        });

        if let Some(delay) = self.job_delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = &self.submit_error {
            return Err(AppError::UpstreamUnavailable(message.clone()));
        }

        Ok(JobRun {
            id: "run-1".to_string(),
            status: RunStatus::Succeeded,
            default_dataset_id: "dataset-1".to_string(),
        })
    }

    fn iterate_dataset<'a>(&'a self, dataset_id: &'a str) -> BoxStream<'a, Result<RawRecord>> {
        self.dataset_reads.lock().unwrap().push(dataset_id.to_string());

        if self.stall_dataset {
            return stream::pending().boxed();
        }

        let records = self.records.iter().cloned().map(Ok);
        match self.dataset_error_after {
            Some(count) => stream::iter(records.take(count))
                .chain(stream::once(async {
                    Err(AppError::DatasetReadError("connection reset".to_string()))
                }))
                .boxed(),
            None => stream::iter(records).boxed(),
        }
    }
}

pub fn test_config() -> Config {
    let mut config = Config::new("test-token");
    config.actor_id = "test-actor".to_string();
    config
}

pub fn test_app(runner: Arc<RecordingRunner>, config: Config) -> Router {
    let service = EventsFetchService::new(Arc::new(config), runner);
    create_router(AppState {
        events: Arc::new(service),
    })
}

/// POST `body` to the endpoint and return status plus parsed JSON body
pub async fn post_fetch_events(app: Router, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/fetch-events")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap();

    (status, json)
}
