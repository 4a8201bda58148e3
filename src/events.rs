use futures::TryStreamExt;
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::runner::{RawRecord, ScrapeJobRunner};

/// Placeholder for any field missing from a dataset record.
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSummary {
    pub name: Value,
    pub location_name: Value,
    pub latitude: Value,
    pub longitude: Value,
}

impl EventSummary {
    /// Present values are carried over untouched; absent or null ones become
    /// the "N/A" sentinel. Never fails.
    pub fn from_record(record: &RawRecord) -> Self {
        let location = record.get("location").filter(|loc| loc.is_object());

        EventSummary {
            name: field_or_sentinel(Some(record), "name"),
            location_name: field_or_sentinel(location, "name"),
            latitude: field_or_sentinel(location, "latitude"),
            longitude: field_or_sentinel(location, "longitude"),
        }
    }
}

fn field_or_sentinel(source: Option<&Value>, key: &str) -> Value {
    source
        .and_then(|value| value.get(key))
        .filter(|value| !value.is_null())
        .cloned()
        .unwrap_or_else(|| Value::String(NOT_AVAILABLE.to_string()))
}

/// Runs the events actor and reshapes its dataset into `EventSummary`s.
pub struct EventsFetchService {
    config: Arc<Config>,
    runner: Arc<dyn ScrapeJobRunner>,
}

impl EventsFetchService {
    pub fn new(config: Arc<Config>, runner: Arc<dyn ScrapeJobRunner>) -> Self {
        Self { config, runner }
    }

    /// Input used when the caller does not supply one.
    pub fn default_run_input<R: Rng>(&self, rng: &mut R) -> Value {
        let max_events = rng.gen_range(self.config.default_max_events.clone());
        json!({
            "startUrls": [self.config.default_start_url],
            "maxEvents": max_events,
        })
    }

    fn resolve_run_input(&self, run_input: Option<Value>) -> Result<Value> {
        match run_input {
            None | Some(Value::Null) => Ok(self.default_run_input(&mut rand::thread_rng())),
            Some(input @ Value::Object(_)) => Ok(input),
            Some(other) => Err(AppError::ConfigError(format!(
                "run_input must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Submit the job, wait for it, and normalize every record of its
    /// dataset. Nothing is returned unless the whole dataset was read.
    pub async fn fetch_events(&self, run_input: Option<Value>) -> Result<Vec<EventSummary>> {
        let run_input = self.resolve_run_input(run_input)?;
        debug!(run_input = %run_input, "Resolved actor input");

        let job_start = Instant::now();
        let run = tokio::time::timeout(
            self.config.job_timeout,
            self.runner.submit_and_wait(&self.config.actor_id, &run_input),
        )
        .await
        .map_err(|_| {
            AppError::Timeout(format!(
                "actor run did not finish within {:?}",
                self.config.job_timeout
            ))
        })??;
        info!(
            dataset_id = %run.default_dataset_id,
            elapsed = ?job_start.elapsed(),
            "Actor run finished"
        );

        let dataset_start = Instant::now();
        let events = tokio::time::timeout(
            self.config.dataset_timeout,
            self.runner
                .iterate_dataset(&run.default_dataset_id)
                .map_ok(|record| EventSummary::from_record(&record))
                .try_collect::<Vec<_>>(),
        )
        .await
        .map_err(|_| {
            AppError::Timeout(format!(
                "dataset {} was not read within {:?}",
                run.default_dataset_id, self.config.dataset_timeout
            ))
        })??;
        info!(
            events = events.len(),
            elapsed = ?dataset_start.elapsed(),
            "Dataset read"
        );

        Ok(events)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
