use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;

/// One untyped item from a run's dataset.
pub type RawRecord = Value;

/// Lifecycle status of an actor run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum RunStatus {
    Ready,
    Running,
    Succeeded,
    Failed,
    TimingOut,
    TimedOut,
    Aborting,
    Aborted,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Whether the run has stopped and will not change status again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Succeeded | RunStatus::Failed | RunStatus::TimedOut | RunStatus::Aborted
        )
    }
}

/// A remote actor run, as much of it as the service needs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRun {
    pub id: String,
    pub status: RunStatus,
    pub default_dataset_id: String,
}

/// Remote execution of scraping jobs and retrieval of their results.
#[async_trait]
pub trait ScrapeJobRunner: Send + Sync {
    /// Start `actor_id` with `run_input` and wait until the run has finished
    /// successfully.
    async fn submit_and_wait(&self, actor_id: &str, run_input: &Value) -> Result<JobRun>;

    /// Stream the items of a dataset. The stream is single-pass; pages are
    /// only requested as it is polled.
    fn iterate_dataset<'a>(&'a self, dataset_id: &'a str) -> BoxStream<'a, Result<RawRecord>>;
}
