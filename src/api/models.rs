use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
pub struct FetchEventsRequest {
    /// Actor input; the service default is used when absent or null.
    #[serde(default)]
    pub run_input: Option<Value>,
}
