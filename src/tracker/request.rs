//! Wire-shaped request bodies
//!
//! Field names follow the JSON bodies the task processes already send, so a
//! transport layer can deserialize straight into these types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::address::TaskAddress;
use crate::Result;

/// The six address segments of a task-scoped route, as raw strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPath {
    /// Job ID
    pub job_id: String,
    /// Component name
    pub component_name: String,
    /// Task ID
    pub task_id: String,
    /// Task version, unparsed
    pub task_version: String,
    /// Role, unparsed
    pub role: String,
    /// Party ID
    pub party_id: String,
}

impl TaskPath {
    /// Build a path from raw segments.
    #[must_use]
    pub fn new(
        job_id: impl Into<String>,
        component_name: impl Into<String>,
        task_id: impl Into<String>,
        task_version: impl Into<String>,
        role: impl Into<String>,
        party_id: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            component_name: component_name.into(),
            task_id: task_id.into(),
            task_version: task_version.into(),
            role: role.into(),
            party_id: party_id.into(),
        }
    }

    /// Full-mode resolution.
    ///
    /// # Errors
    ///
    /// [`crate::Error::InvalidAddress`] as for [`TaskAddress::resolve`].
    pub fn resolve(&self) -> Result<TaskAddress> {
        TaskAddress::resolve(
            &self.job_id,
            &self.component_name,
            &self.task_id,
            &self.task_version,
            &self.role,
            &self.party_id,
        )
    }
}

impl From<&TaskAddress> for TaskPath {
    fn from(address: &TaskAddress) -> Self {
        Self::new(
            address.job_id(),
            address.component_name(),
            address.task_id(),
            address.task_version().to_string(),
            address.role().as_str(),
            address.party_id(),
        )
    }
}

/// Body of `metric_data/save`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMetricDataRequest {
    /// Metric namespace
    pub metric_namespace: String,
    /// Metric name
    pub metric_name: String,
    /// Points as `[key, value]` pairs
    pub metrics: Vec<Value>,
    /// Scope the series to the whole job
    #[serde(default)]
    pub job_level: bool,
}

/// Body of `metric_meta/save`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMetricMetaRequest {
    /// Metric namespace
    pub metric_namespace: String,
    /// Metric name
    pub metric_name: String,
    /// Metadata object
    pub metric_meta: Value,
    /// Scope the metadata to the whole job
    #[serde(default)]
    pub job_level: bool,
}

/// Body of a metric read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadMetricsRequest {
    /// Namespace filter
    #[serde(default)]
    pub metric_namespace: Option<String>,
    /// Name filter
    #[serde(default)]
    pub metric_name: Option<String>,
    /// Read job-level metrics instead of the task's own
    #[serde(default)]
    pub job_level: bool,
}

/// Body of `table_meta/get`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetTableMetaRequest {
    /// Single field to return instead of the whole document
    #[serde(default)]
    pub field: Option<String>,
}

/// Body of `component_model/save`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveComponentModelRequest {
    /// Job-wide model ID
    pub model_id: String,
    /// Job-wide model version
    pub model_version: String,
    /// Artifact label within the component
    pub component_model_alias: String,
    /// Object-store location of the model bytes
    pub blob_ref: String,
}

/// Body of `component_model/get`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetComponentModelRequest {
    /// Job-wide model ID
    pub model_id: String,
    /// Job-wide model version
    pub model_version: String,
    /// Alias to fetch; all aliases when omitted
    #[serde(default)]
    pub search_model_alias: Option<String>,
}

/// Body of `output_data_info/save`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOutputDataInfoRequest {
    /// Logical output name
    pub data_name: String,
    /// Physical table namespace
    pub table_namespace: String,
    /// Physical table name
    pub table_name: String,
}

/// Body of `output_data_info/read`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadOutputDataInfoRequest {
    /// Logical output name
    pub data_name: String,
}

/// Body of `summary/save`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertSummaryRequest {
    /// Summary object
    pub summary: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metric_request_from_wire() {
        let request: SaveMetricDataRequest = serde_json::from_value(json!({
            "metric_namespace": "train",
            "metric_name": "loss",
            "metrics": [[0, 0.8], [1, 0.6]]
        }))
        .unwrap();
        assert!(!request.job_level);
        assert_eq!(request.metrics.len(), 2);
    }

    #[test]
    fn test_task_path_round_trip_through_address() {
        let path = TaskPath::new("J1", "intersect", "T1", "3", "host", "10000");
        let address = path.resolve().unwrap();
        assert_eq!(TaskPath::from(&address), path);
    }
}
