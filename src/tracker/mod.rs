//! Tracking Facade - the single entry point for task processes and readers
//!
//! The facade is a cheap clone over a long-lived [`KvStore`] handle. Each call
//! resolves its address, validates its payload, dispatches to one sub-store,
//! and wraps the outcome in an [`Envelope`]. Nothing is mutated unless every
//! validation passed.
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use trueno_tracking::tracker::{ReadOutputDataInfoRequest, SaveOutputDataInfoRequest, TaskPath};
//! use trueno_tracking::TrackingDb;
//!
//! # async fn example() -> trueno_tracking::Result<()> {
//! let db = TrackingDb::builder().build()?;
//! let tracker = db.tracker();
//! let path = TaskPath::new("J1", "intersect", "T1", "0", "guest", "9999");
//!
//! let saved = tracker
//!     .save_output_data_info(
//!         &path,
//!         SaveOutputDataInfoRequest {
//!             data_name: "output".into(),
//!             table_namespace: "ns1".into(),
//!             table_name: "t1".into(),
//!         },
//!     )
//!     .await;
//! assert!(saved.is_success());
//!
//! let history = tracker
//!     .read_output_data_info(&path, ReadOutputDataInfoRequest { data_name: "output".into() })
//!     .await;
//! assert_eq!(history.data.map(|h| h.len()), Some(1));
//! # Ok(())
//! # }
//! ```

mod envelope;
mod request;

pub use envelope::{Envelope, RetCode, UnknownRetCode};
pub use request::{
    GetComponentModelRequest, GetTableMetaRequest, InsertSummaryRequest, ReadMetricsRequest,
    ReadOutputDataInfoRequest, SaveComponentModelRequest, SaveMetricDataRequest,
    SaveMetricMetaRequest, SaveOutputDataInfoRequest, TaskPath,
};

use std::sync::Arc;

use serde_json::Value;

use crate::address::{latest_version, AddressFilter, LogicalTask, MetricScope};
use crate::artifact::{ArtifactRegistry, ModelRecord, SummaryRecord};
use crate::document;
use crate::kv::KvStore;
use crate::lineage::{LineageRegistry, OutputDataInfo, OutputTable};
use crate::metric::{MetricEntry, MetricPoint, MetricStore};
use crate::{Result, TrackingConfig};

/// Wrap an operation result, logging failures by severity.
fn respond<T>(operation: &'static str, result: Result<T>) -> Envelope<T> {
    match result {
        Ok(data) => Envelope::ok(data),
        Err(error) => {
            if error.is_caller_error() {
                tracing::warn!(operation, %error, "rejected tracking request");
            } else {
                let retryable = error.is_retryable();
                tracing::error!(operation, %error, retryable, "tracking request failed");
            }
            Envelope::error(&error)
        }
    }
}

fn respond_done(operation: &'static str, result: Result<()>) -> Envelope<()> {
    match result {
        Ok(()) => Envelope::done(),
        Err(error) => respond(operation, Err(error)),
    }
}

/// Tracking facade over metric, artifact and lineage stores.
#[derive(Debug)]
pub struct Tracker<S> {
    metrics: MetricStore<S>,
    artifacts: ArtifactRegistry<S>,
    lineage: LineageRegistry<S>,
}

impl<S> Clone for Tracker<S> {
    fn clone(&self) -> Self {
        Self {
            metrics: self.metrics.clone(),
            artifacts: self.artifacts.clone(),
            lineage: self.lineage.clone(),
        }
    }
}

impl<S: KvStore> Tracker<S> {
    /// Create a facade over a shared KV handle.
    #[must_use]
    pub fn new(kv: Arc<S>, config: &TrackingConfig) -> Self {
        Self {
            metrics: MetricStore::new(Arc::clone(&kv), config),
            artifacts: ArtifactRegistry::new(Arc::clone(&kv), config),
            lineage: LineageRegistry::new(kv),
        }
    }

    /// Typed access to the metric store.
    #[must_use]
    pub const fn metrics(&self) -> &MetricStore<S> {
        &self.metrics
    }

    /// Typed access to the artifact registry.
    #[must_use]
    pub const fn artifacts(&self) -> &ArtifactRegistry<S> {
        &self.artifacts
    }

    /// Typed access to the lineage registry.
    #[must_use]
    pub const fn lineage(&self) -> &LineageRegistry<S> {
        &self.lineage
    }

    // ------------------------------------------------------------------
    // Metrics
    // ------------------------------------------------------------------

    /// SaveMetricData: replace a series at task or job scope.
    pub async fn save_metric_data(
        &self,
        path: &TaskPath,
        request: SaveMetricDataRequest,
    ) -> Envelope<()> {
        let result = async {
            let address = path.resolve()?;
            let points = request
                .metrics
                .iter()
                .enumerate()
                .map(|(index, raw)| MetricPoint::from_json(index, raw))
                .collect::<Result<Vec<_>>>()?;
            let scope = MetricScope::from_address(&address, request.job_level);
            self.metrics
                .save_metric_data(&scope, &request.metric_namespace, &request.metric_name, points)
                .await
        };
        respond_done("save_metric_data", result.await)
    }

    /// SaveMetricMeta: upsert metric metadata at task or job scope.
    pub async fn save_metric_meta(
        &self,
        path: &TaskPath,
        request: SaveMetricMetaRequest,
    ) -> Envelope<()> {
        let result = async {
            let address = path.resolve()?;
            let meta = document::from_value("metric_meta", request.metric_meta)?;
            let scope = MetricScope::from_address(&address, request.job_level);
            self.metrics
                .save_metric_meta(&scope, &request.metric_namespace, &request.metric_name, meta)
                .await
        };
        respond_done("save_metric_meta", result.await)
    }

    /// Read metrics of the task (or, with `job_level`, of its job).
    pub async fn read_metrics(
        &self,
        path: &TaskPath,
        request: ReadMetricsRequest,
    ) -> Envelope<Vec<MetricEntry>> {
        let result = async {
            let address = path.resolve()?;
            let scope = MetricScope::from_address(&address, request.job_level);
            self.metrics
                .read_metrics(
                    &scope,
                    request.metric_namespace.as_deref(),
                    request.metric_name.as_deref(),
                )
                .await
        };
        respond("read_metrics", result.await)
    }

    /// Read job-level metrics with only a job ID in hand.
    pub async fn read_job_metrics(
        &self,
        job_id: &str,
        namespace: Option<&str>,
        name: Option<&str>,
    ) -> Envelope<Vec<MetricEntry>> {
        let result = async {
            let scope = MetricScope::job(job_id)?;
            self.metrics.read_metrics(&scope, namespace, name).await
        };
        respond("read_job_metrics", result.await)
    }

    // ------------------------------------------------------------------
    // Artifacts
    // ------------------------------------------------------------------

    /// SaveTableMeta: shallow-merge a document into the task's table metadata.
    pub async fn save_table_meta(&self, path: &TaskPath, doc: Value) -> Envelope<()> {
        let result = async {
            let address = path.resolve()?;
            let doc = document::from_value("table_meta", doc)?;
            self.artifacts.save_table_meta(&address, doc).await
        };
        respond_done("save_table_meta", result.await)
    }

    /// GetTableMeta: whole document or one field; the payload is `None` if absent.
    pub async fn get_table_meta(
        &self,
        path: &TaskPath,
        request: GetTableMetaRequest,
    ) -> Envelope<Option<Value>> {
        let result = async {
            let address = path.resolve()?;
            self.artifacts
                .get_table_meta(&address, request.field.as_deref())
                .await
        };
        respond("get_table_meta", result.await)
    }

    /// WriteOutputModel: create or replace one model alias reference.
    pub async fn write_output_model(
        &self,
        path: &TaskPath,
        request: SaveComponentModelRequest,
    ) -> Envelope<()> {
        let result = async {
            let address = path.resolve()?;
            self.artifacts
                .write_output_model(
                    &address,
                    &request.model_id,
                    &request.model_version,
                    &request.component_model_alias,
                    &request.blob_ref,
                )
                .await
        };
        respond_done("write_output_model", result.await)
    }

    /// GetOutputModel: this component and party's references, one alias or
    /// all aliases sorted by name.
    pub async fn get_output_model(
        &self,
        path: &TaskPath,
        request: GetComponentModelRequest,
    ) -> Envelope<Vec<ModelRecord>> {
        let result = async {
            let address = path.resolve()?;
            self.artifacts
                .get_output_model(
                    &address,
                    &request.model_id,
                    &request.model_version,
                    request.search_model_alias.as_deref(),
                )
                .await
        };
        respond("get_output_model", result.await)
    }

    /// InsertSummary: replace the task's summary.
    pub async fn insert_summary(
        &self,
        path: &TaskPath,
        request: InsertSummaryRequest,
    ) -> Envelope<()> {
        let result = async {
            let address = path.resolve()?;
            let summary = document::from_value("summary", request.summary)?;
            self.artifacts.insert_summary(&address, summary).await
        };
        respond_done("insert_summary", result.await)
    }

    /// Read the task's summary; the payload is `None` if none was written.
    pub async fn get_summary(&self, path: &TaskPath) -> Envelope<Option<SummaryRecord>> {
        let result = async {
            let address = path.resolve()?;
            self.artifacts.get_summary(&address).await
        };
        respond("get_summary", result.await)
    }

    // ------------------------------------------------------------------
    // Lineage
    // ------------------------------------------------------------------

    /// SaveOutputDataInfo: append a lineage record.
    pub async fn save_output_data_info(
        &self,
        path: &TaskPath,
        request: SaveOutputDataInfoRequest,
    ) -> Envelope<()> {
        let result = async {
            let address = path.resolve()?;
            self.lineage
                .record_output(
                    &address,
                    &request.data_name,
                    &request.table_name,
                    &request.table_namespace,
                )
                .await
                .map(|_| ())
        };
        respond_done("save_output_data_info", result.await)
    }

    /// ReadOutputDataInfo: full history of one `data_name`, oldest first.
    pub async fn read_output_data_info(
        &self,
        path: &TaskPath,
        request: ReadOutputDataInfoRequest,
    ) -> Envelope<Vec<OutputDataInfo>> {
        let result = async {
            let address = path.resolve()?;
            self.lineage.read_history(&address, &request.data_name).await
        };
        respond("read_output_data_info", result.await)
    }

    /// QueryOutputDataInfos: lineage records of a job, optionally narrowed.
    ///
    /// Zero matches is a success with an empty list.
    pub async fn query_output_data_infos(
        &self,
        job_id: &str,
        component_name: Option<&str>,
        role: Option<&str>,
        party_id: Option<&str>,
    ) -> Envelope<Vec<OutputDataInfo>> {
        let result = async {
            let filter = AddressFilter::resolve(job_id, component_name, role, party_id)?;
            self.lineage.query_outputs(&filter).await
        };
        respond("query_output_data_infos", result.await)
    }

    /// Output tables of one component for one role/party.
    pub async fn query_output_tables(
        &self,
        job_id: &str,
        component_name: &str,
        role: &str,
        party_id: &str,
    ) -> Envelope<Vec<OutputTable>> {
        let result = async {
            let filter =
                AddressFilter::resolve(job_id, Some(component_name), Some(role), Some(party_id))?;
            let records = self.lineage.query_outputs(&filter).await?;
            Ok::<_, crate::Error>(records.iter().map(OutputDataInfo::to_output_table).collect())
        };
        respond("query_output_tables", result.await)
    }

    // ------------------------------------------------------------------
    // Versioning
    // ------------------------------------------------------------------

    /// Greatest `task_version` of `task` that wrote anything; the payload is
    /// `None` if no attempt wrote.
    pub async fn latest_task_version(&self, task: &LogicalTask) -> Envelope<Option<u64>> {
        let result = async {
            let mut versions = self.metrics.task_versions(task).await?;
            versions.extend(self.artifacts.task_versions(task).await?);
            versions.extend(self.lineage.task_versions(task).await?);
            Ok::<_, crate::Error>(latest_version(versions))
        };
        respond("latest_task_version", result.await)
    }

    /// Summary of the latest attempt of `task` that wrote one.
    pub async fn get_summary_latest(&self, task: &LogicalTask) -> Envelope<Option<SummaryRecord>> {
        respond("get_summary_latest", self.artifacts.get_summary_latest(task).await)
    }

    /// Table metadata of the latest attempt of `task` that wrote any.
    pub async fn get_table_meta_latest(
        &self,
        task: &LogicalTask,
        field: Option<&str>,
    ) -> Envelope<Option<Value>> {
        let result = self.artifacts.get_table_meta_latest(task, field).await;
        respond("get_table_meta_latest", result)
    }

    /// Task-level metrics of the latest attempt of `task` that wrote any.
    pub async fn read_metrics_latest(
        &self,
        task: &LogicalTask,
        namespace: Option<&str>,
        name: Option<&str>,
    ) -> Envelope<Vec<MetricEntry>> {
        let result = self.metrics.read_metrics_latest(task, namespace, name).await;
        respond("read_metrics_latest", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKvStore;
    use serde_json::json;

    fn tracker() -> Tracker<MemoryKvStore> {
        Tracker::new(Arc::new(MemoryKvStore::new()), &TrackingConfig::default())
    }

    fn path() -> TaskPath {
        TaskPath::new("J1", "intersect", "T1", "0", "guest", "9999")
    }

    #[tokio::test]
    async fn test_invalid_address_rejected_before_dispatch() {
        let tracker = tracker();
        let bad = TaskPath::new("J1", "intersect", "T1", "latest", "guest", "9999");

        let request = InsertSummaryRequest { summary: json!({}) };
        let envelope = tracker.insert_summary(&bad, request).await;
        assert_eq!(envelope.retcode, RetCode::InvalidAddress);
        assert!(tracker.get_summary(&path()).await.data.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_non_numeric_point_rejects_whole_series() {
        let tracker = tracker();
        let request = SaveMetricDataRequest {
            metric_namespace: "train".into(),
            metric_name: "loss".into(),
            metrics: vec![json!([0, 0.8]), json!([1, "nan"])],
            job_level: false,
        };

        let envelope = tracker.save_metric_data(&path(), request).await;
        assert_eq!(envelope.retcode, RetCode::InvalidPayload);
        assert!(envelope.retmsg.contains("index 1"));

        let read = tracker.read_metrics(&path(), ReadMetricsRequest::default()).await;
        assert_eq!(read.data, Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_non_object_documents_rejected() {
        let tracker = tracker();
        let envelope = tracker.save_table_meta(&path(), json!("not a map")).await;
        assert_eq!(envelope.retcode, RetCode::InvalidPayload);

        let envelope = tracker
            .save_metric_meta(
                &path(),
                SaveMetricMetaRequest {
                    metric_namespace: "train".into(),
                    metric_name: "loss".into(),
                    metric_meta: json!(42),
                    job_level: false,
                },
            )
            .await;
        assert_eq!(envelope.retcode, RetCode::InvalidPayload);
    }

    #[tokio::test]
    async fn test_query_output_tables_empty_is_success() {
        let tracker = tracker();
        let envelope = tracker.query_output_tables("J1", "intersect", "guest", "9999").await;
        assert!(envelope.is_success());
        assert_eq!(envelope.data, Some(Vec::new()));

        let envelope = tracker.query_output_tables("J1", "intersect", "boss", "9999").await;
        assert_eq!(envelope.retcode, RetCode::InvalidAddress);
    }

    #[tokio::test]
    async fn test_latest_task_version_spans_stores() {
        let tracker = tracker();
        let v3 = TaskPath::new("J1", "intersect", "T1", "3", "guest", "9999");
        let v12 = TaskPath::new("J1", "intersect", "T1", "12", "guest", "9999");

        tracker.insert_summary(&v3, InsertSummaryRequest { summary: json!({"a": 1}) }).await;
        tracker
            .save_output_data_info(
                &v12,
                SaveOutputDataInfoRequest {
                    data_name: "output".into(),
                    table_namespace: "ns".into(),
                    table_name: "t".into(),
                },
            )
            .await;

        let logical = path().resolve().unwrap().logical();
        assert_eq!(tracker.latest_task_version(&logical).await.data, Some(Some(12)));
        // The summary's latest attempt is the one that wrote a summary.
        let summary = tracker.get_summary_latest(&logical).await.data.unwrap().unwrap();
        assert_eq!(summary.address().task_version(), 3);
    }

    #[tokio::test]
    async fn test_latest_reads_use_envelope() {
        let tracker = tracker();
        let logical = path().resolve().unwrap().logical();

        let version = tracker.latest_task_version(&logical).await;
        assert_eq!(version.retcode, RetCode::Success);
        assert_eq!(version.data, Some(None));

        let metrics = tracker.read_metrics_latest(&logical, None, None).await;
        assert!(metrics.is_success());
        assert_eq!(metrics.data, Some(Vec::new()));

        let meta = tracker.get_table_meta_latest(&logical, Some("count")).await;
        assert_eq!(meta.data, Some(None));
        assert_eq!(tracker.get_summary_latest(&logical).await.data, Some(None));
    }

    #[tokio::test]
    async fn test_output_models_resolved_against_caller_path() {
        let tracker = tracker();
        let guest = path();
        let host = TaskPath::new("J1", "intersect", "T1", "0", "host", "10000");
        let write = |blob: &str| SaveComponentModelRequest {
            model_id: "guest-9999#host-10000#model".into(),
            model_version: "202601011200".into(),
            component_model_alias: "model".into(),
            blob_ref: blob.into(),
        };
        let read = GetComponentModelRequest {
            model_id: "guest-9999#host-10000#model".into(),
            model_version: "202601011200".into(),
            search_model_alias: Some("model".into()),
        };

        tracker.write_output_model(&guest, write("s3://guest/model")).await;
        tracker.write_output_model(&host, write("s3://host/model")).await;

        let guest_models = tracker.get_output_model(&guest, read.clone()).await.data.unwrap();
        assert_eq!(guest_models[0].blob_ref(), "s3://guest/model");
        let host_models = tracker.get_output_model(&host, read.clone()).await.data.unwrap();
        assert_eq!(host_models[0].blob_ref(), "s3://host/model");

        let bad = TaskPath::new("J1", "intersect", "T1", "x", "host", "10000");
        let envelope = tracker.get_output_model(&bad, read).await;
        assert_eq!(envelope.retcode, RetCode::InvalidAddress);
    }
}
