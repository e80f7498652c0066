//! Metric Store - persistence for metric series and metadata

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::{MetricEntry, MetricMeta, MetricPoint, MetricSeries};
use crate::address::{latest_version, LogicalTask, MetricScope};
use crate::document::{self, Document};
use crate::kv::{self, KvStore};
use crate::{Error, Result, TrackingConfig};

const DATA: &str = "metric_data";
const META: &str = "metric_meta";

fn require_name(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidAddress(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Store for metric series and metric metadata.
///
/// ## Write semantics
///
/// A series is replaced as a whole on every write; there is no partial merge.
/// Re-submitting an identical series is a no-op, so the stored record
/// (including `updated_at`) is unchanged by retries. Concurrent writers to the
/// same `(scope, namespace, name)` converge to last-writer-wins.
#[derive(Debug)]
pub struct MetricStore<S> {
    kv: Arc<S>,
    max_points: usize,
    max_document_bytes: usize,
}

impl<S> Clone for MetricStore<S> {
    fn clone(&self) -> Self {
        Self {
            kv: Arc::clone(&self.kv),
            max_points: self.max_points,
            max_document_bytes: self.max_document_bytes,
        }
    }
}

impl<S: KvStore> MetricStore<S> {
    /// Create a metric store over a shared KV handle.
    #[must_use]
    pub fn new(kv: Arc<S>, config: &TrackingConfig) -> Self {
        Self {
            kv,
            max_points: config.max_points_per_series,
            max_document_bytes: config.max_document_bytes,
        }
    }

    /// Replace the series stored under `(scope, namespace, name)`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidAddress`] if `namespace` or `name` is empty
    /// - [`Error::InvalidPayload`] if the series exceeds the configured size
    /// - [`Error::InvalidMetricPoint`] for a non-finite value
    /// - storage errors from the backend, unchanged
    ///
    /// Validation runs before any write; on error prior state is untouched.
    pub async fn save_metric_data(
        &self,
        scope: &MetricScope,
        namespace: &str,
        name: &str,
        points: Vec<MetricPoint>,
    ) -> Result<()> {
        require_name("metric_namespace", namespace)?;
        require_name("metric_name", name)?;
        if points.len() > self.max_points {
            return Err(Error::InvalidPayload(format!(
                "metric {namespace}/{name} has {} points, limit is {}",
                points.len(),
                self.max_points
            )));
        }
        if let Some(index) = points
            .iter()
            .position(|p| p.value().is_some_and(|v| !v.is_finite()))
        {
            return Err(Error::InvalidMetricPoint {
                index,
                reason: "value must be finite".into(),
            });
        }

        let key = scope.storage_key(&[DATA], &[namespace, name]);
        let count = points.len();
        let series = MetricSeries::new(scope.clone(), namespace, name, points);
        self.kv
            .update(&key, move |current| {
                if let Some(bytes) = current {
                    let existing: MetricSeries = kv::decode(bytes)?;
                    if existing.points() == series.points() {
                        return Ok(None);
                    }
                }
                Ok(Some(kv::encode(&series)?))
            })
            .await?;

        tracing::debug!(
            job_id = scope.job_id(),
            job_level = scope.is_job_level(),
            namespace,
            name,
            points = count,
            "saved metric data"
        );
        Ok(())
    }

    /// Upsert the metadata document for `(scope, namespace, name)`.
    ///
    /// Independent of the series: either may be written first.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidAddress`] for empty names, [`Error::InvalidPayload`]
    /// for an oversized document, storage errors unchanged.
    pub async fn save_metric_meta(
        &self,
        scope: &MetricScope,
        namespace: &str,
        name: &str,
        meta: Document,
    ) -> Result<()> {
        require_name("metric_namespace", namespace)?;
        require_name("metric_name", name)?;
        document::ensure_within("metric_meta", &meta, self.max_document_bytes)?;

        let key = scope.storage_key(&[META], &[namespace, name]);
        let record = MetricMeta::new(scope.clone(), namespace, name, meta);
        self.kv
            .update(&key, move |current| {
                if let Some(bytes) = current {
                    let existing: MetricMeta = kv::decode(bytes)?;
                    if existing.meta() == record.meta() {
                        return Ok(None);
                    }
                }
                Ok(Some(kv::encode(&record)?))
            })
            .await?;

        tracing::debug!(job_id = scope.job_id(), namespace, name, "saved metric meta");
        Ok(())
    }

    /// Read every metric of `scope`, optionally narrowed by namespace and name.
    ///
    /// Series and metadata are joined on `(namespace, name)`; the result is
    /// sorted by that pair. Nothing stored yields an empty vector.
    ///
    /// # Errors
    ///
    /// Storage or decoding errors from the backend.
    pub async fn read_metrics(
        &self,
        scope: &MetricScope,
        namespace: Option<&str>,
        name: Option<&str>,
    ) -> Result<Vec<MetricEntry>> {
        let scan = |head: &'static str| {
            let tail: Vec<&str> = namespace.into_iter().collect();
            let mut prefix = scope.storage_key(&[head], &tail);
            prefix.push('/');
            prefix
        };

        let series: Vec<MetricSeries> =
            kv::decode_all(self.kv.scan_prefix(&scan(DATA)).await?)?;
        let metas: Vec<MetricMeta> = kv::decode_all(self.kv.scan_prefix(&scan(META)).await?)?;

        let wanted = |n: &str| name.map_or(true, |want| want == n);
        let mut joined: FxHashMap<(String, String), MetricEntry> = FxHashMap::default();

        for s in series.into_iter().filter(|s| wanted(s.name())) {
            let entry = joined
                .entry((s.namespace().to_string(), s.name().to_string()))
                .or_insert_with(|| MetricEntry {
                    namespace: s.namespace().to_string(),
                    name: s.name().to_string(),
                    ..MetricEntry::default()
                });
            entry.points = s.points().to_vec();
        }
        for m in metas.into_iter().filter(|m| wanted(m.name())) {
            let entry = joined
                .entry((m.namespace().to_string(), m.name().to_string()))
                .or_insert_with(|| MetricEntry {
                    namespace: m.namespace().to_string(),
                    name: m.name().to_string(),
                    ..MetricEntry::default()
                });
            entry.meta = Some(m.meta().clone());
        }

        let mut entries: Vec<MetricEntry> = joined.into_values().collect();
        entries.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
        Ok(entries)
    }

    /// [`Self::read_metrics`] on the latest attempt of `task` that wrote
    /// task-level metrics. Empty if no attempt did.
    ///
    /// # Errors
    ///
    /// Storage or decoding errors from the backend.
    pub async fn read_metrics_latest(
        &self,
        task: &LogicalTask,
        namespace: Option<&str>,
        name: Option<&str>,
    ) -> Result<Vec<MetricEntry>> {
        match latest_version(self.task_versions(task).await?) {
            Some(version) => {
                let scope = MetricScope::Task(task.at_version(version));
                self.read_metrics(&scope, namespace, name).await
            }
            None => Ok(Vec::new()),
        }
    }

    /// Versions of `task` that have task-level metric data or metadata.
    ///
    /// # Errors
    ///
    /// Storage or decoding errors from the backend.
    pub async fn task_versions(&self, task: &LogicalTask) -> Result<Vec<u64>> {
        let mut versions = Vec::new();
        for head in [DATA, META] {
            let rows = self.kv.scan_prefix(&task.storage_prefix(&[head, "task"])).await?;
            for (_, bytes) in rows {
                let scope = if head == DATA {
                    kv::decode::<MetricSeries>(&bytes)?.scope().clone()
                } else {
                    kv::decode::<MetricMeta>(&bytes)?.scope().clone()
                };
                if let MetricScope::Task(address) = scope {
                    versions.push(address.task_version());
                }
            }
        }
        Ok(versions)
    }
}
