//! Artifact Registry - persistence for table metadata, models and summaries

use std::sync::Arc;

use serde_json::Value;

use super::{ModelRecord, SummaryRecord, TableMeta};
use crate::address::{LogicalTask, TaskAddress};
use crate::document::{self, Document};
use crate::kv::{self, KvStore};
use crate::{Error, Result, TrackingConfig};

const TABLE_META: &str = "table_meta";
const MODEL: &str = "model";
const SUMMARY: &str = "summary";

fn require_id(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidAddress(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Registry of task outputs other than metrics and lineage.
///
/// ## Key layout
///
/// ```text
/// table_meta / job / component / task / role / party / version
/// summary    / job / component / task / role / party / version
/// model      / job / component / role / party / model_id / model_version / alias
/// ```
///
/// Parties share `model_id`/`model_version` and components reuse aliases, so
/// model references are scoped to the producing component and party. A
/// retried task replaces the reference of its earlier attempt.
///
/// Absent records are never errors: reads return `None` or an empty vector.
#[derive(Debug)]
pub struct ArtifactRegistry<S> {
    kv: Arc<S>,
    max_document_bytes: usize,
}

impl<S> Clone for ArtifactRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            kv: Arc::clone(&self.kv),
            max_document_bytes: self.max_document_bytes,
        }
    }
}

impl<S: KvStore> ArtifactRegistry<S> {
    /// Create a registry over a shared KV handle.
    #[must_use]
    pub fn new(kv: Arc<S>, config: &TrackingConfig) -> Self {
        Self {
            kv,
            max_document_bytes: config.max_document_bytes,
        }
    }

    /// Merge `doc` into the table metadata of `address`.
    ///
    /// New keys are added, existing keys overwritten, unmentioned keys kept.
    /// The merge happens inside one atomic update of the key.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPayload`] if the merged document exceeds the size
    /// limit (nothing is written), storage errors unchanged.
    pub async fn save_table_meta(&self, address: &TaskAddress, doc: Document) -> Result<()> {
        let key = address.storage_key(&[TABLE_META], &[]);
        let max = self.max_document_bytes;
        let fields = doc.len();
        let address_owned = address.clone();

        self.kv
            .update(&key, move |current| {
                let mut merged = match current {
                    Some(bytes) => kv::decode::<TableMeta>(bytes)?.into_document(),
                    None => Document::new(),
                };
                let before = merged.clone();
                document::merge(&mut merged, doc);
                if current.is_some() && merged == before {
                    return Ok(None);
                }
                document::ensure_within("table_meta", &merged, max)?;
                Ok(Some(kv::encode(&TableMeta::new(address_owned, merged))?))
            })
            .await?;

        tracing::debug!(address = %address, fields, "merged table meta");
        Ok(())
    }

    /// Read table metadata of `address`: the whole document, or one field.
    ///
    /// # Errors
    ///
    /// Storage or decoding errors from the backend.
    pub async fn get_table_meta(
        &self,
        address: &TaskAddress,
        field: Option<&str>,
    ) -> Result<Option<Value>> {
        let key = address.storage_key(&[TABLE_META], &[]);
        let Some(bytes) = self.kv.get(&key).await? else {
            return Ok(None);
        };
        let mut doc = kv::decode::<TableMeta>(&bytes)?.into_document();
        Ok(match field {
            Some(field) => doc.remove(field),
            None => Some(Value::Object(doc)),
        })
    }

    /// Create or replace the reference for one model alias.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidAddress`] for empty model identifiers,
    /// [`Error::InvalidPayload`] for an empty `blob_ref`, storage errors unchanged.
    pub async fn write_output_model(
        &self,
        address: &TaskAddress,
        model_id: &str,
        model_version: &str,
        alias: &str,
        blob_ref: &str,
    ) -> Result<()> {
        require_id("model_id", model_id)?;
        require_id("model_version", model_version)?;
        require_id("component_model_alias", alias)?;
        if blob_ref.is_empty() {
            return Err(Error::InvalidPayload("model blob_ref must not be empty".into()));
        }

        let key = address.party_key(MODEL, &[model_id, model_version, alias]);
        let record = ModelRecord::new(address.clone(), model_id, model_version, alias, blob_ref);
        self.kv
            .update(&key, move |current| {
                if let Some(bytes) = current {
                    let existing: ModelRecord = kv::decode(bytes)?;
                    if existing.address() == record.address()
                        && existing.blob_ref() == record.blob_ref()
                    {
                        return Ok(None);
                    }
                }
                Ok(Some(kv::encode(&record)?))
            })
            .await?;

        tracing::debug!(
            address = %address,
            model_id,
            model_version,
            alias,
            "wrote output model"
        );
        Ok(())
    }

    /// Read the model references `address`'s component and party wrote:
    /// one alias, or every alias sorted by name.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidAddress`] for empty model identifiers, storage errors unchanged.
    pub async fn get_output_model(
        &self,
        address: &TaskAddress,
        model_id: &str,
        model_version: &str,
        alias: Option<&str>,
    ) -> Result<Vec<ModelRecord>> {
        require_id("model_id", model_id)?;
        require_id("model_version", model_version)?;

        if let Some(alias) = alias {
            let key = address.party_key(MODEL, &[model_id, model_version, alias]);
            return match self.kv.get(&key).await? {
                Some(bytes) => Ok(vec![kv::decode(&bytes)?]),
                None => Ok(Vec::new()),
            };
        }

        // Trailing separator keeps `v1` from matching `v10`.
        let mut prefix = address.party_key(MODEL, &[model_id, model_version]);
        prefix.push('/');
        let rows = self.kv.scan_prefix(&prefix).await?;
        let mut models: Vec<ModelRecord> = kv::decode_all(rows)?;
        // Escaping can reorder keys relative to the raw alias.
        models.sort_by(|a, b| a.alias().cmp(b.alias()));
        Ok(models)
    }

    /// Replace the summary of `address`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPayload`] for an oversized document, storage errors unchanged.
    pub async fn insert_summary(&self, address: &TaskAddress, summary: Document) -> Result<()> {
        document::ensure_within("summary", &summary, self.max_document_bytes)?;

        let key = address.storage_key(&[SUMMARY], &[]);
        let record = SummaryRecord::new(address.clone(), summary);
        self.kv
            .update(&key, move |current| {
                if let Some(bytes) = current {
                    let existing: SummaryRecord = kv::decode(bytes)?;
                    if existing.summary() == record.summary() {
                        return Ok(None);
                    }
                }
                Ok(Some(kv::encode(&record)?))
            })
            .await?;

        tracing::debug!(address = %address, "inserted summary");
        Ok(())
    }

    /// Read the summary of `address`, `None` if none was written yet.
    ///
    /// # Errors
    ///
    /// Storage or decoding errors from the backend.
    pub async fn get_summary(&self, address: &TaskAddress) -> Result<Option<SummaryRecord>> {
        let key = address.storage_key(&[SUMMARY], &[]);
        match self.kv.get(&key).await? {
            Some(bytes) => Ok(Some(kv::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Summary of the latest attempt of `task` that wrote one.
    ///
    /// # Errors
    ///
    /// Storage or decoding errors from the backend.
    pub async fn get_summary_latest(&self, task: &LogicalTask) -> Result<Option<SummaryRecord>> {
        let rows = self.kv.scan_prefix(&task.storage_prefix(&[SUMMARY])).await?;
        let records: Vec<SummaryRecord> = kv::decode_all(rows)?;
        Ok(records.into_iter().max_by_key(|r| r.address().task_version()))
    }

    /// Table metadata of the latest attempt of `task` that wrote any.
    ///
    /// # Errors
    ///
    /// Storage or decoding errors from the backend.
    pub async fn get_table_meta_latest(
        &self,
        task: &LogicalTask,
        field: Option<&str>,
    ) -> Result<Option<Value>> {
        let rows = self.kv.scan_prefix(&task.storage_prefix(&[TABLE_META])).await?;
        let records: Vec<TableMeta> = kv::decode_all(rows)?;
        let Some(latest) = records.into_iter().max_by_key(|r| r.address().task_version()) else {
            return Ok(None);
        };
        let mut doc = latest.into_document();
        Ok(match field {
            Some(field) => doc.remove(field),
            None => Some(Value::Object(doc)),
        })
    }

    /// Versions of `task` that have table metadata or a summary.
    ///
    /// # Errors
    ///
    /// Storage or decoding errors from the backend.
    pub async fn task_versions(&self, task: &LogicalTask) -> Result<Vec<u64>> {
        let mut versions = Vec::new();
        for (_, bytes) in self.kv.scan_prefix(&task.storage_prefix(&[TABLE_META])).await? {
            versions.push(kv::decode::<TableMeta>(&bytes)?.address().task_version());
        }
        for (_, bytes) in self.kv.scan_prefix(&task.storage_prefix(&[SUMMARY])).await? {
            versions.push(kv::decode::<SummaryRecord>(&bytes)?.address().task_version());
        }
        Ok(versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKvStore;
    use serde_json::json;

    fn registry() -> ArtifactRegistry<MemoryKvStore> {
        ArtifactRegistry::new(Arc::new(MemoryKvStore::new()), &TrackingConfig::default())
    }

    fn address() -> TaskAddress {
        TaskAddress::resolve("J1", "hetero_lr_0", "T1", "0", "guest", "9999").unwrap()
    }

    fn doc(value: Value) -> Document {
        document::from_value("doc", value).unwrap()
    }

    #[tokio::test]
    async fn test_table_meta_merges() {
        let registry = registry();
        let a = address();

        registry.save_table_meta(&a, doc(json!({"x": 1}))).await.unwrap();
        registry.save_table_meta(&a, doc(json!({"y": 2}))).await.unwrap();

        assert_eq!(
            registry.get_table_meta(&a, None).await.unwrap(),
            Some(json!({"x": 1, "y": 2}))
        );
    }

    #[tokio::test]
    async fn test_table_meta_overwrites_existing_keys() {
        let registry = registry();
        let a = address();

        registry.save_table_meta(&a, doc(json!({"x": 1, "z": 0}))).await.unwrap();
        registry.save_table_meta(&a, doc(json!({"x": 5}))).await.unwrap();

        assert_eq!(registry.get_table_meta(&a, Some("x")).await.unwrap(), Some(json!(5)));
        assert_eq!(registry.get_table_meta(&a, Some("z")).await.unwrap(), Some(json!(0)));
        assert_eq!(registry.get_table_meta(&a, Some("missing")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_table_meta_absent() {
        let registry = registry();
        assert_eq!(registry.get_table_meta(&address(), None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_table_meta_oversized_merge_rejected() {
        let config = TrackingConfig {
            max_document_bytes: 32,
            ..TrackingConfig::default()
        };
        let registry = ArtifactRegistry::new(Arc::new(MemoryKvStore::new()), &config);
        let a = address();

        registry.save_table_meta(&a, doc(json!({"x": 1}))).await.unwrap();
        let err = registry
            .save_table_meta(&a, doc(json!({"padding": "0123456789012345678901234567890"})))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidPayload(_)));
        assert_eq!(registry.get_table_meta(&a, None).await.unwrap(), Some(json!({"x": 1})));
    }

    #[tokio::test]
    async fn test_models_sorted_by_alias() {
        let registry = registry();
        let a = address();

        registry.write_output_model(&a, "m", "v1", "model", "s3://m/model").await.unwrap();
        registry
            .write_output_model(&a, "m", "v1", "isometric_model", "s3://m/iso")
            .await
            .unwrap();
        registry.write_output_model(&a, "m", "v2", "model", "s3://m2/model").await.unwrap();
        registry.write_output_model(&a, "m", "v10", "model", "s3://m10/model").await.unwrap();

        let all = registry.get_output_model(&a, "m", "v1", None).await.unwrap();
        let aliases: Vec<&str> = all.iter().map(ModelRecord::alias).collect();
        assert_eq!(aliases, vec!["isometric_model", "model"]);

        let one = registry.get_output_model(&a, "m", "v1", Some("model")).await.unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].blob_ref(), "s3://m/model");
    }

    #[tokio::test]
    async fn test_model_replace_and_absent() {
        let registry = registry();
        let a = address();

        registry.write_output_model(&a, "m", "v1", "model", "s3://old").await.unwrap();
        registry.write_output_model(&a, "m", "v1", "model", "s3://new").await.unwrap();
        let models = registry.get_output_model(&a, "m", "v1", Some("model")).await.unwrap();
        assert_eq!(models[0].blob_ref(), "s3://new");

        let other = registry.get_output_model(&a, "m", "v1", Some("other")).await.unwrap();
        assert!(other.is_empty());
        assert!(registry.get_output_model(&a, "m", "v9", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_models_scoped_to_component_and_party() {
        let registry = registry();
        let guest_lr = address();
        let host_lr =
            TaskAddress::resolve("J1", "hetero_lr_0", "T1", "0", "host", "10000").unwrap();
        let guest_intersect =
            TaskAddress::resolve("J1", "intersect_0", "T0", "0", "guest", "9999").unwrap();

        // Parties share model_id/model_version; components share the alias.
        for (address, blob) in [
            (&guest_lr, "s3://guest/model"),
            (&host_lr, "s3://host/model"),
            (&guest_intersect, "s3://intersect/model"),
        ] {
            registry.write_output_model(address, "m", "v1", "model", blob).await.unwrap();
        }

        for (address, blob) in [
            (&guest_lr, "s3://guest/model"),
            (&host_lr, "s3://host/model"),
            (&guest_intersect, "s3://intersect/model"),
        ] {
            let one = registry.get_output_model(address, "m", "v1", Some("model")).await.unwrap();
            let all = registry.get_output_model(address, "m", "v1", None).await.unwrap();
            assert_eq!(one.len(), 1);
            assert_eq!(one[0].blob_ref(), blob);
            assert_eq!(one[0].address(), address);
            assert_eq!(all, one);
        }
    }

    #[tokio::test]
    async fn test_model_readable_from_retried_task() {
        let registry = registry();
        let first = address();
        let retry = first.with_version(1);

        registry.write_output_model(&first, "m", "v1", "model", "s3://attempt0").await.unwrap();
        let seen = registry.get_output_model(&retry, "m", "v1", Some("model")).await.unwrap();
        assert_eq!(seen[0].blob_ref(), "s3://attempt0");

        registry.write_output_model(&retry, "m", "v1", "model", "s3://attempt1").await.unwrap();
        let seen = registry.get_output_model(&first, "m", "v1", Some("model")).await.unwrap();
        assert_eq!(seen[0].blob_ref(), "s3://attempt1");
        assert_eq!(seen[0].address().task_version(), 1);
    }

    #[tokio::test]
    async fn test_model_validation() {
        let registry = registry();
        let a = address();

        assert!(matches!(
            registry.write_output_model(&a, "", "v1", "model", "s3://x").await,
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            registry.write_output_model(&a, "m", "v1", "model", "").await,
            Err(Error::InvalidPayload(_))
        ));
    }

    #[tokio::test]
    async fn test_summary_replaced_wholesale() {
        let registry = registry();
        let a = address();

        assert!(registry.get_summary(&a).await.unwrap().is_none());
        let first = doc(json!({"intersect_num": 10, "rate": 0.5}));
        registry.insert_summary(&a, first).await.unwrap();
        registry.insert_summary(&a, doc(json!({"intersect_num": 12}))).await.unwrap();

        let summary = registry.get_summary(&a).await.unwrap().unwrap();
        assert_eq!(Value::Object(summary.summary().clone()), json!({"intersect_num": 12}));
    }

    #[tokio::test]
    async fn test_versions_independent() {
        let registry = registry();
        let v1 = address().with_version(1);
        let v2 = address().with_version(2);

        registry.insert_summary(&v1, doc(json!({"attempt": 1}))).await.unwrap();
        registry.insert_summary(&v2, doc(json!({"attempt": 2}))).await.unwrap();
        registry.save_table_meta(&v2, doc(json!({"t": 2}))).await.unwrap();

        let first = registry.get_summary(&v1).await.unwrap().unwrap();
        assert_eq!(first.summary().get("attempt"), Some(&json!(1)));

        let mut versions = registry.task_versions(&v1.logical()).await.unwrap();
        versions.sort_unstable();
        versions.dedup();
        assert_eq!(versions, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_latest_is_numeric_max() {
        let registry = registry();
        let base = address();

        // "10" sorts before "9" as a key segment; latest must still be 10.
        for version in [9, 10, 2] {
            registry
                .insert_summary(&base.with_version(version), doc(json!({"attempt": version})))
                .await
                .unwrap();
        }
        let meta = doc(json!({"t": 3}));
        registry.save_table_meta(&base.with_version(3), meta).await.unwrap();

        let latest = registry.get_summary_latest(&base.logical()).await.unwrap().unwrap();
        assert_eq!(latest.address().task_version(), 10);
        assert_eq!(
            registry.get_table_meta_latest(&base.logical(), Some("t")).await.unwrap(),
            Some(json!(3))
        );

        let other =
            TaskAddress::resolve("J1", "hetero_lr_0", "T2", "0", "guest", "9999").unwrap();
        assert!(registry.get_summary_latest(&other.logical()).await.unwrap().is_none());
    }
}
