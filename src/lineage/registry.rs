//! Output Lineage Registry - append-only history of output tables

use std::sync::Arc;

use super::OutputDataInfo;
use crate::address::{key, AddressFilter, LogicalTask, TaskAddress};
use crate::kv::{self, KvStore};
use crate::{Error, Result};

const LINEAGE: &str = "lineage";

fn require_field(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidPayload(format!("{field} must not be empty")));
    }
    Ok(())
}

fn history_key(address: &TaskAddress, data_name: &str) -> String {
    address.party_key(LINEAGE, &[data_name])
}

/// Append-only registry mapping logical output names to physical tables.
///
/// ## Key layout
///
/// ```text
/// lineage / job / component / role / party / data_name  ->  [record, ...]
/// ```
///
/// One document holds the whole history of a `data_name`, so records written
/// by every attempt of a task land in the same history. Appends go through a
/// single atomic update of that document: a record's position is fixed when
/// it becomes visible and a reader never sees a later record without the
/// earlier ones.
#[derive(Debug)]
pub struct LineageRegistry<S> {
    kv: Arc<S>,
}

impl<S> Clone for LineageRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            kv: Arc::clone(&self.kv),
        }
    }
}

impl<S: KvStore> LineageRegistry<S> {
    /// Create a registry over a shared KV handle.
    #[must_use]
    pub const fn new(kv: Arc<S>) -> Self {
        Self { kv }
    }

    /// Append a lineage record. Prior records are never touched.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPayload`] if a name is empty, storage errors unchanged.
    pub async fn record_output(
        &self,
        address: &TaskAddress,
        data_name: &str,
        table_name: &str,
        table_namespace: &str,
    ) -> Result<OutputDataInfo> {
        require_field("data_name", data_name)?;
        require_field("table_name", table_name)?;
        require_field("table_namespace", table_namespace)?;

        let mut appended = None;
        self.kv
            .update(&history_key(address, data_name), |current| {
                let mut history: Vec<OutputDataInfo> = match current {
                    Some(bytes) => kv::decode(bytes)?,
                    None => Vec::new(),
                };
                let mut record = OutputDataInfo::new(
                    address.clone(),
                    data_name,
                    table_name,
                    table_namespace,
                    history.len() as u64,
                );
                if let Some(last) = history.last() {
                    record = record.not_before(last.created_at());
                }
                history.push(record.clone());
                appended = Some(record);
                Ok(Some(kv::encode(&history)?))
            })
            .await?;
        let record = appended.ok_or_else(|| {
            Error::StorageUnavailable(format!("append to {data_name} was not applied"))
        })?;

        tracing::debug!(
            address = %address,
            data_name,
            table_name,
            table_namespace,
            sequence = record.sequence(),
            "recorded output data info"
        );
        Ok(record)
    }

    /// Every record matching `filter`, oldest first.
    ///
    /// Histories are merged by write time; records of one history keep their
    /// append order. Zero matches is an empty vector, whether or not the job
    /// exists.
    ///
    /// # Errors
    ///
    /// Storage or decoding errors from the backend.
    pub async fn query_outputs(&self, filter: &AddressFilter) -> Result<Vec<OutputDataInfo>> {
        // Narrow the scan by the leading dimensions that are pinned.
        let role = filter.role().map(|r| r.as_str());
        let mut segments = vec![LINEAGE, filter.job_id()];
        for dimension in [filter.component_name(), role, filter.party_id()] {
            match dimension {
                Some(value) => segments.push(value),
                None => break,
            }
        }

        let rows = self.kv.scan_prefix(&key::prefix(&segments)).await?;
        let histories: Vec<Vec<OutputDataInfo>> = kv::decode_all(rows)?;
        let mut records: Vec<OutputDataInfo> = histories
            .into_iter()
            .flatten()
            .filter(|r| filter.matches(r.address()))
            .collect();
        // Stable: equal timestamps keep key order, then history order.
        records.sort_by_key(OutputDataInfo::created_at);
        Ok(records)
    }

    /// Complete history of `data_name` for the job/component/role/party of
    /// `address`, oldest first.
    ///
    /// More than one record means the output was re-pointed, typically by a
    /// retried task.
    ///
    /// # Errors
    ///
    /// Storage or decoding errors from the backend.
    pub async fn read_history(
        &self,
        address: &TaskAddress,
        data_name: &str,
    ) -> Result<Vec<OutputDataInfo>> {
        match self.kv.get(&history_key(address, data_name)).await? {
            Some(bytes) => kv::decode(&bytes),
            None => Ok(Vec::new()),
        }
    }

    /// Versions of `task` that recorded any output.
    ///
    /// # Errors
    ///
    /// Storage or decoding errors from the backend.
    pub async fn task_versions(&self, task: &LogicalTask) -> Result<Vec<u64>> {
        let first = task.at_version(0);
        let filter = AddressFilter::resolve(
            first.job_id(),
            Some(first.component_name()),
            Some(first.role().as_str()),
            Some(first.party_id()),
        )?;
        Ok(self
            .query_outputs(&filter)
            .await?
            .iter()
            .filter(|r| task.contains(r.address()))
            .map(|r| r.address().task_version())
            .collect())
    }
}
