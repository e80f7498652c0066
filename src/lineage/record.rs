//! Output Data Info - one historical mapping of a logical output to a table

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::TaskAddress;

/// One lineage record: `data_name` was backed by `table_namespace.table_name`
/// as of `created_at`.
///
/// Records are append-only. A retried task that writes the same `data_name`
/// again adds a second record rather than replacing the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDataInfo {
    address: TaskAddress,
    data_name: String,
    table_name: String,
    table_namespace: String,
    sequence: u64,
    created_at: DateTime<Utc>,
}

impl OutputDataInfo {
    /// Create a record at position `sequence` of its `data_name` history.
    #[must_use]
    pub fn new(
        address: TaskAddress,
        data_name: impl Into<String>,
        table_name: impl Into<String>,
        table_namespace: impl Into<String>,
        sequence: u64,
    ) -> Self {
        Self {
            address,
            data_name: data_name.into(),
            table_name: table_name.into(),
            table_namespace: table_namespace.into(),
            sequence,
            created_at: Utc::now(),
        }
    }

    /// Get the writing task address.
    #[must_use]
    pub const fn address(&self) -> &TaskAddress {
        &self.address
    }

    /// Get the logical output name.
    #[must_use]
    pub fn data_name(&self) -> &str {
        &self.data_name
    }

    /// Get the physical table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Get the physical table namespace.
    #[must_use]
    pub fn table_namespace(&self) -> &str {
        &self.table_namespace
    }

    /// Get the position of this record in its `data_name` history (0 = first).
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The `(table_name, table_namespace)` pair.
    #[must_use]
    pub fn table(&self) -> (&str, &str) {
        (&self.table_name, &self.table_namespace)
    }

    /// Clamp `created_at` so a history's timestamps never go backwards.
    pub(crate) fn not_before(mut self, earliest: DateTime<Utc>) -> Self {
        self.created_at = self.created_at.max(earliest);
        self
    }

    /// Project to the human-facing output-table row.
    #[must_use]
    pub fn to_output_table(&self) -> OutputTable {
        OutputTable {
            data_name: self.data_name.clone(),
            table_name: self.table_name.clone(),
            table_namespace: self.table_namespace.clone(),
        }
    }
}

/// Row returned by the component output-table listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTable {
    /// Logical output name
    pub data_name: String,
    /// Physical table name
    pub table_name: String,
    /// Physical table namespace
    pub table_namespace: String,
}
