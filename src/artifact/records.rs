//! Artifact Records - table metadata, model references and summaries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::TaskAddress;
use crate::document::Document;

/// Metadata describing the tables a task produced.
///
/// One document per task address, grown by shallow merges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMeta {
    address: TaskAddress,
    document: Document,
    updated_at: DateTime<Utc>,
}

impl TableMeta {
    /// Create a table-meta record stamped with the current time.
    #[must_use]
    pub fn new(address: TaskAddress, document: Document) -> Self {
        Self {
            address,
            document,
            updated_at: Utc::now(),
        }
    }

    /// Get the producing task address.
    #[must_use]
    pub const fn address(&self) -> &TaskAddress {
        &self.address
    }

    /// Get the merged document.
    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.document
    }

    /// Consume the record, returning the document.
    #[must_use]
    pub fn into_document(self) -> Document {
        self.document
    }

    /// Get the time of the last effective merge.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Reference to a produced model artifact.
///
/// The model bytes live in an external object store; `blob_ref` is where the
/// producing task put them (e.g. `s3://models/J1/lr/model.pb`).
///
/// ## Identity
///
/// `(model_id, model_version, alias)` within the producing job, component,
/// role and party. One job-wide model spans many components and parties;
/// `alias` tells artifacts of one component apart (`"model"`,
/// `"isometric_model"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecord {
    address: TaskAddress,
    model_id: String,
    model_version: String,
    alias: String,
    blob_ref: String,
    created_at: DateTime<Utc>,
}

impl ModelRecord {
    /// Create a model record stamped with the current time.
    #[must_use]
    pub fn new(
        address: TaskAddress,
        model_id: impl Into<String>,
        model_version: impl Into<String>,
        alias: impl Into<String>,
        blob_ref: impl Into<String>,
    ) -> Self {
        Self {
            address,
            model_id: model_id.into(),
            model_version: model_version.into(),
            alias: alias.into(),
            blob_ref: blob_ref.into(),
            created_at: Utc::now(),
        }
    }

    /// Get the producing task address.
    #[must_use]
    pub const fn address(&self) -> &TaskAddress {
        &self.address
    }

    /// Get the model ID.
    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Get the model version.
    #[must_use]
    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    /// Get the component model alias.
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Get the object-store reference.
    #[must_use]
    pub fn blob_ref(&self) -> &str {
        &self.blob_ref
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Free-form summary of one task execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    address: TaskAddress,
    summary: Document,
    updated_at: DateTime<Utc>,
}

impl SummaryRecord {
    /// Create a summary record stamped with the current time.
    #[must_use]
    pub fn new(address: TaskAddress, summary: Document) -> Self {
        Self {
            address,
            summary,
            updated_at: Utc::now(),
        }
    }

    /// Get the task address.
    #[must_use]
    pub const fn address(&self) -> &TaskAddress {
        &self.address
    }

    /// Get the summary document.
    #[must_use]
    pub const fn summary(&self) -> &Document {
        &self.summary
    }

    /// Get the time of the last effective write.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
