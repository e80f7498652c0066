//! # Trueno-Tracking: Multi-Party Task Execution Tracking Store
//!
//! **Version**: 0.1.0
//!
//! Trueno-Tracking records what each task of a multi-party job produced:
//! metric series and their metadata, table metadata, model artifact
//! references, summaries, and the lineage of named output tables. Every
//! party (guest, host, arbiter) writes its own task-scoped records
//! concurrently; schedulers, UIs and downstream components read them back.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Poka-Yoke**: Addresses and payloads are validated before any mutation
//! - **Jidoka**: Every write is idempotent or append-only, so retries are safe
//! - **Heijunka**: Per-key atomicity only; writers to different keys never wait
//!
//! ## Addressing
//!
//! ```text
//! job_id / component_name / task_id / task_version / role / party_id
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use serde_json::json;
//! use trueno_tracking::tracker::{ReadMetricsRequest, SaveMetricDataRequest, TaskPath};
//! use trueno_tracking::TrackingDb;
//!
//! # async fn example() -> trueno_tracking::Result<()> {
//! let db = TrackingDb::builder().max_points_per_series(10_000).build()?;
//! let tracker = db.tracker();
//! let path = TaskPath::new("J1", "intersect", "T1", "0", "guest", "9999");
//!
//! tracker
//!     .save_metric_data(
//!         &path,
//!         SaveMetricDataRequest {
//!             metric_namespace: "train".into(),
//!             metric_name: "loss".into(),
//!             metrics: vec![json!([0, 0.8]), json!([1, 0.6])],
//!             job_level: false,
//!         },
//!     )
//!     .await;
//!
//! let read = tracker.read_metrics(&path, ReadMetricsRequest::default()).await;
//! assert_eq!(read.data.unwrap()[0].points.len(), 2);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod address;
pub mod artifact;
pub mod config;
pub mod document;
pub mod error;
pub mod kv;
pub mod lineage;
pub mod logging;
pub mod metric;
pub mod tracker;

use std::sync::Arc;

pub use config::TrackingConfig;
pub use error::{Error, Result};

use kv::{KvStore, MemoryKvStore};
use tracker::Tracker;

/// Tracking database instance: a long-lived store handle plus configuration.
///
/// Hand out [`Tracker`] facades with [`TrackingDb::tracker`]; they are cheap
/// clones sharing this handle.
#[derive(Debug)]
pub struct TrackingDb<S = MemoryKvStore> {
    store: Arc<S>,
    config: TrackingConfig,
}

impl TrackingDb<MemoryKvStore> {
    /// Create a new database builder (in-memory backend)
    #[must_use]
    pub fn builder() -> TrackingDbBuilder {
        TrackingDbBuilder::default()
    }
}

impl<S: KvStore> TrackingDb<S> {
    /// Wrap an externally provided storage backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` fails validation
    pub fn with_store(store: Arc<S>, config: TrackingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// Create a tracking facade over this database
    #[must_use]
    pub fn tracker(&self) -> Tracker<S> {
        Tracker::new(Arc::clone(&self.store), &self.config)
    }

    /// Get the active configuration
    #[must_use]
    pub const fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Get the shared storage handle
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }
}

/// Database builder
#[derive(Debug, Default)]
pub struct TrackingDbBuilder {
    config: TrackingConfig,
}

impl TrackingDbBuilder {
    /// Start from a full configuration
    #[must_use]
    pub fn config(mut self, config: TrackingConfig) -> Self {
        self.config = config;
        self
    }

    /// Set pre-allocated key capacity of the in-memory backend
    #[must_use]
    pub const fn initial_capacity(mut self, capacity: usize) -> Self {
        self.config.initial_capacity = capacity;
        self
    }

    /// Set the maximum number of points per metric series
    #[must_use]
    pub const fn max_points_per_series(mut self, max: usize) -> Self {
        self.config.max_points_per_series = max;
        self
    }

    /// Set the maximum encoded size of a tracking document
    #[must_use]
    pub const fn max_document_bytes(mut self, max: usize) -> Self {
        self.config.max_document_bytes = max;
        self
    }

    /// Build the database
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration fails validation
    pub fn build(self) -> Result<TrackingDb> {
        self.config.validate()?;
        tracing::info!(
            initial_capacity = self.config.initial_capacity,
            max_points_per_series = self.config.max_points_per_series,
            max_document_bytes = self.config.max_document_bytes,
            "tracking database ready"
        );
        Ok(TrackingDb {
            store: Arc::new(MemoryKvStore::with_capacity(self.config.initial_capacity)),
            config: self.config,
        })
    }
}
