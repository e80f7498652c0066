//! Metric Store - namespaced metric series and their metadata
//!
//! ## Schema Overview
//!
//! ```text
//! MetricScope (job | task) ──< (namespace, name) ──┬── MetricSeries [whole-series replace]
//!                                                  └── MetricMeta   [upsert, independent]
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use trueno_tracking::address::{MetricScope, TaskAddress};
//! use trueno_tracking::kv::MemoryKvStore;
//! use trueno_tracking::metric::{MetricPoint, MetricStore};
//! use trueno_tracking::TrackingConfig;
//!
//! # async fn example() -> trueno_tracking::Result<()> {
//! let store = MetricStore::new(Arc::new(MemoryKvStore::new()), &TrackingConfig::default());
//! let address = TaskAddress::resolve("J1", "intersect", "T1", "0", "guest", "9999")?;
//! let scope = MetricScope::from_address(&address, false);
//!
//! store
//!     .save_metric_data(&scope, "train", "loss", vec![MetricPoint::new(0, 0.8)])
//!     .await?;
//! let entries = store.read_metrics(&scope, Some("train"), Some("loss")).await?;
//! assert_eq!(entries[0].points.len(), 1);
//! # Ok(())
//! # }
//! ```

mod record;
mod store;

pub use record::{MetricEntry, MetricKey, MetricMeta, MetricPoint, MetricSeries};
pub use store::MetricStore;
