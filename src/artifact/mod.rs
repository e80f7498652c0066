//! Artifact Registry - outputs of a task other than metrics and lineage
//!
//! ## Schema Overview
//!
//! ```text
//! TaskAddress ──┬── TableMeta     [shallow merge]
//!               ├── SummaryRecord [whole-document replace]
//!               └──< ModelRecord  per (model_id, model_version, alias) [create/replace]
//! ```

mod records;
mod registry;

pub use records::{ModelRecord, SummaryRecord, TableMeta};
pub use registry::ArtifactRegistry;
