//! Output Lineage Registry
//!
//! Maps a logical output name (`data_name`) of a component to the physical
//! table that backs it. Re-pointing an output appends a new record; callers
//! pick the authoritative (usually latest) one from the history.

mod record;
mod registry;

pub use record::{OutputDataInfo, OutputTable};
pub use registry::LineageRegistry;
