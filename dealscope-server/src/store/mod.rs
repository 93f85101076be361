//! Store Module
//!
//! Process-wide in-memory state shared by the services.
//! Each store guards its map with a single lock that is never held across an
//! `.await`, and exposes only get/set/clear style operations.

pub mod field_options;
pub mod job_tracker;
pub mod result_cache;

pub use field_options::{FieldOptionCache, OptionLabels};
pub use job_tracker::JobTracker;
pub use result_cache::ResultCache;
