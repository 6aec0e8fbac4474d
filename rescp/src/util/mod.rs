//! General utility code that didn't fit anywhere else
//!
//! Note that most of this module is not exported.
// (c) 2026 rescp developers

mod metadata_ext;
pub(crate) use metadata_ext::FsMetadataExt;

pub(crate) mod process;

mod tracing;
pub use tracing::TimeFormat;
pub(crate) use tracing::{is_initialized as tracing_is_initialised, setup as setup_tracing, trace_level};
