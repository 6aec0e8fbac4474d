//! Single-file transfer: sources, descriptors, the gzip transform and the attempt executor
// (c) 2026 rescp developers

pub mod compress;
mod descriptor;
mod executor;
mod source;

pub use descriptor::Descriptor;
pub use executor::Executor;
pub use source::{BytesSource, DEFAULT_MODE, FileSource, Opened, Reader, Source};
