//! HTTP middleware.

pub mod panic_recovery;
pub mod request_metadata;
pub mod tracing;
