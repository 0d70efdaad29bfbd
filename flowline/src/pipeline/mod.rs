//! Pipeline assembly and execution.
//!
//! This module provides:
//! - The synchronous pipeline and its type-state builder
//! - The asynchronous pipeline composed over a caller-owned Tokio handle
//! - The distributed pipeline routing named stages to logical endpoints

mod distributed;
mod future;
#[cfg(test)]
mod integration_tests;
mod sync;

pub use distributed::DistributedPipeline;
pub use future::{AsyncPipeline, AsyncPipelineBuilder};
pub use sync::{Pipeline, PipelineBuilder};
