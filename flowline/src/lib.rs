//! # Flowline
//!
//! A staged-processing pipeline engine.
//!
//! Flowline chains typed transformation stages into a single executable unit
//! and runs it in one of three modes:
//!
//! - **Synchronous**: stages run one after another on the calling thread,
//!   short-circuiting on the first failure
//! - **Asynchronous**: stages are composed into a chain of continuations over
//!   a caller-supplied Tokio runtime handle; the caller blocks only when it
//!   chooses to await the deferred result
//! - **Distributed**: an ordered registry of stage names routed to logical
//!   service endpoints, with the same error and short-circuit semantics
//!
//! All three modes share a per-run [`RunContext`](context::RunContext) and a
//! stage-attributed error taxonomy ([`PipelineError`](errors::PipelineError)).
//!
//! ## Quick Start
//!
//! ```rust
//! use flowline::prelude::*;
//!
//! let pipeline = PipelineBuilder::new("greeting")
//!     .add_stage(FnStage::new("Uppercase", |s: String, _ctx: &RunContext| {
//!         Ok(s.to_uppercase())
//!     }))
//!     .add_stage(FnStage::new("Exclaim", |s: String, _ctx: &RunContext| {
//!         Ok(format!("{s}!"))
//!     }))
//!     .build();
//!
//! let output = pipeline.execute("hello".to_string()).unwrap();
//! assert_eq!(output, "HELLO!");
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod context;
pub mod endpoint;
pub mod errors;
pub mod observability;
pub mod pipeline;
pub mod stage;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::context::{RunContext, RunFailure};
    pub use crate::endpoint::{Endpoint, FnEndpoint, StageEndpoint};
    pub use crate::errors::PipelineError;
    pub use crate::pipeline::{
        AsyncPipeline, AsyncPipelineBuilder, DistributedPipeline, Pipeline,
        PipelineBuilder,
    };
    pub use crate::stage::{AsyncFnStage, AsyncStage, Blocking, FnStage, Stage};
}
