//! Run-scoped context shared by all stages of one pipeline invocation.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// A failure captured in the context's error slot.
///
/// The slot is advisory: the primary error channel is the `PipelineError`
/// returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    /// The stage where the failure originated, when known.
    pub stage: Option<String>,
    /// Human-readable description of the failure.
    pub message: String,
}

impl RunFailure {
    /// Creates a failure record attributed to a stage.
    #[must_use]
    pub fn in_stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage: Some(stage.into()),
            message: message.into(),
        }
    }
}

/// Per-execution metadata shared by all stages of one pipeline run.
///
/// A `RunContext` is created at the start of `execute`/`execute_async` and
/// dropped when the call returns. It is exclusively owned by that run: it
/// must never be shared across concurrent invocations of the same pipeline.
#[derive(Debug)]
pub struct RunContext {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    start: Instant,
    attributes: RwLock<HashMap<String, serde_json::Value>>,
    failure: RwLock<Option<RunFailure>>,
    attempt: AtomicU32,
}

impl RunContext {
    /// Creates a new context with a generated run identifier.
    #[must_use]
    pub fn new() -> Self {
        Self::with_run_id(Uuid::new_v4())
    }

    /// Creates a new context with the supplied run identifier.
    #[must_use]
    pub fn with_run_id(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            start: Instant::now(),
            attributes: RwLock::new(HashMap::new()),
            failure: RwLock::new(None),
            attempt: AtomicU32::new(1),
        }
    }

    /// Returns the unique identifier of this run.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the wall-clock time at which the run started.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns the elapsed duration since the run started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Sets an attribute, overwriting any previous value for the key.
    ///
    /// Attributes carry cross-cutting metadata (pipeline name, execution
    /// mode, stage-specific flags) between stages without widening the
    /// stage's typed signature.
    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.attributes.write().insert(key.into(), value.into());
    }

    /// Gets an attribute value, if present.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<serde_json::Value> {
        self.attributes.read().get(key).cloned()
    }

    /// Gets an attribute deserialized into a concrete type.
    ///
    /// Returns `None` when the key is absent or the value does not
    /// deserialize into `T`.
    #[must_use]
    pub fn attribute_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attribute(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Removes an attribute, returning its previous value.
    pub fn remove_attribute(&self, key: &str) -> Option<serde_json::Value> {
        self.attributes.write().remove(key)
    }

    /// Returns a snapshot of all attributes.
    #[must_use]
    pub fn attributes(&self) -> HashMap<String, serde_json::Value> {
        self.attributes.read().clone()
    }

    /// Records a failure for this run.
    ///
    /// The slot holds at most one failure: the first recorded failure wins,
    /// matching the short-circuit contract where only one stage can fail
    /// per run.
    pub fn record_failure(&self, failure: RunFailure) {
        let mut slot = self.failure.write();
        if slot.is_none() {
            *slot = Some(failure);
        }
    }

    /// Returns the captured failure, if any.
    #[must_use]
    pub fn failure(&self) -> Option<RunFailure> {
        self.failure.read().clone()
    }

    /// Returns true if a failure has been recorded.
    #[must_use]
    pub fn has_failure(&self) -> bool {
        self.failure.read().is_some()
    }

    /// Returns the current attempt number, starting at 1.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt.load(Ordering::SeqCst)
    }

    /// Increments the attempt counter.
    ///
    /// The engine never retries on its own; callers that re-run a pipeline
    /// with the same context call this before each retry.
    pub fn increment_attempt(&self) -> u32 {
        self.attempt.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
