//! Distributed pipeline: named stages routed to logical endpoints.
//!
//! A routing and sequencing abstraction only. Retries, timeouts, circuit
//! breaking, and transport all belong to the [`Endpoint`] implementations
//! behind the registry.

use crate::context::{RunContext, RunFailure};
use crate::endpoint::Endpoint;
use crate::errors::PipelineError;
use std::collections::HashMap;
use std::sync::Arc;

/// An ordered registry of stage names bound to logical service endpoints.
///
/// The execution order is an explicit list, kept separately from the
/// name-to-endpoint map: map iteration order is not a reliable proxy for
/// execution order.
#[derive(Debug, Default)]
pub struct DistributedPipeline {
    name: String,
    endpoints: HashMap<String, Arc<dyn Endpoint>>,
    sequence: Vec<String>,
}

impl DistributedPipeline {
    /// Creates a new distributed pipeline with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        tracing::debug!(pipeline = %name, "distributed pipeline created");
        Self {
            name,
            endpoints: HashMap::new(),
            sequence: Vec::new(),
        }
    }

    /// Registers a stage name bound to an endpoint, chainable.
    ///
    /// The first registration of a name fixes its position in the execution
    /// order; re-registering the same name replaces its endpoint without
    /// moving it.
    #[must_use]
    pub fn register_stage(mut self, stage: impl Into<String>, endpoint: Arc<dyn Endpoint>) -> Self {
        let stage = stage.into();
        if !self.sequence.contains(&stage) {
            self.sequence.push(stage.clone());
        }
        tracing::debug!(
            stage = %stage,
            endpoint = %endpoint.address(),
            pipeline = %self.name,
            "stage registered"
        );
        self.endpoints.insert(stage, endpoint);
        self
    }

    /// Reserves a position for a stage name without binding an endpoint.
    ///
    /// Executing the pipeline while the name is still unbound fails fast
    /// with [`PipelineError::MissingEndpoint`] before invoking anything.
    #[must_use]
    pub fn declare_stage(mut self, stage: impl Into<String>) -> Self {
        let stage = stage.into();
        if !self.sequence.contains(&stage) {
            self.sequence.push(stage);
        }
        self
    }

    /// Executes the pipeline, routing the payload through each endpoint in
    /// registration order.
    pub fn execute(&self, input: serde_json::Value) -> Result<serde_json::Value, PipelineError> {
        let ctx = RunContext::new();
        self.execute_with(input, &ctx)
    }

    /// Executes the pipeline within a caller-owned run context.
    pub fn execute_with(
        &self,
        input: serde_json::Value,
        ctx: &RunContext,
    ) -> Result<serde_json::Value, PipelineError> {
        ctx.set_attribute("pipeline.name", self.name.as_str());
        ctx.set_attribute("pipeline.mode", "distributed");
        tracing::info!(
            pipeline = %self.name,
            run_id = %ctx.run_id(),
            stages = self.sequence.len(),
            "starting distributed pipeline run"
        );

        let mut current = input;
        let total = self.sequence.len();
        for (index, stage) in self.sequence.iter().enumerate() {
            let Some(endpoint) = self.endpoints.get(stage) else {
                // Configuration failure: fail fast, invoke nothing.
                tracing::error!(
                    pipeline = %self.name,
                    stage = %stage,
                    "no endpoint bound for stage"
                );
                return Err(PipelineError::missing_endpoint(stage.clone()));
            };

            tracing::debug!(
                stage = %stage,
                endpoint = %endpoint.address(),
                position = index + 1,
                total,
                "invoking endpoint"
            );

            match endpoint.invoke(current, ctx) {
                Ok(output) => {
                    tracing::debug!(stage = %stage, "endpoint completed");
                    current = output;
                }
                Err(cause) => {
                    tracing::error!(stage = %stage, error = %cause, "endpoint failed");
                    ctx.record_failure(RunFailure::in_stage(stage, cause.to_string()));
                    return Err(PipelineError::stage(stage.clone(), cause));
                }
            }
        }

        tracing::info!(
            pipeline = %self.name,
            elapsed_ms = ctx.elapsed().as_secs_f64() * 1000.0,
            "distributed pipeline run completed"
        );
        Ok(current)
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_sequence(&self) -> &[String] {
        &self.sequence
    }

    /// Returns the endpoint bound to a stage name, if any.
    #[must_use]
    pub fn endpoint(&self, stage: &str) -> Option<&Arc<dyn Endpoint>> {
        self.endpoints.get(stage)
    }
}
