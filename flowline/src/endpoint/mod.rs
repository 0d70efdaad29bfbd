//! Logical service endpoints for the distributed pipeline.
//!
//! An endpoint is an injected capability: the pipeline knows how to route
//! values to it in order, but stays agnostic to whatever transport (if any)
//! sits behind `invoke`. Payloads are `serde_json::Value`, the logical wire
//! format of a routing abstraction.

use crate::context::RunContext;
use crate::stage::Stage;

/// A named, invokable logical target used in place of an in-process stage.
#[cfg_attr(test, mockall::automock)]
pub trait Endpoint: Send + Sync {
    /// Returns the endpoint address (a URL, service name, or other locator).
    fn address(&self) -> &str;

    /// Invokes the endpoint with the given payload and run context.
    fn invoke(
        &self,
        input: serde_json::Value,
        ctx: &RunContext,
    ) -> anyhow::Result<serde_json::Value>;
}

impl std::fmt::Debug for dyn Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("address", &self.address())
            .finish()
    }
}

/// A closure-backed endpoint.
pub struct FnEndpoint<F>
where
    F: Fn(serde_json::Value, &RunContext) -> anyhow::Result<serde_json::Value> + Send + Sync,
{
    address: String,
    func: F,
}

impl<F> FnEndpoint<F>
where
    F: Fn(serde_json::Value, &RunContext) -> anyhow::Result<serde_json::Value> + Send + Sync,
{
    /// Creates an endpoint at the given address from a closure.
    pub fn new(address: impl Into<String>, func: F) -> Self {
        Self {
            address: address.into(),
            func,
        }
    }
}

impl<F> std::fmt::Debug for FnEndpoint<F>
where
    F: Fn(serde_json::Value, &RunContext) -> anyhow::Result<serde_json::Value> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnEndpoint")
            .field("address", &self.address)
            .finish()
    }
}

impl<F> Endpoint for FnEndpoint<F>
where
    F: Fn(serde_json::Value, &RunContext) -> anyhow::Result<serde_json::Value> + Send + Sync,
{
    fn address(&self) -> &str {
        &self.address
    }

    fn invoke(
        &self,
        input: serde_json::Value,
        ctx: &RunContext,
    ) -> anyhow::Result<serde_json::Value> {
        (self.func)(input, ctx)
    }
}

/// Exposes an in-process [`Stage`] over JSON values as an endpoint.
///
/// Useful for co-locating a workload with the router while keeping the
/// distributed execution contract.
#[derive(Debug)]
pub struct StageEndpoint<S> {
    address: String,
    stage: S,
}

impl<S> StageEndpoint<S>
where
    S: Stage<Input = serde_json::Value, Output = serde_json::Value>,
{
    /// Wraps a stage as an endpoint at the given address.
    pub fn new(address: impl Into<String>, stage: S) -> Self {
        Self {
            address: address.into(),
            stage,
        }
    }
}

impl<S> Endpoint for StageEndpoint<S>
where
    S: Stage<Input = serde_json::Value, Output = serde_json::Value>,
{
    fn address(&self) -> &str {
        &self.address
    }

    fn invoke(
        &self,
        input: serde_json::Value,
        ctx: &RunContext,
    ) -> anyhow::Result<serde_json::Value> {
        self.stage.process(input, ctx)
    }
}
