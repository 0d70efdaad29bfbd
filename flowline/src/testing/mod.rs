//! Reusable fixture stages and endpoints.
//!
//! These back the crate's own tests and are exported for callers who want
//! ready-made building blocks when testing their own pipelines.

use crate::context::RunContext;
use crate::endpoint::Endpoint;
use crate::stage::{AsyncStage, Stage};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Uppercases its string input.
#[derive(Debug, Clone, Default)]
pub struct UppercaseStage;

impl Stage for UppercaseStage {
    type Input = String;
    type Output = String;

    fn name(&self) -> &str {
        "UppercaseStage"
    }

    fn process(&self, input: String, _ctx: &RunContext) -> anyhow::Result<String> {
        Ok(input.to_uppercase())
    }
}

/// Appends a fixed suffix to its string input.
#[derive(Debug, Clone)]
pub struct AppendStage {
    suffix: String,
}

impl AppendStage {
    /// Creates a stage appending the given suffix.
    #[must_use]
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }
}

impl Stage for AppendStage {
    type Input = String;
    type Output = String;

    fn name(&self) -> &str {
        "AppendStage"
    }

    fn process(&self, input: String, _ctx: &RunContext) -> anyhow::Result<String> {
        Ok(format!("{input}{}", self.suffix))
    }
}

/// Always fails with a configurable name and message.
#[derive(Debug, Clone)]
pub struct FailStage {
    name: String,
    message: String,
}

impl FailStage {
    /// Creates a failing stage with the given name and error message.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl Stage for FailStage {
    type Input = String;
    type Output = String;

    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, _input: String, _ctx: &RunContext) -> anyhow::Result<String> {
        Err(anyhow::anyhow!(self.message.clone()))
    }
}

/// Passes its input through and counts how many times it ran.
///
/// The counter is shared, making side effects observable after the run:
/// short-circuit tests assert it stayed at zero.
#[derive(Debug, Clone)]
pub struct CountingStage {
    name: String,
    counter: Arc<AtomicUsize>,
}

impl CountingStage {
    /// Creates a counting stage sharing the given counter.
    #[must_use]
    pub fn new(name: impl Into<String>, counter: Arc<AtomicUsize>) -> Self {
        Self {
            name: name.into(),
            counter,
        }
    }

    /// Returns the number of completed invocations.
    #[must_use]
    pub fn count(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }
}

impl Stage for CountingStage {
    type Input = String;
    type Output = String;

    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, input: String, _ctx: &RunContext) -> anyhow::Result<String> {
        self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(input)
    }
}

/// An asynchronous stage that sleeps before passing its input through.
#[derive(Debug, Clone)]
pub struct SleepStage {
    name: String,
    millis: u64,
}

impl SleepStage {
    /// Creates a stage sleeping for the given number of milliseconds.
    #[must_use]
    pub fn new(name: impl Into<String>, millis: u64) -> Self {
        Self {
            name: name.into(),
            millis,
        }
    }
}

#[async_trait]
impl AsyncStage for SleepStage {
    type Input = String;
    type Output = String;

    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, input: String, _ctx: Arc<RunContext>) -> anyhow::Result<String> {
        tokio::time::sleep(std::time::Duration::from_millis(self.millis)).await;
        Ok(input)
    }
}

/// An asynchronous stage that panics instead of failing cleanly.
///
/// Exercises the path where a failure escapes the stage's own future.
#[derive(Debug, Clone)]
pub struct PanicStage {
    name: String,
    message: String,
}

impl PanicStage {
    /// Creates a panicking stage with the given name and panic message.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl AsyncStage for PanicStage {
    type Input = String;
    type Output = String;

    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, _input: String, _ctx: Arc<RunContext>) -> anyhow::Result<String> {
        panic!("{}", self.message)
    }
}

/// An endpoint that uppercases string payloads.
#[derive(Debug, Clone, Default)]
pub struct UppercaseEndpoint;

impl Endpoint for UppercaseEndpoint {
    fn address(&self) -> &str {
        "svc://uppercase"
    }

    fn invoke(
        &self,
        input: serde_json::Value,
        _ctx: &RunContext,
    ) -> anyhow::Result<serde_json::Value> {
        let text = input
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("expected a string payload"))?;
        Ok(serde_json::Value::String(text.to_uppercase()))
    }
}

/// An endpoint that passes payloads through and counts invocations.
#[derive(Debug, Clone)]
pub struct CountingEndpoint {
    address: String,
    counter: Arc<AtomicUsize>,
}

impl CountingEndpoint {
    /// Creates a counting endpoint sharing the given counter.
    #[must_use]
    pub fn new(address: impl Into<String>, counter: Arc<AtomicUsize>) -> Self {
        Self {
            address: address.into(),
            counter,
        }
    }

    /// Returns the number of invocations.
    #[must_use]
    pub fn count(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }
}

impl Endpoint for CountingEndpoint {
    fn address(&self) -> &str {
        &self.address
    }

    fn invoke(
        &self,
        input: serde_json::Value,
        _ctx: &RunContext,
    ) -> anyhow::Result<serde_json::Value> {
        self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(input)
    }
}

/// An endpoint that always fails.
#[derive(Debug, Clone)]
pub struct FailingEndpoint {
    address: String,
    message: String,
}

impl FailingEndpoint {
    /// Creates a failing endpoint with the given address and error message.
    #[must_use]
    pub fn new(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            message: message.into(),
        }
    }
}

impl Endpoint for FailingEndpoint {
    fn address(&self) -> &str {
        &self.address
    }

    fn invoke(
        &self,
        _input: serde_json::Value,
        _ctx: &RunContext,
    ) -> anyhow::Result<serde_json::Value> {
        Err(anyhow::anyhow!(self.message.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_uppercase_stage() {
        let ctx = RunContext::new();
        let out = UppercaseStage.process("abc".into(), &ctx).unwrap();
        assert_eq!(out, "ABC");
    }

    #[test]
    fn test_fail_stage_message() {
        let ctx = RunContext::new();
        let err = FailStage::new("ErrorStage", "Intentional error")
            .process("in".into(), &ctx)
            .unwrap_err();
        assert_eq!(err.to_string(), "Intentional error");
    }

    #[test]
    fn test_counting_stage_observes_side_effects() {
        let counter = Arc::new(AtomicUsize::new(0));
        let stage = CountingStage::new("Count", Arc::clone(&counter));
        let ctx = RunContext::new();

        stage.process("x".into(), &ctx).unwrap();
        stage.process("y".into(), &ctx).unwrap();
        assert_eq!(stage.count(), 2);
    }

    #[test]
    fn test_uppercase_endpoint_rejects_non_string() {
        let ctx = RunContext::new();
        let err = UppercaseEndpoint
            .invoke(serde_json::json!(5), &ctx)
            .unwrap_err();
        assert!(err.to_string().contains("expected a string payload"));
    }
}
