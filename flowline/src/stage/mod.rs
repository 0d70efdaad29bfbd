//! Stage contracts and adapters.
//!
//! A stage is a named transformation: one typed input plus the run context
//! in, one typed output out, or a failure. Stages are stateless with respect
//! to the pipeline; any stage-local state (a fixed prefix, a counter handle)
//! is closed over at construction time.

use crate::context::RunContext;
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;

/// A synchronous pipeline stage.
pub trait Stage: Send + Sync {
    /// The input type consumed by this stage.
    type Input;
    /// The output type produced by this stage.
    type Output;

    /// Returns the stage name, used for diagnostics and error attribution.
    fn name(&self) -> &str;

    /// Transforms the input into an output within the shared run context.
    fn process(&self, input: Self::Input, ctx: &RunContext) -> anyhow::Result<Self::Output>;
}

/// An asynchronous pipeline stage.
///
/// `process` takes the context as an [`Arc`] because the stage's work may be
/// dispatched to an independent worker and must outlive the caller's borrow.
#[async_trait]
pub trait AsyncStage: Send + Sync {
    /// The input type consumed by this stage.
    type Input: Send + 'static;
    /// The output type produced by this stage.
    type Output: Send + 'static;

    /// Returns the stage name, used for diagnostics and error attribution.
    fn name(&self) -> &str;

    /// Transforms the input into an output within the shared run context.
    async fn process(
        &self,
        input: Self::Input,
        ctx: Arc<RunContext>,
    ) -> anyhow::Result<Self::Output>;
}

/// A closure-backed synchronous stage.
pub struct FnStage<I, O, F>
where
    F: Fn(I, &RunContext) -> anyhow::Result<O> + Send + Sync,
{
    name: String,
    func: F,
    _marker: PhantomData<fn(I) -> O>,
}

impl<I, O, F> FnStage<I, O, F>
where
    F: Fn(I, &RunContext) -> anyhow::Result<O> + Send + Sync,
{
    /// Creates a named stage from a closure.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
            _marker: PhantomData,
        }
    }
}

impl<I, O, F> std::fmt::Debug for FnStage<I, O, F>
where
    F: Fn(I, &RunContext) -> anyhow::Result<O> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage").field("name", &self.name).finish()
    }
}

impl<I, O, F> Stage for FnStage<I, O, F>
where
    F: Fn(I, &RunContext) -> anyhow::Result<O> + Send + Sync,
{
    type Input = I;
    type Output = O;

    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, input: I, ctx: &RunContext) -> anyhow::Result<O> {
        (self.func)(input, ctx)
    }
}

/// A closure-backed asynchronous stage.
pub struct AsyncFnStage<I, O, F, Fut>
where
    F: Fn(I, Arc<RunContext>) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = anyhow::Result<O>> + Send,
{
    name: String,
    func: F,
    _marker: PhantomData<fn(I) -> (O, Fut)>,
}

impl<I, O, F, Fut> AsyncFnStage<I, O, F, Fut>
where
    F: Fn(I, Arc<RunContext>) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = anyhow::Result<O>> + Send,
{
    /// Creates a named asynchronous stage from a closure.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
            _marker: PhantomData,
        }
    }
}

impl<I, O, F, Fut> std::fmt::Debug for AsyncFnStage<I, O, F, Fut>
where
    F: Fn(I, Arc<RunContext>) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = anyhow::Result<O>> + Send,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncFnStage")
            .field("name", &self.name)
            .finish()
    }
}

#[async_trait]
impl<I, O, F, Fut> AsyncStage for AsyncFnStage<I, O, F, Fut>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I, Arc<RunContext>) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = anyhow::Result<O>> + Send,
{
    type Input = I;
    type Output = O;

    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, input: I, ctx: Arc<RunContext>) -> anyhow::Result<O> {
        (self.func)(input, ctx).await
    }
}

/// Runs a synchronous [`Stage`] inside an asynchronous pipeline.
///
/// The wrapped stage completes without suspension points of its own; it
/// still occupies an independent worker while it runs.
#[derive(Debug, Clone)]
pub struct Blocking<S>(pub S);

#[async_trait]
impl<S> AsyncStage for Blocking<S>
where
    S: Stage,
    S::Input: Send + 'static,
    S::Output: Send + 'static,
{
    type Input = S::Input;
    type Output = S::Output;

    fn name(&self) -> &str {
        self.0.name()
    }

    async fn process(
        &self,
        input: Self::Input,
        ctx: Arc<RunContext>,
    ) -> anyhow::Result<Self::Output> {
        self.0.process(input, &ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fn_stage() {
        let stage = FnStage::new("Double", |n: i64, _ctx: &RunContext| Ok(n * 2));
        let ctx = RunContext::new();

        assert_eq!(stage.name(), "Double");
        assert_eq!(stage.process(21, &ctx).unwrap(), 42);
    }

    #[test]
    fn test_fn_stage_reads_context() {
        let stage = FnStage::new("Tag", |s: String, ctx: &RunContext| {
            let mode = ctx
                .attribute_as::<String>("pipeline.mode")
                .unwrap_or_default();
            Ok(format!("{s}:{mode}"))
        });

        let ctx = RunContext::new();
        ctx.set_attribute("pipeline.mode", "sync");
        assert_eq!(stage.process("in".into(), &ctx).unwrap(), "in:sync");
    }

    #[test]
    fn test_async_fn_stage() {
        let stage = AsyncFnStage::new("Shout", |s: String, _ctx| async move {
            Ok(s.to_uppercase())
        });
        let ctx = Arc::new(RunContext::new());

        assert_eq!(stage.name(), "Shout");
        let out = tokio_test::block_on(stage.process("quiet".into(), ctx)).unwrap();
        assert_eq!(out, "QUIET");
    }

    #[test]
    fn test_blocking_adapter() {
        let stage = Blocking(FnStage::new("Trim", |s: String, _ctx: &RunContext| {
            Ok(s.trim().to_string())
        }));
        let ctx = Arc::new(RunContext::new());

        assert_eq!(stage.name(), "Trim");
        let out = tokio_test::block_on(stage.process("  padded  ".into(), ctx)).unwrap();
        assert_eq!(out, "padded");
    }
}
