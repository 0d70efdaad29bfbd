//! Asynchronous pipeline: stages composed into a chain of continuations.
//!
//! Each stage's work is dispatched onto a caller-supplied Tokio runtime
//! handle; the chain suspends only at stage-to-stage composition points.
//! Stage *k+1* is never scheduled before stage *k*'s task has resolved
//! successfully, and failures travel through the chain as tagged
//! [`PipelineError`] values so causality survives every await boundary.

use crate::context::{RunContext, RunFailure};
use crate::errors::PipelineError;
use crate::stage::AsyncStage;
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use tokio::runtime::Handle;

type AsyncLink<I, O> =
    Arc<dyn Fn(I, Arc<RunContext>) -> BoxFuture<'static, Result<O, PipelineError>> + Send + Sync>;

/// Builder for an [`AsyncPipeline`], statically checking adjacent stage
/// types the same way [`PipelineBuilder`](super::PipelineBuilder) does.
///
/// The Tokio [`Handle`] is supplied at construction: the pipeline never
/// owns or hides an executor, and shutdown stays with the caller.
pub struct AsyncPipelineBuilder<I, Cur> {
    name: String,
    handle: Handle,
    stage_names: Vec<String>,
    chain: AsyncLink<I, Cur>,
}

impl<I: Send + 'static> AsyncPipelineBuilder<I, I> {
    /// Creates a builder for a named asynchronous pipeline executing on the
    /// given runtime handle.
    #[must_use]
    pub fn new(name: impl Into<String>, handle: Handle) -> Self {
        let name = name.into();
        tracing::debug!(pipeline = %name, "async pipeline builder created");
        Self {
            name,
            handle,
            stage_names: Vec::new(),
            chain: Arc::new(|input, _ctx| futures::future::ready(Ok(input)).boxed()),
        }
    }
}

impl<I: Send + 'static, Cur: Send + 'static> AsyncPipelineBuilder<I, Cur> {
    /// Appends a stage, consuming the builder and returning one whose
    /// current type is the stage's output type.
    #[must_use]
    pub fn add_stage<S>(mut self, stage: S) -> AsyncPipelineBuilder<I, S::Output>
    where
        S: AsyncStage<Input = Cur> + 'static,
    {
        let stage_name = stage.name().to_string();
        let position = self.stage_names.len() + 1;
        tracing::debug!(
            stage = %stage_name,
            pipeline = %self.name,
            "stage added to async pipeline"
        );
        self.stage_names.push(stage_name.clone());

        let stage = Arc::new(stage);
        let handle = self.handle.clone();
        let prev = Arc::clone(&self.chain);

        let chain: AsyncLink<I, S::Output> = Arc::new(move |input, ctx| {
            let prev = Arc::clone(&prev);
            let stage = Arc::clone(&stage);
            let handle = handle.clone();
            let stage_name = stage_name.clone();

            async move {
                let value = prev(input, Arc::clone(&ctx)).await?;
                tracing::debug!(stage = %stage_name, position, "executing async stage");

                // Dispatch the stage's own work to an independent worker;
                // the chain only suspends here, at the composition point.
                let task_ctx = Arc::clone(&ctx);
                let task_stage = Arc::clone(&stage);
                let task = handle.spawn(async move { task_stage.process(value, task_ctx).await });

                match task.await {
                    Ok(Ok(output)) => {
                        tracing::debug!(stage = %stage_name, "async stage completed");
                        Ok(output)
                    }
                    Ok(Err(cause)) => {
                        tracing::error!(stage = %stage_name, error = %cause, "async stage failed");
                        ctx.record_failure(RunFailure::in_stage(&stage_name, cause.to_string()));
                        Err(PipelineError::stage(stage_name.clone(), cause))
                    }
                    Err(join_error) if join_error.is_panic() => {
                        // A panic escapes the stage's own future; fold it
                        // back into the same stage-attributed shape so
                        // downstream consumers cannot tell the difference.
                        let message = panic_message(join_error.into_panic());
                        tracing::error!(stage = %stage_name, %message, "async stage panicked");
                        ctx.record_failure(RunFailure::in_stage(&stage_name, message.clone()));
                        Err(PipelineError::stage(
                            stage_name.clone(),
                            anyhow::anyhow!("stage panicked: {message}"),
                        ))
                    }
                    Err(_) => Err(PipelineError::Interrupted),
                }
            }
            .boxed()
        });

        AsyncPipelineBuilder {
            name: self.name,
            handle: self.handle,
            stage_names: self.stage_names,
            chain,
        }
    }

    /// Finalizes the builder into an immutable asynchronous pipeline.
    #[must_use]
    pub fn build(self) -> AsyncPipeline<I, Cur> {
        AsyncPipeline {
            name: self.name,
            handle: self.handle,
            stage_names: self.stage_names,
            chain: self.chain,
        }
    }
}

/// An ordered sequence of asynchronous stages composed into a single
/// deferred result.
///
/// The pipeline never blocks internally between stages; only the optional
/// [`execute`](Self::execute) convenience blocks, and only the caller's
/// thread.
pub struct AsyncPipeline<I, O> {
    name: String,
    handle: Handle,
    stage_names: Vec<String>,
    chain: AsyncLink<I, O>,
}

impl<I: Send + 'static, O: Send + 'static> AsyncPipeline<I, O> {
    /// Starts a run and returns the deferred result.
    ///
    /// Dropping the returned future only stops the caller from waiting;
    /// stage work already dispatched runs to completion.
    pub fn execute_async(&self, input: I) -> BoxFuture<'static, Result<O, PipelineError>> {
        let ctx = Arc::new(RunContext::new());
        ctx.set_attribute("pipeline.name", self.name.as_str());
        ctx.set_attribute("pipeline.mode", "async");
        tracing::info!(
            pipeline = %self.name,
            run_id = %ctx.run_id(),
            stages = self.stage_names.len(),
            "starting async pipeline run"
        );

        let chain = Arc::clone(&self.chain);
        let name = self.name.clone();

        async move {
            let result = chain(input, Arc::clone(&ctx)).await;
            let elapsed_ms = ctx.elapsed().as_secs_f64() * 1000.0;
            match &result {
                Ok(_) => {
                    tracing::info!(pipeline = %name, elapsed_ms, "async pipeline run completed");
                }
                Err(error) => {
                    tracing::error!(pipeline = %name, elapsed_ms, %error, "async pipeline run failed");
                }
            }
            result
        }
        .boxed()
    }

    /// Runs the pipeline and blocks the calling thread until the deferred
    /// result resolves.
    ///
    /// Must not be called from inside the async runtime; it is a
    /// convenience for synchronous callers only. A run abandoned by the
    /// scheduler surfaces as [`PipelineError::Interrupted`].
    pub fn execute(&self, input: I) -> Result<O, PipelineError> {
        let task = self.handle.spawn(self.execute_async(input));
        match self.handle.block_on(task) {
            Ok(result) => result,
            Err(join_error) if join_error.is_panic() => Err(PipelineError::Unexpected {
                source: anyhow::anyhow!(
                    "pipeline task panicked: {}",
                    panic_message(join_error.into_panic())
                ),
            }),
            Err(_) => Err(PipelineError::Interrupted),
        }
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> &[String] {
        &self.stage_names
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stage_names.len()
    }
}

impl<I, O> std::fmt::Debug for AsyncPipeline<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncPipeline")
            .field("name", &self.name)
            .field("stages", &self.stage_names)
            .finish()
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
