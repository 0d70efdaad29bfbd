//! Synchronous pipeline: ordered stages on the calling thread.

use crate::context::{RunContext, RunFailure};
use crate::errors::PipelineError;
use crate::stage::Stage;

type Link<I, O> = Box<dyn Fn(I, &RunContext) -> Result<O, PipelineError> + Send + Sync>;

/// Builder that assembles a [`Pipeline`] while statically checking that
/// adjacent stage types line up.
///
/// `I` is the pipeline's declared input type and `Cur` the output type of the
/// most recently added stage. [`add_stage`](Self::add_stage) only accepts a
/// stage whose input type equals `Cur`, so a mismatched chain is rejected at
/// compile time rather than surfacing as a cast failure mid-run.
pub struct PipelineBuilder<I, Cur> {
    name: String,
    stage_names: Vec<String>,
    chain: Link<I, Cur>,
}

impl<I: 'static> PipelineBuilder<I, I> {
    /// Creates a builder for a named pipeline taking input of type `I`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        tracing::debug!(pipeline = %name, "pipeline builder created");
        Self {
            name,
            stage_names: Vec::new(),
            chain: Box::new(|input, _ctx| Ok(input)),
        }
    }
}

impl<I: 'static, Cur: 'static> PipelineBuilder<I, Cur> {
    /// Appends a stage, consuming the builder and returning one whose
    /// current type is the stage's output type.
    #[must_use]
    pub fn add_stage<S>(mut self, stage: S) -> PipelineBuilder<I, S::Output>
    where
        S: Stage<Input = Cur> + 'static,
        S::Output: 'static,
    {
        let stage_name = stage.name().to_string();
        let position = self.stage_names.len() + 1;
        tracing::debug!(
            stage = %stage_name,
            pipeline = %self.name,
            "stage added to pipeline"
        );
        self.stage_names.push(stage_name.clone());

        let prev = self.chain;
        let chain: Link<I, S::Output> = Box::new(move |input, ctx| {
            let value = prev(input, ctx)?;
            tracing::debug!(stage = %stage_name, position, "executing stage");
            match stage.process(value, ctx) {
                Ok(output) => {
                    tracing::debug!(stage = %stage_name, "stage completed");
                    Ok(output)
                }
                Err(cause) => {
                    tracing::error!(stage = %stage_name, error = %cause, "stage failed");
                    ctx.record_failure(RunFailure::in_stage(&stage_name, cause.to_string()));
                    Err(PipelineError::stage(stage_name.clone(), cause))
                }
            }
        });

        PipelineBuilder {
            name: self.name,
            stage_names: self.stage_names,
            chain,
        }
    }

    /// Finalizes the builder into an immutable pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline<I, Cur> {
        Pipeline {
            name: self.name,
            stage_names: self.stage_names,
            chain: self.chain,
        }
    }
}

/// An ordered sequence of stages executed one after another on the calling
/// thread, short-circuiting on the first failure.
///
/// Immutable after construction: the stage list cannot change once built,
/// so a pipeline value is safe to execute from any thread, one run per call.
pub struct Pipeline<I, O> {
    name: String,
    stage_names: Vec<String>,
    chain: Link<I, O>,
}

impl<I: 'static, O: 'static> Pipeline<I, O> {
    /// Executes the pipeline with a fresh run context.
    ///
    /// On success returns the last stage's output. On the first stage
    /// failure, remaining stages are skipped and a stage-attributed
    /// [`PipelineError`] is returned.
    pub fn execute(&self, input: I) -> Result<O, PipelineError> {
        let ctx = RunContext::new();
        self.execute_with(input, &ctx)
    }

    /// Executes the pipeline within a caller-owned run context.
    ///
    /// Lets retrying callers keep one context across attempts (bumping its
    /// attempt counter between runs). The context must not be shared with
    /// any concurrent invocation.
    pub fn execute_with(&self, input: I, ctx: &RunContext) -> Result<O, PipelineError> {
        ctx.set_attribute("pipeline.name", self.name.as_str());
        ctx.set_attribute("pipeline.mode", "sync");
        tracing::info!(
            pipeline = %self.name,
            run_id = %ctx.run_id(),
            stages = self.stage_names.len(),
            attempt = ctx.attempt(),
            "starting pipeline run"
        );

        let result = (self.chain)(input, ctx);
        let elapsed_ms = ctx.elapsed().as_secs_f64() * 1000.0;
        match &result {
            Ok(_) => {
                tracing::info!(pipeline = %self.name, elapsed_ms, "pipeline run completed");
            }
            Err(error) => {
                tracing::error!(pipeline = %self.name, elapsed_ms, %error, "pipeline run failed");
            }
        }
        result
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

    /// Returns true if the pipeline has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stage_names.is_empty()
    }
}

impl<I, O> std::fmt::Debug for Pipeline<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &self.stage_names)
            .finish()
    }
}
