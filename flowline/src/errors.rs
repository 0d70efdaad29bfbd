//! Error types for flowline pipelines.
//!
//! Every failure a pipeline hands to its caller is a [`PipelineError`]. The
//! variants tag where the failure came from, so error attribution survives
//! composition across asynchronous boundaries without inspecting nested
//! causes at runtime.

use thiserror::Error;

/// The failure type produced by all pipeline variants.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage (or endpoint) raised an error during its turn.
    ///
    /// The originating cause is preserved and reachable via
    /// [`std::error::Error::source`].
    #[error("failed in stage '{stage}': {source}")]
    Stage {
        /// Name of the stage where the failure originated.
        stage: String,
        /// The underlying cause.
        #[source]
        source: anyhow::Error,
    },

    /// A registered stage name had no endpoint bound at execution time.
    ///
    /// This is a configuration failure: it is raised before any endpoint
    /// is invoked.
    #[error("no endpoint for stage '{stage}'")]
    MissingEndpoint {
        /// The stage name with no bound endpoint.
        stage: String,
    },

    /// The blocking wait on an asynchronous run was abandoned before the
    /// run finished (task cancelled or scheduler shut down).
    ///
    /// Carries no stage name: the origin is the waiting mechanism, not a
    /// stage.
    #[error("asynchronous pipeline execution was interrupted")]
    Interrupted,

    /// A failure introduced by the composition machinery itself, with a
    /// cause that is not attributable to a named stage.
    #[error("unexpected pipeline failure: {source}")]
    Unexpected {
        /// The underlying cause.
        #[source]
        source: anyhow::Error,
    },
}

impl PipelineError {
    /// Creates an error from a bare message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Unexpected {
            source: anyhow::anyhow!(message.into()),
        }
    }

    /// Creates an error from a message and an underlying cause.
    #[must_use]
    pub fn with_cause(message: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        Self::Unexpected {
            source: cause.into().context(message.into()),
        }
    }

    /// Creates a stage-attributed error.
    ///
    /// The resulting message is `failed in stage '<name>': <cause>`, with
    /// the stage name embedded exactly once.
    #[must_use]
    pub fn stage(stage: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        Self::Stage {
            stage: stage.into(),
            source: cause.into(),
        }
    }

    /// Creates a configuration error for a stage name with no endpoint.
    #[must_use]
    pub fn missing_endpoint(stage: impl Into<String>) -> Self {
        Self::MissingEndpoint {
            stage: stage.into(),
        }
    }

    /// Returns the name of the failing stage, when known.
    #[must_use]
    pub fn stage_name(&self) -> Option<&str> {
        match self {
            Self::Stage { stage, .. } | Self::MissingEndpoint { stage } => Some(stage),
            Self::Interrupted | Self::Unexpected { .. } => None,
        }
    }

    /// Returns true if this is a configuration failure rather than a
    /// stage or composition failure.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingEndpoint { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::error::Error as _;

    #[test]
    fn test_stage_error_message_format() {
        let err = PipelineError::stage("ErrorStage", anyhow::anyhow!("Intentional error"));
        assert_eq!(
            err.to_string(),
            "failed in stage 'ErrorStage': Intentional error"
        );
    }

    #[test]
    fn test_stage_error_preserves_cause() {
        let err = PipelineError::stage("Parse", anyhow::anyhow!("bad input"));
        let source = err.source().map(std::string::ToString::to_string);
        assert_eq!(source, Some("bad input".to_string()));
        assert_eq!(err.stage_name(), Some("Parse"));
    }

    #[test]
    fn test_stage_name_appears_exactly_once() {
        let err = PipelineError::stage("Resize", anyhow::anyhow!("out of memory"));
        let message = err.to_string();
        assert_eq!(message.matches("Resize").count(), 1);
    }

    #[test]
    fn test_missing_endpoint_message() {
        let err = PipelineError::missing_endpoint("store");
        assert_eq!(err.to_string(), "no endpoint for stage 'store'");
        assert!(err.is_configuration());
        assert_eq!(err.stage_name(), Some("store"));
    }

    #[test]
    fn test_interrupted_carries_no_stage() {
        let err = PipelineError::Interrupted;
        assert_eq!(err.stage_name(), None);
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_message_constructors() {
        let plain = PipelineError::message("boom");
        assert!(plain.to_string().contains("boom"));
        assert_eq!(plain.stage_name(), None);

        let caused = PipelineError::with_cause("while routing", anyhow::anyhow!("io down"));
        assert!(caused.to_string().contains("while routing"));
        assert!(caused.source().is_some());
    }
}
