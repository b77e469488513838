// stepflow/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Framework-level failures raised by the engine itself, as opposed to the
/// errors returned by user handlers.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Flow '{flow}' has no handler for required step '{step}'")]
  HandlerMissing { flow: String, step: String },

  #[error("Branch in step '{step}' could not extract its sub-context: {source}")]
  ExtractorFailure {
    step: String,
    #[source]
    source: AnyhowError,
  },

  #[error("No branch matched in step '{step}'")]
  NoBranchMatched { step: String },

  #[error("No flow registered for context type {type_name}")]
  NotRegistered { type_name: &'static str },

  #[error("Registered flow expected context type {expected}")]
  TypeMismatch { expected: &'static str },

  #[error("Handler failed: {source}")]
  Handler {
    #[source]
    source: AnyhowError,
  },
}

impl From<AnyhowError> for FlowError {
  fn from(source: AnyhowError) -> Self {
    FlowError::Handler { source }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
