// stepflow/src/branch/scope.rs

use crate::core::control::{Control, Outcome};
use crate::core::shared::Shared;
use crate::error::FlowError;
use crate::flow::Flow;
use async_trait::async_trait;
use std::sync::Arc;

pub(crate) type Extract<T, S> = Arc<dyn Fn(Shared<T>) -> Result<Shared<S>, FlowError> + Send + Sync>;
pub(crate) type Condition<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// A route with its sub-context type erased, so routes over different `S`
/// can live in one list.
#[async_trait]
pub(crate) trait AnyRoute<T, E>: Send + Sync
where
  T: 'static + Send + Sync,
{
  fn matches(&self, data: &T) -> bool;

  async fn run(&self, step: &str, ctx: Shared<T>) -> Result<Control, E>;
}

pub(crate) struct Route<T, S, E>
where
  T: 'static + Send + Sync,
  S: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) sub_flow: Arc<Flow<S, E>>,
  pub(crate) extract: Extract<T, S>,
  pub(crate) condition: Condition<T>,
}

#[async_trait]
impl<T, S, E> AnyRoute<T, E> for Route<T, S, E>
where
  T: 'static + Send + Sync,
  S: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn matches(&self, data: &T) -> bool {
    (self.condition)(data)
  }

  async fn run(&self, step: &str, ctx: Shared<T>) -> Result<Control, E> {
    let sub_ctx = (self.extract)(ctx).map_err(|e| match e {
      FlowError::Handler { source } => FlowError::ExtractorFailure {
        step: step.to_string(),
        source,
      },
      other => other,
    })?;
    let outcome = self.sub_flow.run(sub_ctx).await?;
    Ok(match outcome {
      Outcome::Completed => Control::Continue,
      Outcome::Halted => Control::Halt,
    })
  }
}
