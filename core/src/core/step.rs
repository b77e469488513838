// stepflow/src/core/step.rs

//! Step definitions and the boxed handler type.

use super::{Control, Shared};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Predicate evaluated before a step runs; `true` skips the step.
pub type SkipIf<T> = Arc<dyn Fn(&T) -> bool + Send + Sync + 'static>;

/// A type-erased async step handler.
pub type Handler<T, E> =
  Box<dyn Fn(Shared<T>) -> Pin<Box<dyn Future<Output = Result<Control, E>> + Send>> + Send + Sync>;

#[derive(Clone)]
pub struct Step<T: 'static + Send + Sync> {
  pub name: String,
  pub optional: bool,
  pub skip_if: Option<SkipIf<T>>,
}

impl<T: 'static + Send + Sync> std::fmt::Debug for Step<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Step")
      .field("name", &self.name)
      .field("optional", &self.optional)
      .field("has_skip_if", &self.skip_if.is_some())
      .finish()
  }
}
