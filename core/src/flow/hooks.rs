// stepflow/src/flow/hooks.rs

//! Handler registration for the `before`, `on` and `after` phases.

use crate::core::control::Control;
use crate::core::shared::Shared;
use crate::core::step::Handler;
use crate::error::FlowError;
use crate::flow::definition::{Flow, Phase};
use std::future::Future;

impl<T, E> Flow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Registers a handler that runs before the step's `on` handlers.
  ///
  /// The handler may fail with any error convertible into the flow's `E`.
  pub fn before<F, Fut, HandlerErr>(&mut self, step: &str, handler: F)
  where
    F: Fn(Shared<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Control, HandlerErr>> + Send + 'static,
    HandlerErr: Into<E> + Send + 'static,
  {
    self.push_handler(step, Phase::Before, box_handler(handler));
  }

  /// Registers a main handler for the step.
  pub fn on<F, Fut, HandlerErr>(&mut self, step: &str, handler: F)
  where
    F: Fn(Shared<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Control, HandlerErr>> + Send + 'static,
    HandlerErr: Into<E> + Send + 'static,
  {
    self.push_handler(step, Phase::On, box_handler(handler));
  }

  /// Registers a handler that runs once the step's `on` handlers (or its
  /// branch) have finished.
  pub fn after<F, Fut, HandlerErr>(&mut self, step: &str, handler: F)
  where
    F: Fn(Shared<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Control, HandlerErr>> + Send + 'static,
    HandlerErr: Into<E> + Send + 'static,
  {
    self.push_handler(step, Phase::After, box_handler(handler));
  }
}

fn box_handler<T, E, F, Fut, HandlerErr>(handler: F) -> Handler<T, E>
where
  T: 'static + Send + Sync,
  E: 'static,
  F: Fn(Shared<T>) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Control, HandlerErr>> + Send + 'static,
  HandlerErr: Into<E> + Send + 'static,
{
  Box::new(move |ctx| {
    let fut = handler(ctx);
    Box::pin(async move { fut.await.map_err(Into::into) })
  })
}
