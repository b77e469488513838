// tests/common/mod.rs
#![allow(dead_code)]

use once_cell::sync::Lazy;
use std::future::Future;
use stepflow::{Control, FlowError, Shared};
use tracing::Level;

#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub trail: Vec<String>,
  pub halt_at: Option<String>,
  pub route: Option<String>,
  pub note: String,
}

#[derive(Clone, Debug, Default)]
pub struct SubContext {
  pub input: String,
  pub output: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TestError {
  #[error("flow error: {0}")]
  Flow(#[from] FlowError),

  #[error("handler failed: {0}")]
  Handler(String),
}

/// Records `label` in the trail, bumps the counter and halts when
/// `halt_at` names this label.
pub fn record(
  label: &'static str,
) -> impl Fn(Shared<TestContext>) -> std::pin::Pin<Box<dyn Future<Output = Result<Control, TestError>> + Send>>
     + Send
     + Sync
     + 'static {
  move |ctx: Shared<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.trail.push(label.to_string());
      if guard.halt_at.as_deref() == Some(label) {
        return Ok(Control::Halt);
      }
      Ok(Control::Continue)
    })
  }
}

pub fn fail(
  label: &'static str,
) -> impl Fn(Shared<TestContext>) -> std::pin::Pin<Box<dyn Future<Output = Result<Control, TestError>> + Send>>
     + Send
     + Sync
     + 'static {
  move |ctx: Shared<TestContext>| {
    Box::pin(async move {
      ctx.write().trail.push(label.to_string());
      Err(TestError::Handler(format!("{label} broke")))
    })
  }
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
