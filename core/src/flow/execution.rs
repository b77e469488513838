// stepflow/src/flow/execution.rs

//! `Flow::run`: walks the steps in order and drives each phase's handlers.

use crate::core::control::{Control, Outcome};
use crate::core::shared::Shared;
use crate::core::step::Step;
use crate::error::FlowError;
use crate::flow::definition::{Flow, Phase};
use tracing::{debug, error, info_span, instrument, warn, Instrument};

impl<T, E> Flow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step against `ctx`.
  ///
  /// Returns `Outcome::Halted` as soon as a handler returns `Control::Halt`,
  /// and the first handler error unchanged.
  #[instrument(
    name = "Flow::run",
    skip_all,
    fields(flow = %self.name, steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx: Shared<T>) -> Result<Outcome, E> {
    debug!("Flow starting.");
    for (index, step) in self.steps.iter().enumerate() {
      let span = info_span!("flow_step", step = %step.name, index, optional = step.optional);
      if let Control::Halt = self.run_step(step, ctx.clone()).instrument(span).await? {
        debug!(step = %step.name, "Flow halted.");
        return Ok(Outcome::Halted);
      }
    }
    debug!("Flow completed.");
    Ok(Outcome::Completed)
  }

  async fn run_step(&self, step: &Step<T>, ctx: Shared<T>) -> Result<Control, E> {
    let skipped = step.skip_if.as_ref().is_some_and(|skip| skip(&*ctx.read()));
    if skipped {
      debug!("Step skipped by its condition.");
      return Ok(Control::Continue);
    }

    let Some(hooks) = self.hooks.get(&step.name).filter(|hooks| !hooks.is_empty()) else {
      if step.optional {
        debug!("Optional step has no handlers.");
        return Ok(Control::Continue);
      }
      error!("Required step has no handlers.");
      return Err(E::from(FlowError::HandlerMissing {
        flow: self.name.clone(),
        step: step.name.clone(),
      }));
    };

    for phase in Phase::ALL {
      for (index, handler) in hooks.phase(phase).iter().enumerate() {
        match handler(ctx.clone()).await {
          Ok(Control::Continue) => {}
          Ok(Control::Halt) => {
            debug!(?phase, handler = index, "Handler halted the flow.");
            return Ok(Control::Halt);
          }
          Err(e) => {
            warn!(?phase, handler = index, error = %e, "Handler failed.");
            return Err(e);
          }
        }
      }
    }
    Ok(Control::Continue)
  }
}
