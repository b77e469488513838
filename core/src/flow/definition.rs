// stepflow/src/flow/definition.rs

//! The `Flow<T, E>` struct and its structural setup methods.

use crate::branch::BranchBuilder;
use crate::core::step::{Handler, SkipIf, Step};
use crate::error::FlowError;
use std::collections::HashMap;
use std::sync::Arc;

/// The three handler phases of a step, executed in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
  Before,
  On,
  After,
}

impl Phase {
  pub const ALL: [Phase; 3] = [Phase::Before, Phase::On, Phase::After];
}

pub(crate) struct StepHooks<T: 'static + Send + Sync, E> {
  pub(crate) before: Vec<Handler<T, E>>,
  pub(crate) on: Vec<Handler<T, E>>,
  pub(crate) after: Vec<Handler<T, E>>,
}

impl<T: 'static + Send + Sync, E> StepHooks<T, E> {
  fn empty() -> Self {
    Self {
      before: Vec::new(),
      on: Vec::new(),
      after: Vec::new(),
    }
  }

  pub(crate) fn phase(&self, phase: Phase) -> &[Handler<T, E>] {
    match phase {
      Phase::Before => &self.before,
      Phase::On => &self.on,
      Phase::After => &self.after,
    }
  }

  pub(crate) fn phase_mut(&mut self, phase: Phase) -> &mut Vec<Handler<T, E>> {
    match phase {
      Phase::Before => &mut self.before,
      Phase::On => &mut self.on,
      Phase::After => &mut self.after,
    }
  }

  pub(crate) fn is_empty(&self) -> bool {
    self.before.is_empty() && self.on.is_empty() && self.after.is_empty()
  }
}

/// An ordered list of named steps over the context type `T`.
///
/// Handlers return `Result<Control, E>`. `E` must absorb [`FlowError`] so the
/// runner can report its own failures (missing handlers, branch extraction)
/// through the same channel as handler errors.
pub struct Flow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) name: String,
  pub(crate) steps: Vec<Step<T>>,
  pub(crate) hooks: HashMap<String, StepHooks<T, E>>,
}

impl<T, E> Flow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Declares a flow from `(step_name, optional)` pairs.
  pub fn new(name: impl Into<String>, steps: &[(&str, bool)]) -> Self {
    let mut flow = Self {
      name: name.into(),
      steps: Vec::with_capacity(steps.len()),
      hooks: HashMap::new(),
    };
    for (step, optional) in steps {
      flow.ensure_step_absent(step);
      flow.steps.push(Step {
        name: (*step).to_string(),
        optional: *optional,
        skip_if: None,
      });
    }
    flow
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn step_names(&self) -> impl Iterator<Item = &str> {
    self.steps.iter().map(|s| s.name.as_str())
  }

  /// Panics on an unknown step. Misnamed steps are wiring bugs, caught when
  /// flows are built at startup.
  pub(crate) fn step_mut(&mut self, step: &str) -> &mut Step<T> {
    let flow_name = self.name.clone();
    match self.steps.iter_mut().find(|s| s.name == step) {
      Some(found) => found,
      None => panic!("stepflow setup error: step '{step}' is not declared in flow '{flow_name}'"),
    }
  }

  fn ensure_step_absent(&self, step: &str) {
    if self.steps.iter().any(|s| s.name == step) {
      panic!(
        "stepflow setup error: step '{step}' declared twice in flow '{}'",
        self.name
      );
    }
  }

  pub fn set_optional(&mut self, step: &str, optional: bool) {
    self.step_mut(step).optional = optional;
  }

  /// Skips `step` whenever `predicate` holds for the context at that point.
  pub fn skip_if(&mut self, step: &str, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) {
    let predicate: SkipIf<T> = Arc::new(predicate);
    self.step_mut(step).skip_if = Some(predicate);
  }

  /// Appends a new step after `existing`.
  pub fn insert_after(&mut self, existing: &str, step: &str, optional: bool) {
    self.step_mut(existing);
    self.ensure_step_absent(step);
    let idx = self.steps.iter().position(|s| s.name == existing).unwrap_or(self.steps.len() - 1);
    self.steps.insert(
      idx + 1,
      Step {
        name: step.to_string(),
        optional,
        skip_if: None,
      },
    );
  }

  /// Turns `step` into a branch point. See [`BranchBuilder`].
  pub fn branch(&mut self, step: &str) -> BranchBuilder<'_, T, E> {
    self.step_mut(step);
    BranchBuilder::new(self, step.to_string())
  }

  pub(crate) fn push_handler(&mut self, step: &str, phase: Phase, handler: Handler<T, E>) {
    self.step_mut(step);
    self
      .hooks
      .entry(step.to_string())
      .or_insert_with(StepHooks::empty)
      .phase_mut(phase)
      .push(handler);
  }

  pub(crate) fn replace_handlers(&mut self, step: &str, phase: Phase, handler: Handler<T, E>) {
    self.step_mut(step);
    let slot = self
      .hooks
      .entry(step.to_string())
      .or_insert_with(StepHooks::empty)
      .phase_mut(phase);
    slot.clear();
    slot.push(handler);
  }
}
