// stepflow/src/core/control.rs

//! Signals exchanged between handlers and the flow runner.

/// Returned by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
  /// Keep going: remaining handlers of this step, then the next step.
  Continue,
  /// Stop the whole flow now. Nothing after this handler runs.
  Halt,
}

/// How a flow run ended when no handler returned an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  Completed,
  Halted,
}
