// stepflow/src/registry.rs

//! `FlowRegistry<E>`: flows keyed by their context type.

use crate::core::control::Outcome;
use crate::core::shared::Shared;
use crate::error::FlowError;
use crate::flow::Flow;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};

#[async_trait]
trait ErasedFlow<E>: Send + Sync {
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<Outcome, E>;
}

struct Registered<T, FlowErr>
where
  T: 'static + Send + Sync,
  FlowErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  flow: Arc<Flow<T, FlowErr>>,
}

#[async_trait]
impl<T, FlowErr, E> ErasedFlow<E> for Registered<T, FlowErr>
where
  T: 'static + Send + Sync,
  FlowErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  E: From<FlowErr> + From<FlowError> + Send + 'static,
{
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<Outcome, E> {
    let ctx = ctx.downcast::<Shared<T>>().map_err(|_| {
      let expected = std::any::type_name::<T>();
      error!(expected, "Registry handed a context of the wrong type.");
      E::from(FlowError::TypeMismatch { expected })
    })?;
    self.flow.run(*ctx).await.map_err(E::from)
  }
}

/// Holds at most one flow per context type. `E` is the error callers see; it
/// must absorb both [`FlowError`] and each registered flow's own error type.
pub struct FlowRegistry<E = FlowError>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  flows: RwLock<HashMap<TypeId, Arc<dyn ErasedFlow<E>>>>,
}

impl<E> FlowRegistry<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      flows: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `flow`, replacing any earlier flow for the same `T`.
  pub fn register<T, FlowErr>(&self, flow: Flow<T, FlowErr>)
  where
    T: 'static + Send + Sync,
    FlowErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
    E: From<FlowErr>,
  {
    debug!(context = std::any::type_name::<T>(), flow = flow.name(), "Registering flow.");
    let entry: Arc<dyn ErasedFlow<E>> = Arc::new(Registered { flow: Arc::new(flow) });
    self.flows.write().insert(TypeId::of::<T>(), entry);
  }

  pub fn contains<T: 'static + Send + Sync>(&self) -> bool {
    self.flows.read().contains_key(&TypeId::of::<T>())
  }

  /// Runs the flow registered for `T`.
  pub async fn run<T: 'static + Send + Sync>(&self, ctx: Shared<T>) -> Result<Outcome, E> {
    let type_name = std::any::type_name::<T>();
    let entry = self.flows.read().get(&TypeId::of::<T>()).cloned();
    let Some(entry) = entry else {
      error!(context = type_name, "No flow registered.");
      return Err(E::from(FlowError::NotRegistered { type_name }));
    };
    entry.run_erased(Box::new(ctx)).await
  }
}

impl<E> Default for FlowRegistry<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}
