// stepflow/src/branch/builder.rs

use crate::branch::scope::{AnyRoute, Route};
use crate::core::control::Control;
use crate::core::shared::Shared;
use crate::core::step::Handler;
use crate::error::FlowError;
use crate::flow::{Flow, Phase};
use std::sync::Arc;
use tracing::{debug, warn};

/// Fluent builder for a branch step, obtained from [`Flow::branch`].
///
/// ```ignore
/// flow
///   .branch("pay")
///   .route(card_flow, |ctx| Ok(ctx.read().card.clone()))
///   .when(|c| c.method == Method::Card)
///   .otherwise(Control::Continue)
///   .finish(false);
/// ```
///
/// Routes are tested in declaration order and only the first match runs.
/// Without `otherwise`, a context that matches no route fails with
/// [`FlowError::NoBranchMatched`].
pub struct BranchBuilder<'f, T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  flow: &'f mut Flow<T, E>,
  step: String,
  routes: Vec<Arc<dyn AnyRoute<T, E>>>,
  otherwise: Option<Control>,
}

/// A route waiting for its condition.
pub struct RouteBuilder<'f, T, S, E>
where
  T: 'static + Send + Sync,
  S: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  branch: BranchBuilder<'f, T, E>,
  sub_flow: Arc<Flow<S, E>>,
  extract: crate::branch::scope::Extract<T, S>,
}

impl<'f, T, E> BranchBuilder<'f, T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) fn new(flow: &'f mut Flow<T, E>, step: String) -> Self {
    Self {
      flow,
      step,
      routes: Vec::new(),
      otherwise: None,
    }
  }

  /// Adds a route to `sub_flow`. `extract` builds the sub-context from the
  /// parent; returning the same `Shared` for both is fine when `S == T`.
  pub fn route<S, X>(self, sub_flow: Arc<Flow<S, E>>, extract: X) -> RouteBuilder<'f, T, S, E>
  where
    S: 'static + Send + Sync,
    X: Fn(Shared<T>) -> Result<Shared<S>, FlowError> + Send + Sync + 'static,
  {
    RouteBuilder {
      branch: self,
      sub_flow,
      extract: Arc::new(extract),
    }
  }

  /// What to do when no route matches.
  pub fn otherwise(mut self, control: Control) -> Self {
    self.otherwise = Some(control);
    self
  }

  /// Installs the branch as the step's `on` handler. When `optional` is set,
  /// a failing sub-flow is logged and the parent flow continues.
  pub fn finish(self, optional: bool) {
    let BranchBuilder {
      flow,
      step,
      routes,
      otherwise,
    } = self;
    let routes = Arc::new(routes);
    let step_name = step.clone();

    let handler: Handler<T, E> = Box::new(move |ctx: Shared<T>| {
      let routes = Arc::clone(&routes);
      let step = step_name.clone();
      Box::pin(async move {
        let chosen = {
          let data = ctx.read();
          routes.iter().position(|route| route.matches(&data))
        };
        let Some(index) = chosen else {
          return match otherwise {
            Some(control) => {
              debug!(%step, ?control, "No branch route matched.");
              Ok(control)
            }
            None => Err(E::from(FlowError::NoBranchMatched { step })),
          };
        };
        debug!(%step, route = index, "Branch route selected.");
        match routes[index].run(&step, ctx).await {
          Ok(control) => Ok(control),
          Err(e) if optional => {
            warn!(%step, route = index, error = %e, "Optional branch failed; continuing.");
            Ok(Control::Continue)
          }
          Err(e) => Err(e),
        }
      })
    });

    flow.set_optional(&step, optional);
    flow.replace_handlers(&step, Phase::On, handler);
  }
}

impl<'f, T, S, E> RouteBuilder<'f, T, S, E>
where
  T: 'static + Send + Sync,
  S: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Completes the route with the condition that selects it.
  pub fn when(self, condition: impl Fn(&T) -> bool + Send + Sync + 'static) -> BranchBuilder<'f, T, E> {
    let RouteBuilder {
      mut branch,
      sub_flow,
      extract,
    } = self;
    branch.routes.push(Arc::new(Route {
      sub_flow,
      extract,
      condition: Arc::new(condition),
    }));
    branch
  }
}
