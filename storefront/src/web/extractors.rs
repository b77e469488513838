// storefront/src/web/extractors.rs
use actix_web::{FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::{Principal, Role};

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// The caller as asserted by the upstream auth collaborator. Session handling
/// lives outside this service; it forwards the user id and role as headers.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Principal);

fn principal_from_headers(req: &HttpRequest) -> Result<Principal, AppError> {
  let user_id = req
    .headers()
    .get(USER_ID_HEADER)
    .and_then(|value| value.to_str().ok())
    .and_then(|value| Uuid::parse_str(value.trim()).ok())
    .ok_or_else(|| AppError::Unauthenticated(format!("Missing or invalid {} header", USER_ID_HEADER)))?;

  let role = match req.headers().get(USER_ROLE_HEADER) {
    None => Role::Customer,
    Some(value) => value
      .to_str()
      .map_err(|_| AppError::Unauthenticated(format!("Unreadable {} header", USER_ROLE_HEADER)))?
      .trim()
      .parse::<Role>()
      .map_err(AppError::Unauthenticated)?,
  };
  Ok(Principal { user_id, role })
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    ready(principal_from_headers(req).map(AuthenticatedUser).map_err(|e| {
      warn!(error = %e, path = %req.path(), "Request rejected by the principal extractor.");
      e
    }))
  }
}
