// zipline_server/src/web/extractors.rs

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;
use uuid::Uuid;
use zipline::{LifecycleEngine, Role};

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "X-User-ID";

/// Caller identity. Session handling lives in front of this service; by the
/// time a request arrives the gateway has put the user id in `X-User-ID`.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let user_id = req
      .headers()
      .get(USER_ID_HEADER)
      .and_then(|value| value.to_str().ok())
      .and_then(|raw| Uuid::parse_str(raw.trim()).ok());

    match user_id {
      Some(user_id) => ready(Ok(AuthenticatedUser { user_id })),
      None => {
        warn!("AuthenticatedUser extractor: Missing or invalid X-User-ID header.");
        ready(Err(AppError::Auth(
          "User authentication required. Missing or invalid X-User-ID header.".to_string(),
        )))
      }
    }
  }
}

impl AuthenticatedUser {
  /// Fan-out and token listings across users are for zippers only.
  pub async fn require_zipper(&self, engine: &LifecycleEngine) -> Result<(), AppError> {
    match engine.role_of(self.user_id).await? {
      Some(Role::Zipper) => Ok(()),
      _ => {
        warn!(user_id = %self.user_id, "Zipper-only action refused.");
        Err(AppError::Forbidden("This action requires the zipper role.".to_string()))
      }
    }
  }
}
