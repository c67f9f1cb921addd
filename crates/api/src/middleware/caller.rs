//! Caller identity middleware.
//!
//! Authentication happens upstream; requests arrive with the caller's user
//! id in `X-User-Id`. The middleware resolves that id through the directory
//! and stores a [`Caller`] in the request extensions.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use outlay_core::workflow::{ApproverRole, WorkflowError};
use outlay_db::DirectoryRepository;
use outlay_shared::{
    AppError,
    types::{CompanyId, UserId},
};

use crate::{AppState, error::ApiError};

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The resolved caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    /// Caller's user id.
    pub user_id: UserId,
    /// Company the caller belongs to; every request is scoped to it.
    pub company_id: CompanyId,
    /// Caller's organizational role.
    pub role: ApproverRole,
}

impl Caller {
    /// Fails with `AdminRequired` unless the caller is an admin.
    pub fn require_admin(&self) -> Result<(), WorkflowError> {
        if self.role == ApproverRole::Admin {
            Ok(())
        } else {
            Err(WorkflowError::AdminRequired)
        }
    }
}

fn parse_user_id(request: &Request) -> Result<UserId, AppError> {
    let raw = request
        .headers()
        .get(USER_ID_HEADER)
        .ok_or_else(|| AppError::Unauthorized("X-User-Id header is required".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("X-User-Id header is not valid text".to_string()))?;

    Uuid::parse_str(raw.trim())
        .map(UserId::from_uuid)
        .map_err(|_| AppError::Unauthorized("X-User-Id header is not a valid UUID".to_string()))
}

/// Resolves `X-User-Id` into a [`Caller`] extension.
///
/// Missing, malformed or unknown ids are rejected with 401.
pub async fn caller_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let user_id = match parse_user_id(&request) {
        Ok(id) => id,
        Err(e) => return ApiError::from(e).into_response(),
    };

    let directory = DirectoryRepository::new((*state.db).clone());
    let user = match directory.resolve_user(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return ApiError::from(AppError::Unauthorized(format!("unknown user {user_id}")))
                .into_response();
        }
        Err(e) => return ApiError::from(e).into_response(),
    };

    request.extensions_mut().insert(Caller {
        user_id: user.id,
        company_id: user.company_id,
        role: user.role,
    });
    next.run(request).await
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .copied()
            .ok_or_else(|| AppError::Unauthorized("caller identity required".to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with(value: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/");
        if let Some(v) = value {
            builder = builder.header(USER_ID_HEADER, v);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_parse_user_id() {
        let id = Uuid::now_v7();
        let parsed = parse_user_id(&request_with(Some(&id.to_string()))).unwrap();
        assert_eq!(parsed.into_inner(), id);
    }

    #[test]
    fn test_parse_user_id_rejects_bad_input() {
        assert!(parse_user_id(&request_with(None)).is_err());
        assert!(parse_user_id(&request_with(Some("not-a-uuid"))).is_err());
    }

    #[test]
    fn test_require_admin() {
        let mut caller = Caller {
            user_id: UserId::new(),
            company_id: CompanyId::new(),
            role: ApproverRole::Admin,
        };
        assert!(caller.require_admin().is_ok());

        caller.role = ApproverRole::Manager;
        assert!(matches!(
            caller.require_admin(),
            Err(WorkflowError::AdminRequired)
        ));
    }
}
