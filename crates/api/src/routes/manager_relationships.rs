//! Manager relationship routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use outlay_db::{DirectoryRepository, entities::manager_relationships};
use outlay_shared::types::UserId;

use crate::{AppState, error::ApiResult, middleware::Caller};

/// Creates the manager relationship routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/manager-relationships",
            get(list_relationships).post(assign_manager),
        )
        .route(
            "/manager-relationships/{employee_id}",
            delete(remove_manager),
        )
}

/// Request body for assigning a manager.
#[derive(Debug, Deserialize)]
pub struct AssignManagerRequest {
    /// Employee being managed.
    pub employee_id: Uuid,
    /// Their manager.
    pub manager_id: Uuid,
}

/// A manager relationship.
#[derive(Debug, Serialize)]
pub struct ManagerRelationshipResponse {
    /// Relationship ID.
    pub id: Uuid,
    /// Employee.
    pub employee_id: Uuid,
    /// Manager.
    pub manager_id: Uuid,
    /// Created at timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<manager_relationships::Model> for ManagerRelationshipResponse {
    fn from(link: manager_relationships::Model) -> Self {
        Self {
            id: link.id,
            employee_id: link.employee_id,
            manager_id: link.manager_id,
            created_at: link.created_at.with_timezone(&Utc),
        }
    }
}

/// GET `/manager-relationships` - List the company's relationships.
async fn list_relationships(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<Value>> {
    let repo = DirectoryRepository::new((*state.db).clone());
    let links = repo.list_manager_relationships(caller.company_id).await?;

    let items: Vec<ManagerRelationshipResponse> = links.into_iter().map(Into::into).collect();
    Ok(Json(json!({ "data": items })))
}

/// POST `/manager-relationships` - Assign or replace an employee's manager.
async fn assign_manager(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<AssignManagerRequest>,
) -> ApiResult<Json<ManagerRelationshipResponse>> {
    caller.require_admin()?;

    let repo = DirectoryRepository::new((*state.db).clone());
    let link = repo
        .assign_manager(
            caller.company_id,
            UserId::from_uuid(payload.employee_id),
            UserId::from_uuid(payload.manager_id),
        )
        .await?;

    Ok(Json(link.into()))
}

/// DELETE `/manager-relationships/{employee_id}` - Remove an employee's manager.
async fn remove_manager(
    State(state): State<AppState>,
    caller: Caller,
    Path(employee_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    caller.require_admin()?;

    let repo = DirectoryRepository::new((*state.db).clone());
    repo.remove_manager(caller.company_id, UserId::from_uuid(employee_id))
        .await?;

    tracing::info!(company_id = %caller.company_id, employee_id = %employee_id, "Manager removed");
    Ok(StatusCode::NO_CONTENT)
}
