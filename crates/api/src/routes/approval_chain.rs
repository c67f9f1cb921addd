//! Approval chain routes.
//!
//! Reads are open to every caller in the company; changes require admin.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, put},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use outlay_core::workflow::ApproverRole;
use outlay_db::{
    ApprovalChainRepository,
    entities::approval_chain_steps,
    repositories::{AddChainStepInput, UpdateChainStepInput},
};
use outlay_shared::types::ChainStepId;

use crate::{AppState, error::ApiResult, middleware::Caller};

/// Creates the approval chain routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/approval-chain", get(list_steps).post(add_step))
        .route("/approval-chain/order", put(reorder_steps))
        .route(
            "/approval-chain/{step_id}",
            patch(update_step).delete(remove_step),
        )
}

/// Request body for adding a step.
#[derive(Debug, Deserialize)]
pub struct AddStepRequest {
    /// Role resolved at expense creation.
    pub approver_role: ApproverRole,
    /// Position; appended when omitted.
    pub sequence_order: Option<i32>,
}

/// Request body for changing a step.
#[derive(Debug, Deserialize)]
pub struct UpdateStepRequest {
    /// New role.
    pub approver_role: Option<ApproverRole>,
    /// New position.
    pub sequence_order: Option<i32>,
}

/// Request body for reordering the chain.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    /// Every step id of the company, in the new order.
    pub step_ids: Vec<Uuid>,
}

/// A chain step.
#[derive(Debug, Serialize)]
pub struct ChainStepResponse {
    /// Step ID.
    pub id: Uuid,
    /// Role resolved at expense creation.
    pub approver_role: ApproverRole,
    /// Position in the chain.
    pub sequence_order: i32,
    /// Created at timestamp.
    pub created_at: DateTime<Utc>,
    /// Updated at timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<approval_chain_steps::Model> for ChainStepResponse {
    fn from(step: approval_chain_steps::Model) -> Self {
        Self {
            id: step.id,
            approver_role: step.approver_role.into(),
            sequence_order: step.sequence_order,
            created_at: step.created_at.with_timezone(&Utc),
            updated_at: step.updated_at.with_timezone(&Utc),
        }
    }
}

fn to_data(steps: Vec<approval_chain_steps::Model>) -> Json<Value> {
    let items: Vec<ChainStepResponse> = steps.into_iter().map(Into::into).collect();
    Json(json!({ "data": items }))
}

/// GET `/approval-chain` - List the caller's chain, ascending.
async fn list_steps(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<Value>> {
    let repo = ApprovalChainRepository::new((*state.db).clone());
    let steps = repo.list_steps(caller.company_id).await?;
    Ok(to_data(steps))
}

/// POST `/approval-chain` - Add a step.
async fn add_step(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<AddStepRequest>,
) -> ApiResult<(StatusCode, Json<ChainStepResponse>)> {
    caller.require_admin()?;

    let repo = ApprovalChainRepository::new((*state.db).clone());
    let step = repo
        .add_step(
            caller.company_id,
            AddChainStepInput {
                approver_role: payload.approver_role,
                sequence_order: payload.sequence_order,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(step.into())))
}

/// PATCH `/approval-chain/{step_id}` - Change a step's role or position.
async fn update_step(
    State(state): State<AppState>,
    caller: Caller,
    Path(step_id): Path<Uuid>,
    Json(payload): Json<UpdateStepRequest>,
) -> ApiResult<Json<ChainStepResponse>> {
    caller.require_admin()?;

    let repo = ApprovalChainRepository::new((*state.db).clone());
    let step = repo
        .update_step(
            caller.company_id,
            ChainStepId::from_uuid(step_id),
            UpdateChainStepInput {
                approver_role: payload.approver_role,
                sequence_order: payload.sequence_order,
            },
        )
        .await?;

    Ok(Json(step.into()))
}

/// DELETE `/approval-chain/{step_id}` - Remove a step.
async fn remove_step(
    State(state): State<AppState>,
    caller: Caller,
    Path(step_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    caller.require_admin()?;

    let repo = ApprovalChainRepository::new((*state.db).clone());
    repo.remove_step(caller.company_id, ChainStepId::from_uuid(step_id))
        .await?;

    tracing::info!(company_id = %caller.company_id, step_id = %step_id, "Chain step removed");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT `/approval-chain/order` - Renumber the chain to 1..n.
async fn reorder_steps(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<ReorderRequest>,
) -> ApiResult<Json<Value>> {
    caller.require_admin()?;

    let ids: Vec<ChainStepId> = payload
        .step_ids
        .into_iter()
        .map(ChainStepId::from_uuid)
        .collect();

    let repo = ApprovalChainRepository::new((*state.db).clone());
    let steps = repo.reorder(caller.company_id, &ids).await?;
    Ok(to_data(steps))
}
