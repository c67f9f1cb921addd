//! Approval decision routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderValue, header::RETRY_AFTER},
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use outlay_core::workflow::{Decision, ExpenseStatus, NextApprover, Resolution};
use outlay_db::{ExpenseRepository, WorkflowRepository, repositories::DecisionOutcome};
use outlay_shared::types::ExpenseApprovalId;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::Caller,
    routes::expenses::{ApprovalResponse, ExpenseResponse},
};

/// Creates the approval routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/approvals/pending", get(list_pending))
        .route("/approvals/{approval_id}", patch(decide))
}

/// Request body for a decision.
#[derive(Debug, Deserialize)]
pub struct DecideRequest {
    /// `approved` or `rejected`.
    pub status: Decision,
    /// Optional comments.
    pub comments: Option<String>,
}

/// Response for a decision.
#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    /// The decided row.
    pub approval: ApprovalResponse,
    /// Expense status after evaluation.
    pub expense_status: ExpenseStatus,
    /// Whether this decision changed the expense status.
    pub status_changed: bool,
    /// Why the expense holds its status.
    pub resolution: Resolution,
    /// Who is notified next, while the expense is pending.
    pub next_approver: Option<NextApprover>,
    /// True when the decision had already been recorded.
    pub replayed: bool,
}

impl From<DecisionOutcome> for DecisionResponse {
    fn from(outcome: DecisionOutcome) -> Self {
        Self {
            approval: outcome.approval.into(),
            expense_status: outcome.expense_status,
            status_changed: outcome.status_changed,
            resolution: outcome.resolution,
            next_approver: outcome.next_approver,
            replayed: outcome.replayed,
        }
    }
}

/// A pending approval with its expense.
#[derive(Debug, Serialize)]
pub struct PendingApprovalResponse {
    /// The caller's approval row.
    pub approval: ApprovalResponse,
    /// The expense awaiting the decision.
    pub expense: ExpenseResponse,
}

/// GET `/approvals/pending` - The caller's pending approval rows.
async fn list_pending(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<serde_json::Value>> {
    let repo = ExpenseRepository::new((*state.db).clone());
    let pending = repo.list_pending_for_approver(caller.user_id).await?;

    let items: Vec<PendingApprovalResponse> = pending
        .into_iter()
        .map(|p| PendingApprovalResponse {
            approval: p.approval.into(),
            expense: p.expense.into(),
        })
        .collect();
    Ok(Json(json!({ "data": items })))
}

/// PATCH `/approvals/{approval_id}` - Approve or reject.
///
/// Lost updates answer 409 with `Retry-After`.
async fn decide(
    State(state): State<AppState>,
    caller: Caller,
    Path(approval_id): Path<Uuid>,
    Json(payload): Json<DecideRequest>,
) -> Response {
    let repo = WorkflowRepository::new((*state.db).clone());

    match repo
        .decide_approval(
            ExpenseApprovalId::from_uuid(approval_id),
            payload.status,
            payload.comments,
            caller.user_id,
        )
        .await
    {
        Ok(outcome) => Json(DecisionResponse::from(outcome)).into_response(),
        Err(e) if e.is_retryable() => {
            let mut response = ApiError::from(e).into_response();
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from_static("1"));
            response
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_request() {
        let req: DecideRequest =
            serde_json::from_str(r#"{"status": "rejected", "comments": "no receipt"}"#).unwrap();
        assert_eq!(req.status, Decision::Rejected);
        assert_eq!(req.comments.as_deref(), Some("no receipt"));

        assert!(serde_json::from_str::<DecideRequest>(r#"{"status": "pending"}"#).is_err());
    }
}
