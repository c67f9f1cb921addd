//! Expense routes.
//!
//! Creating an expense also instantiates its approval workflow; the response
//! says whether approvers were assigned.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use outlay_core::workflow::{
    ApprovalStatus, ApproverRole, ExpenseStatus, RuleType, UnresolvedStep, WorkflowError,
};
use outlay_db::{
    ExpenseRepository,
    entities::{expense_approval_rules, expense_approvals, expenses},
    repositories::{CreateExpenseInput, WorkflowInstantiation, WorkflowOutcome},
};
use outlay_shared::types::{ExpenseId, PageRequest, PageResponse};

use crate::{AppState, error::ApiResult, middleware::Caller};

/// Creates the expense routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", get(list_expenses).post(create_expense))
        .route("/expenses/{expense_id}", get(get_expense))
        .route("/expenses/{expense_id}/workflow", post(instantiate_workflow))
        .route("/expenses/{expense_id}/approvals", get(list_approvals))
        .route("/expenses/{expense_id}/rules", get(list_rule_snapshot))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for submitting an expense.
#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    /// Positive amount.
    pub amount: Decimal,
    /// ISO currency code; the company default when omitted.
    pub currency: Option<String>,
    /// Free text.
    pub description: Option<String>,
    /// Date the expense was incurred.
    pub expense_date: NaiveDate,
}

/// An expense.
#[derive(Debug, Serialize)]
pub struct ExpenseResponse {
    /// Expense ID.
    pub id: Uuid,
    /// Submitter.
    pub submitter_id: Uuid,
    /// Amount.
    pub amount: Decimal,
    /// Currency code.
    pub currency: String,
    /// Description.
    pub description: Option<String>,
    /// Date incurred.
    pub expense_date: NaiveDate,
    /// Workflow status.
    pub status: ExpenseStatus,
    /// Optimistic lock version.
    pub version: i32,
    /// Created at timestamp.
    pub created_at: DateTime<Utc>,
    /// Updated at timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<expenses::Model> for ExpenseResponse {
    fn from(e: expenses::Model) -> Self {
        Self {
            id: e.id,
            submitter_id: e.submitter_id,
            amount: e.amount,
            currency: e.currency,
            description: e.description,
            expense_date: e.expense_date,
            status: e.status.into(),
            version: e.version,
            created_at: e.created_at.with_timezone(&Utc),
            updated_at: e.updated_at.with_timezone(&Utc),
        }
    }
}

/// One approver's slot on an expense.
#[derive(Debug, Serialize)]
pub struct ApprovalResponse {
    /// Approval row ID.
    pub id: Uuid,
    /// Expense.
    pub expense_id: Uuid,
    /// Approver.
    pub approver_id: Uuid,
    /// Decision state.
    pub status: ApprovalStatus,
    /// Position copied from the chain.
    pub sequence_order: i32,
    /// Approver's comments.
    pub comments: Option<String>,
    /// When the decision was recorded.
    pub decided_at: Option<DateTime<Utc>>,
}

impl From<expense_approvals::Model> for ApprovalResponse {
    fn from(a: expense_approvals::Model) -> Self {
        Self {
            id: a.id,
            expense_id: a.expense_id,
            approver_id: a.approver_id,
            status: a.status.into(),
            sequence_order: a.sequence_order,
            comments: a.comments,
            decided_at: a.decided_at.map(|d| d.with_timezone(&Utc)),
        }
    }
}

/// A rule as captured on the expense.
#[derive(Debug, Serialize)]
pub struct RuleSnapshotResponse {
    /// Source rule.
    pub approval_rule_id: Uuid,
    /// Rule kind.
    pub rule_type: RuleType,
    /// Required approval percentage.
    pub percentage_threshold: Option<Decimal>,
    /// Designated approver.
    pub specific_approver_id: Option<Uuid>,
    /// Whether the rule was active when captured.
    pub is_active: bool,
    /// Evaluation order, from 1.
    pub position: i32,
}

impl From<expense_approval_rules::Model> for RuleSnapshotResponse {
    fn from(r: expense_approval_rules::Model) -> Self {
        Self {
            approval_rule_id: r.approval_rule_id,
            rule_type: r.rule_type.into(),
            percentage_threshold: r.percentage_threshold,
            specific_approver_id: r.specific_approver_id,
            is_active: r.is_active,
            position: r.position,
        }
    }
}

/// Approvers and rules assigned to an expense.
#[derive(Debug, Serialize)]
pub struct InstantiationResponse {
    /// Approval rows, ascending by sequence order.
    pub approvals: Vec<ApprovalResponse>,
    /// Chain steps that resolved to nobody.
    pub unresolved: Vec<UnresolvedStep>,
    /// Rule snapshot in evaluation order.
    pub rule_snapshot: Vec<RuleSnapshotResponse>,
}

impl From<WorkflowInstantiation> for InstantiationResponse {
    fn from(inst: WorkflowInstantiation) -> Self {
        Self {
            approvals: inst.approvals.into_iter().map(Into::into).collect(),
            unresolved: inst.unresolved,
            rule_snapshot: inst.rule_snapshot.into_iter().map(Into::into).collect(),
        }
    }
}

/// Response for a submitted expense.
#[derive(Debug, Serialize)]
pub struct CreateExpenseResponse {
    /// The stored expense.
    pub expense: ExpenseResponse,
    /// Workflow outcome.
    pub workflow: WorkflowOutcome,
    /// Assigned approvers and rules, when instantiation succeeded.
    pub instantiation: Option<InstantiationResponse>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/expenses` - List the company's expenses, newest first.
async fn list_expenses(
    State(state): State<AppState>,
    caller: Caller,
    Query(page): Query<PageRequest>,
) -> ApiResult<Json<PageResponse<ExpenseResponse>>> {
    let repo = ExpenseRepository::new((*state.db).clone());
    let expenses = repo.list_expenses(caller.company_id, &page).await?;
    Ok(Json(expenses.map(Into::into)))
}

/// POST `/expenses` - Submit an expense as the caller.
async fn create_expense(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<CreateExpenseRequest>,
) -> ApiResult<(StatusCode, Json<CreateExpenseResponse>)> {
    let repo = ExpenseRepository::new((*state.db).clone());
    let created = repo
        .create_expense(CreateExpenseInput {
            submitter_id: caller.user_id,
            amount: payload.amount,
            currency: payload.currency,
            description: payload.description,
            expense_date: payload.expense_date,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateExpenseResponse {
            expense: created.expense.into(),
            workflow: created.workflow,
            instantiation: created.instantiation.map(Into::into),
        }),
    ))
}

/// GET `/expenses/{expense_id}` - Get an expense.
async fn get_expense(
    State(state): State<AppState>,
    caller: Caller,
    Path(expense_id): Path<Uuid>,
) -> ApiResult<Json<ExpenseResponse>> {
    let repo = ExpenseRepository::new((*state.db).clone());
    let expense = repo
        .get_expense(caller.company_id, ExpenseId::from_uuid(expense_id))
        .await?;
    Ok(Json(expense.into()))
}

/// POST `/expenses/{expense_id}/workflow` - Retry workflow instantiation.
///
/// Allowed for the submitter and for admins.
async fn instantiate_workflow(
    State(state): State<AppState>,
    caller: Caller,
    Path(expense_id): Path<Uuid>,
) -> ApiResult<Json<InstantiationResponse>> {
    let expense_id = ExpenseId::from_uuid(expense_id);
    let repo = ExpenseRepository::new((*state.db).clone());

    let expense = repo.get_expense(caller.company_id, expense_id).await?;
    if expense.submitter_id != caller.user_id.into_inner() && caller.role != ApproverRole::Admin {
        return Err(WorkflowError::AdminRequired.into());
    }

    let inst = repo.instantiate_workflow(expense_id).await?;
    Ok(Json(inst.into()))
}

/// GET `/expenses/{expense_id}/approvals` - Approval rows, ascending.
async fn list_approvals(
    State(state): State<AppState>,
    caller: Caller,
    Path(expense_id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let repo = ExpenseRepository::new((*state.db).clone());
    let rows = repo
        .list_approvals(caller.company_id, ExpenseId::from_uuid(expense_id))
        .await?;

    let items: Vec<ApprovalResponse> = rows.into_iter().map(Into::into).collect();
    Ok(Json(json!({ "data": items })))
}

/// GET `/expenses/{expense_id}/rules` - The expense's rule snapshot.
async fn list_rule_snapshot(
    State(state): State<AppState>,
    caller: Caller,
    Path(expense_id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let repo = ExpenseRepository::new((*state.db).clone());
    let rules = repo
        .list_rule_snapshot(caller.company_id, ExpenseId::from_uuid(expense_id))
        .await?;

    let items: Vec<RuleSnapshotResponse> = rules.into_iter().map(Into::into).collect();
    Ok(Json(json!({ "data": items })))
}
