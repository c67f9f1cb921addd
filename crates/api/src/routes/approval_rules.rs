//! Approval rule routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use outlay_core::workflow::RuleType;
use outlay_db::{
    ApprovalRuleRepository,
    entities::approval_rules,
    repositories::{CreateApprovalRuleInput, UpdateApprovalRuleInput},
};
use outlay_shared::types::{ApprovalRuleId, UserId};

use crate::{AppState, error::ApiResult, middleware::Caller};

/// Creates the approval rules routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/approval-rules", get(list_rules).post(create_rule))
        .route(
            "/approval-rules/{rule_id}",
            get(get_rule).patch(update_rule).delete(delete_rule),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing rules.
#[derive(Debug, Default, Deserialize)]
pub struct ListRulesQuery {
    /// Include deactivated rules.
    #[serde(default)]
    pub include_inactive: bool,
}

/// Request body for creating an approval rule.
#[derive(Debug, Deserialize)]
pub struct CreateApprovalRuleRequest {
    /// Rule kind.
    pub rule_type: RuleType,
    /// Required approval percentage, 0..=100.
    pub percentage_threshold: Option<Decimal>,
    /// Designated approver.
    pub specific_approver_id: Option<Uuid>,
    /// Optional description.
    pub description: Option<String>,
}

/// Request body for updating an approval rule.
///
/// An explicit `null` clears an optional field; an absent key leaves it.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateApprovalRuleRequest {
    /// New rule kind.
    pub rule_type: Option<RuleType>,
    /// New threshold.
    #[serde(default, with = "serde_with::rust::double_option")]
    pub percentage_threshold: Option<Option<Decimal>>,
    /// New designated approver.
    #[serde(default, with = "serde_with::rust::double_option")]
    pub specific_approver_id: Option<Option<Uuid>>,
    /// New description.
    #[serde(default, with = "serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
    /// Active status.
    pub is_active: Option<bool>,
}

/// Response for an approval rule.
#[derive(Debug, Serialize)]
pub struct ApprovalRuleResponse {
    /// Rule ID.
    pub id: Uuid,
    /// Rule kind.
    pub rule_type: RuleType,
    /// Required approval percentage.
    pub percentage_threshold: Option<Decimal>,
    /// Designated approver.
    pub specific_approver_id: Option<Uuid>,
    /// Description.
    pub description: Option<String>,
    /// Active status.
    pub is_active: bool,
    /// Created at timestamp.
    pub created_at: DateTime<Utc>,
    /// Updated at timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<approval_rules::Model> for ApprovalRuleResponse {
    fn from(rule: approval_rules::Model) -> Self {
        Self {
            id: rule.id,
            rule_type: rule.rule_type.into(),
            percentage_threshold: rule.percentage_threshold,
            specific_approver_id: rule.specific_approver_id,
            description: rule.description,
            is_active: rule.is_active,
            created_at: rule.created_at.with_timezone(&Utc),
            updated_at: rule.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<UpdateApprovalRuleRequest> for UpdateApprovalRuleInput {
    fn from(req: UpdateApprovalRuleRequest) -> Self {
        Self {
            rule_type: req.rule_type,
            percentage_threshold: req.percentage_threshold,
            specific_approver_id: req
                .specific_approver_id
                .map(|inner| inner.map(UserId::from_uuid)),
            description: req.description,
            is_active: req.is_active,
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/approval-rules` - List rules in evaluation order.
async fn list_rules(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<ListRulesQuery>,
) -> ApiResult<Json<Value>> {
    let repo = ApprovalRuleRepository::new((*state.db).clone());
    let rules = repo
        .list_rules(caller.company_id, query.include_inactive)
        .await?;

    let items: Vec<ApprovalRuleResponse> = rules.into_iter().map(Into::into).collect();
    Ok(Json(json!({ "data": items })))
}

/// POST `/approval-rules` - Create a rule.
async fn create_rule(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<CreateApprovalRuleRequest>,
) -> ApiResult<(StatusCode, Json<ApprovalRuleResponse>)> {
    caller.require_admin()?;

    let repo = ApprovalRuleRepository::new((*state.db).clone());
    let rule = repo
        .create_rule(
            caller.company_id,
            CreateApprovalRuleInput {
                rule_type: payload.rule_type,
                percentage_threshold: payload.percentage_threshold,
                specific_approver_id: payload.specific_approver_id.map(UserId::from_uuid),
                description: payload.description,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(rule.into())))
}

/// GET `/approval-rules/{rule_id}` - Get a rule.
async fn get_rule(
    State(state): State<AppState>,
    caller: Caller,
    Path(rule_id): Path<Uuid>,
) -> ApiResult<Json<ApprovalRuleResponse>> {
    let repo = ApprovalRuleRepository::new((*state.db).clone());
    let rule = repo
        .get_rule(caller.company_id, ApprovalRuleId::from_uuid(rule_id))
        .await?;
    Ok(Json(rule.into()))
}

/// PATCH `/approval-rules/{rule_id}` - Update a rule.
async fn update_rule(
    State(state): State<AppState>,
    caller: Caller,
    Path(rule_id): Path<Uuid>,
    Json(payload): Json<UpdateApprovalRuleRequest>,
) -> ApiResult<Json<ApprovalRuleResponse>> {
    caller.require_admin()?;

    let repo = ApprovalRuleRepository::new((*state.db).clone());
    let rule = repo
        .update_rule(
            caller.company_id,
            ApprovalRuleId::from_uuid(rule_id),
            payload.into(),
        )
        .await?;

    tracing::info!(company_id = %caller.company_id, rule_id = %rule_id, "Approval rule updated");
    Ok(Json(rule.into()))
}

/// DELETE `/approval-rules/{rule_id}` - Deactivate a rule.
async fn delete_rule(
    State(state): State<AppState>,
    caller: Caller,
    Path(rule_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    caller.require_admin()?;

    let repo = ApprovalRuleRepository::new((*state.db).clone());
    repo.delete_rule(caller.company_id, ApprovalRuleId::from_uuid(rule_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_distinguishes_null_from_absent() {
        let req: UpdateApprovalRuleRequest =
            serde_json::from_str(r#"{"percentage_threshold": null}"#).unwrap();
        assert_eq!(req.percentage_threshold, Some(None));
        assert_eq!(req.specific_approver_id, None);

        let req: UpdateApprovalRuleRequest =
            serde_json::from_str(r#"{"percentage_threshold": "75.5"}"#).unwrap();
        assert_eq!(req.percentage_threshold, Some(Some(Decimal::new(755, 1))));
    }

    #[test]
    fn test_create_request_parses_rule_type() {
        let req: CreateApprovalRuleRequest = serde_json::from_str(
            r#"{"rule_type": "specific_approver", "specific_approver_id": "00000000-0000-0000-0000-000000000001"}"#,
        )
        .unwrap();
        assert_eq!(req.rule_type, RuleType::SpecificApprover);
        assert!(req.percentage_threshold.is_none());
    }
}
