//! Approval Rule Repository
//!
//! Provides CRUD operations for a company's conditional approval rules.
//! Deleting a rule only deactivates it; expenses keep their own snapshot.

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use outlay_core::workflow::{ApprovalRule, RuleType, RuleValidator, WorkflowError};
use outlay_shared::types::{ApprovalRuleId, CompanyId, UserId};

use crate::entities::{
    approval_rules::{self, ActiveModel, Entity as ApprovalRuleEntity, Model as ApprovalRuleModel},
    users,
};

use super::db_err;

/// Input for creating an approval rule.
#[derive(Debug, Clone)]
pub struct CreateApprovalRuleInput {
    /// Rule kind.
    pub rule_type: RuleType,
    /// Required share of approvals, 0..=100.
    pub percentage_threshold: Option<Decimal>,
    /// Designated approver.
    pub specific_approver_id: Option<UserId>,
    /// Optional description.
    pub description: Option<String>,
}

/// Input for updating an approval rule.
///
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct UpdateApprovalRuleInput {
    /// New rule kind.
    pub rule_type: Option<RuleType>,
    /// New threshold.
    pub percentage_threshold: Option<Option<Decimal>>,
    /// New designated approver.
    pub specific_approver_id: Option<Option<UserId>>,
    /// New description.
    pub description: Option<Option<String>>,
    /// Active status.
    pub is_active: Option<bool>,
}

/// Converts a stored rule into the engine's view.
#[must_use]
pub fn to_core_rule(model: &ApprovalRuleModel) -> ApprovalRule {
    ApprovalRule {
        id: ApprovalRuleId::from_uuid(model.id),
        rule_type: model.rule_type.into(),
        percentage_threshold: model.percentage_threshold,
        specific_approver_id: model.specific_approver_id.map(UserId::from_uuid),
        is_active: model.is_active,
    }
}

/// Loads a company's active rules in evaluation order (created_at, id).
pub async fn load_active_rules<C: ConnectionTrait>(
    conn: &C,
    company_id: CompanyId,
) -> Result<Vec<ApprovalRuleModel>, WorkflowError> {
    ApprovalRuleEntity::find()
        .filter(approval_rules::Column::CompanyId.eq(company_id.into_inner()))
        .filter(approval_rules::Column::IsActive.eq(true))
        .order_by_asc(approval_rules::Column::CreatedAt)
        .order_by_asc(approval_rules::Column::Id)
        .all(conn)
        .await
        .map_err(db_err)
}

/// Repository for approval rule operations.
#[derive(Debug, Clone)]
pub struct ApprovalRuleRepository {
    db: DatabaseConnection,
}

impl ApprovalRuleRepository {
    /// Creates a new ApprovalRuleRepository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a new approval rule.
    pub async fn create_rule(
        &self,
        company_id: CompanyId,
        input: CreateApprovalRuleInput,
    ) -> Result<ApprovalRuleModel, WorkflowError> {
        RuleValidator::validate(
            input.rule_type,
            input.percentage_threshold,
            input.specific_approver_id,
        )?;
        self.check_approver_company(company_id, input.specific_approver_id)
            .await?;

        let now = chrono::Utc::now();
        let rule = ActiveModel {
            id: Set(Uuid::now_v7()),
            company_id: Set(company_id.into_inner()),
            rule_type: Set(input.rule_type.into()),
            percentage_threshold: Set(input.percentage_threshold),
            specific_approver_id: Set(input.specific_approver_id.map(UserId::into_inner)),
            description: Set(input.description),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let result = rule.insert(&self.db).await.map_err(db_err)?;

        tracing::info!(
            company_id = %company_id,
            rule_id = %result.id,
            rule_type = %input.rule_type,
            "Approval rule created"
        );

        Ok(result)
    }

    /// Lists a company's rules in evaluation order.
    ///
    /// Inactive rules are included only when asked for.
    pub async fn list_rules(
        &self,
        company_id: CompanyId,
        include_inactive: bool,
    ) -> Result<Vec<ApprovalRuleModel>, WorkflowError> {
        if !include_inactive {
            return load_active_rules(&self.db, company_id).await;
        }

        ApprovalRuleEntity::find()
            .filter(approval_rules::Column::CompanyId.eq(company_id.into_inner()))
            .order_by_asc(approval_rules::Column::CreatedAt)
            .order_by_asc(approval_rules::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    /// Gets a specific approval rule by ID.
    pub async fn get_rule(
        &self,
        company_id: CompanyId,
        rule_id: ApprovalRuleId,
    ) -> Result<ApprovalRuleModel, WorkflowError> {
        let rule = ApprovalRuleEntity::find_by_id(rule_id.into_inner())
            .filter(approval_rules::Column::CompanyId.eq(company_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(WorkflowError::RuleNotFound(rule_id.into_inner()))?;

        Ok(rule)
    }

    /// Updates an approval rule.
    ///
    /// The merged rule is validated as a whole.
    pub async fn update_rule(
        &self,
        company_id: CompanyId,
        rule_id: ApprovalRuleId,
        input: UpdateApprovalRuleInput,
    ) -> Result<ApprovalRuleModel, WorkflowError> {
        let existing = self.get_rule(company_id, rule_id).await?;

        let rule_type = input.rule_type.unwrap_or_else(|| existing.rule_type.into());
        let percentage_threshold = input
            .percentage_threshold
            .unwrap_or(existing.percentage_threshold);
        let specific_approver_id = input
            .specific_approver_id
            .unwrap_or_else(|| existing.specific_approver_id.map(UserId::from_uuid));

        RuleValidator::validate(rule_type, percentage_threshold, specific_approver_id)?;
        self.check_approver_company(company_id, specific_approver_id)
            .await?;

        let mut rule: ActiveModel = existing.into();
        rule.rule_type = Set(rule_type.into());
        rule.percentage_threshold = Set(percentage_threshold);
        rule.specific_approver_id = Set(specific_approver_id.map(UserId::into_inner));
        if let Some(description) = input.description {
            rule.description = Set(description);
        }
        if let Some(is_active) = input.is_active {
            rule.is_active = Set(is_active);
        }
        rule.updated_at = Set(chrono::Utc::now().into());

        rule.update(&self.db).await.map_err(db_err)
    }

    /// Soft deletes an approval rule by setting is_active to false.
    pub async fn delete_rule(
        &self,
        company_id: CompanyId,
        rule_id: ApprovalRuleId,
    ) -> Result<(), WorkflowError> {
        let existing = self.get_rule(company_id, rule_id).await?;

        let mut rule: ActiveModel = existing.into();
        rule.is_active = Set(false);
        rule.updated_at = Set(chrono::Utc::now().into());

        rule.update(&self.db).await.map_err(db_err)?;

        tracing::info!(company_id = %company_id, rule_id = %rule_id, "Approval rule deactivated");
        Ok(())
    }

    async fn check_approver_company(
        &self,
        company_id: CompanyId,
        approver_id: Option<UserId>,
    ) -> Result<(), WorkflowError> {
        let Some(approver_id) = approver_id else {
            return Ok(());
        };

        let approver = users::Entity::find_by_id(approver_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(WorkflowError::UserNotFound(approver_id.into_inner()))?;

        if approver.company_id != company_id.into_inner() {
            return Err(WorkflowError::UserNotFound(approver_id.into_inner()));
        }
        Ok(())
    }
}
