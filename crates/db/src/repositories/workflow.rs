//! Workflow repository for approval decisions.
//!
//! Each decision runs in one transaction: the parent expense row is locked
//! before the approval rows are read, and the status write is guarded by
//! the expense's `version` column.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;

use outlay_core::workflow::{
    ApprovalEvaluator, ApprovalRow, ApprovalRule, ApproverDirectory, Decision, DecisionCheck,
    ExpenseStatus, NextApprover, Resolution, WorkflowError,
};
use outlay_shared::types::{
    ApprovalRuleId, CompanyId, ExpenseApprovalId, ExpenseId, UserId,
};

use crate::entities::{expense_approval_rules, expense_approvals, expenses};

use super::db_err;
use super::directory::SeaOrmDirectory;

/// Result of a decision.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionOutcome {
    /// The approval row after the decision.
    pub approval: expense_approvals::Model,
    /// Expense status after evaluation.
    pub expense_status: ExpenseStatus,
    /// Whether this decision changed the expense status.
    pub status_changed: bool,
    /// Why the expense is in its status.
    pub resolution: Resolution,
    /// The next pending approver, if the expense is still pending.
    pub next_approver: Option<NextApprover>,
    /// True when the row already held this decision and nothing was written.
    pub replayed: bool,
}

fn to_approval_row(model: &expense_approvals::Model) -> ApprovalRow {
    ApprovalRow {
        id: ExpenseApprovalId::from_uuid(model.id),
        approver_id: UserId::from_uuid(model.approver_id),
        status: model.status.into(),
        sequence_order: model.sequence_order,
    }
}

fn snapshot_to_rule(model: &expense_approval_rules::Model) -> ApprovalRule {
    ApprovalRule {
        id: ApprovalRuleId::from_uuid(model.approval_rule_id),
        rule_type: model.rule_type.into(),
        percentage_threshold: model.percentage_threshold,
        specific_approver_id: model.specific_approver_id.map(UserId::from_uuid),
        is_active: model.is_active,
    }
}

/// Workflow repository for approval decisions.
#[derive(Debug, Clone)]
pub struct WorkflowRepository {
    db: DatabaseConnection,
}

impl WorkflowRepository {
    /// Creates a new workflow repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records an approver decision and re-evaluates the expense.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The approval row or expense does not exist
    /// - The acting user is not the row's approver or a rule's designated approver
    /// - The row already holds a different decision
    /// - The expense is already final
    /// - The expense changed concurrently (retryable)
    /// - Database operation fails
    pub async fn decide_approval(
        &self,
        approval_id: ExpenseApprovalId,
        decision: Decision,
        comments: Option<String>,
        acting_user: UserId,
    ) -> Result<DecisionOutcome, WorkflowError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let approval = expense_approvals::Entity::find_by_id(approval_id.into_inner())
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(WorkflowError::ApprovalNotFound(approval_id.into_inner()))?;

        // Every decision on this expense serializes on this lock
        let expense = expenses::Entity::find_by_id(approval.expense_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(WorkflowError::ExpenseNotFound(approval.expense_id))?;

        let acting = SeaOrmDirectory::new(&txn)
            .resolve_user(acting_user)
            .await?
            .ok_or(WorkflowError::NotAuthorizedToDecide {
                user_id: acting_user.into_inner(),
            })?;

        let row_models = expense_approvals::Entity::find()
            .filter(expense_approvals::Column::ExpenseId.eq(expense.id))
            .order_by_asc(expense_approvals::Column::SequenceOrder)
            .all(&txn)
            .await
            .map_err(db_err)?;
        let rows: Vec<ApprovalRow> = row_models.iter().map(to_approval_row).collect();

        let rules: Vec<ApprovalRule> = expense_approval_rules::Entity::find()
            .filter(expense_approval_rules::Column::ExpenseId.eq(expense.id))
            .filter(expense_approval_rules::Column::IsActive.eq(true))
            .order_by_asc(expense_approval_rules::Column::Position)
            .all(&txn)
            .await
            .map_err(db_err)?
            .iter()
            .map(snapshot_to_rule)
            .collect();

        ApprovalEvaluator::authorize(
            &acting,
            CompanyId::from_uuid(expense.company_id),
            &to_approval_row(&approval),
            &rules,
        )?;

        let expense_id = ExpenseId::from_uuid(expense.id);
        let current_status: ExpenseStatus = expense.status.into();
        let result = ApprovalEvaluator::decide(
            expense_id,
            current_status,
            &rows,
            &rules,
            approval_id,
            decision,
            acting_user,
        )?;

        // Rows were re-read under the lock, so use the fresh copy
        let current = row_models
            .into_iter()
            .find(|m| m.id == approval_id.into_inner())
            .ok_or(WorkflowError::ApprovalNotFound(approval_id.into_inner()))?;

        if result.check == DecisionCheck::Replay {
            txn.commit().await.map_err(db_err)?;
            tracing::debug!(
                approval_id = %approval_id,
                decision = %decision,
                "Decision replayed, nothing to write"
            );
            return Ok(DecisionOutcome {
                approval: current,
                expense_status: current_status,
                status_changed: false,
                resolution: Resolution::Replayed,
                next_approver: None,
                replayed: true,
            });
        }

        let record = decision.record(comments);
        let mut active: expense_approvals::ActiveModel = current.into();
        active.status = Set(record.decision.as_status().into());
        active.comments = Set(record.comments);
        active.decided_at = Set(Some(record.decided_at.into()));
        active.updated_at = Set(record.decided_at.into());
        let updated = active.update(&txn).await.map_err(db_err)?;

        let evaluation = result.evaluation;
        if evaluation.status_changed {
            let written = expenses::Entity::update_many()
                .set(expenses::ActiveModel {
                    status: Set(evaluation.status.into()),
                    version: Set(expense.version.saturating_add(1)),
                    updated_at: Set(Utc::now().into()),
                    ..Default::default()
                })
                .filter(expenses::Column::Id.eq(expense.id))
                .filter(expenses::Column::Version.eq(expense.version))
                .exec(&txn)
                .await
                .map_err(db_err)?;

            if written.rows_affected == 0 {
                tracing::warn!(expense_id = %expense_id, "Lost update on expense status");
                return Err(WorkflowError::ConcurrencyConflict(expense.id));
            }
        }

        txn.commit().await.map_err(db_err)?;

        tracing::info!(
            approval_id = %approval_id,
            expense_id = %expense_id,
            acting_user = %acting_user,
            decision = %decision,
            "Approval decided"
        );
        if evaluation.status_changed {
            tracing::info!(
                expense_id = %expense_id,
                from = %current_status,
                to = %evaluation.status,
                resolution = ?evaluation.resolution,
                "Expense status changed"
            );
        }
        if let Some(next) = evaluation.next_approver {
            tracing::info!(
                expense_id = %expense_id,
                approver_id = %next.approver_id,
                sequence_order = next.sequence_order,
                "Next approver notified"
            );
        }

        Ok(DecisionOutcome {
            approval: updated,
            expense_status: evaluation.status,
            status_changed: evaluation.status_changed,
            resolution: evaluation.resolution,
            next_approver: evaluation.next_approver,
            replayed: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::sea_orm_active_enums::{ApprovalRuleType, ApprovalStatusDb};
    use outlay_core::workflow::{ApprovalStatus, RuleType};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_approval_row_conversion() {
        let now = Utc::now().into();
        let model = expense_approvals::Model {
            id: Uuid::now_v7(),
            expense_id: Uuid::now_v7(),
            approver_id: Uuid::now_v7(),
            status: ApprovalStatusDb::Approved,
            sequence_order: 3,
            comments: None,
            decided_at: Some(now),
            created_at: now,
            updated_at: now,
        };

        let row = to_approval_row(&model);
        assert_eq!(row.id.into_inner(), model.id);
        assert_eq!(row.status, ApprovalStatus::Approved);
        assert_eq!(row.sequence_order, 3);
    }

    #[test]
    fn test_snapshot_conversion_uses_source_rule_id() {
        let model = expense_approval_rules::Model {
            id: Uuid::now_v7(),
            expense_id: Uuid::now_v7(),
            approval_rule_id: Uuid::now_v7(),
            rule_type: ApprovalRuleType::Hybrid,
            percentage_threshold: Some(dec!(75)),
            specific_approver_id: None,
            is_active: true,
            position: 1,
            created_at: Utc::now().into(),
        };

        let rule = snapshot_to_rule(&model);
        assert_eq!(rule.id.into_inner(), model.approval_rule_id);
        assert_eq!(rule.rule_type, RuleType::Hybrid);
        assert_eq!(rule.percentage_threshold, Some(dec!(75)));
    }
}
