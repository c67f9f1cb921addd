//! Expense repository.
//!
//! Creates expenses and instantiates their approval workflow: the chain is
//! resolved to concrete approvers and the active rules are snapshotted, all
//! in one transaction.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use outlay_core::workflow::{
    ApproverDirectory, ChainStep, UnresolvedStep, WorkflowError, WorkflowPlanner, resolve_context,
};
use outlay_shared::types::{CompanyId, ExpenseId, PageRequest, PageResponse, UserId};

use crate::entities::{
    companies, expense_approval_rules, expense_approvals, expenses,
    sea_orm_active_enums::{ApprovalStatusDb, ExpenseStatusDb},
    users,
};

use super::approval_chain::{load_chain, to_chain_step};
use super::approval_rule::{load_active_rules, to_core_rule};
use super::db_err;
use super::directory::SeaOrmDirectory;

/// Input for creating an expense.
#[derive(Debug, Clone)]
pub struct CreateExpenseInput {
    /// Submitting user; the expense belongs to their company.
    pub submitter_id: UserId,
    /// Positive amount.
    pub amount: Decimal,
    /// ISO currency code; defaults to the company's currency.
    pub currency: Option<String>,
    /// Free text.
    pub description: Option<String>,
    /// Date the expense was incurred.
    pub expense_date: NaiveDate,
}

/// Approval rows and rule snapshot created for one expense.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowInstantiation {
    /// The expense.
    pub expense_id: Uuid,
    /// Created approval rows, ascending by sequence order.
    pub approvals: Vec<expense_approvals::Model>,
    /// Chain steps that resolved to nobody.
    pub unresolved: Vec<UnresolvedStep>,
    /// Snapshotted rules, in evaluation order.
    pub rule_snapshot: Vec<expense_approval_rules::Model>,
}

/// What happened to the workflow of a newly created expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "message")]
pub enum WorkflowOutcome {
    /// At least one approver was assigned.
    Assigned,
    /// No chain step resolved; the expense stays pending.
    NoApproversAssigned,
    /// Instantiation failed; the expense exists without approval rows.
    Failed(String),
}

/// A created expense and its workflow outcome.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedExpense {
    /// The stored expense.
    pub expense: expenses::Model,
    /// Workflow outcome.
    pub workflow: WorkflowOutcome,
    /// Details when instantiation succeeded.
    pub instantiation: Option<WorkflowInstantiation>,
}

/// A pending approval row with its expense.
#[derive(Debug, Clone, Serialize)]
pub struct PendingApproval {
    /// The approval row.
    pub approval: expense_approvals::Model,
    /// The expense awaiting the decision.
    pub expense: expenses::Model,
}

/// Repository for expenses and their workflow state.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    db: DatabaseConnection,
}

impl ExpenseRepository {
    /// Creates a new expense repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an expense, then instantiates its workflow.
    ///
    /// The expense is committed before instantiation runs. A failed
    /// instantiation is reported in the outcome and never removes the
    /// expense.
    pub async fn create_expense(
        &self,
        input: CreateExpenseInput,
    ) -> Result<CreatedExpense, WorkflowError> {
        if input.amount <= Decimal::ZERO {
            return Err(WorkflowError::InvalidExpense(
                "amount must be positive".to_string(),
            ));
        }

        let submitter = users::Entity::find_by_id(input.submitter_id.into_inner())
            .find_also_related(companies::Entity)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(WorkflowError::UserNotFound(input.submitter_id.into_inner()))?;
        let (user, company) = submitter;

        let currency = match (input.currency, company) {
            (Some(c), _) => c.trim().to_uppercase(),
            (None, Some(company)) => company.default_currency,
            (None, None) => "USD".to_string(),
        };
        if !is_currency_code(&currency) {
            return Err(WorkflowError::InvalidExpense(format!(
                "currency must be a 3-letter code, got {currency:?}"
            )));
        }

        let now = Utc::now();
        let expense = expenses::ActiveModel {
            id: Set(Uuid::now_v7()),
            company_id: Set(user.company_id),
            submitter_id: Set(user.id),
            amount: Set(input.amount),
            currency: Set(currency),
            description: Set(input.description),
            expense_date: Set(input.expense_date),
            status: Set(ExpenseStatusDb::Pending),
            version: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;

        tracing::info!(
            expense_id = %expense.id,
            company_id = %expense.company_id,
            submitter_id = %expense.submitter_id,
            amount = %expense.amount,
            "Expense created"
        );

        let expense_id = ExpenseId::from_uuid(expense.id);
        let (workflow, instantiation) = match self.instantiate_workflow(expense_id).await {
            Ok(inst) if inst.approvals.is_empty() => {
                (WorkflowOutcome::NoApproversAssigned, Some(inst))
            }
            Ok(inst) => (WorkflowOutcome::Assigned, Some(inst)),
            Err(e) => {
                tracing::error!(
                    expense_id = %expense_id,
                    error = %e,
                    "Workflow instantiation failed"
                );
                (WorkflowOutcome::Failed(e.to_string()), None)
            }
        };

        Ok(CreatedExpense {
            expense,
            workflow,
            instantiation,
        })
    }

    /// Resolves the company chain to approvers and snapshots active rules.
    ///
    /// Runs in one transaction. Fails with `WorkflowAlreadyInstantiated`
    /// when the expense already has approval rows or a rule snapshot.
    pub async fn instantiate_workflow(
        &self,
        expense_id: ExpenseId,
    ) -> Result<WorkflowInstantiation, WorkflowError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let expense = expenses::Entity::find_by_id(expense_id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(WorkflowError::ExpenseNotFound(expense_id.into_inner()))?;

        let existing_rows = expense_approvals::Entity::find()
            .filter(expense_approvals::Column::ExpenseId.eq(expense.id))
            .count(&txn)
            .await
            .map_err(db_err)?;
        let existing_snapshot = expense_approval_rules::Entity::find()
            .filter(expense_approval_rules::Column::ExpenseId.eq(expense.id))
            .count(&txn)
            .await
            .map_err(db_err)?;
        if existing_rows > 0 || existing_snapshot > 0 {
            return Err(WorkflowError::WorkflowAlreadyInstantiated(expense.id));
        }

        let directory = SeaOrmDirectory::new(&txn);
        let submitter = directory
            .resolve_user(UserId::from_uuid(expense.submitter_id))
            .await?
            .ok_or(WorkflowError::UserNotFound(expense.submitter_id))?;

        let company_id = CompanyId::from_uuid(expense.company_id);
        let chain: Vec<ChainStep> = load_chain(&txn, company_id)
            .await?
            .iter()
            .map(to_chain_step)
            .collect();
        let rule_models = load_active_rules(&txn, company_id).await?;
        let rules: Vec<_> = rule_models.iter().map(to_core_rule).collect();

        let context = resolve_context(&directory, &submitter, &chain).await?;
        let plan = WorkflowPlanner::plan(&context, &chain, &rules);

        let now = Utc::now();
        let mut approvals = Vec::with_capacity(plan.approvals.len());
        for planned in &plan.approvals {
            let row = expense_approvals::ActiveModel {
                id: Set(Uuid::now_v7()),
                expense_id: Set(expense.id),
                approver_id: Set(planned.approver_id.into_inner()),
                status: Set(ApprovalStatusDb::Pending),
                sequence_order: Set(planned.sequence_order),
                comments: Set(None),
                decided_at: Set(None),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            }
            .insert(&txn)
            .await
            .map_err(db_err)?;
            approvals.push(row);
        }

        let mut rule_snapshot = Vec::with_capacity(plan.rule_snapshot.len());
        for (position, rule) in (1..).zip(&plan.rule_snapshot) {
            let row = expense_approval_rules::ActiveModel {
                id: Set(Uuid::now_v7()),
                expense_id: Set(expense.id),
                approval_rule_id: Set(rule.id.into_inner()),
                rule_type: Set(rule.rule_type.into()),
                percentage_threshold: Set(rule.percentage_threshold),
                specific_approver_id: Set(rule.specific_approver_id.map(UserId::into_inner)),
                is_active: Set(rule.is_active),
                position: Set(position),
                created_at: Set(now.into()),
            }
            .insert(&txn)
            .await
            .map_err(db_err)?;
            rule_snapshot.push(row);
        }

        txn.commit().await.map_err(db_err)?;

        for step in &plan.unresolved {
            tracing::warn!(
                expense_id = %expense.id,
                sequence_order = step.sequence_order,
                role = %step.role,
                reason = ?step.reason,
                "Chain step resolved to no approver"
            );
        }
        tracing::info!(
            expense_id = %expense.id,
            approvers = approvals.len(),
            unresolved = plan.unresolved.len(),
            rules = rule_snapshot.len(),
            "Workflow instantiated"
        );

        Ok(WorkflowInstantiation {
            expense_id: expense.id,
            approvals,
            unresolved: plan.unresolved,
            rule_snapshot,
        })
    }

    /// Gets an expense within a company.
    pub async fn get_expense(
        &self,
        company_id: CompanyId,
        expense_id: ExpenseId,
    ) -> Result<expenses::Model, WorkflowError> {
        expenses::Entity::find_by_id(expense_id.into_inner())
            .filter(expenses::Column::CompanyId.eq(company_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(WorkflowError::ExpenseNotFound(expense_id.into_inner()))
    }

    /// Lists a company's expenses, newest first.
    pub async fn list_expenses(
        &self,
        company_id: CompanyId,
        page: &PageRequest,
    ) -> Result<PageResponse<expenses::Model>, WorkflowError> {
        let page = page.normalized();
        let query = expenses::Entity::find()
            .filter(expenses::Column::CompanyId.eq(company_id.into_inner()));

        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let items = query
            .order_by_desc(expenses::Column::CreatedAt)
            .order_by_desc(expenses::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(PageResponse::new(items, page.page, page.per_page, total))
    }

    /// Lists an expense's approval rows, ascending by sequence order.
    pub async fn list_approvals(
        &self,
        company_id: CompanyId,
        expense_id: ExpenseId,
    ) -> Result<Vec<expense_approvals::Model>, WorkflowError> {
        let expense = self.get_expense(company_id, expense_id).await?;

        expense_approvals::Entity::find()
            .filter(expense_approvals::Column::ExpenseId.eq(expense.id))
            .order_by_asc(expense_approvals::Column::SequenceOrder)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    /// Lists an expense's rule snapshot in evaluation order.
    pub async fn list_rule_snapshot(
        &self,
        company_id: CompanyId,
        expense_id: ExpenseId,
    ) -> Result<Vec<expense_approval_rules::Model>, WorkflowError> {
        let expense = self.get_expense(company_id, expense_id).await?;

        expense_approval_rules::Entity::find()
            .filter(expense_approval_rules::Column::ExpenseId.eq(expense.id))
            .order_by_asc(expense_approval_rules::Column::Position)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    /// Lists the approver's pending rows on expenses that are still pending.
    pub async fn list_pending_for_approver(
        &self,
        approver_id: UserId,
    ) -> Result<Vec<PendingApproval>, WorkflowError> {
        let rows = expense_approvals::Entity::find()
            .find_also_related(expenses::Entity)
            .filter(expense_approvals::Column::ApproverId.eq(approver_id.into_inner()))
            .filter(expense_approvals::Column::Status.eq(ApprovalStatusDb::Pending))
            .filter(expenses::Column::Status.eq(ExpenseStatusDb::Pending))
            .order_by_asc(expenses::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .filter_map(|(approval, expense)| {
                expense.map(|expense| PendingApproval { approval, expense })
            })
            .collect())
    }
}

/// Three ASCII letters, as in ISO 4217.
fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|ch| ch.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("USD", true)]
    #[case("eur", true)]
    #[case("US", false)]
    #[case("USDT", false)]
    #[case("123", false)]
    #[case("\u{c4}B", false)]
    #[case("U D", false)]
    fn test_currency_code(#[case] code: &str, #[case] valid: bool) {
        assert_eq!(is_currency_code(code), valid);
    }
}
