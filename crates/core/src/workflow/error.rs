//! Workflow error types for expense approval.
//!
//! Covers chain configuration, rule validation, workflow instantiation and
//! decision handling. Every variant maps to an HTTP status and a stable
//! machine-readable code.

use outlay_shared::AppError;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::workflow::types::{ApprovalStatus, ExpenseStatus, RuleType};

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Expense approval row not found.
    #[error("Expense approval {0} not found")]
    ApprovalNotFound(Uuid),

    /// Expense not found.
    #[error("Expense {0} not found")]
    ExpenseNotFound(Uuid),

    /// Approval rule not found.
    #[error("Approval rule {0} not found")]
    RuleNotFound(Uuid),

    /// Approval chain step not found.
    #[error("Approval chain step {0} not found")]
    ChainStepNotFound(Uuid),

    /// User not found.
    #[error("User {0} not found")]
    UserNotFound(Uuid),

    /// No manager relationship recorded for the employee.
    #[error("No manager relationship for employee {0}")]
    ManagerRelationshipNotFound(Uuid),

    /// Another chain step already uses this sequence order.
    #[error("Sequence order {0} is already used in this company's chain")]
    DuplicateSequenceOrder(i32),

    /// Sequence orders start at 1.
    #[error("Sequence order must be at least 1, got {0}")]
    InvalidSequenceOrder(i32),

    /// The approver already has a slot on this expense.
    #[error("User {approver_id} already has an approval on expense {expense_id}")]
    DuplicateApprover {
        /// The expense.
        expense_id: Uuid,
        /// The approver.
        approver_id: Uuid,
    },

    /// Percentage threshold outside 0..=100 or finer than two decimal places.
    #[error("Percentage threshold must be between 0 and 100 with at most 2 decimal places, got {0}")]
    InvalidThreshold(Decimal),

    /// A rule type is missing the field it is evaluated on.
    #[error("Rule of type {rule_type} requires {field}")]
    MissingRuleField {
        /// The rule type being validated.
        rule_type: RuleType,
        /// Name of the missing field.
        field: &'static str,
    },

    /// A reorder request does not cover exactly the company's chain steps.
    #[error("Invalid chain reorder: {0}")]
    InvalidReorder(String),

    /// Expense input rejected.
    #[error("Invalid expense: {0}")]
    InvalidExpense(String),

    /// Manager assignment rejected.
    #[error("Invalid manager assignment: {0}")]
    InvalidManagerAssignment(String),

    /// Approval row cannot move between these statuses.
    #[error("Invalid approval transition from {from} to {to}")]
    InvalidTransition {
        /// The current row status.
        from: ApprovalStatus,
        /// The requested row status.
        to: ApprovalStatus,
    },

    /// The expense has already reached a final status.
    #[error("Expense {expense_id} is already {status}")]
    ExpenseFinalized {
        /// The expense.
        expense_id: Uuid,
        /// Its terminal status.
        status: ExpenseStatus,
    },

    /// Approval rows or rule snapshot already exist for the expense.
    #[error("Workflow already instantiated for expense {0}")]
    WorkflowAlreadyInstantiated(Uuid),

    /// The acting user is not allowed to decide on this expense.
    #[error("User {user_id} is not authorized to decide on this expense")]
    NotAuthorizedToDecide {
        /// The user who attempted the decision.
        user_id: Uuid,
    },

    /// The operation requires an admin.
    #[error("Only admins can change approval configuration")]
    AdminRequired,

    /// The expense changed underneath the decision; retry.
    #[error("Expense {0} was modified concurrently, retry the decision")]
    ConcurrencyConflict(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl WorkflowError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidSequenceOrder(_)
            | Self::InvalidThreshold(_)
            | Self::MissingRuleField { .. }
            | Self::InvalidReorder(_)
            | Self::InvalidExpense(_)
            | Self::InvalidManagerAssignment(_) => 400,

            Self::NotAuthorizedToDecide { .. } | Self::AdminRequired => 403,

            Self::ApprovalNotFound(_)
            | Self::ExpenseNotFound(_)
            | Self::RuleNotFound(_)
            | Self::ChainStepNotFound(_)
            | Self::UserNotFound(_)
            | Self::ManagerRelationshipNotFound(_) => 404,

            Self::DuplicateSequenceOrder(_)
            | Self::DuplicateApprover { .. }
            | Self::InvalidTransition { .. }
            | Self::ExpenseFinalized { .. }
            | Self::WorkflowAlreadyInstantiated(_)
            | Self::ConcurrencyConflict(_) => 409,

            Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ApprovalNotFound(_) => "APPROVAL_NOT_FOUND",
            Self::ExpenseNotFound(_) => "EXPENSE_NOT_FOUND",
            Self::RuleNotFound(_) => "RULE_NOT_FOUND",
            Self::ChainStepNotFound(_) => "CHAIN_STEP_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::ManagerRelationshipNotFound(_) => "MANAGER_RELATIONSHIP_NOT_FOUND",
            Self::DuplicateSequenceOrder(_) => "DUPLICATE_SEQUENCE_ORDER",
            Self::InvalidSequenceOrder(_) => "INVALID_SEQUENCE_ORDER",
            Self::DuplicateApprover { .. } => "DUPLICATE_APPROVER",
            Self::InvalidThreshold(_) => "INVALID_THRESHOLD",
            Self::MissingRuleField { .. } => "MISSING_RULE_FIELD",
            Self::InvalidReorder(_) => "INVALID_REORDER",
            Self::InvalidExpense(_) => "INVALID_EXPENSE",
            Self::InvalidManagerAssignment(_) => "INVALID_MANAGER_ASSIGNMENT",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::ExpenseFinalized { .. } => "EXPENSE_FINALIZED",
            Self::WorkflowAlreadyInstantiated(_) => "WORKFLOW_ALREADY_INSTANTIATED",
            Self::NotAuthorizedToDecide { .. } => "NOT_AUTHORIZED_TO_DECIDE",
            Self::AdminRequired => "ADMIN_REQUIRED",
            Self::ConcurrencyConflict(_) => "CONCURRENCY_CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns true if the caller may retry the same request unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_))
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        let message = err.to_string();
        match err.status_code() {
            400 => Self::Validation(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            _ => Self::Database(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(WorkflowError::ApprovalNotFound(Uuid::nil()), 404, "APPROVAL_NOT_FOUND")]
    #[case(WorkflowError::ExpenseNotFound(Uuid::nil()), 404, "EXPENSE_NOT_FOUND")]
    #[case(WorkflowError::DuplicateSequenceOrder(2), 409, "DUPLICATE_SEQUENCE_ORDER")]
    #[case(WorkflowError::InvalidSequenceOrder(0), 400, "INVALID_SEQUENCE_ORDER")]
    #[case(WorkflowError::InvalidThreshold(Decimal::new(101, 0)), 400, "INVALID_THRESHOLD")]
    #[case(WorkflowError::InvalidExpense("amount".into()), 400, "INVALID_EXPENSE")]
    #[case(WorkflowError::AdminRequired, 403, "ADMIN_REQUIRED")]
    #[case(WorkflowError::ConcurrencyConflict(Uuid::nil()), 409, "CONCURRENCY_CONFLICT")]
    #[case(WorkflowError::Database("boom".into()), 500, "DATABASE_ERROR")]
    fn test_status_and_code(
        #[case] err: WorkflowError,
        #[case] status: u16,
        #[case] code: &str,
    ) {
        assert_eq!(err.status_code(), status);
        assert_eq!(err.error_code(), code);
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = WorkflowError::InvalidTransition {
            from: ApprovalStatus::Approved,
            to: ApprovalStatus::Rejected,
        };
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.error_code(), "INVALID_TRANSITION");
        assert!(err.to_string().contains("approved"));
        assert!(err.to_string().contains("rejected"));
    }

    #[test]
    fn test_missing_rule_field_message() {
        let err = WorkflowError::MissingRuleField {
            rule_type: RuleType::SpecificApprover,
            field: "specific_approver_id",
        };
        assert_eq!(err.status_code(), 400);
        assert_eq!(
            err.to_string(),
            "Rule of type specific_approver requires specific_approver_id"
        );
    }

    #[test]
    fn test_only_concurrency_conflict_is_retryable() {
        assert!(WorkflowError::ConcurrencyConflict(Uuid::nil()).is_retryable());
        assert!(!WorkflowError::WorkflowAlreadyInstantiated(Uuid::nil()).is_retryable());
        assert!(
            !WorkflowError::ExpenseFinalized {
                expense_id: Uuid::nil(),
                status: ExpenseStatus::Approved,
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_converts_to_app_error() {
        let app: AppError = WorkflowError::AdminRequired.into();
        assert_eq!(app.status_code(), 403);

        let app: AppError = WorkflowError::ExpenseNotFound(Uuid::nil()).into();
        assert_eq!(app.status_code(), 404);

        let app: AppError = WorkflowError::DuplicateApprover {
            expense_id: Uuid::nil(),
            approver_id: Uuid::nil(),
        }
        .into();
        assert_eq!(app.error_code(), "CONFLICT");
    }
}
