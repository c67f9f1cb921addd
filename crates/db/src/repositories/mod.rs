//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod approval_chain;
pub mod approval_rule;
pub mod directory;
pub mod expense;
pub mod workflow;

use outlay_core::workflow::WorkflowError;
use sea_orm::DbErr;

pub use approval_chain::{AddChainStepInput, ApprovalChainRepository, UpdateChainStepInput};
pub use approval_rule::{ApprovalRuleRepository, CreateApprovalRuleInput, UpdateApprovalRuleInput};
pub use directory::{CreateCompanyInput, CreateUserInput, DirectoryRepository, SeaOrmDirectory};
pub use expense::{
    CreateExpenseInput, CreatedExpense, ExpenseRepository, PendingApproval, WorkflowInstantiation,
    WorkflowOutcome,
};
pub use workflow::{DecisionOutcome, WorkflowRepository};

#[allow(clippy::needless_pass_by_value)]
pub(crate) fn db_err(err: DbErr) -> WorkflowError {
    WorkflowError::Database(err.to_string())
}
