//! Expense approval workflow for Outlay.
//!
//! This module resolves a company's approval chain into concrete approvers
//! for each expense, evaluates conditional rules, and runs the state machine
//! that turns approver decisions into a final expense status.
//!
//! # Modules
//!
//! - `types` - Workflow domain types (ExpenseStatus, Decision, RuleType)
//! - `error` - Workflow-specific error types
//! - `chain` - Chain step ordering and reorder computation
//! - `rules` - Rule validation and matching
//! - `directory` - Organization directory seam
//! - `instantiation` - Per-expense approver planning
//! - `evaluator` - Decision state machine

pub mod chain;
pub mod directory;
pub mod error;
pub mod evaluator;
pub mod instantiation;
pub mod rules;
pub mod types;

#[cfg(test)]
mod evaluator_props;
#[cfg(test)]
mod instantiation_props;

pub use chain::{ChainService, ChainStep};
pub use directory::{ApproverDirectory, DirectoryUser, resolve_context};
pub use error::WorkflowError;
pub use evaluator::{
    ApprovalEvaluator, ApprovalRow, DecisionCheck, DecisionResult, Evaluation, NextApprover,
    Resolution,
};
pub use instantiation::{
    DirectoryContext, PlannedApproval, UnresolvedReason, UnresolvedStep, WorkflowPlan,
    WorkflowPlanner,
};
pub use rules::{ApprovalRule, ApprovalTally, RuleMatcher, RuleValidator};
pub use types::{
    ApprovalStatus, ApproverRole, Decision, DecisionRecord, ExpenseStatus, RuleType,
};
