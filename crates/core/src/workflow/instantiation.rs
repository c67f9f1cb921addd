//! Workflow instantiation planning.
//!
//! Turns a company's chain and rule set into the concrete approval rows and
//! rule snapshot for one expense. Planning is pure; the database crate
//! persists the plan in a single transaction.

use std::collections::HashSet;

use outlay_shared::types::UserId;
use serde::{Deserialize, Serialize};

use crate::workflow::chain::{ChainService, ChainStep};
use crate::workflow::rules::ApprovalRule;
use crate::workflow::types::ApproverRole;

/// Approvers available to the chain for one submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryContext {
    /// The expense submitter.
    pub submitter_id: UserId,
    /// The submitter's manager, if assigned.
    pub manager_id: Option<UserId>,
    /// The company admin picked by the directory.
    pub admin_id: Option<UserId>,
}

/// An approval row to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlannedApproval {
    /// Resolved approver.
    pub approver_id: UserId,
    /// Sequence order copied from the chain step.
    pub sequence_order: i32,
    /// Role of the chain step.
    pub role: ApproverRole,
}

/// Why a chain step produced no approval row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// The submitter has no manager.
    NoManager,
    /// The company has no admin.
    NoAdmin,
    /// The resolved user already holds an earlier step.
    DuplicateApprover(UserId),
}

/// A chain step skipped during instantiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedStep {
    /// Sequence order of the skipped step.
    pub sequence_order: i32,
    /// Role of the skipped step.
    pub role: ApproverRole,
    /// Why it was skipped.
    pub reason: UnresolvedReason,
}

/// Result of planning an expense's workflow.
#[derive(Debug, Clone, Default)]
pub struct WorkflowPlan {
    /// Rows to create, ascending by sequence order.
    pub approvals: Vec<PlannedApproval>,
    /// Steps that resolved to nobody.
    pub unresolved: Vec<UnresolvedStep>,
    /// Active rules to snapshot, in evaluation order.
    pub rule_snapshot: Vec<ApprovalRule>,
}

impl WorkflowPlan {
    /// Returns true if at least one approver was assigned.
    #[must_use]
    pub fn has_approvers(&self) -> bool {
        !self.approvals.is_empty()
    }
}

/// Stateless workflow planner.
pub struct WorkflowPlanner;

impl WorkflowPlanner {
    /// Resolves each chain step to an approver and snapshots active rules.
    ///
    /// Steps are walked in ascending sequence order. A user resolved for a
    /// second time keeps only the earlier step. `rules` must already be in
    /// evaluation order.
    #[must_use]
    pub fn plan(ctx: &DirectoryContext, chain: &[ChainStep], rules: &[ApprovalRule]) -> WorkflowPlan {
        let mut plan = WorkflowPlan::default();
        let mut assigned = HashSet::new();

        for step in ChainService::ordered(chain.to_vec()) {
            let resolved = match step.approver_role {
                ApproverRole::Employee => Ok(ctx.submitter_id),
                ApproverRole::Manager => ctx.manager_id.ok_or(UnresolvedReason::NoManager),
                ApproverRole::Admin => ctx.admin_id.ok_or(UnresolvedReason::NoAdmin),
            };

            let outcome = resolved.and_then(|approver_id| {
                if assigned.insert(approver_id) {
                    Ok(approver_id)
                } else {
                    Err(UnresolvedReason::DuplicateApprover(approver_id))
                }
            });

            match outcome {
                Ok(approver_id) => plan.approvals.push(PlannedApproval {
                    approver_id,
                    sequence_order: step.sequence_order,
                    role: step.approver_role,
                }),
                Err(reason) => plan.unresolved.push(UnresolvedStep {
                    sequence_order: step.sequence_order,
                    role: step.approver_role,
                    reason,
                }),
            }
        }

        plan.rule_snapshot = rules.iter().filter(|r| r.is_active).cloned().collect();
        plan
    }
}
