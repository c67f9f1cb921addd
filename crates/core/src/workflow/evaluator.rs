//! Approval evaluator.
//!
//! Applies one approver decision to an expense's approval rows and derives
//! the expense status. Resolution order:
//!
//! 1. a matching conditional rule approves
//! 2. every row approved approves
//! 3. any row rejected rejects
//! 4. otherwise the expense stays pending
//!
//! Approved and Rejected are terminal. Rows only move from pending to a
//! decision, and resubmitting the same decision is a no-op.

use outlay_shared::types::{ApprovalRuleId, CompanyId, ExpenseApprovalId, ExpenseId, UserId};
use serde::Serialize;

use crate::workflow::directory::DirectoryUser;
use crate::workflow::error::WorkflowError;
use crate::workflow::rules::{ApprovalRule, ApprovalTally, RuleMatcher};
use crate::workflow::types::{ApprovalStatus, Decision, ExpenseStatus, RuleType};

/// One approver's slot on an expense, as seen by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApprovalRow {
    /// Row id.
    pub id: ExpenseApprovalId,
    /// Assigned approver.
    pub approver_id: UserId,
    /// Current status.
    pub status: ApprovalStatus,
    /// Position in the chain.
    pub sequence_order: i32,
}

/// What to do with an incoming decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionCheck {
    /// Write the decision and re-evaluate.
    Apply,
    /// The row already holds this decision; nothing to write.
    Replay,
}

/// Why the expense ended up in its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "rule_id")]
pub enum Resolution {
    /// A conditional rule matched.
    ConditionalRule(ApprovalRuleId),
    /// Every approver approved.
    AllApproved,
    /// At least one approver rejected and no rule approved.
    AnyRejected,
    /// Still waiting on approvers.
    AwaitingApprovals,
    /// Replayed decision, nothing evaluated.
    Replayed,
}

/// The pending approver next in sequence after an approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NextApprover {
    /// Their approval row.
    pub approval_id: ExpenseApprovalId,
    /// The approver.
    pub approver_id: UserId,
    /// Their sequence order.
    pub sequence_order: i32,
}

/// Outcome of evaluating an expense after a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    /// Resulting expense status.
    pub status: ExpenseStatus,
    /// Whether the status differs from before the decision.
    pub status_changed: bool,
    /// Why.
    pub resolution: Resolution,
    /// Informational: the next pending approver, if the expense is still
    /// pending after an approval.
    pub next_approver: Option<NextApprover>,
}

/// A decision applied in memory, ready to be persisted.
#[derive(Debug, Clone)]
pub struct DecisionResult {
    /// Whether the row must be written.
    pub check: DecisionCheck,
    /// The decided row with its new status.
    pub approval: ApprovalRow,
    /// All rows after the decision, ascending by sequence order.
    pub rows: Vec<ApprovalRow>,
    /// Derived expense status.
    pub evaluation: Evaluation,
}

/// Stateless approval state machine.
pub struct ApprovalEvaluator;

impl ApprovalEvaluator {
    /// Checks that the acting user may decide `row` on an expense of
    /// `company_id`.
    ///
    /// The acting user must belong to the company and be either the row's
    /// approver or the designated approver of an active rule in `rules`.
    pub fn authorize(
        acting: &DirectoryUser,
        company_id: CompanyId,
        row: &ApprovalRow,
        rules: &[ApprovalRule],
    ) -> Result<(), WorkflowError> {
        let refused = || WorkflowError::NotAuthorizedToDecide {
            user_id: acting.id.into_inner(),
        };

        if acting.company_id != company_id {
            return Err(refused());
        }
        if row.approver_id == acting.id || Self::is_designated(rules, acting.id) {
            return Ok(());
        }
        Err(refused())
    }

    /// Whether `user` is the designated approver of an active rule.
    fn is_designated(rules: &[ApprovalRule], user: UserId) -> bool {
        rules.iter().any(|r| {
            r.is_active
                && matches!(r.rule_type, RuleType::SpecificApprover | RuleType::Hybrid)
                && r.specific_approver_id == Some(user)
        })
    }

    /// Decides whether a decision applies, replays, or is refused.
    pub fn check_decision(
        expense_id: ExpenseId,
        expense_status: ExpenseStatus,
        row_status: ApprovalStatus,
        decision: Decision,
    ) -> Result<DecisionCheck, WorkflowError> {
        let target = decision.as_status();

        if row_status == target {
            return Ok(DecisionCheck::Replay);
        }
        if row_status.is_decided() {
            return Err(WorkflowError::InvalidTransition {
                from: row_status,
                to: target,
            });
        }
        if expense_status.is_terminal() {
            return Err(WorkflowError::ExpenseFinalized {
                expense_id: expense_id.into_inner(),
                status: expense_status,
            });
        }
        Ok(DecisionCheck::Apply)
    }

    /// Derives the expense status from rows that already include the decision.
    #[must_use]
    pub fn evaluate(
        current_status: ExpenseStatus,
        rows: &[ApprovalRow],
        rules: &[ApprovalRule],
        decided: &ApprovalRow,
        decision: Decision,
        acting_user: UserId,
    ) -> Evaluation {
        if current_status.is_terminal() {
            return Evaluation {
                status: current_status,
                status_changed: false,
                resolution: Resolution::Replayed,
                next_approver: None,
            };
        }

        let tally = ApprovalTally {
            approved: rows
                .iter()
                .filter(|r| r.status == ApprovalStatus::Approved)
                .count(),
            total: rows.len(),
        };
        let all_approved = !rows.is_empty() && tally.approved == tally.total;
        let any_rejected = rows.iter().any(|r| r.status == ApprovalStatus::Rejected);

        let (status, resolution) =
            if let Some(rule_id) = RuleMatcher::first_match(rules, tally, acting_user, decision) {
                (ExpenseStatus::Approved, Resolution::ConditionalRule(rule_id))
            } else if all_approved {
                (ExpenseStatus::Approved, Resolution::AllApproved)
            } else if any_rejected {
                (ExpenseStatus::Rejected, Resolution::AnyRejected)
            } else {
                (ExpenseStatus::Pending, Resolution::AwaitingApprovals)
            };

        let next_approver = if decision == Decision::Approved && status == ExpenseStatus::Pending {
            Self::next_approver(rows, decided.sequence_order)
        } else {
            None
        };

        Evaluation {
            status,
            status_changed: status != current_status,
            resolution,
            next_approver,
        }
    }

    /// The pending row immediately after `sequence_order`, if any.
    #[must_use]
    pub fn next_approver(rows: &[ApprovalRow], sequence_order: i32) -> Option<NextApprover> {
        let next_order = sequence_order.checked_add(1)?;
        rows.iter()
            .find(|r| r.sequence_order == next_order && r.status == ApprovalStatus::Pending)
            .map(|r| NextApprover {
                approval_id: r.id,
                approver_id: r.approver_id,
                sequence_order: r.sequence_order,
            })
    }

    /// Applies a decision to an expense's rows in memory.
    ///
    /// `rows` are every approval row of the expense and `rules` its rule
    /// snapshot in evaluation order. Nothing changes on a replay.
    pub fn decide(
        expense_id: ExpenseId,
        expense_status: ExpenseStatus,
        rows: &[ApprovalRow],
        rules: &[ApprovalRule],
        approval_id: ExpenseApprovalId,
        decision: Decision,
        acting_user: UserId,
    ) -> Result<DecisionResult, WorkflowError> {
        let current = rows
            .iter()
            .find(|r| r.id == approval_id)
            .copied()
            .ok_or_else(|| WorkflowError::ApprovalNotFound(approval_id.into_inner()))?;

        let check = Self::check_decision(expense_id, expense_status, current.status, decision)?;

        let mut updated: Vec<ApprovalRow> = rows.to_vec();
        updated.sort_by_key(|r| r.sequence_order);

        if check == DecisionCheck::Replay {
            return Ok(DecisionResult {
                check,
                approval: current,
                rows: updated,
                evaluation: Evaluation {
                    status: expense_status,
                    status_changed: false,
                    resolution: Resolution::Replayed,
                    next_approver: None,
                },
            });
        }

        let mut approval = current;
        approval.status = decision.as_status();
        for row in &mut updated {
            if row.id == approval_id {
                row.status = approval.status;
            }
        }

        let evaluation =
            Self::evaluate(expense_status, &updated, rules, &approval, decision, acting_user);

        Ok(DecisionResult {
            check,
            approval,
            rows: updated,
            evaluation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::workflow::types::ApproverRole;

    fn row(order: i32) -> ApprovalRow {
        ApprovalRow {
            id: ExpenseApprovalId::new(),
            approver_id: UserId::new(),
            status: ApprovalStatus::Pending,
            sequence_order: order,
        }
    }

    fn percentage(threshold: rust_decimal::Decimal) -> ApprovalRule {
        ApprovalRule {
            id: ApprovalRuleId::new(),
            rule_type: RuleType::Percentage,
            percentage_threshold: Some(threshold),
            specific_approver_id: None,
            is_active: true,
        }
    }

    fn specific(approver: UserId) -> ApprovalRule {
        ApprovalRule {
            id: ApprovalRuleId::new(),
            rule_type: RuleType::SpecificApprover,
            percentage_threshold: None,
            specific_approver_id: Some(approver),
            is_active: true,
        }
    }

    /// Applies `decision` by the row's own approver and returns the new state.
    fn step(
        status: ExpenseStatus,
        rows: &[ApprovalRow],
        rules: &[ApprovalRule],
        idx: usize,
        decision: Decision,
    ) -> DecisionResult {
        ApprovalEvaluator::decide(
            ExpenseId::new(),
            status,
            rows,
            rules,
            rows[idx].id,
            decision,
            rows[idx].approver_id,
        )
        .unwrap()
    }

    #[test]
    fn test_manager_then_admin_without_rules() {
        let rows = vec![row(1), row(2)];

        let first = step(ExpenseStatus::Pending, &rows, &[], 0, Decision::Approved);
        assert_eq!(first.evaluation.status, ExpenseStatus::Pending);
        assert!(!first.evaluation.status_changed);
        assert_eq!(first.evaluation.resolution, Resolution::AwaitingApprovals);
        let next = first.evaluation.next_approver.unwrap();
        assert_eq!(next.approver_id, rows[1].approver_id);
        assert_eq!(next.sequence_order, 2);

        let second = step(first.evaluation.status, &first.rows, &[], 1, Decision::Approved);
        assert_eq!(second.evaluation.status, ExpenseStatus::Approved);
        assert!(second.evaluation.status_changed);
        assert_eq!(second.evaluation.resolution, Resolution::AllApproved);
        assert!(second.evaluation.next_approver.is_none());
    }

    #[test]
    fn test_single_manager_rejects_under_full_percentage_rule() {
        let rows = vec![row(1)];
        let rules = vec![percentage(dec!(100))];

        let result = step(ExpenseStatus::Pending, &rows, &rules, 0, Decision::Rejected);

        assert_eq!(result.evaluation.status, ExpenseStatus::Rejected);
        assert_eq!(result.evaluation.resolution, Resolution::AnyRejected);
    }

    #[test]
    fn test_percentage_rule_boundary() {
        let mut rows: Vec<ApprovalRow> = (1..=5).map(row).collect();
        let rules = vec![percentage(dec!(60))];
        rows[0].status = ApprovalStatus::Approved;

        let second = step(ExpenseStatus::Pending, &rows, &rules, 1, Decision::Approved);
        assert_eq!(second.evaluation.status, ExpenseStatus::Pending);

        let third = step(second.evaluation.status, &second.rows, &rules, 2, Decision::Approved);
        assert_eq!(third.evaluation.status, ExpenseStatus::Approved);
        assert_eq!(
            third.evaluation.resolution,
            Resolution::ConditionalRule(rules[0].id)
        );
    }

    #[test]
    fn test_specific_approver_finalizes_immediately() {
        let rows = vec![row(1), row(2), row(3)];
        let rules = vec![specific(rows[2].approver_id)];

        let result = step(ExpenseStatus::Pending, &rows, &rules, 2, Decision::Approved);

        assert_eq!(result.evaluation.status, ExpenseStatus::Approved);
        assert_eq!(
            result.evaluation.resolution,
            Resolution::ConditionalRule(rules[0].id)
        );
    }

    #[test]
    fn test_specific_approver_outside_chain_short_circuits() {
        let cfo = UserId::new();
        let rows = vec![row(1), row(2)];
        let rules = vec![specific(cfo)];

        let result = ApprovalEvaluator::decide(
            ExpenseId::new(),
            ExpenseStatus::Pending,
            &rows,
            &rules,
            rows[0].id,
            Decision::Approved,
            cfo,
        )
        .unwrap();

        assert_eq!(result.evaluation.status, ExpenseStatus::Approved);
    }

    #[test]
    fn test_rejection_wins_over_earlier_approvals_without_rule() {
        let mut rows = vec![row(1), row(2), row(3)];
        rows[0].status = ApprovalStatus::Approved;
        rows[1].status = ApprovalStatus::Approved;
        let rules = vec![percentage(dec!(100))];

        let result = step(ExpenseStatus::Pending, &rows, &rules, 2, Decision::Rejected);

        assert_eq!(result.evaluation.status, ExpenseStatus::Rejected);
    }

    #[test]
    fn test_rule_match_beats_rejection() {
        let mut rows = vec![row(1), row(2), row(3)];
        rows[0].status = ApprovalStatus::Rejected;
        rows[1].status = ApprovalStatus::Approved;
        let rules = vec![percentage(dec!(50))];

        // The row was rejected earlier, so the expense would already be
        // rejected; evaluate directly to check ordering only.
        let decided = ApprovalRow {
            status: ApprovalStatus::Approved,
            ..rows[2]
        };
        rows[2] = decided;
        let evaluation = ApprovalEvaluator::evaluate(
            ExpenseStatus::Pending,
            &rows,
            &rules,
            &decided,
            Decision::Approved,
            decided.approver_id,
        );

        assert_eq!(evaluation.status, ExpenseStatus::Approved);
    }

    #[test]
    fn test_replay_is_noop() {
        let rows = vec![row(1), row(2)];

        let first = step(ExpenseStatus::Pending, &rows, &[], 0, Decision::Approved);
        let replay = step(first.evaluation.status, &first.rows, &[], 0, Decision::Approved);

        assert_eq!(replay.check, DecisionCheck::Replay);
        assert_eq!(replay.evaluation.status, first.evaluation.status);
        assert!(!replay.evaluation.status_changed);
        assert_eq!(replay.rows, first.rows);
    }

    #[test]
    fn test_changing_a_decision_is_refused() {
        let rows = vec![row(1), row(2)];
        let first = step(ExpenseStatus::Pending, &rows, &[], 0, Decision::Approved);

        let result = ApprovalEvaluator::decide(
            ExpenseId::new(),
            first.evaluation.status,
            &first.rows,
            &[],
            rows[0].id,
            Decision::Rejected,
            rows[0].approver_id,
        );

        assert!(matches!(
            result,
            Err(WorkflowError::InvalidTransition {
                from: ApprovalStatus::Approved,
                to: ApprovalStatus::Rejected,
            })
        ));
    }

    #[test]
    fn test_terminal_expense_refuses_pending_rows() {
        let rows = vec![row(1), row(2)];
        let result = ApprovalEvaluator::decide(
            ExpenseId::new(),
            ExpenseStatus::Approved,
            &rows,
            &[],
            rows[1].id,
            Decision::Rejected,
            rows[1].approver_id,
        );

        assert!(matches!(
            result,
            Err(WorkflowError::ExpenseFinalized {
                status: ExpenseStatus::Approved,
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_approval_row() {
        let rows = vec![row(1)];
        let result = ApprovalEvaluator::decide(
            ExpenseId::new(),
            ExpenseStatus::Pending,
            &rows,
            &[],
            ExpenseApprovalId::new(),
            Decision::Approved,
            UserId::new(),
        );

        assert!(matches!(result, Err(WorkflowError::ApprovalNotFound(_))));
    }

    #[test]
    fn test_no_next_approver_after_rejection() {
        let rows = vec![row(1), row(2), row(3)];
        let rules = vec![percentage(dec!(100))];
        let mut skipped = rows.clone();
        skipped[0].status = ApprovalStatus::Approved;

        let result = step(ExpenseStatus::Pending, &skipped, &rules, 1, Decision::Rejected);
        assert!(result.evaluation.next_approver.is_none());
    }

    #[test]
    fn test_next_approver_skips_decided_rows() {
        let mut rows = vec![row(1), row(2), row(3)];
        rows[1].status = ApprovalStatus::Approved;

        assert!(ApprovalEvaluator::next_approver(&rows, 1).is_none());
        assert_eq!(
            ApprovalEvaluator::next_approver(&rows, 2).map(|n| n.approver_id),
            Some(rows[2].approver_id)
        );
    }

    fn member(company_id: CompanyId, id: UserId, role: ApproverRole) -> DirectoryUser {
        DirectoryUser {
            id,
            company_id,
            role,
        }
    }

    #[test]
    fn test_authorize_requires_same_company() {
        let company = CompanyId::new();
        let rows = vec![row(1)];
        let approver = member(company, rows[0].approver_id, ApproverRole::Manager);
        let outsider = DirectoryUser {
            company_id: CompanyId::new(),
            ..approver
        };

        assert!(ApprovalEvaluator::authorize(&approver, company, &rows[0], &[]).is_ok());
        assert!(matches!(
            ApprovalEvaluator::authorize(&outsider, company, &rows[0], &[]),
            Err(WorkflowError::NotAuthorizedToDecide { .. })
        ));
    }

    #[test]
    fn test_submitter_cannot_decide_managers_row() {
        let company = CompanyId::new();
        let manager_row = row(1);
        let submitter = member(company, UserId::new(), ApproverRole::Employee);
        let rules = vec![percentage(dec!(50))];

        let result = ApprovalEvaluator::authorize(&submitter, company, &manager_row, &rules);

        assert!(matches!(
            result,
            Err(WorkflowError::NotAuthorizedToDecide { user_id }) if user_id == submitter.id.into_inner()
        ));
    }

    #[test]
    fn test_designated_approver_may_decide_any_row() {
        let company = CompanyId::new();
        let rows = vec![row(1), row(2)];
        let cfo = member(company, UserId::new(), ApproverRole::Admin);
        let hybrid = ApprovalRule {
            rule_type: RuleType::Hybrid,
            percentage_threshold: Some(dec!(60)),
            ..specific(cfo.id)
        };

        for rules in [vec![specific(cfo.id)], vec![hybrid]] {
            for r in &rows {
                assert!(ApprovalEvaluator::authorize(&cfo, company, r, &rules).is_ok());
            }
        }
    }

    #[test]
    fn test_inactive_designation_grants_nothing() {
        let company = CompanyId::new();
        let rows = vec![row(1)];
        let cfo = member(company, UserId::new(), ApproverRole::Admin);
        let inactive = ApprovalRule {
            is_active: false,
            ..specific(cfo.id)
        };

        assert!(matches!(
            ApprovalEvaluator::authorize(&cfo, company, &rows[0], &[inactive]),
            Err(WorkflowError::NotAuthorizedToDecide { .. })
        ));
    }
}
