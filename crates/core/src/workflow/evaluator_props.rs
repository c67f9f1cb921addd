//! Property-based tests for ApprovalEvaluator.

use outlay_shared::types::{ApprovalRuleId, ExpenseApprovalId, ExpenseId, UserId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::workflow::error::WorkflowError;
use crate::workflow::evaluator::{ApprovalEvaluator, ApprovalRow, DecisionCheck};
use crate::workflow::rules::ApprovalRule;
use crate::workflow::types::{ApprovalStatus, Decision, ExpenseStatus, RuleType};

fn arb_decision() -> impl Strategy<Value = Decision> {
    prop_oneof![Just(Decision::Approved), Just(Decision::Rejected)]
}

/// A chain of 1..8 pending rows and a sequence of (row index, decision).
fn arb_session() -> impl Strategy<Value = (usize, Vec<(usize, Decision)>)> {
    (1usize..8).prop_flat_map(|n| {
        (
            Just(n),
            prop::collection::vec((0..n, arb_decision()), 1..16),
        )
    })
}

fn pending_rows(n: usize) -> Vec<ApprovalRow> {
    (1..=n)
        .map(|order| ApprovalRow {
            id: ExpenseApprovalId::new(),
            approver_id: UserId::new(),
            status: ApprovalStatus::Pending,
            sequence_order: i32::try_from(order).unwrap(),
        })
        .collect()
}

fn percentage_rule(threshold: u32) -> ApprovalRule {
    ApprovalRule {
        id: ApprovalRuleId::new(),
        rule_type: RuleType::Percentage,
        percentage_threshold: Some(Decimal::from(threshold)),
        specific_approver_id: None,
        is_active: true,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Once an expense leaves pending, no decision ever changes its status.
    #[test]
    fn prop_terminal_status_is_final(
        (n, decisions) in arb_session(),
        threshold in 0u32..=100,
    ) {
        let expense_id = ExpenseId::new();
        let rules = vec![percentage_rule(threshold)];
        let mut rows = pending_rows(n);
        let mut status = ExpenseStatus::Pending;
        let mut finalized: Option<ExpenseStatus> = None;

        for (idx, decision) in decisions {
            let row = rows[idx];
            match ApprovalEvaluator::decide(
                expense_id, status, &rows, &rules, row.id, decision, row.approver_id,
            ) {
                Ok(result) => {
                    if let Some(final_status) = finalized {
                        prop_assert_eq!(result.check, DecisionCheck::Replay);
                        prop_assert_eq!(result.evaluation.status, final_status);
                    }
                    rows = result.rows;
                    status = result.evaluation.status;
                    if status.is_terminal() && finalized.is_none() {
                        finalized = Some(status);
                    }
                }
                Err(WorkflowError::ExpenseFinalized { status: s, .. }) => {
                    prop_assert_eq!(Some(s), finalized);
                }
                Err(WorkflowError::InvalidTransition { from, .. }) => {
                    prop_assert!(from.is_decided());
                }
                Err(other) => prop_assert!(false, "unexpected error: {other}"),
            }
        }
    }

    /// Replaying a decision leaves rows and status untouched.
    #[test]
    fn prop_replay_is_idempotent(
        n in 1usize..8,
        idx_seed in any::<usize>(),
        decision in arb_decision(),
    ) {
        let expense_id = ExpenseId::new();
        let rows = pending_rows(n);
        let row = rows[idx_seed % n];

        let first = ApprovalEvaluator::decide(
            expense_id, ExpenseStatus::Pending, &rows, &[], row.id, decision, row.approver_id,
        ).unwrap();
        let replay = ApprovalEvaluator::decide(
            expense_id, first.evaluation.status, &first.rows, &[], row.id, decision, row.approver_id,
        ).unwrap();

        prop_assert_eq!(replay.check, DecisionCheck::Replay);
        prop_assert_eq!(replay.evaluation.status, first.evaluation.status);
        prop_assert!(!replay.evaluation.status_changed);
        prop_assert_eq!(replay.rows, first.rows);
    }

    /// Without rules the status is approved iff every row approved and
    /// rejected iff any row rejected.
    #[test]
    fn prop_no_rules_status_follows_rows((n, decisions) in arb_session()) {
        let expense_id = ExpenseId::new();
        let mut rows = pending_rows(n);
        let mut status = ExpenseStatus::Pending;

        for (idx, decision) in decisions {
            let row = rows[idx];
            if let Ok(result) = ApprovalEvaluator::decide(
                expense_id, status, &rows, &[], row.id, decision, row.approver_id,
            ) {
                rows = result.rows;
                status = result.evaluation.status;

                let all_approved = rows.iter().all(|r| r.status == ApprovalStatus::Approved);
                let any_rejected = rows.iter().any(|r| r.status == ApprovalStatus::Rejected);
                if result.check == DecisionCheck::Apply {
                    prop_assert_eq!(status == ExpenseStatus::Approved, all_approved);
                    prop_assert_eq!(status == ExpenseStatus::Rejected, any_rejected && !all_approved);
                }
            }
        }
    }

    /// A decision never adds or removes approval rows.
    #[test]
    fn prop_row_count_is_stable((n, decisions) in arb_session()) {
        let expense_id = ExpenseId::new();
        let mut rows = pending_rows(n);
        let mut status = ExpenseStatus::Pending;

        for (idx, decision) in decisions {
            let row = rows[idx];
            if let Ok(result) = ApprovalEvaluator::decide(
                expense_id, status, &rows, &[], row.id, decision, row.approver_id,
            ) {
                prop_assert_eq!(result.rows.len(), n);
                rows = result.rows;
                status = result.evaluation.status;
            }
        }
    }
}
