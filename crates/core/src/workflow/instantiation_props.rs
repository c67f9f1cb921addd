//! Property-based tests for WorkflowPlanner.

use std::collections::HashSet;

use outlay_shared::types::{ChainStepId, UserId};
use proptest::prelude::*;

use crate::workflow::chain::ChainStep;
use crate::workflow::instantiation::{DirectoryContext, WorkflowPlanner};
use crate::workflow::types::ApproverRole;

fn arb_role() -> impl Strategy<Value = ApproverRole> {
    prop_oneof![
        Just(ApproverRole::Admin),
        Just(ApproverRole::Manager),
        Just(ApproverRole::Employee),
    ]
}

/// Chains with unique sequence orders in 1..50, in arbitrary order.
fn arb_chain() -> impl Strategy<Value = Vec<ChainStep>> {
    prop::collection::btree_map(1i32..50, arb_role(), 0..8).prop_flat_map(|steps| {
        let steps: Vec<ChainStep> = steps
            .into_iter()
            .map(|(order, role)| ChainStep {
                id: ChainStepId::new(),
                approver_role: role,
                sequence_order: order,
            })
            .collect();
        Just(steps).prop_shuffle()
    })
}

/// Directory contexts where manager and admin may be missing or collide.
fn arb_context() -> impl Strategy<Value = DirectoryContext> {
    (0u8..4, 0u8..4).prop_map(|(manager, admin)| {
        let submitter = UserId::new();
        let shared = UserId::new();
        let pick = |choice: u8| match choice {
            0 => None,
            1 => Some(UserId::new()),
            2 => Some(shared),
            _ => Some(submitter),
        };
        DirectoryContext {
            submitter_id: submitter,
            manager_id: pick(manager),
            admin_id: pick(admin),
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every chain step is either assigned or reported, never both.
    #[test]
    fn prop_every_step_accounted_for(chain in arb_chain(), ctx in arb_context()) {
        let plan = WorkflowPlanner::plan(&ctx, &chain, &[]);

        prop_assert!(plan.approvals.len() <= chain.len());
        prop_assert_eq!(plan.approvals.len() + plan.unresolved.len(), chain.len());
    }

    /// No approver holds two rows on one expense.
    #[test]
    fn prop_approvers_unique(chain in arb_chain(), ctx in arb_context()) {
        let plan = WorkflowPlanner::plan(&ctx, &chain, &[]);

        let approvers: HashSet<UserId> = plan.approvals.iter().map(|a| a.approver_id).collect();
        prop_assert_eq!(approvers.len(), plan.approvals.len());
    }

    /// Assigned sequence orders come from the chain and are ascending.
    #[test]
    fn prop_orders_come_from_chain(chain in arb_chain(), ctx in arb_context()) {
        let plan = WorkflowPlanner::plan(&ctx, &chain, &[]);

        let chain_orders: HashSet<i32> = chain.iter().map(|s| s.sequence_order).collect();
        let orders: Vec<i32> = plan.approvals.iter().map(|a| a.sequence_order).collect();

        prop_assert!(orders.iter().all(|o| chain_orders.contains(o)));
        prop_assert!(orders.windows(2).all(|w| w[0] < w[1]));
    }

    /// Each assigned approver matches the role of its step.
    #[test]
    fn prop_roles_resolve_to_context(chain in arb_chain(), ctx in arb_context()) {
        let plan = WorkflowPlanner::plan(&ctx, &chain, &[]);

        for approval in &plan.approvals {
            let expected = match approval.role {
                ApproverRole::Employee => Some(ctx.submitter_id),
                ApproverRole::Manager => ctx.manager_id,
                ApproverRole::Admin => ctx.admin_id,
            };
            prop_assert_eq!(Some(approval.approver_id), expected);
        }
    }
}
