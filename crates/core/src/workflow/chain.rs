//! Approval chain ordering.
//!
//! A company's chain is an ordered list of approver roles. Sequence orders
//! start at 1 and are unique within a company.

use std::collections::HashSet;

use outlay_shared::types::ChainStepId;
use serde::{Deserialize, Serialize};

use crate::workflow::error::WorkflowError;
use crate::workflow::types::ApproverRole;

/// One role slot in a company's approval chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStep {
    /// Step id.
    pub id: ChainStepId,
    /// Role resolved to a concrete approver at instantiation.
    pub approver_role: ApproverRole,
    /// Position in the chain, 1-based.
    pub sequence_order: i32,
}

/// Stateless checks and computations over a company's chain.
pub struct ChainService;

impl ChainService {
    /// Rejects sequence orders below 1.
    pub fn validate_sequence_order(sequence_order: i32) -> Result<(), WorkflowError> {
        if sequence_order < 1 {
            return Err(WorkflowError::InvalidSequenceOrder(sequence_order));
        }
        Ok(())
    }

    /// Validates a new or moved step against the existing chain.
    ///
    /// `moving` is the step being changed, which may keep its own order.
    pub fn validate_placement(
        existing: &[ChainStep],
        sequence_order: i32,
        moving: Option<ChainStepId>,
    ) -> Result<(), WorkflowError> {
        Self::validate_sequence_order(sequence_order)?;

        let taken = existing
            .iter()
            .any(|s| s.sequence_order == sequence_order && Some(s.id) != moving);
        if taken {
            return Err(WorkflowError::DuplicateSequenceOrder(sequence_order));
        }
        Ok(())
    }

    /// Sequence order for a step appended at the end of the chain.
    #[must_use]
    pub fn next_sequence_order(existing: &[ChainStep]) -> i32 {
        existing
            .iter()
            .map(|s| s.sequence_order)
            .max()
            .map_or(1, |max| max.saturating_add(1))
    }

    /// Returns the steps sorted ascending by sequence order.
    #[must_use]
    pub fn ordered(mut steps: Vec<ChainStep>) -> Vec<ChainStep> {
        steps.sort_by_key(|s| (s.sequence_order, s.id));
        steps
    }

    /// Computes the new sequence orders for a reorder request.
    ///
    /// `ordered_ids` must list every existing step exactly once. The result
    /// assigns 1..=n in the requested order.
    pub fn renumber(
        existing: &[ChainStep],
        ordered_ids: &[ChainStepId],
    ) -> Result<Vec<(ChainStepId, i32)>, WorkflowError> {
        let known: HashSet<ChainStepId> = existing.iter().map(|s| s.id).collect();
        let mut seen = HashSet::with_capacity(ordered_ids.len());

        for id in ordered_ids {
            if !known.contains(id) {
                return Err(WorkflowError::InvalidReorder(format!(
                    "step {id} does not belong to this chain"
                )));
            }
            if !seen.insert(*id) {
                return Err(WorkflowError::InvalidReorder(format!(
                    "step {id} listed more than once"
                )));
            }
        }

        if seen.len() != known.len() {
            return Err(WorkflowError::InvalidReorder(format!(
                "expected {} steps, got {}",
                known.len(),
                seen.len()
            )));
        }

        ordered_ids
            .iter()
            .enumerate()
            .map(|(idx, id)| {
                let order = i32::try_from(idx + 1).map_err(|_| {
                    WorkflowError::InvalidReorder("chain is too long".to_string())
                })?;
                Ok((*id, order))
            })
            .collect()
    }
}
