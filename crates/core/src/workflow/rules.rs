//! Conditional approval rules.
//!
//! A rule can short-circuit the sequential chain to an immediate approval.
//! Rules never force a rejection. Percentages are compared with decimal
//! arithmetic by cross-multiplying, so no division or rounding is involved.

use outlay_shared::types::{ApprovalRuleId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::workflow::error::WorkflowError;
use crate::workflow::types::{Decision, RuleType};

/// Evaluation-relevant fields of a rule.
///
/// Built either from a live company rule or from the snapshot row copied
/// onto an expense at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRule {
    /// Source rule id.
    pub id: ApprovalRuleId,
    /// Rule kind.
    pub rule_type: RuleType,
    /// Required share of approvals, 0..=100.
    pub percentage_threshold: Option<Decimal>,
    /// Designated approver.
    pub specific_approver_id: Option<UserId>,
    /// Inactive rules are ignored by the evaluator.
    pub is_active: bool,
}

/// Approval counts over every approval row of an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApprovalTally {
    /// Rows with status approved.
    pub approved: usize,
    /// All rows, whatever their status.
    pub total: usize,
}

impl ApprovalTally {
    /// Returns true if `approved / total * 100 >= threshold`.
    ///
    /// A missing or zero threshold counts as not configured, and an expense
    /// without approval rows never meets a threshold.
    #[must_use]
    pub fn meets(&self, threshold: Option<Decimal>) -> bool {
        let Some(threshold) = threshold.filter(|t| !t.is_zero()) else {
            return false;
        };
        if self.total == 0 {
            return false;
        }
        let approved = Decimal::from(self.approved) * Decimal::ONE_HUNDRED;
        let required = threshold * Decimal::from(self.total);
        approved >= required
    }
}

/// Decimal places stored for a percentage threshold.
const THRESHOLD_SCALE: u32 = 2;

/// Validates rule configuration before it is stored.
pub struct RuleValidator;

impl RuleValidator {
    /// Checks threshold bounds and precision, and the fields each rule type
    /// depends on.
    pub fn validate(
        rule_type: RuleType,
        percentage_threshold: Option<Decimal>,
        specific_approver_id: Option<UserId>,
    ) -> Result<(), WorkflowError> {
        if let Some(threshold) = percentage_threshold
            && (threshold < Decimal::ZERO
                || threshold > Decimal::ONE_HUNDRED
                || threshold.normalize().scale() > THRESHOLD_SCALE)
        {
            return Err(WorkflowError::InvalidThreshold(threshold));
        }

        match rule_type {
            RuleType::Percentage if percentage_threshold.is_none() => {
                Err(WorkflowError::MissingRuleField {
                    rule_type,
                    field: "percentage_threshold",
                })
            }
            RuleType::SpecificApprover if specific_approver_id.is_none() => {
                Err(WorkflowError::MissingRuleField {
                    rule_type,
                    field: "specific_approver_id",
                })
            }
            RuleType::Hybrid if percentage_threshold.is_none() && specific_approver_id.is_none() => {
                Err(WorkflowError::MissingRuleField {
                    rule_type,
                    field: "percentage_threshold or specific_approver_id",
                })
            }
            _ => Ok(()),
        }
    }
}

/// Stateless matcher for conditional rules.
pub struct RuleMatcher;

impl RuleMatcher {
    /// Returns true if the acting user is the rule's designated approver and
    /// the decision approves.
    #[must_use]
    pub fn specific_condition(rule: &ApprovalRule, acting_user: UserId, decision: Decision) -> bool {
        decision == Decision::Approved && rule.specific_approver_id == Some(acting_user)
    }

    /// Returns true if the rule's percentage threshold is met.
    #[must_use]
    pub fn percentage_condition(rule: &ApprovalRule, tally: ApprovalTally) -> bool {
        tally.meets(rule.percentage_threshold)
    }

    /// Returns true if the rule says the expense should be approved.
    #[must_use]
    pub fn matches(
        rule: &ApprovalRule,
        tally: ApprovalTally,
        acting_user: UserId,
        decision: Decision,
    ) -> bool {
        match rule.rule_type {
            RuleType::Percentage => Self::percentage_condition(rule, tally),
            RuleType::SpecificApprover => Self::specific_condition(rule, acting_user, decision),
            RuleType::Hybrid => {
                Self::specific_condition(rule, acting_user, decision)
                    || Self::percentage_condition(rule, tally)
            }
        }
    }

    /// First active rule that matches, in the given order.
    #[must_use]
    pub fn first_match(
        rules: &[ApprovalRule],
        tally: ApprovalTally,
        acting_user: UserId,
        decision: Decision,
    ) -> Option<ApprovalRuleId> {
        rules
            .iter()
            .filter(|r| r.is_active)
            .find(|r| Self::matches(r, tally, acting_user, decision))
            .map(|r| r.id)
    }
}
