//! Workflow domain types for expense approval.
//!
//! Status enums, roles and rule kinds shared by the chain, rule, planner and
//! evaluator modules. Wire values are lowercase `snake_case`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an expense.
///
/// The only transitions are:
/// - Pending → Approved
/// - Pending → Rejected
///
/// Approved and Rejected are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    /// Waiting on approvals or a conditional rule.
    Pending,
    /// Finally approved.
    Approved,
    /// Finally rejected.
    Rejected,
}

impl ExpenseStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true once the expense can no longer change status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a single approver's slot on an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// The approver has not decided yet.
    Pending,
    /// The approver approved.
    Approved,
    /// The approver rejected.
    Rejected,
}

impl ApprovalStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true if the approver has already decided.
    #[must_use]
    pub fn is_decided(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A decision an approver can submit.
///
/// Narrower than [`ApprovalStatus`]: "pending" is never a valid decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Approve the expense.
    Approved,
    /// Reject the expense.
    Rejected,
}

impl Decision {
    /// Returns the string representation of the decision.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a decision, refusing "pending".
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// The approval row status this decision produces.
    #[must_use]
    pub fn as_status(&self) -> ApprovalStatus {
        match self {
            Self::Approved => ApprovalStatus::Approved,
            Self::Rejected => ApprovalStatus::Rejected,
        }
    }

    /// Stamps the decision with its comment and the current time.
    #[must_use]
    pub fn record(self, comments: Option<String>) -> DecisionRecord {
        DecisionRecord {
            decision: self,
            comments: comments.filter(|c| !c.trim().is_empty()),
            decided_at: Utc::now(),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Audit data written to the approval row when a decision is applied.
#[derive(Debug, Clone)]
pub struct DecisionRecord {
    /// The decision.
    pub decision: Decision,
    /// Approver comment; blank comments are dropped.
    pub comments: Option<String>,
    /// When the decision was taken.
    pub decided_at: DateTime<Utc>,
}

/// Role a chain step resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverRole {
    /// Any admin of the company.
    Admin,
    /// The submitter's manager.
    Manager,
    /// The submitter themselves.
    Employee,
}

impl ApproverRole {
    /// Parse a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "manager" => Some(Self::Manager),
            "employee" => Some(Self::Employee),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Employee => "employee",
        }
    }
}

impl fmt::Display for ApproverRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of conditional approval rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Approve once a share of approvers has approved.
    Percentage,
    /// Approve as soon as one designated user approves.
    SpecificApprover,
    /// Either of the above.
    Hybrid,
}

impl RuleType {
    /// Parse a rule type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "percentage" => Some(Self::Percentage),
            "specific_approver" => Some(Self::SpecificApprover),
            "hybrid" => Some(Self::Hybrid),
            _ => None,
        }
    }

    /// Returns the string representation of the rule type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::SpecificApprover => "specific_approver",
            Self::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expense_status_round_trip_and_terminality() {
        assert_eq!(ExpenseStatus::parse("PENDING"), Some(ExpenseStatus::Pending));
        assert_eq!(ExpenseStatus::parse("approved"), Some(ExpenseStatus::Approved));
        assert_eq!(ExpenseStatus::parse("Rejected"), Some(ExpenseStatus::Rejected));
        assert_eq!(ExpenseStatus::parse("draft"), None);

        assert!(!ExpenseStatus::Pending.is_terminal());
        assert!(ExpenseStatus::Approved.is_terminal());
        assert!(ExpenseStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_decision_refuses_pending() {
        assert_eq!(Decision::parse("approved"), Some(Decision::Approved));
        assert_eq!(Decision::parse("REJECTED"), Some(Decision::Rejected));
        assert_eq!(Decision::parse("pending"), None);
    }

    #[test]
    fn test_decision_maps_to_row_status() {
        assert_eq!(Decision::Approved.as_status(), ApprovalStatus::Approved);
        assert_eq!(Decision::Rejected.as_status(), ApprovalStatus::Rejected);
        assert!(Decision::Rejected.as_status().is_decided());
        assert!(!ApprovalStatus::Pending.is_decided());
    }

    #[test]
    fn test_decision_record_drops_blank_comments() {
        let record = Decision::Approved.record(Some("   ".to_string()));
        assert!(record.comments.is_none());

        let record = Decision::Rejected.record(Some("missing receipt".to_string()));
        assert_eq!(record.comments.as_deref(), Some("missing receipt"));
        assert_eq!(record.decision, Decision::Rejected);
    }

    #[test]
    fn test_role_and_rule_type_parse() {
        assert_eq!(ApproverRole::parse("Manager"), Some(ApproverRole::Manager));
        assert_eq!(ApproverRole::parse("owner"), None);
        assert_eq!(
            RuleType::parse("specific_approver"),
            Some(RuleType::SpecificApprover)
        );
        assert_eq!(RuleType::Hybrid.to_string(), "hybrid");
        assert_eq!(RuleType::parse("quorum"), None);
    }

    #[test]
    fn test_serde_wire_values() {
        assert_eq!(
            serde_json::to_string(&RuleType::SpecificApprover).unwrap(),
            "\"specific_approver\""
        );
        let status: ExpenseStatus = serde_json::from_str("\"rejected\"").unwrap();
        assert_eq!(status, ExpenseStatus::Rejected);
    }
}
