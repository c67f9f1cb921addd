//! Entity aliases for concise queries.

pub use super::approval_chain_steps::Entity as ApprovalChainSteps;
pub use super::approval_rules::Entity as ApprovalRules;
pub use super::companies::Entity as Companies;
pub use super::expense_approval_rules::Entity as ExpenseApprovalRules;
pub use super::expense_approvals::Entity as ExpenseApprovals;
pub use super::expenses::Entity as Expenses;
pub use super::manager_relationships::Entity as ManagerRelationships;
pub use super::users::Entity as Users;
