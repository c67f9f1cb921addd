//! `SeaORM` entity definitions.

pub mod prelude;

pub mod approval_chain_steps;
pub mod approval_rules;
pub mod companies;
pub mod expense_approval_rules;
pub mod expense_approvals;
pub mod expenses;
pub mod manager_relationships;
pub mod sea_orm_active_enums;
pub mod users;
