//! `SeaORM` active enums backed by Postgres enum types.
//!
//! Each enum converts to and from its `outlay-core` counterpart so
//! repositories never compare raw strings.

use outlay_core::workflow::{ApprovalStatus, ApproverRole, ExpenseStatus, RuleType};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "user_role")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "manager")]
    Manager,
    #[sea_orm(string_value = "employee")]
    Employee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "approval_rule_type")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalRuleType {
    #[sea_orm(string_value = "percentage")]
    Percentage,
    #[sea_orm(string_value = "specific_approver")]
    SpecificApprover,
    #[sea_orm(string_value = "hybrid")]
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "expense_status")]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatusDb {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "approval_status")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatusDb {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl From<UserRole> for ApproverRole {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::Admin => Self::Admin,
            UserRole::Manager => Self::Manager,
            UserRole::Employee => Self::Employee,
        }
    }
}

impl From<ApproverRole> for UserRole {
    fn from(role: ApproverRole) -> Self {
        match role {
            ApproverRole::Admin => Self::Admin,
            ApproverRole::Manager => Self::Manager,
            ApproverRole::Employee => Self::Employee,
        }
    }
}

impl From<ApprovalRuleType> for RuleType {
    fn from(rule_type: ApprovalRuleType) -> Self {
        match rule_type {
            ApprovalRuleType::Percentage => Self::Percentage,
            ApprovalRuleType::SpecificApprover => Self::SpecificApprover,
            ApprovalRuleType::Hybrid => Self::Hybrid,
        }
    }
}

impl From<RuleType> for ApprovalRuleType {
    fn from(rule_type: RuleType) -> Self {
        match rule_type {
            RuleType::Percentage => Self::Percentage,
            RuleType::SpecificApprover => Self::SpecificApprover,
            RuleType::Hybrid => Self::Hybrid,
        }
    }
}

impl From<ExpenseStatusDb> for ExpenseStatus {
    fn from(status: ExpenseStatusDb) -> Self {
        match status {
            ExpenseStatusDb::Pending => Self::Pending,
            ExpenseStatusDb::Approved => Self::Approved,
            ExpenseStatusDb::Rejected => Self::Rejected,
        }
    }
}

impl From<ExpenseStatus> for ExpenseStatusDb {
    fn from(status: ExpenseStatus) -> Self {
        match status {
            ExpenseStatus::Pending => Self::Pending,
            ExpenseStatus::Approved => Self::Approved,
            ExpenseStatus::Rejected => Self::Rejected,
        }
    }
}

impl From<ApprovalStatusDb> for ApprovalStatus {
    fn from(status: ApprovalStatusDb) -> Self {
        match status {
            ApprovalStatusDb::Pending => Self::Pending,
            ApprovalStatusDb::Approved => Self::Approved,
            ApprovalStatusDb::Rejected => Self::Rejected,
        }
    }
}

impl From<ApprovalStatus> for ApprovalStatusDb {
    fn from(status: ApprovalStatus) -> Self {
        match status {
            ApprovalStatus::Pending => Self::Pending,
            ApprovalStatus::Approved => Self::Approved,
            ApprovalStatus::Rejected => Self::Rejected,
        }
    }
}
