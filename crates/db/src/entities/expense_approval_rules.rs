//! `SeaORM` Entity for expense_approval_rules table.
//!
//! Rule fields are copied at expense creation so later edits to
//! `approval_rules` never change how an existing expense is evaluated.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::ApprovalRuleType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "expense_approval_rules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub expense_id: Uuid,
    pub approval_rule_id: Uuid,
    pub rule_type: ApprovalRuleType,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))", nullable)]
    pub percentage_threshold: Option<Decimal>,
    pub specific_approver_id: Option<Uuid>,
    pub is_active: bool,
    pub position: i32,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id"
    )]
    Expenses,
    #[sea_orm(
        belongs_to = "super::approval_rules::Entity",
        from = "Column::ApprovalRuleId",
        to = "super::approval_rules::Column::Id"
    )]
    ApprovalRules,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
