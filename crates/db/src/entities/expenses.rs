//! `SeaORM` Entity for expenses table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::ExpenseStatusDb;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub submitter_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    pub currency: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub expense_date: Date,
    pub status: ExpenseStatusDb,
    /// Bumped on every status write; guards lost updates.
    pub version: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::companies::Entity",
        from = "Column::CompanyId",
        to = "super::companies::Column::Id"
    )]
    Companies,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::SubmitterId",
        to = "super::users::Column::Id"
    )]
    Submitter,
    #[sea_orm(has_many = "super::expense_approvals::Entity")]
    ExpenseApprovals,
    #[sea_orm(has_many = "super::expense_approval_rules::Entity")]
    ExpenseApprovalRules,
}

impl Related<super::companies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Companies.def()
    }
}

impl Related<super::expense_approvals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseApprovals.def()
    }
}

impl Related<super::expense_approval_rules::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseApprovalRules.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
