//! Organization directory repository.
//!
//! Owns companies, users and manager relationships, and adapts them to the
//! workflow engine's [`ApproverDirectory`] seam.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use outlay_core::workflow::{ApproverDirectory, ApproverRole, DirectoryUser, WorkflowError};
use outlay_shared::types::{CompanyId, UserId};

use crate::entities::{
    companies, manager_relationships,
    sea_orm_active_enums::UserRole,
    users,
};

use super::db_err;

/// Input for creating a company.
#[derive(Debug, Clone)]
pub struct CreateCompanyInput {
    /// Company name.
    pub name: String,
    /// Country, free text.
    pub country: Option<String>,
    /// ISO currency code; defaults to USD.
    pub default_currency: Option<String>,
}

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    /// Owning company.
    pub company_id: CompanyId,
    /// Unique email.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Organizational role.
    pub role: ApproverRole,
}

/// Repository for the organization directory.
#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    db: DatabaseConnection,
}

impl DirectoryRepository {
    /// Creates a new directory repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a company.
    pub async fn create_company(
        &self,
        input: CreateCompanyInput,
    ) -> Result<companies::Model, WorkflowError> {
        let company = companies::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(input.name),
            country: Set(input.country),
            default_currency: Set(input
                .default_currency
                .map_or_else(|| "USD".to_string(), |c| c.to_uppercase())),
            created_at: Set(Utc::now().into()),
        };

        company.insert(&self.db).await.map_err(db_err)
    }

    /// Creates a user in a company.
    pub async fn create_user(&self, input: CreateUserInput) -> Result<users::Model, WorkflowError> {
        let user = users::ActiveModel {
            id: Set(Uuid::now_v7()),
            company_id: Set(input.company_id.into_inner()),
            email: Set(input.email.to_lowercase()),
            full_name: Set(input.full_name),
            role: Set(input.role.into()),
            created_at: Set(Utc::now().into()),
        };

        user.insert(&self.db).await.map_err(db_err)
    }

    /// Finds a user by id.
    pub async fn get_user(&self, user_id: UserId) -> Result<users::Model, WorkflowError> {
        users::Entity::find_by_id(user_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(WorkflowError::UserNotFound(user_id.into_inner()))
    }

    /// Resolves a user into the engine's view, if they exist.
    pub async fn resolve_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<DirectoryUser>, WorkflowError> {
        SeaOrmDirectory::new(&self.db).resolve_user(user_id).await
    }

    /// Lists a company's users, oldest first.
    pub async fn list_users(&self, company_id: CompanyId) -> Result<Vec<users::Model>, WorkflowError> {
        users::Entity::find()
            .filter(users::Column::CompanyId.eq(company_id.into_inner()))
            .order_by_asc(users::Column::CreatedAt)
            .order_by_asc(users::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    /// Lists a company's manager relationships.
    pub async fn list_manager_relationships(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<manager_relationships::Model>, WorkflowError> {
        manager_relationships::Entity::find()
            .filter(manager_relationships::Column::CompanyId.eq(company_id.into_inner()))
            .order_by_asc(manager_relationships::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    /// Assigns (or replaces) an employee's manager.
    ///
    /// Both users must belong to `company_id` and differ.
    pub async fn assign_manager(
        &self,
        company_id: CompanyId,
        employee_id: UserId,
        manager_id: UserId,
    ) -> Result<manager_relationships::Model, WorkflowError> {
        if employee_id == manager_id {
            return Err(WorkflowError::InvalidManagerAssignment(
                "an employee cannot manage themselves".to_string(),
            ));
        }

        for user_id in [employee_id, manager_id] {
            let user = self.get_user(user_id).await?;
            if user.company_id != company_id.into_inner() {
                return Err(WorkflowError::InvalidManagerAssignment(format!(
                    "user {user_id} belongs to another company"
                )));
            }
        }

        let existing = manager_relationships::Entity::find()
            .filter(manager_relationships::Column::CompanyId.eq(company_id.into_inner()))
            .filter(manager_relationships::Column::EmployeeId.eq(employee_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        let saved = if let Some(existing) = existing {
            let mut active: manager_relationships::ActiveModel = existing.into();
            active.manager_id = Set(manager_id.into_inner());
            active.update(&self.db).await.map_err(db_err)?
        } else {
            manager_relationships::ActiveModel {
                id: Set(Uuid::now_v7()),
                company_id: Set(company_id.into_inner()),
                employee_id: Set(employee_id.into_inner()),
                manager_id: Set(manager_id.into_inner()),
                created_at: Set(Utc::now().into()),
            }
            .insert(&self.db)
            .await
            .map_err(db_err)?
        };

        tracing::info!(
            company_id = %company_id,
            employee_id = %employee_id,
            manager_id = %manager_id,
            "Manager assigned"
        );

        Ok(saved)
    }

    /// Removes an employee's manager relationship.
    pub async fn remove_manager(
        &self,
        company_id: CompanyId,
        employee_id: UserId,
    ) -> Result<(), WorkflowError> {
        let result = manager_relationships::Entity::delete_many()
            .filter(manager_relationships::Column::CompanyId.eq(company_id.into_inner()))
            .filter(manager_relationships::Column::EmployeeId.eq(employee_id.into_inner()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(WorkflowError::ManagerRelationshipNotFound(
                employee_id.into_inner(),
            ));
        }
        Ok(())
    }
}

/// [`ApproverDirectory`] over any SeaORM connection or open transaction.
pub struct SeaOrmDirectory<'c, C> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> SeaOrmDirectory<'c, C> {
    /// Wraps a connection.
    pub const fn new(conn: &'c C) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl<C: ConnectionTrait> ApproverDirectory for SeaOrmDirectory<'_, C> {
    async fn resolve_user(&self, user_id: UserId) -> Result<Option<DirectoryUser>, WorkflowError> {
        let user = users::Entity::find_by_id(user_id.into_inner())
            .one(self.conn)
            .await
            .map_err(db_err)?;

        Ok(user.map(|u| DirectoryUser {
            id: UserId::from_uuid(u.id),
            company_id: CompanyId::from_uuid(u.company_id),
            role: u.role.into(),
        }))
    }

    async fn resolve_manager(
        &self,
        employee_id: UserId,
        company_id: CompanyId,
    ) -> Result<Option<UserId>, WorkflowError> {
        let link = manager_relationships::Entity::find()
            .filter(manager_relationships::Column::CompanyId.eq(company_id.into_inner()))
            .filter(manager_relationships::Column::EmployeeId.eq(employee_id.into_inner()))
            .one(self.conn)
            .await
            .map_err(db_err)?;

        Ok(link.map(|l| UserId::from_uuid(l.manager_id)))
    }

    async fn find_admin(&self, company_id: CompanyId) -> Result<Option<UserId>, WorkflowError> {
        let admin = users::Entity::find()
            .filter(users::Column::CompanyId.eq(company_id.into_inner()))
            .filter(users::Column::Role.eq(UserRole::Admin))
            .order_by_asc(users::Column::CreatedAt)
            .order_by_asc(users::Column::Id)
            .one(self.conn)
            .await
            .map_err(db_err)?;

        Ok(admin.map(|a| UserId::from_uuid(a.id)))
    }
}
