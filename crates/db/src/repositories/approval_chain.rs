//! Approval chain repository.
//!
//! CRUD for a company's ordered approver roles, plus atomic reordering.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use outlay_core::workflow::{ApproverRole, ChainService, ChainStep, WorkflowError};
use outlay_shared::types::{ChainStepId, CompanyId};

use crate::entities::approval_chain_steps::{self, ActiveModel, Entity as ChainStepEntity, Model};

use super::db_err;

/// Input for adding a chain step.
#[derive(Debug, Clone)]
pub struct AddChainStepInput {
    /// Role to resolve.
    pub approver_role: ApproverRole,
    /// Explicit position; appended to the end when absent.
    pub sequence_order: Option<i32>,
}

/// Input for changing a chain step.
#[derive(Debug, Clone, Default)]
pub struct UpdateChainStepInput {
    /// New role.
    pub approver_role: Option<ApproverRole>,
    /// New position.
    pub sequence_order: Option<i32>,
}

/// Converts a stored step into the engine's view.
#[must_use]
pub fn to_chain_step(model: &Model) -> ChainStep {
    ChainStep {
        id: ChainStepId::from_uuid(model.id),
        approver_role: model.approver_role.into(),
        sequence_order: model.sequence_order,
    }
}

/// Loads a company's chain, ascending by sequence order.
pub async fn load_chain<C: ConnectionTrait>(
    conn: &C,
    company_id: CompanyId,
) -> Result<Vec<Model>, WorkflowError> {
    ChainStepEntity::find()
        .filter(approval_chain_steps::Column::CompanyId.eq(company_id.into_inner()))
        .order_by_asc(approval_chain_steps::Column::SequenceOrder)
        .all(conn)
        .await
        .map_err(db_err)
}

/// Repository for approval chain steps.
#[derive(Debug, Clone)]
pub struct ApprovalChainRepository {
    db: DatabaseConnection,
}

impl ApprovalChainRepository {
    /// Creates a new approval chain repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists a company's chain steps, ascending.
    pub async fn list_steps(&self, company_id: CompanyId) -> Result<Vec<Model>, WorkflowError> {
        load_chain(&self.db, company_id).await
    }

    /// Gets one chain step.
    pub async fn get_step(
        &self,
        company_id: CompanyId,
        step_id: ChainStepId,
    ) -> Result<Model, WorkflowError> {
        ChainStepEntity::find_by_id(step_id.into_inner())
            .filter(approval_chain_steps::Column::CompanyId.eq(company_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(WorkflowError::ChainStepNotFound(step_id.into_inner()))
    }

    /// Adds a step to the chain.
    pub async fn add_step(
        &self,
        company_id: CompanyId,
        input: AddChainStepInput,
    ) -> Result<Model, WorkflowError> {
        let existing: Vec<ChainStep> = self
            .list_steps(company_id)
            .await?
            .iter()
            .map(to_chain_step)
            .collect();

        let sequence_order = input
            .sequence_order
            .unwrap_or_else(|| ChainService::next_sequence_order(&existing));
        ChainService::validate_placement(&existing, sequence_order, None)?;

        let now = Utc::now();
        let step = ActiveModel {
            id: Set(Uuid::now_v7()),
            company_id: Set(company_id.into_inner()),
            approver_role: Set(input.approver_role.into()),
            sequence_order: Set(sequence_order),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let saved = step
            .insert(&self.db)
            .await
            .map_err(|e| order_err(e, sequence_order))?;

        tracing::info!(
            company_id = %company_id,
            step_id = %saved.id,
            role = %input.approver_role,
            sequence_order,
            "Chain step added"
        );

        Ok(saved)
    }

    /// Changes a step's role and/or position.
    pub async fn update_step(
        &self,
        company_id: CompanyId,
        step_id: ChainStepId,
        input: UpdateChainStepInput,
    ) -> Result<Model, WorkflowError> {
        let current = self.get_step(company_id, step_id).await?;
        let target_order = input.sequence_order.unwrap_or(current.sequence_order);

        let mut step: ActiveModel = current.into();

        if let Some(sequence_order) = input.sequence_order {
            let existing: Vec<ChainStep> = self
                .list_steps(company_id)
                .await?
                .iter()
                .map(to_chain_step)
                .collect();
            ChainService::validate_placement(&existing, sequence_order, Some(step_id))?;
            step.sequence_order = Set(sequence_order);
        }
        if let Some(role) = input.approver_role {
            step.approver_role = Set(role.into());
        }
        step.updated_at = Set(Utc::now().into());

        step.update(&self.db)
            .await
            .map_err(|e| order_err(e, target_order))
    }

    /// Removes a step from the chain.
    ///
    /// Existing expenses keep their approval rows.
    pub async fn remove_step(
        &self,
        company_id: CompanyId,
        step_id: ChainStepId,
    ) -> Result<(), WorkflowError> {
        let result = ChainStepEntity::delete_many()
            .filter(approval_chain_steps::Column::Id.eq(step_id.into_inner()))
            .filter(approval_chain_steps::Column::CompanyId.eq(company_id.into_inner()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(WorkflowError::ChainStepNotFound(step_id.into_inner()));
        }
        Ok(())
    }

    /// Renumbers the chain to 1..n in the given order, atomically.
    ///
    /// Rows are first parked on negative orders so the unique
    /// `(company_id, sequence_order)` constraint never sees a collision.
    pub async fn reorder(
        &self,
        company_id: CompanyId,
        ordered_ids: &[ChainStepId],
    ) -> Result<Vec<Model>, WorkflowError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let locked = ChainStepEntity::find()
            .filter(approval_chain_steps::Column::CompanyId.eq(company_id.into_inner()))
            .lock_exclusive()
            .all(&txn)
            .await
            .map_err(db_err)?;
        let existing: Vec<ChainStep> = locked.iter().map(to_chain_step).collect();

        let assignments = ChainService::renumber(&existing, ordered_ids)?;
        let now = Utc::now();

        for (id, order) in &assignments {
            set_order(&txn, *id, -*order, now).await?;
        }
        for (id, order) in &assignments {
            set_order(&txn, *id, *order, now).await?;
        }

        let steps = load_chain(&txn, company_id).await?;
        txn.commit().await.map_err(db_err)?;

        tracing::info!(company_id = %company_id, steps = steps.len(), "Chain reordered");

        Ok(steps)
    }
}

/// Maps a unique violation on `(company_id, sequence_order)` to
/// `DuplicateSequenceOrder`.
fn order_err(err: DbErr, sequence_order: i32) -> WorkflowError {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        WorkflowError::DuplicateSequenceOrder(sequence_order)
    } else {
        db_err(err)
    }
}

async fn set_order<C: ConnectionTrait>(
    conn: &C,
    id: ChainStepId,
    order: i32,
    now: chrono::DateTime<Utc>,
) -> Result<(), WorkflowError> {
    ChainStepEntity::update_many()
        .set(ActiveModel {
            sequence_order: Set(order),
            updated_at: Set(now.into()),
            ..Default::default()
        })
        .filter(approval_chain_steps::Column::Id.eq(id.into_inner()))
        .exec(conn)
        .await
        .map_err(db_err)?;
    Ok(())
}
