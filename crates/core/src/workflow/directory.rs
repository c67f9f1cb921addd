//! Organization directory seam.
//!
//! The workflow engine does not own companies, users or manager links. It
//! asks an [`ApproverDirectory`] to resolve them; the database crate provides
//! the production implementation.

use async_trait::async_trait;
use outlay_shared::types::{CompanyId, UserId};
use serde::{Deserialize, Serialize};

use crate::workflow::chain::ChainStep;
use crate::workflow::error::WorkflowError;
use crate::workflow::instantiation::DirectoryContext;
use crate::workflow::types::ApproverRole;

/// A user as seen by the workflow engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    /// User id.
    pub id: UserId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Organizational role.
    pub role: ApproverRole,
}

impl DirectoryUser {
    /// Returns true if the user is a company admin.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == ApproverRole::Admin
    }
}

/// Lookups the engine needs from the organization directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApproverDirectory: Send + Sync {
    /// Resolves a user by id.
    async fn resolve_user(&self, user_id: UserId) -> Result<Option<DirectoryUser>, WorkflowError>;

    /// Returns the employee's manager within the company, if one is assigned.
    async fn resolve_manager(
        &self,
        employee_id: UserId,
        company_id: CompanyId,
    ) -> Result<Option<UserId>, WorkflowError>;

    /// Returns the company's admin, earliest created first, lowest id on ties.
    async fn find_admin(&self, company_id: CompanyId) -> Result<Option<UserId>, WorkflowError>;
}

/// Gathers the approvers a chain can resolve to for one submitter.
///
/// Only roles present in the chain are looked up.
pub async fn resolve_context<D>(
    directory: &D,
    submitter: &DirectoryUser,
    chain: &[ChainStep],
) -> Result<DirectoryContext, WorkflowError>
where
    D: ApproverDirectory + ?Sized,
{
    let needs = |role: ApproverRole| chain.iter().any(|s| s.approver_role == role);

    let manager_id = if needs(ApproverRole::Manager) {
        directory
            .resolve_manager(submitter.id, submitter.company_id)
            .await?
    } else {
        None
    };

    let admin_id = if needs(ApproverRole::Admin) {
        directory.find_admin(submitter.company_id).await?
    } else {
        None
    };

    Ok(DirectoryContext {
        submitter_id: submitter.id,
        manager_id,
        admin_id,
    })
}
