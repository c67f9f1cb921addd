//! Database seeder for Outlay development and testing.
//!
//! Seeds a demo company with an admin, a manager, two employees, a two-step
//! approval chain and a hybrid rule. Ids are fixed so they can be used as
//! `X-User-Id` values against a local server. Re-running skips what exists.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use chrono::Utc;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

use outlay_core::workflow::{ApproverRole, RuleType};
use outlay_db::{
    ApprovalChainRepository, ApprovalRuleRepository, DirectoryRepository,
    entities::{companies, users},
    repositories::{AddChainStepInput, CreateApprovalRuleInput},
};
use outlay_shared::types::{CompanyId, UserId};

/// Demo company ID.
const DEMO_COMPANY_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0001);

/// Demo users: (id, email, name, role).
const DEMO_USERS: [(u128, &str, &str, ApproverRole); 4] = [
    (0x10, "admin@outlay.dev", "Ada Admin", ApproverRole::Admin),
    (0x11, "manager@outlay.dev", "Max Manager", ApproverRole::Manager),
    (0x12, "erin@outlay.dev", "Erin Employee", ApproverRole::Employee),
    (0x13, "eli@outlay.dev", "Eli Employee", ApproverRole::Employee),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set in environment")?;

    println!("Connecting to database...");
    let db = outlay_db::connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    println!("Seeding demo company...");
    seed_company(&db).await?;

    println!("Seeding demo users...");
    seed_users(&db).await?;

    println!("Seeding manager relationships...");
    seed_managers(&db).await?;

    println!("Seeding approval chain and rules...");
    seed_workflow(&db).await?;

    println!("Seeding complete!");
    for (id, email, _, role) in DEMO_USERS {
        println!("  {role:<8} {email:<20} X-User-Id: {}", Uuid::from_u128(id));
    }
    Ok(())
}

fn company_id() -> CompanyId {
    CompanyId::from_uuid(DEMO_COMPANY_ID)
}

fn user_id(index: usize) -> UserId {
    UserId::from_uuid(Uuid::from_u128(DEMO_USERS[index].0))
}

async fn seed_company(db: &DatabaseConnection) -> anyhow::Result<()> {
    if companies::Entity::find_by_id(DEMO_COMPANY_ID)
        .one(db)
        .await?
        .is_some()
    {
        println!("  Demo company already exists, skipping...");
        return Ok(());
    }

    companies::ActiveModel {
        id: Set(DEMO_COMPANY_ID),
        name: Set("Outlay Demo Co".to_string()),
        country: Set(Some("US".to_string())),
        default_currency: Set("USD".to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;
    Ok(())
}

async fn seed_users(db: &DatabaseConnection) -> anyhow::Result<()> {
    for (id, email, name, role) in DEMO_USERS {
        let id = Uuid::from_u128(id);
        if users::Entity::find_by_id(id).one(db).await?.is_some() {
            println!("  {email} already exists, skipping...");
            continue;
        }

        users::ActiveModel {
            id: Set(id),
            company_id: Set(DEMO_COMPANY_ID),
            email: Set(email.to_string()),
            full_name: Set(name.to_string()),
            role: Set(role.into()),
            created_at: Set(Utc::now().into()),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

async fn seed_managers(db: &DatabaseConnection) -> anyhow::Result<()> {
    let directory = DirectoryRepository::new(db.clone());
    let manager = user_id(1);

    // Assignment replaces, so re-running is harmless
    for employee in [user_id(2), user_id(3)] {
        directory
            .assign_manager(company_id(), employee, manager)
            .await?;
    }
    Ok(())
}

async fn seed_workflow(db: &DatabaseConnection) -> anyhow::Result<()> {
    let chain = ApprovalChainRepository::new(db.clone());
    if !chain.list_steps(company_id()).await?.is_empty() {
        println!("  Approval chain already exists, skipping...");
        return Ok(());
    }

    for role in [ApproverRole::Manager, ApproverRole::Admin] {
        chain
            .add_step(
                company_id(),
                AddChainStepInput {
                    approver_role: role,
                    sequence_order: None,
                },
            )
            .await?;
    }

    ApprovalRuleRepository::new(db.clone())
        .create_rule(
            company_id(),
            CreateApprovalRuleInput {
                rule_type: RuleType::Hybrid,
                percentage_threshold: Some(dec!(60)),
                specific_approver_id: Some(user_id(0)),
                description: Some("Admin sign-off or 60% of approvers".to_string()),
            },
        )
        .await?;
    Ok(())
}
