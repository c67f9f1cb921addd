//! Approval workflow schema.
//!
//! Creates the directory tables (companies, users, manager links), the
//! per-company chain and rule configuration, and the per-expense approval
//! rows and rule snapshot.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: DIRECTORY
        // ============================================================
        db.execute_unprepared(COMPANIES_SQL).await?;
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(MANAGER_RELATIONSHIPS_SQL).await?;

        // ============================================================
        // PART 3: CHAIN & RULE CONFIGURATION
        // ============================================================
        db.execute_unprepared(APPROVAL_CHAIN_STEPS_SQL).await?;
        db.execute_unprepared(APPROVAL_RULES_SQL).await?;

        // ============================================================
        // PART 4: EXPENSES & WORKFLOW STATE
        // ============================================================
        db.execute_unprepared(EXPENSES_SQL).await?;
        db.execute_unprepared(EXPENSE_APPROVALS_SQL).await?;
        db.execute_unprepared(EXPENSE_APPROVAL_RULES_SQL).await?;

        // ============================================================
        // PART 5: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE user_role AS ENUM ('admin', 'manager', 'employee');

CREATE TYPE approval_rule_type AS ENUM ('percentage', 'specific_approver', 'hybrid');

CREATE TYPE expense_status AS ENUM ('pending', 'approved', 'rejected');

CREATE TYPE approval_status AS ENUM ('pending', 'approved', 'rejected');
";

const COMPANIES_SQL: &str = r"
CREATE TABLE companies (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    country VARCHAR(100),
    default_currency CHAR(3) NOT NULL DEFAULT 'USD',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    email VARCHAR(255) NOT NULL UNIQUE,
    full_name VARCHAR(255) NOT NULL,
    role user_role NOT NULL DEFAULT 'employee',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_users_company ON users(company_id);

-- Admin lookup: earliest created first, lowest id on ties
CREATE INDEX idx_users_company_admins ON users(company_id, created_at, id) WHERE role = 'admin';
";

const MANAGER_RELATIONSHIPS_SQL: &str = r"
CREATE TABLE manager_relationships (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    employee_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    manager_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT uq_manager_relationships_employee UNIQUE (employee_id, company_id),
    CONSTRAINT chk_not_self_managed CHECK (employee_id <> manager_id)
);

CREATE INDEX idx_manager_relationships_manager ON manager_relationships(manager_id);
";

// Reordering parks rows on negative orders inside one transaction, so the
// chain table has no positivity check; the core validates sequence_order >= 1.
const APPROVAL_CHAIN_STEPS_SQL: &str = r"
CREATE TABLE approval_chain_steps (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    approver_role user_role NOT NULL,
    sequence_order INTEGER NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT uq_approval_chain_steps_order UNIQUE (company_id, sequence_order)
);
";

const APPROVAL_RULES_SQL: &str = r"
CREATE TABLE approval_rules (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    rule_type approval_rule_type NOT NULL,
    percentage_threshold NUMERIC(5, 2),
    specific_approver_id UUID REFERENCES users(id) ON DELETE SET NULL,
    description TEXT,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_percentage_threshold CHECK (
        percentage_threshold IS NULL
        OR (percentage_threshold >= 0 AND percentage_threshold <= 100)
    )
);

CREATE INDEX idx_approval_rules_company_active ON approval_rules(company_id, created_at, id)
    WHERE is_active = true;
";

const EXPENSES_SQL: &str = r"
CREATE TABLE expenses (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    submitter_id UUID NOT NULL REFERENCES users(id),
    amount NUMERIC(19, 4) NOT NULL,
    currency CHAR(3) NOT NULL,
    description TEXT,
    expense_date DATE NOT NULL,
    status expense_status NOT NULL DEFAULT 'pending',
    version INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_expense_amount_positive CHECK (amount > 0)
);

CREATE INDEX idx_expenses_company_created ON expenses(company_id, created_at DESC);
CREATE INDEX idx_expenses_submitter ON expenses(submitter_id);
";

const EXPENSE_APPROVALS_SQL: &str = r"
CREATE TABLE expense_approvals (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    expense_id UUID NOT NULL REFERENCES expenses(id) ON DELETE CASCADE,
    approver_id UUID NOT NULL REFERENCES users(id),
    status approval_status NOT NULL DEFAULT 'pending',
    sequence_order INTEGER NOT NULL,
    comments TEXT,
    decided_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT uq_expense_approvals_approver UNIQUE (expense_id, approver_id),
    CONSTRAINT chk_expense_approvals_order CHECK (sequence_order >= 1),
    CONSTRAINT chk_decided_at CHECK ((status = 'pending') = (decided_at IS NULL))
);

CREATE INDEX idx_expense_approvals_expense ON expense_approvals(expense_id, sequence_order);
CREATE INDEX idx_expense_approvals_pending ON expense_approvals(approver_id)
    WHERE status = 'pending';
";

const EXPENSE_APPROVAL_RULES_SQL: &str = r"
CREATE TABLE expense_approval_rules (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    expense_id UUID NOT NULL REFERENCES expenses(id) ON DELETE CASCADE,
    approval_rule_id UUID NOT NULL REFERENCES approval_rules(id),
    rule_type approval_rule_type NOT NULL,
    percentage_threshold NUMERIC(5, 2),
    specific_approver_id UUID,
    is_active BOOLEAN NOT NULL DEFAULT true,
    position INTEGER NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT uq_expense_approval_rules_position UNIQUE (expense_id, position),
    CONSTRAINT uq_expense_approval_rules_rule UNIQUE (expense_id, approval_rule_id)
);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_final_expense_status_change
-- Approved and rejected expenses never change status again
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_final_expense_status_change()
RETURNS TRIGGER AS $$
BEGIN
    IF OLD.status <> 'pending' AND NEW.status IS DISTINCT FROM OLD.status THEN
        RAISE EXCEPTION 'Expense % is already %', OLD.id, OLD.status;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_final_expense_status_change
BEFORE UPDATE ON expenses
FOR EACH ROW
EXECUTE FUNCTION prevent_final_expense_status_change();

-- ============================================================
-- FUNCTION: prevent_decided_approval_change
-- Approval rows only move from pending to a decision
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_decided_approval_change()
RETURNS TRIGGER AS $$
BEGIN
    IF OLD.status <> 'pending' AND NEW.status IS DISTINCT FROM OLD.status THEN
        RAISE EXCEPTION 'Approval % is already %', OLD.id, OLD.status;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_decided_approval_change
BEFORE UPDATE ON expense_approvals
FOR EACH ROW
EXECUTE FUNCTION prevent_decided_approval_change();
";

const DROP_ALL_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_prevent_decided_approval_change ON expense_approvals;
DROP TRIGGER IF EXISTS trg_prevent_final_expense_status_change ON expenses;

DROP FUNCTION IF EXISTS prevent_decided_approval_change();
DROP FUNCTION IF EXISTS prevent_final_expense_status_change();

DROP TABLE IF EXISTS expense_approval_rules CASCADE;
DROP TABLE IF EXISTS expense_approvals CASCADE;
DROP TABLE IF EXISTS expenses CASCADE;
DROP TABLE IF EXISTS approval_rules CASCADE;
DROP TABLE IF EXISTS approval_chain_steps CASCADE;
DROP TABLE IF EXISTS manager_relationships CASCADE;
DROP TABLE IF EXISTS users CASCADE;
DROP TABLE IF EXISTS companies CASCADE;

DROP TYPE IF EXISTS approval_status;
DROP TYPE IF EXISTS expense_status;
DROP TYPE IF EXISTS approval_rule_type;
DROP TYPE IF EXISTS user_role;
";
