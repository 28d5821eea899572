//! Database migrations

use libsql::Connection;

use crate::error::Result;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        migrate_v1(conn).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    // Check if schema_version table exists
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Migration to version 1: Initial schema
async fn migrate_v1(conn: &Connection) -> Result<()> {
    // libsql doesn't have execute_batch, so we run each statement separately
    // Using a transaction for atomicity

    conn.execute("BEGIN TRANSACTION", ()).await?;

    let statements = [
        // Schema version tracking
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        // Customers table; ids are caller-supplied and globally unique
        "CREATE TABLE IF NOT EXISTS customers (
            customer_id INTEGER PRIMARY KEY,
            branch_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            nik TEXT NOT NULL,
            address TEXT NOT NULL,
            phone_number TEXT NOT NULL,
            registration_date TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_customers_branch ON customers(branch_id)",
        // Loans table
        "CREATE TABLE IF NOT EXISTS loans (
            loan_id INTEGER PRIMARY KEY,
            customer_id INTEGER NOT NULL REFERENCES customers(customer_id),
            branch_id INTEGER NOT NULL,
            amount_plafond REAL NOT NULL,
            interest_rate REAL NOT NULL,
            loan_date TEXT NOT NULL,
            term_months INTEGER NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('active', 'completed', 'defaulted')),
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_loans_branch ON loans(branch_id)",
        "CREATE INDEX IF NOT EXISTS idx_loans_customer ON loans(customer_id)",
        // Payments table
        "CREATE TABLE IF NOT EXISTS payments (
            payment_id INTEGER PRIMARY KEY,
            loan_id INTEGER NOT NULL REFERENCES loans(loan_id),
            branch_id INTEGER NOT NULL,
            payment_date TEXT NOT NULL,
            amount_paid REAL NOT NULL,
            due_date TEXT NOT NULL,
            is_on_time INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_payments_branch ON payments(branch_id)",
        "CREATE INDEX IF NOT EXISTS idx_payments_loan ON payments(loan_id)",
        // Employees table
        "CREATE TABLE IF NOT EXISTS employees (
            employee_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            position TEXT NOT NULL,
            assigned_customers INTEGER NOT NULL DEFAULT 0,
            hire_date TEXT NOT NULL,
            branch_id INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_employees_branch ON employees(branch_id)",
        // Income table; no branch column, reachable via the loan
        "CREATE TABLE IF NOT EXISTS income (
            income_id INTEGER PRIMARY KEY,
            loan_id INTEGER NOT NULL REFERENCES loans(loan_id),
            income_amount REAL NOT NULL,
            recorded_date TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_income_loan ON income(loan_id)",
        // API key secrets; exactly one of branch_id/user_id is set,
        // at most one active secret per scope
        "CREATE TABLE IF NOT EXISTS secrets (
            secret_id INTEGER PRIMARY KEY AUTOINCREMENT,
            branch_id INTEGER UNIQUE,
            user_id INTEGER UNIQUE,
            hashed_secret TEXT NOT NULL,
            CHECK ((branch_id IS NULL) != (user_id IS NULL))
        )",
        // Role directory consulted by executive auth
        "CREATE TABLE IF NOT EXISTS users (
            user_id INTEGER PRIMARY KEY,
            role TEXT NOT NULL
        )",
        // Append-only sync audit trail
        "CREATE TABLE IF NOT EXISTS sync_logs (
            sync_id INTEGER PRIMARY KEY AUTOINCREMENT,
            synced_table TEXT NOT NULL,
            last_sync_time INTEGER NOT NULL,
            records_synced INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_sync_logs_time ON sync_logs(last_sync_time DESC)",
        // Branch directory joined by the dashboards
        "CREATE TABLE IF NOT EXISTS kantor_units (
            branch_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        )",
        // Record migration version
        "INSERT INTO schema_version (version) VALUES (1)",
    ];

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use libsql::Builder;

    use super::*;

    async fn setup() -> Connection {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        db.connect().unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations_idempotent() {
        let conn = setup().await;
        run(&conn).await.unwrap();
        run(&conn).await.unwrap(); // Should not fail

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migration_v1_creates_store_tables() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        for table in [
            "customers",
            "loans",
            "payments",
            "employees",
            "income",
            "secrets",
            "users",
            "sync_logs",
            "kantor_units",
        ] {
            let mut rows = conn
                .query(
                    "SELECT EXISTS(
                        SELECT 1 FROM sqlite_master
                        WHERE type = 'table' AND name = ?1
                    )",
                    libsql::params![table],
                )
                .await
                .unwrap();

            let exists = rows
                .next()
                .await
                .unwrap()
                .is_some_and(|row| row.get::<i32>(0).unwrap() != 0);

            assert!(exists, "missing table {table}");
        }
    }
}
