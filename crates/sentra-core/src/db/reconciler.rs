//! Branch batch reconciliation
//!
//! Merges one incoming branch batch into the central store as a single
//! transaction: upsert stages in dependency order, one sync-log append, then
//! commit. Any failure rolls the whole batch back.

use chrono::Utc;
use libsql::{params, Connection};

use crate::error::Result;
use crate::models::{BranchBatch, Customer, Employee, Income, Loan, Payment};

use super::sync_logs::{SyncLogStore, FULL_BRANCH_TABLE};

/// Entity kinds in fixed processing order. Loans reference customers;
/// payments and income reference loans.
const STAGES: [UpsertStage; 5] = [
    UpsertStage::Customers,
    UpsertStage::Loans,
    UpsertStage::Payments,
    UpsertStage::Employees,
    UpsertStage::Income,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpsertStage {
    Customers,
    Loans,
    Payments,
    Employees,
    Income,
}

/// Receipt for a committed branch batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReceipt {
    /// Count written to the sync log (customers + loans + payments)
    pub records_synced: usize,
    /// Commit timestamp (Unix ms)
    pub synced_at: i64,
}

/// Transactional upsert engine for branch batches
pub struct SyncReconciler<'a> {
    conn: &'a Connection,
}

impl<'a> SyncReconciler<'a> {
    /// Create a new reconciler on the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Merge a branch batch into the store as one transaction.
    ///
    /// The stored branch id on customer/loan/payment/employee rows is always
    /// `branch_id` (the authenticated caller), never the payload's. Records
    /// referencing rows absent from both the store and the batch abort the
    /// whole transaction.
    pub async fn reconcile(&self, branch_id: i64, batch: &BranchBatch) -> Result<SyncReceipt> {
        self.conn.execute("BEGIN IMMEDIATE", ()).await?;

        let receipt = match self.apply(branch_id, batch).await {
            Ok(receipt) => receipt,
            Err(error) => {
                self.conn.execute("ROLLBACK", ()).await.ok();
                tracing::warn!(branch_id, "branch sync rolled back: {error}");
                return Err(error);
            }
        };

        if let Err(error) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(error.into());
        }

        tracing::debug!(
            branch_id,
            records = receipt.records_synced,
            "branch batch committed"
        );
        Ok(receipt)
    }

    async fn apply(&self, branch_id: i64, batch: &BranchBatch) -> Result<SyncReceipt> {
        let now = Utc::now().timestamp_millis();

        for stage in STAGES {
            self.apply_stage(stage, branch_id, batch, now).await?;
        }

        let records_synced = batch.logged_record_count();
        SyncLogStore::new(self.conn)
            .append(FULL_BRANCH_TABLE, records_synced, now)
            .await?;

        Ok(SyncReceipt {
            records_synced,
            synced_at: now,
        })
    }

    async fn apply_stage(
        &self,
        stage: UpsertStage,
        branch_id: i64,
        batch: &BranchBatch,
        now: i64,
    ) -> Result<()> {
        match stage {
            UpsertStage::Customers => {
                for customer in &batch.customers {
                    self.upsert_customer(branch_id, customer, now).await?;
                }
            }
            UpsertStage::Loans => {
                for loan in &batch.loans {
                    self.upsert_loan(branch_id, loan, now).await?;
                }
            }
            UpsertStage::Payments => {
                for payment in &batch.payments {
                    self.upsert_payment(branch_id, payment, now).await?;
                }
            }
            UpsertStage::Employees => {
                for employee in &batch.employees {
                    self.upsert_employee(branch_id, employee, now).await?;
                }
            }
            UpsertStage::Income => {
                for income in &batch.income {
                    self.upsert_income(income, now).await?;
                }
            }
        }
        Ok(())
    }

    async fn upsert_customer(&self, branch_id: i64, customer: &Customer, now: i64) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO customers (customer_id, branch_id, name, nik, address,
                                        phone_number, registration_date, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(customer_id) DO UPDATE SET
                     branch_id = excluded.branch_id,
                     name = excluded.name,
                     nik = excluded.nik,
                     address = excluded.address,
                     phone_number = excluded.phone_number,
                     registration_date = excluded.registration_date,
                     updated_at = excluded.updated_at",
                params![
                    customer.customer_id,
                    branch_id,
                    customer.name.as_str(),
                    customer.nik.as_str(),
                    customer.address.as_str(),
                    customer.phone_number.as_str(),
                    customer.registration_date.to_string(),
                    now,
                    now
                ],
            )
            .await?;
        Ok(())
    }

    async fn upsert_loan(&self, branch_id: i64, loan: &Loan, now: i64) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO loans (loan_id, customer_id, branch_id, amount_plafond,
                                    interest_rate, loan_date, term_months, status,
                                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(loan_id) DO UPDATE SET
                     customer_id = excluded.customer_id,
                     branch_id = excluded.branch_id,
                     amount_plafond = excluded.amount_plafond,
                     interest_rate = excluded.interest_rate,
                     loan_date = excluded.loan_date,
                     term_months = excluded.term_months,
                     status = excluded.status,
                     updated_at = excluded.updated_at",
                params![
                    loan.loan_id,
                    loan.customer_id,
                    branch_id,
                    loan.amount_plafond,
                    loan.interest_rate,
                    loan.loan_date.to_string(),
                    loan.term_months,
                    loan.status.as_str(),
                    now,
                    now
                ],
            )
            .await?;
        Ok(())
    }

    async fn upsert_payment(&self, branch_id: i64, payment: &Payment, now: i64) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO payments (payment_id, loan_id, branch_id, payment_date,
                                       amount_paid, due_date, is_on_time,
                                       created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(payment_id) DO UPDATE SET
                     loan_id = excluded.loan_id,
                     branch_id = excluded.branch_id,
                     payment_date = excluded.payment_date,
                     amount_paid = excluded.amount_paid,
                     due_date = excluded.due_date,
                     is_on_time = excluded.is_on_time,
                     updated_at = excluded.updated_at",
                params![
                    payment.payment_id,
                    payment.loan_id,
                    branch_id,
                    payment.payment_date.to_string(),
                    payment.amount_paid,
                    payment.due_date.to_string(),
                    i64::from(payment.is_on_time),
                    now,
                    now
                ],
            )
            .await?;
        Ok(())
    }

    async fn upsert_employee(&self, branch_id: i64, employee: &Employee, now: i64) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO employees (employee_id, name, position, assigned_customers,
                                        hire_date, branch_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(employee_id) DO UPDATE SET
                     name = excluded.name,
                     position = excluded.position,
                     assigned_customers = excluded.assigned_customers,
                     hire_date = excluded.hire_date,
                     branch_id = excluded.branch_id,
                     updated_at = excluded.updated_at",
                params![
                    employee.employee_id,
                    employee.name.as_str(),
                    employee.position.as_str(),
                    employee.assigned_customers,
                    employee.hire_date.to_string(),
                    branch_id,
                    now,
                    now
                ],
            )
            .await?;
        Ok(())
    }

    async fn upsert_income(&self, income: &Income, now: i64) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO income (income_id, loan_id, income_amount, recorded_date,
                                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(income_id) DO UPDATE SET
                     loan_id = excluded.loan_id,
                     income_amount = excluded.income_amount,
                     recorded_date = excluded.recorded_date,
                     updated_at = excluded.updated_at",
                params![
                    income.income_id,
                    income.loan_id,
                    income.income_amount,
                    income.recorded_date.to_string(),
                    now,
                    now
                ],
            )
            .await?;
        Ok(())
    }
}
