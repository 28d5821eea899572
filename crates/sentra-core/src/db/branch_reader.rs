//! Branch snapshot projection

use libsql::{params, Connection};

use crate::error::Result;
use crate::models::{BranchSnapshot, Customer, Employee, Income, Loan, Payment};

use super::parse_date;

/// Read-only projection of one branch's stored dataset.
///
/// No reconciliation logic; an unknown branch yields empty collections.
pub struct BranchReader<'a> {
    conn: &'a Connection,
}

impl<'a> BranchReader<'a> {
    /// Create a new reader on the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Fetch the current snapshot of a branch.
    ///
    /// Income rows are reachable transitively through the branch's loans.
    pub async fn fetch_branch(&self, branch_id: i64) -> Result<BranchSnapshot> {
        Ok(BranchSnapshot {
            branch_id,
            customers: self.customers(branch_id).await?,
            loans: self.loans(branch_id).await?,
            payments: self.payments(branch_id).await?,
            employees: self.employees(branch_id).await?,
            income: self.income(branch_id).await?,
        })
    }

    async fn customers(&self, branch_id: i64) -> Result<Vec<Customer>> {
        let mut rows = self
            .conn
            .query(
                "SELECT customer_id, branch_id, name, nik, address, phone_number,
                        registration_date
                 FROM customers
                 WHERE branch_id = ?1
                 ORDER BY customer_id",
                params![branch_id],
            )
            .await?;

        let mut customers = Vec::new();
        while let Some(row) = rows.next().await? {
            customers.push(Customer {
                customer_id: row.get(0)?,
                branch_id: row.get(1)?,
                name: row.get(2)?,
                nik: row.get(3)?,
                address: row.get(4)?,
                phone_number: row.get(5)?,
                registration_date: parse_date(
                    "customers.registration_date",
                    &row.get::<String>(6)?,
                )?,
            });
        }
        Ok(customers)
    }

    async fn loans(&self, branch_id: i64) -> Result<Vec<Loan>> {
        let mut rows = self
            .conn
            .query(
                "SELECT loan_id, customer_id, branch_id, amount_plafond, interest_rate,
                        loan_date, term_months, status
                 FROM loans
                 WHERE branch_id = ?1
                 ORDER BY loan_id",
                params![branch_id],
            )
            .await?;

        let mut loans = Vec::new();
        while let Some(row) = rows.next().await? {
            loans.push(Loan {
                loan_id: row.get(0)?,
                customer_id: row.get(1)?,
                branch_id: row.get(2)?,
                amount_plafond: row.get(3)?,
                interest_rate: row.get(4)?,
                loan_date: parse_date("loans.loan_date", &row.get::<String>(5)?)?,
                term_months: row.get(6)?,
                status: row.get::<String>(7)?.parse()?,
            });
        }
        Ok(loans)
    }

    async fn payments(&self, branch_id: i64) -> Result<Vec<Payment>> {
        let mut rows = self
            .conn
            .query(
                "SELECT payment_id, loan_id, branch_id, payment_date, amount_paid,
                        due_date, is_on_time
                 FROM payments
                 WHERE branch_id = ?1
                 ORDER BY payment_id",
                params![branch_id],
            )
            .await?;

        let mut payments = Vec::new();
        while let Some(row) = rows.next().await? {
            payments.push(Payment {
                payment_id: row.get(0)?,
                loan_id: row.get(1)?,
                branch_id: row.get(2)?,
                payment_date: parse_date("payments.payment_date", &row.get::<String>(3)?)?,
                amount_paid: row.get(4)?,
                due_date: parse_date("payments.due_date", &row.get::<String>(5)?)?,
                is_on_time: row.get::<i64>(6)? != 0,
            });
        }
        Ok(payments)
    }

    async fn employees(&self, branch_id: i64) -> Result<Vec<Employee>> {
        let mut rows = self
            .conn
            .query(
                "SELECT employee_id, name, position, assigned_customers, hire_date,
                        branch_id
                 FROM employees
                 WHERE branch_id = ?1
                 ORDER BY employee_id",
                params![branch_id],
            )
            .await?;

        let mut employees = Vec::new();
        while let Some(row) = rows.next().await? {
            employees.push(Employee {
                employee_id: row.get(0)?,
                name: row.get(1)?,
                position: row.get(2)?,
                assigned_customers: row.get(3)?,
                hire_date: parse_date("employees.hire_date", &row.get::<String>(4)?)?,
                branch_id: row.get(5)?,
            });
        }
        Ok(employees)
    }

    async fn income(&self, branch_id: i64) -> Result<Vec<Income>> {
        let mut rows = self
            .conn
            .query(
                "SELECT income_id, loan_id, income_amount, recorded_date
                 FROM income
                 WHERE loan_id IN (SELECT loan_id FROM loans WHERE branch_id = ?1)
                 ORDER BY income_id",
                params![branch_id],
            )
            .await?;

        let mut income = Vec::new();
        while let Some(row) = rows.next().await? {
            income.push(Income {
                income_id: row.get(0)?,
                loan_id: row.get(1)?,
                income_amount: row.get(2)?,
                recorded_date: parse_date("income.recorded_date", &row.get::<String>(3)?)?,
            });
        }
        Ok(income)
    }
}
