//! Branch batch and snapshot models

use serde::{Deserialize, Serialize};

use super::{Customer, Employee, Income, Loan, Payment};

/// One incoming data dump from a branch office.
///
/// Every collection may be empty; a missing collection on the wire
/// deserializes as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchBatch {
    #[serde(default)]
    pub customers: Vec<Customer>,
    #[serde(default)]
    pub loans: Vec<Loan>,
    #[serde(default)]
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub income: Vec<Income>,
}

impl BranchBatch {
    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
            && self.loans.is_empty()
            && self.payments.is_empty()
            && self.employees.is_empty()
            && self.income.is_empty()
    }

    /// Record count reported in the sync log.
    ///
    /// Audit convention: customers, loans, and payments only; employees and
    /// income are excluded.
    pub fn logged_record_count(&self) -> usize {
        self.customers.len() + self.loans.len() + self.payments.len()
    }
}

/// The current stored dataset of one branch, as returned by a pull
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchSnapshot {
    pub branch_id: i64,
    pub customers: Vec<Customer>,
    pub loans: Vec<Loan>,
    pub payments: Vec<Payment>,
    pub employees: Vec<Employee>,
    pub income: Vec<Income>,
}
