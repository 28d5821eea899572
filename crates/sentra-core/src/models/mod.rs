//! Data models for Sentra

mod analytics;
mod batch;
mod customer;
mod employee;
mod income;
mod loan;
mod payment;
mod sync_log;

pub use analytics::{BranchSummary, BreakdownSlice, MonthlyPoint};
pub use batch::{BranchBatch, BranchSnapshot};
pub use customer::Customer;
pub use employee::Employee;
pub use income::Income;
pub use loan::{Loan, LoanStatus};
pub use payment::Payment;
pub use sync_log::SyncLogEntry;
