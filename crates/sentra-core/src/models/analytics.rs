//! Dashboard aggregation row models

use serde::{Deserialize, Serialize};

/// Per-branch aggregate row for the branches summary dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchSummary {
    pub branch_id: i64,
    pub branch_name: String,
    pub customers: i64,
    pub active_loans: i64,
    /// Income recorded against the branch's active loans
    pub total_income: f64,
    /// On-time payments over all payments, rounded to 2 decimals; 0.0 when
    /// the branch has no payments
    pub on_time_ratio: f64,
}

/// One month's value in a time-bucketed series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    /// Bucket in `YYYY-MM` form
    pub month: String,
    pub value: f64,
}

/// One named bucket of a count breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownSlice {
    pub name: String,
    pub value: i64,
}
