//! Employee model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A branch office employee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub employee_id: i64,
    pub name: String,
    pub position: String,
    /// Number of customers assigned to this employee
    pub assigned_customers: i64,
    pub hire_date: NaiveDate,
    #[serde(default)]
    pub branch_id: i64,
}
