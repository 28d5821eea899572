//! Payment model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An installment payment against a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: i64,
    pub loan_id: i64,
    #[serde(default)]
    pub branch_id: i64,
    pub payment_date: NaiveDate,
    pub amount_paid: f64,
    pub due_date: NaiveDate,
    pub is_on_time: bool,
}
