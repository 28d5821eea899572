//! Income model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Income recorded against a loan.
///
/// Income rows carry no branch id; they are reachable only through their
/// loan's branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Income {
    pub income_id: i64,
    pub loan_id: i64,
    pub income_amount: f64,
    pub recorded_date: NaiveDate,
}
