//! Loan model

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Lifecycle status of a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Completed,
    Defaulted,
}

impl LoanStatus {
    /// Status as stored in the `loans.status` column
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Defaulted => "defaulted",
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "defaulted" => Ok(Self::Defaulted),
            other => Err(Error::InvalidInput(format!("unknown loan status: {other}"))),
        }
    }
}

/// A loan extended to a customer.
///
/// References the customer by id; the reconciler requires the customer to
/// exist in the store or earlier in the same batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub loan_id: i64,
    pub customer_id: i64,
    #[serde(default)]
    pub branch_id: i64,
    /// Principal amount
    pub amount_plafond: f64,
    pub interest_rate: f64,
    pub loan_date: NaiveDate,
    pub term_months: i64,
    pub status: LoanStatus,
}
