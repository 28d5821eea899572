//! Customer model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A customer registered at a branch office.
///
/// `customer_id` is caller-supplied and globally unique across the central
/// store. The `branch_id` carried on an incoming record is advisory only; the
/// reconciler always stores the authenticated caller's branch id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// Unique identifier across all branches
    pub customer_id: i64,
    /// Owning branch office
    #[serde(default)]
    pub branch_id: i64,
    pub name: String,
    /// National identity number
    pub nik: String,
    pub address: String,
    pub phone_number: String,
    pub registration_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_without_branch_id() {
        let customer: Customer = serde_json::from_str(
            r#"{
                "customer_id": 10,
                "name": "Siti Rahma",
                "nik": "3174000000000001",
                "address": "Jl. Melati 4",
                "phone_number": "081200000001",
                "registration_date": "2024-03-15"
            }"#,
        )
        .unwrap();

        assert_eq!(customer.customer_id, 10);
        assert_eq!(customer.branch_id, 0);
        assert_eq!(
            customer.registration_date,
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );
    }
}
