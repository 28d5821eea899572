//! Dashboard aggregations over the merged store
//!
//! Every method is a stateless read-only projection; nothing here writes.

use libsql::{params, Connection};

use crate::error::Result;
use crate::models::{BranchSummary, BreakdownSlice, MonthlyPoint};

/// Read-only aggregation queries for the executive dashboards
pub struct AnalyticsReader<'a> {
    conn: &'a Connection,
}

impl<'a> AnalyticsReader<'a> {
    /// Create a new reader on the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// One aggregate row per branch in the directory.
    ///
    /// Total income covers the branch's active loans. A branch with no
    /// payments has an on-time ratio of 0.0, not null.
    pub async fn branches_summary(&self) -> Result<Vec<BranchSummary>> {
        let mut rows = self
            .conn
            .query(
                "SELECT ku.branch_id,
                        ku.name,
                        (SELECT COUNT(*) FROM customers c
                         WHERE c.branch_id = ku.branch_id),
                        (SELECT COUNT(*) FROM loans l
                         WHERE l.branch_id = ku.branch_id AND l.status = 'active'),
                        COALESCE((SELECT SUM(i.income_amount)
                                  FROM income i
                                  JOIN loans l ON l.loan_id = i.loan_id
                                  WHERE l.branch_id = ku.branch_id
                                    AND l.status = 'active'), 0.0),
                        COALESCE((SELECT ROUND(
                                      CAST(SUM(p.is_on_time) AS REAL)
                                          / COUNT(p.payment_id), 2)
                                  FROM payments p
                                  WHERE p.branch_id = ku.branch_id), 0.0)
                 FROM kantor_units ku
                 ORDER BY ku.branch_id",
                (),
            )
            .await?;

        let mut summaries = Vec::new();
        while let Some(row) = rows.next().await? {
            summaries.push(BranchSummary {
                branch_id: row.get(0)?,
                branch_name: row.get(1)?,
                customers: row.get(2)?,
                active_loans: row.get(3)?,
                total_income: row.get(4)?,
                on_time_ratio: row.get(5)?,
            });
        }
        Ok(summaries)
    }

    /// Income totals per month, ascending
    pub async fn income_over_time(&self) -> Result<Vec<MonthlyPoint>> {
        self.monthly_series(
            "SELECT strftime('%Y-%m', recorded_date) AS month,
                    SUM(income_amount)
             FROM income
             GROUP BY month
             ORDER BY month",
        )
        .await
    }

    /// Running income totals per month, ascending
    pub async fn income_over_time_cumulative(&self) -> Result<Vec<MonthlyPoint>> {
        self.monthly_series(
            "SELECT t.month,
                    SUM(t.total) OVER (ORDER BY t.month)
             FROM (SELECT strftime('%Y-%m', recorded_date) AS month,
                          SUM(income_amount) AS total
                   FROM income
                   GROUP BY month) AS t
             ORDER BY t.month",
        )
        .await
    }

    /// Customer registrations per month, ascending
    pub async fn customers_over_time(&self) -> Result<Vec<MonthlyPoint>> {
        self.monthly_series(
            "SELECT strftime('%Y-%m', registration_date) AS month,
                    CAST(COUNT(*) AS REAL)
             FROM customers
             GROUP BY month
             ORDER BY month",
        )
        .await
    }

    /// Running customer counts per month, ascending
    pub async fn customers_over_time_cumulative(&self) -> Result<Vec<MonthlyPoint>> {
        self.monthly_series(
            "SELECT t.month,
                    CAST(SUM(t.total) OVER (ORDER BY t.month) AS REAL)
             FROM (SELECT strftime('%Y-%m', registration_date) AS month,
                          COUNT(*) AS total
                   FROM customers
                   GROUP BY month) AS t
             ORDER BY t.month",
        )
        .await
    }

    /// Global on-time vs late payment counts
    pub async fn on_time_payment_breakdown(&self) -> Result<Vec<BreakdownSlice>> {
        let on_time = self.count_payments(true).await?;
        let late = self.count_payments(false).await?;
        Ok(vec![
            BreakdownSlice {
                name: "On Time".to_string(),
                value: on_time,
            },
            BreakdownSlice {
                name: "Late".to_string(),
                value: late,
            },
        ])
    }

    async fn count_payments(&self, on_time: bool) -> Result<i64> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM payments WHERE is_on_time = ?1",
                params![i64::from(on_time)],
            )
            .await?;
        let row = rows.next().await?;
        Ok(match row {
            Some(row) => row.get(0)?,
            None => 0,
        })
    }

    async fn monthly_series(&self, sql: &str) -> Result<Vec<MonthlyPoint>> {
        let mut rows = self.conn.query(sql, ()).await?;
        let mut points = Vec::new();
        while let Some(row) = rows.next().await? {
            points.push(MonthlyPoint {
                month: row.get(0)?,
                value: row.get(1)?,
            });
        }
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use crate::db::{Database, SyncReconciler};
    use crate::models::{BranchBatch, Customer, Income, Loan, LoanStatus, Payment};

    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn customer(customer_id: i64, registered: NaiveDate) -> Customer {
        Customer {
            customer_id,
            branch_id: 0,
            name: format!("Customer {customer_id}"),
            nik: format!("nik-{customer_id}"),
            address: "Jl. Dahlia 8".to_string(),
            phone_number: "081200003333".to_string(),
            registration_date: registered,
        }
    }

    fn loan(loan_id: i64, customer_id: i64, status: LoanStatus) -> Loan {
        Loan {
            loan_id,
            customer_id,
            branch_id: 0,
            amount_plafond: 10_000_000.0,
            interest_rate: 0.1,
            loan_date: date(2024, 1, 15),
            term_months: 12,
            status,
        }
    }

    fn payment(payment_id: i64, loan_id: i64, on_time: bool) -> Payment {
        Payment {
            payment_id,
            loan_id,
            branch_id: 0,
            payment_date: date(2024, 2, 1),
            amount_paid: 1_000_000.0,
            due_date: date(2024, 2, 5),
            is_on_time: on_time,
        }
    }

    fn income_row(income_id: i64, loan_id: i64, amount: f64, recorded: NaiveDate) -> Income {
        Income {
            income_id,
            loan_id,
            income_amount: amount,
            recorded_date: recorded,
        }
    }

    async fn register_branch(db: &Database, branch_id: i64, name: &str) {
        db.connection()
            .execute(
                "INSERT INTO kantor_units (branch_id, name) VALUES (?1, ?2)",
                libsql::params![branch_id, name],
            )
            .await
            .unwrap();
    }

    /// Two branches: branch 1 with loans, payments, and income; branch 2
    /// registered in the directory but empty.
    async fn seeded_db() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        register_branch(&db, 1, "Unit Satu").await;
        register_branch(&db, 2, "Unit Dua").await;

        let batch = BranchBatch {
            customers: vec![
                customer(1, date(2024, 1, 10)),
                customer(2, date(2024, 1, 20)),
                customer(3, date(2024, 3, 5)),
            ],
            loans: vec![
                loan(1, 1, LoanStatus::Active),
                loan(2, 2, LoanStatus::Completed),
            ],
            payments: vec![
                payment(1, 1, true),
                payment(2, 1, true),
                payment(3, 1, false),
                payment(4, 2, true),
            ],
            income: vec![
                income_row(1, 1, 100_000.0, date(2024, 1, 15)),
                income_row(2, 1, 50_000.0, date(2024, 3, 10)),
                // Against the completed loan; excluded from summary totals
                income_row(3, 2, 999_000.0, date(2024, 3, 12)),
            ],
            ..BranchBatch::default()
        };
        SyncReconciler::new(db.connection())
            .reconcile(1, &batch)
            .await
            .unwrap();
        db
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_branches_summary_aggregates_per_branch() {
        let db = seeded_db().await;
        let summaries = AnalyticsReader::new(db.connection())
            .branches_summary()
            .await
            .unwrap();

        assert_eq!(summaries.len(), 2);

        let unit_satu = &summaries[0];
        assert_eq!(unit_satu.branch_id, 1);
        assert_eq!(unit_satu.branch_name, "Unit Satu");
        assert_eq!(unit_satu.customers, 3);
        assert_eq!(unit_satu.active_loans, 1);
        assert!((unit_satu.total_income - 150_000.0).abs() < f64::EPSILON);
        // 3 of 4 payments on time
        assert!((unit_satu.on_time_ratio - 0.75).abs() < f64::EPSILON);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_branch_without_payments_has_zero_ratio() {
        let db = seeded_db().await;
        let summaries = AnalyticsReader::new(db.connection())
            .branches_summary()
            .await
            .unwrap();

        let unit_dua = &summaries[1];
        assert_eq!(unit_dua.branch_id, 2);
        assert_eq!(unit_dua.customers, 0);
        assert_eq!(unit_dua.active_loans, 0);
        assert!(unit_dua.total_income.abs() < f64::EPSILON);
        assert!(unit_dua.on_time_ratio.abs() < f64::EPSILON);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_income_over_time_buckets_by_month() {
        let db = seeded_db().await;
        let points = AnalyticsReader::new(db.connection())
            .income_over_time()
            .await
            .unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].month, "2024-01");
        assert!((points[0].value - 100_000.0).abs() < f64::EPSILON);
        assert_eq!(points[1].month, "2024-03");
        assert!((points[1].value - 1_049_000.0).abs() < f64::EPSILON);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cumulative_income_is_a_running_sum() {
        let db = seeded_db().await;
        let points = AnalyticsReader::new(db.connection())
            .income_over_time_cumulative()
            .await
            .unwrap();

        assert_eq!(points.len(), 2);
        assert!((points[0].value - 100_000.0).abs() < f64::EPSILON);
        assert!((points[1].value - 1_149_000.0).abs() < f64::EPSILON);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_customers_over_time_counts_registrations() {
        let db = seeded_db().await;
        let reader = AnalyticsReader::new(db.connection());

        let points = reader.customers_over_time().await.unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].month, "2024-01");
        assert!((points[0].value - 2.0).abs() < f64::EPSILON);
        assert_eq!(points[1].month, "2024-03");
        assert!((points[1].value - 1.0).abs() < f64::EPSILON);

        let cumulative = reader.customers_over_time_cumulative().await.unwrap();
        assert!((cumulative[0].value - 2.0).abs() < f64::EPSILON);
        assert!((cumulative[1].value - 3.0).abs() < f64::EPSILON);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_on_time_breakdown_has_two_named_slices() {
        let db = seeded_db().await;
        let slices = AnalyticsReader::new(db.connection())
            .on_time_payment_breakdown()
            .await
            .unwrap();

        assert_eq!(
            slices,
            vec![
                BreakdownSlice {
                    name: "On Time".to_string(),
                    value: 3,
                },
                BreakdownSlice {
                    name: "Late".to_string(),
                    value: 1,
                },
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_breakdown_on_empty_store_is_zeroed() {
        let db = Database::open_in_memory().await.unwrap();
        let slices = AnalyticsReader::new(db.connection())
            .on_time_payment_breakdown()
            .await
            .unwrap();

        assert_eq!(slices[0].value, 0);
        assert_eq!(slices[1].value, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_series_on_empty_store_are_empty() {
        let db = Database::open_in_memory().await.unwrap();
        let reader = AnalyticsReader::new(db.connection());

        assert!(reader.income_over_time().await.unwrap().is_empty());
        assert!(reader.customers_over_time().await.unwrap().is_empty());
        assert!(reader
            .income_over_time_cumulative()
            .await
            .unwrap()
            .is_empty());
    }
}
