/// Payment records
///
/// Members pay academy fees, either individually (with an optional proof
/// photo) or in bulk, where a coach bills everyone marked present for a paid
/// event. Each payment gets an invoice number
/// `INV-<vendor id><account id><unix nanos>`.
///
/// # Example
///
/// ```no_run
/// use academy_shared::models::payment::{BulkPayment, Payment, PaymentStatus};
/// # use sqlx::PgPool;
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let created = Payment::create_bulk_for_event(&pool, BulkPayment {
///     vendor_id: 1,
///     event_id: 12,
///     amount: 50_000.0,
///     method: "transfer".to_string(),
///     status: PaymentStatus::Pending,
///     payment_type: "event".to_string(),
///     date: chrono::NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
///     note: "March tournament".to_string(),
/// }).await?;
/// println!("billed {} accounts", created.len());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgExecutor, PgPool, Postgres, QueryBuilder};
use std::{fmt, str::FromStr};

use super::account::Account;
use super::event_log::EventLog;
use super::pagination::{Page, PageRequest};
use crate::auth::authorization::RecordScope;

const PAYMENT_COLUMNS: &str = "id, account_id, vendor_id, event_id, amount, method, status, \
     payment_type, date, note, photo, invoice, user_name, created_at, updated_at";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown payment status: {0}")]
pub struct UnknownPaymentStatus(pub String);

impl FromStr for PaymentStatus {
    type Err = UnknownPaymentStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "success" => Ok(PaymentStatus::Success),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(UnknownPaymentStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for PaymentStatus {
    type Error = UnknownPaymentStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: i64,
    pub account_id: i64,
    pub vendor_id: i64,
    pub event_id: Option<i64>,
    pub amount: f64,

    /// cash, transfer, e-wallet
    pub method: String,

    #[sqlx(try_from = "String")]
    pub status: PaymentStatus,

    /// general, event, monthly
    pub payment_type: String,

    pub date: NaiveDate,
    pub note: String,

    /// Relative path of the proof photo
    pub photo: Option<String>,

    pub invoice: String,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePayment {
    pub account_id: i64,
    pub vendor_id: i64,
    pub event_id: Option<i64>,
    pub amount: f64,
    pub method: String,
    pub status: PaymentStatus,
    pub payment_type: String,
    pub date: NaiveDate,
    pub note: String,
    pub photo: Option<String>,
    pub user_name: String,
}

/// One payment per account present at an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkPayment {
    pub vendor_id: i64,
    pub event_id: i64,
    pub amount: f64,
    pub method: String,
    pub status: PaymentStatus,
    pub payment_type: String,
    pub date: NaiveDate,
    pub note: String,
}

/// Column a payment listing may be sorted by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortColumn {
    #[default]
    CreatedAt,
    Date,
    Amount,
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cannot sort by {0}")]
pub struct InvalidSortColumn(pub String);

impl SortColumn {
    /// Parses a `sort_by` value; only whitelisted columns are accepted
    pub fn parse(value: &str) -> Result<Self, InvalidSortColumn> {
        match value {
            "created_at" => Ok(SortColumn::CreatedAt),
            "date" => Ok(SortColumn::Date),
            "amount" => Ok(SortColumn::Amount),
            "status" => Ok(SortColumn::Status),
            other => Err(InvalidSortColumn(other.to_string())),
        }
    }

    fn column(&self) -> &'static str {
        match self {
            SortColumn::CreatedAt => "created_at",
            SortColumn::Date => "date",
            SortColumn::Amount => "amount",
            SortColumn::Status => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Case-insensitive; anything but `ASC` sorts descending
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("asc") {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }

    fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub vendor_id: Option<i64>,
    pub account_id: Option<i64>,

    /// Case-insensitive match on the note
    pub search: Option<String>,

    pub status: Option<PaymentStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub user_name: Option<String>,
    pub sort_by: SortColumn,
    pub sort_order: SortOrder,
}

impl PaymentFilter {
    fn push_conditions(&self, builder: &mut QueryBuilder<'_, Postgres>, scope: RecordScope) {
        scope.push_filter(builder, "vendor_id", Some("account_id"));

        if let Some(vendor_id) = self.vendor_id {
            builder.push(" AND vendor_id = ").push_bind(vendor_id);
        }
        if let Some(account_id) = self.account_id {
            builder.push(" AND account_id = ").push_bind(account_id);
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            builder.push(" AND note ILIKE ").push_bind(format!("%{}%", search));
        }
        if let Some(status) = self.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(start_date) = self.start_date {
            builder.push(" AND date >= ").push_bind(start_date);
        }
        if let Some(end_date) = self.end_date {
            builder.push(" AND date <= ").push_bind(end_date);
        }
        if let Some(user_name) = self.user_name.as_deref().filter(|s| !s.is_empty()) {
            builder.push(" AND user_name ILIKE ").push_bind(format!("%{}%", user_name));
        }
    }

    fn push_order(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder
            .push(" ORDER BY ")
            .push(self.sort_by.column())
            .push(" ")
            .push(self.sort_order.keyword())
            .push(", id DESC");
    }
}

/// `INV-<vendor><account><unix nanos>`
pub fn invoice_number(vendor_id: i64, account_id: i64) -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("INV-{}{}{}", vendor_id, account_id, nanos)
}

impl Payment {
    async fn insert<'e>(
        executor: impl PgExecutor<'e>,
        data: CreatePayment,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO payments (account_id, vendor_id, event_id, amount, method, status,
                                  payment_type, date, note, photo, invoice, user_name)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        );

        sqlx::query_as::<_, Payment>(&sql)
            .bind(data.account_id)
            .bind(data.vendor_id)
            .bind(data.event_id)
            .bind(data.amount)
            .bind(data.method)
            .bind(data.status.as_str())
            .bind(data.payment_type)
            .bind(data.date)
            .bind(data.note)
            .bind(data.photo)
            .bind(invoice_number(data.vendor_id, data.account_id))
            .bind(data.user_name)
            .fetch_one(executor)
            .await
    }

    pub async fn create(pool: &PgPool, data: CreatePayment) -> Result<Self, sqlx::Error> {
        Self::insert(pool, data).await
    }

    /// Bills every account marked present at the event, all or nothing
    pub async fn create_bulk_for_event(
        pool: &PgPool,
        data: BulkPayment,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let account_ids =
            EventLog::present_account_ids(&mut *tx, data.vendor_id, data.event_id).await?;
        let accounts = Account::names(&mut *tx, &account_ids).await?;

        let mut created = Vec::with_capacity(accounts.len());
        for (account_id, user_name) in accounts {
            let payment = Self::insert(
                &mut *tx,
                CreatePayment {
                    account_id,
                    vendor_id: data.vendor_id,
                    event_id: Some(data.event_id),
                    amount: data.amount,
                    method: data.method.clone(),
                    status: data.status,
                    payment_type: data.payment_type.clone(),
                    date: data.date,
                    note: data.note.clone(),
                    photo: None,
                    user_name,
                },
            )
            .await?;
            created.push(payment);
        }

        tx.commit().await?;

        tracing::info!(
            vendor_id = data.vendor_id,
            event_id = data.event_id,
            count = created.len(),
            "Created bulk payments"
        );

        Ok(created)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM payments WHERE id = $1", PAYMENT_COLUMNS);

        sqlx::query_as::<_, Payment>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn update_status(
        pool: &PgPool,
        id: i64,
        status: PaymentStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE payments SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            PAYMENT_COLUMNS
        );

        sqlx::query_as::<_, Payment>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(pool)
            .await
    }

    pub async fn update_photo(
        pool: &PgPool,
        id: i64,
        path: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE payments SET photo = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            PAYMENT_COLUMNS
        );

        sqlx::query_as::<_, Payment>(&sql)
            .bind(id)
            .bind(path)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        scope: RecordScope,
        filter: &PaymentFilter,
        page: PageRequest,
    ) -> Result<Page<Self>, sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM payments WHERE TRUE");
        filter.push_conditions(&mut count, scope);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM payments WHERE TRUE",
            PAYMENT_COLUMNS
        ));
        filter.push_conditions(&mut select, scope);
        filter.push_order(&mut select);
        select
            .push(" LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = select.build_query_as::<Payment>().fetch_all(pool).await?;

        Ok(Page::new(items, total, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_column_whitelist() {
        assert_eq!(SortColumn::parse("amount"), Ok(SortColumn::Amount));
        assert_eq!(
            SortColumn::parse("amount; DROP TABLE payments"),
            Err(InvalidSortColumn("amount; DROP TABLE payments".to_string()))
        );
    }

    #[test]
    fn test_sort_order_defaults_to_desc() {
        assert_eq!(SortOrder::parse("asc"), SortOrder::Asc);
        assert_eq!(SortOrder::parse("ASC"), SortOrder::Asc);
        assert_eq!(SortOrder::parse("sideways"), SortOrder::Desc);
    }

    #[test]
    fn test_invoice_number_format() {
        let invoice = invoice_number(3, 17);
        assert!(invoice.starts_with("INV-317"));
        assert!(invoice["INV-317".len()..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("success".parse::<PaymentStatus>(), Ok(PaymentStatus::Success));
        assert!("paid".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_listing_sql() {
        let filter = PaymentFilter {
            status: Some(PaymentStatus::Pending),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            sort_by: SortColumn::Amount,
            sort_order: SortOrder::Asc,
            ..Default::default()
        };

        let mut builder = QueryBuilder::<Postgres>::new("SELECT id FROM payments WHERE TRUE");
        filter.push_conditions(&mut builder, RecordScope::Own(2));
        filter.push_order(&mut builder);

        assert_eq!(
            builder.sql(),
            "SELECT id FROM payments WHERE TRUE AND account_id = $1 AND status = $2 \
             AND date >= $3 ORDER BY amount ASC, id DESC"
        );
    }
}
