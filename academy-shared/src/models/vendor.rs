/// Vendor (academy) model
///
/// A vendor is the tenant every schedule record and payment hangs off.
/// Vendors are soft-deleted: `deleted_at` is set and every lookup here skips
/// such rows.
///
/// # Example
///
/// ```no_run
/// use academy_shared::models::vendor::{CreateVendor, Vendor};
/// # use sqlx::PgPool;
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let vendor = Vendor::create(&pool, CreateVendor {
///     name: "Garuda Muda".to_string(),
///     email: "admin@garudamuda.id".to_string(),
///     phone: "0812000111".to_string(),
///     address: "Jl. Merdeka 1".to_string(),
///     category: "football".to_string(),
///     ..Default::default()
/// }).await?;
///
/// assert!(Vendor::exists(&pool, vendor.id).await?);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgExecutor, PgPool, Postgres, QueryBuilder};

use super::pagination::{Page, PageRequest};

const VENDOR_COLUMNS: &str = "id, name, email, phone, address, description, photo, bank_name, \
     bank_account, bank_holder, category, created_at, updated_at, deleted_at";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vendor {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub description: String,
    pub photo: Option<String>,
    pub bank_name: Option<String>,
    pub bank_account: Option<String>,
    pub bank_holder: Option<String>,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateVendor {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub description: String,
    pub category: String,
}

/// Bank details shown to members paying by transfer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateVendorBank {
    pub bank_name: String,
    pub bank_account: String,
    pub bank_holder: String,
}

impl Vendor {
    pub async fn create(pool: &PgPool, data: CreateVendor) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO vendors (name, email, phone, address, description, category)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            VENDOR_COLUMNS
        );

        sqlx::query_as::<_, Vendor>(&sql)
            .bind(data.name)
            .bind(data.email)
            .bind(data.phone)
            .bind(data.address)
            .bind(data.description)
            .bind(data.category)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM vendors WHERE id = $1 AND deleted_at IS NULL",
            VENDOR_COLUMNS
        );

        sqlx::query_as::<_, Vendor>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn exists<'e>(executor: impl PgExecutor<'e>, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM vendors WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(executor)
        .await
    }

    /// Whether a live vendor already uses this email or phone
    ///
    /// Returns the name of the clashing field.
    pub async fn find_duplicate(
        pool: &PgPool,
        email: &str,
        phone: &str,
    ) -> Result<Option<&'static str>, sqlx::Error> {
        let row: Option<(bool,)> = sqlx::query_as(
            r#"
            SELECT email = $1
            FROM vendors
            WHERE (email = $1 OR phone = $2) AND deleted_at IS NULL
            LIMIT 1
            "#,
        )
        .bind(email)
        .bind(phone)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|(email_match,)| if email_match { "email" } else { "phone" }))
    }

    /// Public directory listing, optionally filtered by name
    pub async fn list(
        pool: &PgPool,
        name: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Self>, sqlx::Error> {
        fn push_conditions(builder: &mut QueryBuilder<'_, Postgres>, name: Option<&str>) {
            if let Some(name) = name.filter(|n| !n.is_empty()) {
                builder.push(" AND name ILIKE ").push_bind(format!("%{}%", name));
            }
        }

        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM vendors WHERE deleted_at IS NULL",
        );
        push_conditions(&mut count, name);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM vendors WHERE deleted_at IS NULL",
            VENDOR_COLUMNS
        ));
        push_conditions(&mut select, name);
        select
            .push(" ORDER BY name ASC, id ASC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = select.build_query_as::<Vendor>().fetch_all(pool).await?;

        Ok(Page::new(items, total, page))
    }

    pub async fn update_photo(pool: &PgPool, id: i64, path: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE vendors SET photo = $2, updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(path)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn update_bank(
        pool: &PgPool,
        id: i64,
        data: UpdateVendorBank,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE vendors
            SET bank_name = $2, bank_account = $3, bank_holder = $4, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {}
            "#,
            VENDOR_COLUMNS
        );

        sqlx::query_as::<_, Vendor>(&sql)
            .bind(id)
            .bind(data.bank_name)
            .bind(data.bank_account)
            .bind(data.bank_holder)
            .fetch_optional(pool)
            .await
    }

    /// Marks the vendor deleted; returns false if it was already gone
    pub async fn soft_delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE vendors SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
