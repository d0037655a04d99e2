/// Account model and database operations
///
/// Accounts are members, coaches and admins. Each may belong to one academy
/// (`vendor_id`). Email and phone are unique across all accounts; the
/// database constraints are the final word on that.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE accounts (
///     id BIGSERIAL PRIMARY KEY,
///     email VARCHAR(255) NOT NULL,            -- accounts_email_key
///     phone VARCHAR(50),                      -- accounts_phone_key
///     password_hash VARCHAR(255) NOT NULL DEFAULT '',
///     role VARCHAR(20) NOT NULL DEFAULT 'member',
///     vendor_id BIGINT REFERENCES vendors(id),
///     ...profile columns...,
///     match_count INTEGER NOT NULL DEFAULT 0,
///     training_count INTEGER NOT NULL DEFAULT 0,
///     program_count INTEGER NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use academy_shared::models::account::{Account, CreateAccount, Role};
/// use academy_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let account = Account::create(&pool, CreateAccount {
///     email: "player@club.id".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: Role::Member,
///     ..Default::default()
/// }).await?;
///
/// let found = Account::find_by_email(&pool, "player@club.id").await?;
/// assert_eq!(found.map(|a| a.id), Some(account.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgExecutor, PgPool, Postgres, QueryBuilder};
use std::{fmt, str::FromStr};

use super::pagination::{Page, PageRequest};
use crate::auth::authorization::RecordScope;

pub(crate) const ACCOUNT_COLUMNS: &str = "id, email, phone, password_hash, role, vendor_id, name, \
     address, photo, gender, birth_date, status, position, foot, number, age_category, star, \
     fcm_token, active, match_count, training_count, program_count, created_at, updated_at";

/// Account role
///
/// Ordered by privilege: `Member < Coach < Admin`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Player enrolled in an academy
    #[default]
    Member,

    /// Trainer running an academy's schedule
    Coach,

    /// Platform operator
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Coach => "coach",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Role::Member),
            "coach" => Ok(Role::Coach),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Attendance counters kept on the account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceCounter {
    Match,
    Training,
    Program,
}

impl AttendanceCounter {
    /// Maps an event type to its counter, case-insensitively
    ///
    /// Other event types (tournaments, challenges) have no counter.
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type.to_ascii_lowercase().as_str() {
            "match" => Some(AttendanceCounter::Match),
            "training" => Some(AttendanceCounter::Training),
            "program" => Some(AttendanceCounter::Program),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            AttendanceCounter::Match => "match_count",
            AttendanceCounter::Training => "training_count",
            AttendanceCounter::Program => "program_count",
        }
    }
}

/// Account row
///
/// The password hash and the device push token are never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub phone: Option<String>,

    /// Argon2id PHC string, empty for federated-only accounts
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    #[sqlx(try_from = "String")]
    pub role: Role,

    pub vendor_id: Option<i64>,
    pub name: String,
    pub address: Option<String>,
    pub photo: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,

    /// `free` or `pro`
    pub status: String,

    pub position: Option<String>,
    pub foot: Option<String>,
    pub number: Option<i32>,
    pub age_category: Option<String>,
    pub star: f64,

    #[serde(skip_serializing, default)]
    pub fcm_token: Option<String>,

    pub active: bool,
    pub match_count: i32,
    pub training_count: i32,
    pub program_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an account
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateAccount {
    pub email: String,
    pub phone: Option<String>,

    /// Argon2id hash, never a plaintext password; empty for no password
    pub password_hash: String,

    pub role: Role,
    pub vendor_id: Option<i64>,
    pub name: String,
    pub address: Option<String>,
    pub photo: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub position: Option<String>,
    pub foot: Option<String>,
    pub number: Option<i32>,
    pub age_category: Option<String>,
    pub fcm_token: Option<String>,
}

/// Input for updating an account; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAccount {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub vendor_id: Option<i64>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub position: Option<String>,
    pub foot: Option<String>,
    pub number: Option<i32>,
    pub age_category: Option<String>,
    pub star: Option<f64>,
    pub active: Option<bool>,
}

impl UpdateAccount {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.phone.is_none()
            && self.password_hash.is_none()
            && self.role.is_none()
            && self.vendor_id.is_none()
            && self.name.is_none()
            && self.address.is_none()
            && self.gender.is_none()
            && self.birth_date.is_none()
            && self.status.is_none()
            && self.position.is_none()
            && self.foot.is_none()
            && self.number.is_none()
            && self.age_category.is_none()
            && self.star.is_none()
            && self.active.is_none()
    }
}

/// Listing filters; text filters match case-insensitively on substrings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountFilter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub vendor_id: Option<i64>,
}

impl AccountFilter {
    fn push_conditions(&self, builder: &mut QueryBuilder<'_, Postgres>, scope: RecordScope) {
        scope.push_filter(builder, "vendor_id", Some("id"));

        if let Some(name) = self.name.as_deref().filter(|s| !s.is_empty()) {
            builder.push(" AND name ILIKE ").push_bind(format!("%{}%", name));
        }
        if let Some(email) = self.email.as_deref().filter(|s| !s.is_empty()) {
            builder.push(" AND email ILIKE ").push_bind(format!("%{}%", email));
        }
        if let Some(role) = self.role {
            builder.push(" AND role = ").push_bind(role.as_str());
        }
        if let Some(vendor_id) = self.vendor_id {
            builder.push(" AND vendor_id = ").push_bind(vendor_id);
        }
    }
}

impl Account {
    /// Inserts a new account
    ///
    /// # Errors
    ///
    /// A unique violation on `accounts_email_key` or `accounts_phone_key`
    /// when the email or phone is already taken.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        data: CreateAccount,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO accounts (email, phone, password_hash, role, vendor_id, name, address,
                                  photo, gender, birth_date, position, foot, number,
                                  age_category, fcm_token)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );

        sqlx::query_as::<_, Account>(&sql)
            .bind(data.email)
            .bind(data.phone)
            .bind(data.password_hash)
            .bind(data.role.as_str())
            .bind(data.vendor_id)
            .bind(data.name)
            .bind(data.address)
            .bind(data.photo)
            .bind(data.gender)
            .bind(data.birth_date)
            .bind(data.position)
            .bind(data.foot)
            .bind(data.number)
            .bind(data.age_category)
            .bind(data.fcm_token)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS);

        sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM accounts WHERE email = $1", ACCOUNT_COLUMNS);

        sqlx::query_as::<_, Account>(&sql)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_phone(pool: &PgPool, phone: &str) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM accounts WHERE phone = $1", ACCOUNT_COLUMNS);

        sqlx::query_as::<_, Account>(&sql)
            .bind(phone)
            .fetch_optional(pool)
            .await
    }

    /// Whether another account already uses this email
    pub async fn email_taken(
        pool: &PgPool,
        email: &str,
        except_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1 AND id IS DISTINCT FROM $2)",
        )
        .bind(email)
        .bind(except_id)
        .fetch_one(pool)
        .await
    }

    /// Whether another account already uses this phone number
    pub async fn phone_taken(
        pool: &PgPool,
        phone: &str,
        except_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE phone = $1 AND id IS DISTINCT FROM $2)",
        )
        .bind(phone)
        .bind(except_id)
        .fetch_one(pool)
        .await
    }

    /// Updates the given fields; returns `None` if the account doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: UpdateAccount,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE accounts SET updated_at = NOW()");

        if let Some(email) = data.email {
            builder.push(", email = ").push_bind(email);
        }
        if let Some(phone) = data.phone {
            builder.push(", phone = ").push_bind(phone);
        }
        if let Some(password_hash) = data.password_hash {
            builder.push(", password_hash = ").push_bind(password_hash);
        }
        if let Some(role) = data.role {
            builder.push(", role = ").push_bind(role.as_str());
        }
        if let Some(vendor_id) = data.vendor_id {
            builder.push(", vendor_id = ").push_bind(vendor_id);
        }
        if let Some(name) = data.name {
            builder.push(", name = ").push_bind(name);
        }
        if let Some(address) = data.address {
            builder.push(", address = ").push_bind(address);
        }
        if let Some(gender) = data.gender {
            builder.push(", gender = ").push_bind(gender);
        }
        if let Some(birth_date) = data.birth_date {
            builder.push(", birth_date = ").push_bind(birth_date);
        }
        if let Some(status) = data.status {
            builder.push(", status = ").push_bind(status);
        }
        if let Some(position) = data.position {
            builder.push(", position = ").push_bind(position);
        }
        if let Some(foot) = data.foot {
            builder.push(", foot = ").push_bind(foot);
        }
        if let Some(number) = data.number {
            builder.push(", number = ").push_bind(number);
        }
        if let Some(age_category) = data.age_category {
            builder.push(", age_category = ").push_bind(age_category);
        }
        if let Some(star) = data.star {
            builder.push(", star = ").push_bind(star);
        }
        if let Some(active) = data.active {
            builder.push(", active = ").push_bind(active);
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(ACCOUNT_COLUMNS);

        builder.build_query_as::<Account>().fetch_optional(pool).await
    }

    /// Stores the device push token sent at login
    pub async fn update_fcm_token(pool: &PgPool, id: i64, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE accounts SET fcm_token = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stores the relative path of a newly uploaded profile photo
    pub async fn update_photo(pool: &PgPool, id: i64, path: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE accounts SET photo = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(path)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Adds `delta` to an attendance counter, never going below zero
    pub async fn adjust_counter<'e>(
        executor: impl PgExecutor<'e>,
        id: i64,
        counter: AttendanceCounter,
        delta: i32,
    ) -> Result<bool, sqlx::Error> {
        let column = counter.column();
        let sql = format!(
            "UPDATE accounts SET {column} = GREATEST({column} + $2, 0), updated_at = NOW() WHERE id = $1"
        );

        let result = sqlx::query(&sql)
            .bind(id)
            .bind(delta)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Paginated listing within a scope, newest first
    pub async fn list(
        pool: &PgPool,
        scope: RecordScope,
        filter: &AccountFilter,
        page: PageRequest,
    ) -> Result<Page<Self>, sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM accounts WHERE TRUE");
        filter.push_conditions(&mut count, scope);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM accounts WHERE TRUE",
            ACCOUNT_COLUMNS
        ));
        filter.push_conditions(&mut select, scope);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = select.build_query_as::<Account>().fetch_all(pool).await?;

        Ok(Page::new(items, total, page))
    }

    /// Names of the given accounts, keyed by id
    pub async fn names<'e>(
        executor: impl PgExecutor<'e>,
        ids: &[i64],
    ) -> Result<Vec<(i64, String)>, sqlx::Error> {
        sqlx::query_as::<_, (i64, String)>("SELECT id, name FROM accounts WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(executor)
            .await
    }
}
