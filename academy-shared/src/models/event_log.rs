/// Event attendance log
///
/// One row per (account, event). Creating a log, and flipping its status,
/// moves the account's attendance counter for the event type inside the same
/// transaction, so counters always equal the number of active logs.
///
/// # Example
///
/// ```no_run
/// use academy_shared::models::event_log::{CreateEventLog, EventLog};
/// # use sqlx::PgPool;
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let log = EventLog::create_with_attendance(&pool, CreateEventLog {
///     account_id: 4,
///     event_id: 9,
///     vendor_id: 1,
///     user_name: "Budi".to_string(),
///     event_type: "training".to_string(),
///     note: String::new(),
/// }).await?;
///
/// // Marking the log absent decrements training_count again
/// EventLog::update_status(&pool, log.id, false, "sick").await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgExecutor, PgPool, Postgres, QueryBuilder};

use super::account::{Account, AttendanceCounter};
use super::pagination::{Page, PageRequest};
use crate::auth::authorization::RecordScope;

const EVENT_LOG_COLUMNS: &str = "id, account_id, event_id, vendor_id, user_name, event_type, note, \
     status, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventLog {
    pub id: i64,
    pub account_id: i64,
    pub event_id: i64,
    pub vendor_id: i64,
    pub user_name: String,
    pub event_type: String,
    pub note: String,

    /// Present (`true`) or absent
    pub status: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventLog {
    pub account_id: i64,
    pub event_id: i64,
    pub vendor_id: i64,
    pub user_name: String,
    pub event_type: String,
    pub note: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLogFilter {
    pub event_type: Option<String>,
    pub status: Option<bool>,
    pub event_id: Option<i64>,
    pub vendor_id: Option<i64>,
}

impl EventLogFilter {
    fn push_conditions(&self, builder: &mut QueryBuilder<'_, Postgres>, scope: RecordScope) {
        scope.push_filter(builder, "vendor_id", Some("account_id"));

        if let Some(event_type) = self.event_type.clone().filter(|s| !s.is_empty()) {
            builder.push(" AND event_type = ").push_bind(event_type);
        }
        if let Some(status) = self.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(event_id) = self.event_id {
            builder.push(" AND event_id = ").push_bind(event_id);
        }
        if let Some(vendor_id) = self.vendor_id {
            builder.push(" AND vendor_id = ").push_bind(vendor_id);
        }
    }
}

impl EventLog {
    /// Inserts an active log and bumps the matching attendance counter
    ///
    /// # Errors
    ///
    /// A unique violation on `event_logs_account_event_key` if the account
    /// already has a log for the event.
    pub async fn create_with_attendance(
        pool: &PgPool,
        data: CreateEventLog,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO event_logs (account_id, event_id, vendor_id, user_name, event_type, note, status)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE)
            RETURNING {}
            "#,
            EVENT_LOG_COLUMNS
        );

        let log = sqlx::query_as::<_, EventLog>(&sql)
            .bind(data.account_id)
            .bind(data.event_id)
            .bind(data.vendor_id)
            .bind(data.user_name)
            .bind(data.event_type)
            .bind(data.note)
            .fetch_one(&mut *tx)
            .await?;

        if let Some(counter) = AttendanceCounter::from_event_type(&log.event_type) {
            Account::adjust_counter(&mut *tx, log.account_id, counter, 1).await?;
        }

        tx.commit().await?;

        tracing::debug!(
            event_log_id = log.id,
            account_id = log.account_id,
            event_id = log.event_id,
            "Recorded attendance"
        );

        Ok(log)
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM event_logs WHERE id = $1", EVENT_LOG_COLUMNS);

        sqlx::query_as::<_, EventLog>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn exists_for(pool: &PgPool, account_id: i64, event_id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM event_logs WHERE account_id = $1 AND event_id = $2)",
        )
        .bind(account_id)
        .bind(event_id)
        .fetch_one(pool)
        .await
    }

    /// Sets status and note; adjusts the counter only when status flips
    ///
    /// Returns `None` if the log doesn't exist.
    pub async fn update_status(
        pool: &PgPool,
        id: i64,
        status: bool,
        note: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let previous: Option<bool> =
            sqlx::query_scalar("SELECT status FROM event_logs WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(previous) = previous else {
            return Ok(None);
        };

        let sql = format!(
            r#"
            UPDATE event_logs
            SET status = $2, note = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            EVENT_LOG_COLUMNS
        );

        let log = sqlx::query_as::<_, EventLog>(&sql)
            .bind(id)
            .bind(status)
            .bind(note)
            .fetch_one(&mut *tx)
            .await?;

        if previous != status {
            if let Some(counter) = AttendanceCounter::from_event_type(&log.event_type) {
                let delta = if status { 1 } else { -1 };
                Account::adjust_counter(&mut *tx, log.account_id, counter, delta).await?;
            }
        }

        tx.commit().await?;

        Ok(Some(log))
    }

    /// Accounts marked present for an event
    pub async fn present_account_ids<'e>(
        executor: impl PgExecutor<'e>,
        vendor_id: i64,
        event_id: i64,
    ) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT account_id FROM event_logs
            WHERE vendor_id = $1 AND event_id = $2 AND status = TRUE
            ORDER BY account_id
            "#,
        )
        .bind(vendor_id)
        .bind(event_id)
        .fetch_all(executor)
        .await
    }

    pub async fn list(
        pool: &PgPool,
        scope: RecordScope,
        filter: &EventLogFilter,
        page: PageRequest,
    ) -> Result<Page<Self>, sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM event_logs WHERE TRUE");
        filter.push_conditions(&mut count, scope);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM event_logs WHERE TRUE",
            EVENT_LOG_COLUMNS
        ));
        filter.push_conditions(&mut select, scope);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = select.build_query_as::<EventLog>().fetch_all(pool).await?;

        Ok(Page::new(items, total, page))
    }
}
