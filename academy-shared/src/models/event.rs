/// Event model: scheduled academy activities
///
/// Events are matches, trainings, programs, tournaments and the like. Paid
/// events carry a fee and a payment type (`daily`, `monthly`). Attendance is
/// recorded separately in [`super::event_log`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgExecutor, PgPool, Postgres, QueryBuilder};

use super::pagination::{Page, PageRequest};
use crate::auth::authorization::RecordScope;

const EVENT_COLUMNS: &str = "id, vendor_id, title, description, event_type, date, time, location, \
     location_point, is_paid, payment_type, fee, is_finish, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    pub id: i64,
    pub vendor_id: i64,
    pub title: String,
    pub description: String,
    pub event_type: String,
    pub date: NaiveDate,

    /// Free-form start time, e.g. `15:30`
    pub time: Option<String>,

    pub location: String,
    pub location_point: Option<String>,
    pub is_paid: bool,
    pub payment_type: Option<String>,
    pub fee: f64,
    pub is_finish: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an event; also the full replacement used by updates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub title: String,
    pub description: String,
    pub event_type: String,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub location: String,
    pub location_point: Option<String>,
    pub is_paid: bool,
    pub payment_type: Option<String>,
    pub fee: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    pub id: Option<i64>,
    pub vendor_id: Option<i64>,
    pub event_type: Option<String>,
    pub is_paid: Option<bool>,
    pub is_finish: Option<bool>,
    pub payment_type: Option<String>,
    pub date: Option<NaiveDate>,

    /// Case-insensitive match on title, description or location
    pub search: Option<String>,
}

impl EventFilter {
    fn push_conditions(&self, builder: &mut QueryBuilder<'_, Postgres>, scope: RecordScope) {
        scope.push_filter(builder, "vendor_id", None);

        if let Some(id) = self.id {
            builder.push(" AND id = ").push_bind(id);
        }
        if let Some(vendor_id) = self.vendor_id {
            builder.push(" AND vendor_id = ").push_bind(vendor_id);
        }
        if let Some(event_type) = self.event_type.clone().filter(|s| !s.is_empty()) {
            builder.push(" AND event_type = ").push_bind(event_type);
        }
        if let Some(is_paid) = self.is_paid {
            builder.push(" AND is_paid = ").push_bind(is_paid);
        }
        if let Some(is_finish) = self.is_finish {
            builder.push(" AND is_finish = ").push_bind(is_finish);
        }
        if let Some(payment_type) = self.payment_type.clone().filter(|s| !s.is_empty()) {
            builder.push(" AND payment_type = ").push_bind(payment_type);
        }
        if let Some(date) = self.date {
            builder.push(" AND date = ").push_bind(date);
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search);
            builder
                .push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR location ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

impl Event {
    pub async fn create(pool: &PgPool, vendor_id: i64, data: EventData) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO events (vendor_id, title, description, event_type, date, time, location,
                                location_point, is_paid, payment_type, fee)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            EVENT_COLUMNS
        );

        sqlx::query_as::<_, Event>(&sql)
            .bind(vendor_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.event_type)
            .bind(data.date)
            .bind(data.time)
            .bind(data.location)
            .bind(data.location_point)
            .bind(data.is_paid)
            .bind(data.payment_type)
            .bind(data.fee)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM events WHERE id = $1", EVENT_COLUMNS);

        sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Replaces the editable fields of an event
    pub async fn update(pool: &PgPool, id: i64, data: EventData) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE events
            SET title = $2, description = $3, event_type = $4, date = $5, time = $6,
                location = $7, location_point = $8, is_paid = $9, payment_type = $10,
                fee = $11, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            EVENT_COLUMNS
        );

        sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.event_type)
            .bind(data.date)
            .bind(data.time)
            .bind(data.location)
            .bind(data.location_point)
            .bind(data.is_paid)
            .bind(data.payment_type)
            .bind(data.fee)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_finished(
        pool: &PgPool,
        id: i64,
        is_finish: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE events SET is_finish = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            EVENT_COLUMNS
        );

        sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .bind(is_finish)
            .fetch_optional(pool)
            .await
    }

    /// Paginated listing, most recent date first
    pub async fn list(
        pool: &PgPool,
        scope: RecordScope,
        filter: &EventFilter,
        page: PageRequest,
    ) -> Result<Page<Self>, sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM events WHERE TRUE");
        filter.push_conditions(&mut count, scope);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM events WHERE TRUE",
            EVENT_COLUMNS
        ));
        filter.push_conditions(&mut select, scope);
        select
            .push(" ORDER BY date DESC, id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = select.build_query_as::<Event>().fetch_all(pool).await?;

        Ok(Page::new(items, total, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_filter_covers_three_columns() {
        let filter = EventFilter {
            search: Some("stadion".to_string()),
            is_finish: Some(false),
            ..Default::default()
        };

        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM events WHERE TRUE");
        filter.push_conditions(&mut builder, RecordScope::Tenant(2));

        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM events WHERE TRUE AND vendor_id = $1 AND is_finish = $2 \
             AND (title ILIKE $3 OR description ILIKE $4 OR location ILIKE $5)"
        );
    }

    #[test]
    fn test_empty_strings_are_ignored() {
        let filter = EventFilter {
            event_type: Some(String::new()),
            search: Some(String::new()),
            ..Default::default()
        };

        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM events WHERE TRUE");
        filter.push_conditions(&mut builder, RecordScope::All);

        assert_eq!(builder.sql(), "SELECT COUNT(*) FROM events WHERE TRUE");
    }
}
