/// Match records (friendlies, league fixtures)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::pagination::{Page, PageRequest};
use super::training::push_tenant_conditions;
use crate::auth::authorization::RecordScope;

const MATCH_COLUMNS: &str =
    "id, vendor_id, event_id, title, description, date, location, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Match {
    pub id: i64,
    pub vendor_id: i64,
    pub event_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMatch {
    pub vendor_id: i64,
    pub event_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub location: String,
}

impl Match {
    pub async fn create(pool: &PgPool, data: CreateMatch) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO matches (vendor_id, event_id, title, description, date, location)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            MATCH_COLUMNS
        );

        sqlx::query_as::<_, Match>(&sql)
            .bind(data.vendor_id)
            .bind(data.event_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.date)
            .bind(data.location)
            .fetch_one(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        scope: RecordScope,
        vendor_id: Option<i64>,
        page: PageRequest,
    ) -> Result<Page<Self>, sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM matches WHERE TRUE");
        push_tenant_conditions(&mut count, scope, vendor_id);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM matches WHERE TRUE",
            MATCH_COLUMNS
        ));
        push_tenant_conditions(&mut select, scope, vendor_id);
        select
            .push(" ORDER BY date DESC, id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = select.build_query_as::<Match>().fetch_all(pool).await?;

        Ok(Page::new(items, total, page))
    }
}
