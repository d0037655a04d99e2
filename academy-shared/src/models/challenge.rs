/// Skill challenges and their recorded results
///
/// A challenge (e.g. "30m sprint", category `stamina`) belongs to an academy
/// and has a maximum score. Coaches record results per account as
/// [`ChallengeLog`] rows; a log always belongs to the challenge's academy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgExecutor, PgPool, Postgres, QueryBuilder};

use super::pagination::{Page, PageRequest};
use super::training::push_tenant_conditions;
use crate::auth::authorization::RecordScope;

const CHALLENGE_COLUMNS: &str =
    "id, vendor_id, event_id, title, category, max_point, created_at, updated_at";

const CHALLENGE_LOG_COLUMNS: &str =
    "id, account_id, challenge_id, vendor_id, point, note, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Challenge {
    pub id: i64,
    pub vendor_id: i64,
    pub event_id: Option<i64>,
    pub title: String,
    pub category: String,
    pub max_point: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChallenge {
    pub vendor_id: i64,
    pub event_id: Option<i64>,
    pub title: String,
    pub category: String,
    pub max_point: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChallengeLog {
    pub id: i64,
    pub account_id: i64,
    pub challenge_id: i64,
    pub vendor_id: i64,
    pub point: f64,
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result to record; the academy comes from the challenge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChallengeLog {
    pub account_id: i64,
    pub point: f64,
    pub note: String,
}

impl Challenge {
    pub async fn create(pool: &PgPool, data: CreateChallenge) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO challenges (vendor_id, event_id, title, category, max_point)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            CHALLENGE_COLUMNS
        );

        sqlx::query_as::<_, Challenge>(&sql)
            .bind(data.vendor_id)
            .bind(data.event_id)
            .bind(data.title)
            .bind(data.category)
            .bind(data.max_point)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM challenges WHERE id = $1", CHALLENGE_COLUMNS);

        sqlx::query_as::<_, Challenge>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        scope: RecordScope,
        vendor_id: Option<i64>,
        page: PageRequest,
    ) -> Result<Page<Self>, sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM challenges WHERE TRUE");
        push_tenant_conditions(&mut count, scope, vendor_id);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM challenges WHERE TRUE",
            CHALLENGE_COLUMNS
        ));
        push_tenant_conditions(&mut select, scope, vendor_id);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = select.build_query_as::<Challenge>().fetch_all(pool).await?;

        Ok(Page::new(items, total, page))
    }

    /// Records a result for this challenge under its academy
    pub async fn record(
        &self,
        pool: &PgPool,
        data: CreateChallengeLog,
    ) -> Result<ChallengeLog, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO challenge_logs (account_id, challenge_id, vendor_id, point, note)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            CHALLENGE_LOG_COLUMNS
        );

        sqlx::query_as::<_, ChallengeLog>(&sql)
            .bind(data.account_id)
            .bind(self.id)
            .bind(self.vendor_id)
            .bind(data.point)
            .bind(data.note)
            .fetch_one(pool)
            .await
    }
}

impl ChallengeLog {
    /// Scoped listing: members see their own results
    pub async fn list(
        pool: &PgPool,
        scope: RecordScope,
        challenge_id: Option<i64>,
        page: PageRequest,
    ) -> Result<Page<Self>, sqlx::Error> {
        fn push_conditions(
            builder: &mut QueryBuilder<'_, Postgres>,
            scope: RecordScope,
            challenge_id: Option<i64>,
        ) {
            scope.push_filter(builder, "vendor_id", Some("account_id"));
            if let Some(challenge_id) = challenge_id {
                builder.push(" AND challenge_id = ").push_bind(challenge_id);
            }
        }

        let mut count =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM challenge_logs WHERE TRUE");
        push_conditions(&mut count, scope, challenge_id);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM challenge_logs WHERE TRUE",
            CHALLENGE_LOG_COLUMNS
        ));
        push_conditions(&mut select, scope, challenge_id);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = select.build_query_as::<ChallengeLog>().fetch_all(pool).await?;

        Ok(Page::new(items, total, page))
    }
}
