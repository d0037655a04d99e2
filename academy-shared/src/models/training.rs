/// Training session records
///
/// A training optionally points at the scheduling event and at the account
/// that logged it (usually the coach).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::pagination::{Page, PageRequest};
use crate::auth::authorization::RecordScope;

const TRAINING_COLUMNS: &str =
    "id, vendor_id, account_id, event_id, training_type, notes, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Training {
    pub id: i64,
    pub vendor_id: i64,
    pub account_id: Option<i64>,
    pub event_id: Option<i64>,

    /// e.g. physical, technique, tactics
    pub training_type: String,

    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTraining {
    pub vendor_id: i64,
    pub account_id: Option<i64>,
    pub event_id: Option<i64>,
    pub training_type: String,
    pub notes: String,
}

/// Scope plus optional academy filter, shared by the schedule listings
pub(crate) fn push_tenant_conditions(
    builder: &mut QueryBuilder<'_, Postgres>,
    scope: RecordScope,
    vendor_id: Option<i64>,
) {
    scope.push_filter(builder, "vendor_id", None);
    if let Some(vendor_id) = vendor_id {
        builder.push(" AND vendor_id = ").push_bind(vendor_id);
    }
}

impl Training {
    pub async fn create(pool: &PgPool, data: CreateTraining) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO trainings (vendor_id, account_id, event_id, training_type, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            TRAINING_COLUMNS
        );

        sqlx::query_as::<_, Training>(&sql)
            .bind(data.vendor_id)
            .bind(data.account_id)
            .bind(data.event_id)
            .bind(data.training_type)
            .bind(data.notes)
            .fetch_one(pool)
            .await
    }

    /// Scoped listing, optionally narrowed to one academy
    pub async fn list(
        pool: &PgPool,
        scope: RecordScope,
        vendor_id: Option<i64>,
        page: PageRequest,
    ) -> Result<Page<Self>, sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM trainings WHERE TRUE");
        push_tenant_conditions(&mut count, scope, vendor_id);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM trainings WHERE TRUE",
            TRAINING_COLUMNS
        ));
        push_tenant_conditions(&mut select, scope, vendor_id);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = select.build_query_as::<Training>().fetch_all(pool).await?;

        Ok(Page::new(items, total, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_conditions() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM trainings WHERE TRUE");
        push_tenant_conditions(&mut builder, RecordScope::All, Some(5));
        assert_eq!(builder.sql(), "SELECT COUNT(*) FROM trainings WHERE TRUE AND vendor_id = $1");

        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM trainings WHERE TRUE");
        push_tenant_conditions(&mut builder, RecordScope::Tenant(2), None);
        assert_eq!(builder.sql(), "SELECT COUNT(*) FROM trainings WHERE TRUE AND vendor_id = $1");
    }
}
