/// Database models for the academy backend
///
/// Each model owns its SQL. Models are plain structs with `sqlx::FromRow`
/// and static async methods taking a pool (or any executor where the call is
/// used inside a transaction).
///
/// # Models
///
/// - `account`: members, coaches and admins, plus roles and attendance counters
/// - `vendor`: academies (tenants), soft-deleted
/// - `event`, `event_log`: schedule and attendance
/// - `training`, `matches`: session records
/// - `challenge`: challenges and recorded results
/// - `payment`: fees, bulk billing and proofs
/// - `pagination`: page/limit handling for listings
///
/// # Example
///
/// ```no_run
/// use academy_shared::auth::authorization::RecordScope;
/// use academy_shared::models::event::{Event, EventFilter};
/// use academy_shared::models::pagination::PageRequest;
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let page = Event::list(
///     &pool,
///     RecordScope::Tenant(1),
///     &EventFilter { is_finish: Some(false), ..Default::default() },
///     PageRequest::new(Some(1), Some(20))?,
/// ).await?;
/// println!("{} upcoming events", page.total);
/// # Ok(())
/// # }
/// ```

pub mod account;
pub mod challenge;
pub mod event;
pub mod event_log;
pub mod matches;
pub mod pagination;
pub mod payment;
pub mod training;
pub mod vendor;
