/// Event and attendance endpoints
///
/// - `POST /api/event/create`, `PUT /api/event/:id`, `PUT /api/events/finish`
/// - `GET /api/events`
/// - `POST /api/event-log/create`, `PUT /api/event-log/status`
/// - `GET /api/event-logs`, `GET /api/event-logs/user`
///
/// Creating a log and flipping its status keep the account's attendance
/// counters in step (see [`EventLog::create_with_attendance`]).

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{AppJson, AppQuery},
    response::ApiResponse,
    routes::{ensure_vendor, event_in_vendor},
};
use academy_shared::{
    auth::{
        authorization::{require_in_tenant, require_tenant, Capability, RecordScope, Visibility},
        middleware::AuthContext,
    },
    models::{
        account::Account,
        event::{Event, EventData, EventFilter},
        event_log::{CreateEventLog, EventLog, EventLogFilter},
        pagination::{Page, PageRequest},
    },
};
use axum::extract::{Extension, Path, State};
use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

/// Event fields shared by create and update
#[derive(Debug, Deserialize, Validate)]
pub struct EventRequest {
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    /// e.g. `training`, `match`, `program`, `tournament`
    #[validate(length(min = 1, max = 50, message = "Event type is required"))]
    pub event_type: String,

    pub date: NaiveDate,
    pub time: Option<String>,

    #[serde(default)]
    pub location: String,

    pub location_point: Option<String>,

    #[serde(default)]
    pub is_paid: bool,

    pub payment_type: Option<String>,

    #[serde(default)]
    #[validate(range(min = 0.0, message = "Fee cannot be negative"))]
    pub fee: f64,
}

impl From<EventRequest> for EventData {
    fn from(req: EventRequest) -> Self {
        EventData {
            title: req.title,
            description: req.description,
            event_type: req.event_type,
            date: req.date,
            time: req.time,
            location: req.location,
            location_point: req.location_point,
            is_paid: req.is_paid,
            payment_type: req.payment_type,
            fee: req.fee,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    pub vendor_id: i64,

    #[serde(flatten)]
    #[validate(nested)]
    pub event: EventRequest,
}

#[derive(Debug, Deserialize)]
pub struct FinishEventRequest {
    pub id: i64,

    #[serde(default = "default_true")]
    pub is_finish: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct EventQuery {
    pub id: Option<i64>,
    pub vendor_id: Option<i64>,
    pub event_type: Option<String>,
    pub is_paid: Option<bool>,
    pub is_finish: Option<bool>,
    pub payment_type: Option<String>,
    pub date: Option<NaiveDate>,

    /// Substring of title, description or location
    pub search: Option<String>,

    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventLogRequest {
    /// Defaults to the caller
    pub user_id: Option<i64>,

    pub event_id: i64,
    pub vendor_id: i64,

    #[serde(default)]
    #[validate(length(max = 1000, message = "Note must be at most 1000 characters"))]
    pub note: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EventLogStatusRequest {
    pub id: i64,
    pub status: bool,

    #[serde(default)]
    #[validate(length(max = 1000, message = "Note must be at most 1000 characters"))]
    pub note: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventLogQuery {
    pub event_type: Option<String>,
    pub status: Option<bool>,
    pub event_id: Option<i64>,
    pub vendor_id: Option<i64>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl EventLogQuery {
    fn filter(&self) -> EventLogFilter {
        EventLogFilter {
            event_type: self.event_type.clone(),
            status: self.status,
            event_id: self.event_id,
            vendor_id: self.vendor_id,
        }
    }
}

async fn find_event(state: &AppState, id: i64) -> ApiResult<Event> {
    Event::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))
}

/// Create an event (coach of the academy or admin)
pub async fn create_event(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<CreateEventRequest>,
) -> ApiResult<ApiResponse<Event>> {
    req.validate()?;

    let principal = state.principal(&auth).await?;
    require_in_tenant(&principal, Capability::ManageSchedule, req.vendor_id)?;

    ensure_vendor(&state, req.vendor_id).await?;

    let event = Event::create(&state.db, req.vendor_id, req.event.into()).await?;

    tracing::info!(event_id = event.id, vendor_id = event.vendor_id, "Event created");

    Ok(ApiResponse::created(event).with_message("Event created"))
}

/// Replace an event's details; its academy cannot change
pub async fn update_event(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    AppJson(req): AppJson<EventRequest>,
) -> ApiResult<ApiResponse<Event>> {
    req.validate()?;

    let principal = state.principal(&auth).await?;
    let event = find_event(&state, id).await?;
    require_in_tenant(&principal, Capability::ManageSchedule, event.vendor_id)?;

    let event = Event::update(&state.db, id, req.into())
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))?;

    Ok(ApiResponse::ok(event).with_message("Event updated"))
}

/// Mark an event finished (or reopen it with `is_finish: false`)
pub async fn finish_event(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<FinishEventRequest>,
) -> ApiResult<ApiResponse<Event>> {
    let principal = state.principal(&auth).await?;
    let event = find_event(&state, req.id).await?;
    require_in_tenant(&principal, Capability::ManageSchedule, event.vendor_id)?;

    let event = Event::set_finished(&state.db, req.id, req.is_finish)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))?;

    Ok(ApiResponse::ok(event))
}

/// Events of the caller's academy (all academies for admins)
pub async fn list_events(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<EventQuery>,
) -> ApiResult<ApiResponse<Page<Event>>> {
    let principal = state.principal(&auth).await?;
    let page = PageRequest::new(query.page, query.limit)?;

    let filter = EventFilter {
        id: query.id,
        vendor_id: query.vendor_id,
        event_type: query.event_type,
        is_paid: query.is_paid,
        is_finish: query.is_finish,
        payment_type: query.payment_type,
        date: query.date,
        search: query.search,
    };

    let events = Event::list(&state.db, principal.scope(Visibility::Tenant), &filter, page).await?;

    Ok(ApiResponse::ok(events))
}

/// Log attendance at an event
///
/// Members log themselves; logging someone else takes a coach of the
/// academy or an admin. The logged account must belong to the academy.
///
/// # Errors
///
/// - `400 Bad Request`: event or account belongs to another academy
/// - `403 Forbidden`: logging another account without permission
/// - `404 Not Found`: vendor, event or account missing
/// - `409 Conflict`: the account already has a log for this event
pub async fn create_event_log(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<CreateEventLogRequest>,
) -> ApiResult<ApiResponse<EventLog>> {
    req.validate()?;

    let principal = state.principal(&auth).await?;

    ensure_vendor(&state, req.vendor_id).await?;
    let event = event_in_vendor(&state, req.event_id, req.vendor_id).await?;

    let account_id = req.user_id.unwrap_or(principal.id);
    if account_id == principal.id {
        require_tenant(&principal, req.vendor_id)?;
    } else {
        require_in_tenant(&principal, Capability::RecordAttendance, req.vendor_id)?;
    }

    let account = Account::find_by_id(&state.db, account_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    if account.vendor_id != Some(req.vendor_id) {
        return Err(ApiError::BadRequest(
            "User does not belong to this vendor".to_string(),
        ));
    }

    if EventLog::exists_for(&state.db, account_id, event.id).await? {
        return Err(ApiError::Conflict("Event log already exists".to_string()));
    }

    let log = EventLog::create_with_attendance(
        &state.db,
        CreateEventLog {
            account_id,
            event_id: event.id,
            vendor_id: event.vendor_id,
            user_name: account.name,
            event_type: event.event_type,
            note: req.note,
        },
    )
    .await?;

    tracing::info!(
        log_id = log.id,
        account_id,
        event_id = log.event_id,
        "Attendance logged"
    );

    Ok(ApiResponse::created(log).with_message("Event log created"))
}

/// Flip a log's status (coach of the academy or admin)
pub async fn update_event_log_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<EventLogStatusRequest>,
) -> ApiResult<ApiResponse<EventLog>> {
    req.validate()?;

    let principal = state.principal(&auth).await?;

    let log = EventLog::find_by_id(&state.db, req.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event log not found".to_string()))?;
    require_in_tenant(&principal, Capability::RecordAttendance, log.vendor_id)?;

    let log = EventLog::update_status(&state.db, req.id, req.status, &req.note)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event log not found".to_string()))?;

    Ok(ApiResponse::ok(log).with_message("Event log updated"))
}

/// Logs visible to the caller
pub async fn list_event_logs(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<EventLogQuery>,
) -> ApiResult<ApiResponse<Page<EventLog>>> {
    let principal = state.principal(&auth).await?;
    let page = PageRequest::new(query.page, query.limit)?;

    let logs = EventLog::list(
        &state.db,
        principal.scope(Visibility::Personal),
        &query.filter(),
        page,
    )
    .await?;

    Ok(ApiResponse::ok(logs))
}

/// The caller's own logs
pub async fn list_own_event_logs(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<EventLogQuery>,
) -> ApiResult<ApiResponse<Page<EventLog>>> {
    let page = PageRequest::new(query.page, query.limit)?;

    let logs = EventLog::list(
        &state.db,
        RecordScope::Own(auth.user_id),
        &query.filter(),
        page,
    )
    .await?;

    Ok(ApiResponse::ok(logs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_event_request_flattens() {
        let req: CreateEventRequest = serde_json::from_value(serde_json::json!({
            "vendor_id": 3,
            "title": "U-12 training",
            "event_type": "training",
            "date": "2025-03-01",
            "fee": 50000.0
        }))
        .unwrap();

        assert!(req.validate().is_ok());

        let data = EventData::from(req.event);
        assert_eq!(data.event_type, "training");
        assert!(!data.is_paid);
        assert_eq!(data.description, "");
    }

    #[test]
    fn test_negative_fee_rejected() {
        let req: EventRequest = serde_json::from_value(serde_json::json!({
            "title": "Cup",
            "event_type": "tournament",
            "date": "2025-03-01",
            "fee": -1.0
        }))
        .unwrap();

        assert!(req.validate().is_err());
    }

    #[test]
    fn test_finish_defaults_to_true() {
        let req: FinishEventRequest = serde_json::from_value(serde_json::json!({"id": 9})).unwrap();
        assert!(req.is_finish);
    }
}
