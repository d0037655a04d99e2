/// Match endpoints
///
/// - `POST /api/match/create` - Schedule a match (coach or admin)
/// - `GET /api/matches` - Matches visible to the caller
/// - `GET /api/matches/vendor` - Matches of one academy

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{AppJson, AppQuery},
    response::ApiResponse,
    routes::{ensure_vendor, event_in_vendor, VendorPageQuery},
};
use academy_shared::{
    auth::{
        authorization::{require_in_tenant, require_tenant, Capability, RecordScope, Visibility},
        middleware::AuthContext,
    },
    models::{
        matches::{CreateMatch, Match},
        pagination::{Page, PageRequest},
    },
};
use axum::extract::{Extension, State};
use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMatchRequest {
    pub vendor_id: i64,
    pub event_id: Option<i64>,

    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub date: NaiveDate,

    #[serde(default)]
    pub location: String,
}

pub async fn create_match(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<CreateMatchRequest>,
) -> ApiResult<ApiResponse<Match>> {
    req.validate()?;

    let principal = state.principal(&auth).await?;
    require_in_tenant(&principal, Capability::ManageSchedule, req.vendor_id)?;

    ensure_vendor(&state, req.vendor_id).await?;
    if let Some(event_id) = req.event_id {
        event_in_vendor(&state, event_id, req.vendor_id).await?;
    }

    let created = Match::create(
        &state.db,
        CreateMatch {
            vendor_id: req.vendor_id,
            event_id: req.event_id,
            title: req.title,
            description: req.description,
            date: req.date,
            location: req.location,
        },
    )
    .await?;

    tracing::info!(match_id = created.id, vendor_id = created.vendor_id, "Match created");

    Ok(ApiResponse::created(created).with_message("Match created"))
}

pub async fn list_matches(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<VendorPageQuery>,
) -> ApiResult<ApiResponse<Page<Match>>> {
    let principal = state.principal(&auth).await?;
    let page = PageRequest::new(query.page, query.limit)?;

    let matches = Match::list(
        &state.db,
        principal.scope(Visibility::Tenant),
        query.vendor_id,
        page,
    )
    .await?;

    Ok(ApiResponse::ok(matches))
}

pub async fn list_vendor_matches(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<VendorPageQuery>,
) -> ApiResult<ApiResponse<Page<Match>>> {
    let vendor_id = query.required_vendor()?;
    let principal = state.principal(&auth).await?;
    require_tenant(&principal, vendor_id)?;

    let page = PageRequest::new(query.page, query.limit)?;

    let matches = Match::list(&state.db, RecordScope::Tenant(vendor_id), None, page).await?;

    Ok(ApiResponse::ok(matches))
}
