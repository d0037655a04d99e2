/// Training session endpoints
///
/// - `POST /api/training/create` - Record a session (coach or admin)
/// - `GET /api/trainings` - Sessions visible to the caller
/// - `GET /api/trainings/vendor` - Sessions of one academy

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
        pagination::{Page, PageRequest},
        training::{CreateTraining, Training},
    },
};
use axum::extract::{Extension, State};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTrainingRequest {
    pub vendor_id: i64,
    pub event_id: Option<i64>,

    #[validate(length(min = 1, max = 50, message = "Training type is required"))]
    pub training_type: String,

    #[serde(default)]
    pub notes: String,
}

/// Record a training session; the caller is stored as its coach
pub async fn create_training(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<CreateTrainingRequest>,
) -> ApiResult<ApiResponse<Training>> {
    req.validate()?;

    let principal = state.principal(&auth).await?;
    require_in_tenant(&principal, Capability::ManageSchedule, req.vendor_id)?;

    ensure_vendor(&state, req.vendor_id).await?;
    if let Some(event_id) = req.event_id {
        event_in_vendor(&state, event_id, req.vendor_id).await?;
    }

    let training = Training::create(
        &state.db,
        CreateTraining {
            vendor_id: req.vendor_id,
            account_id: Some(principal.id),
            event_id: req.event_id,
            training_type: req.training_type,
            notes: req.notes,
        },
    )
    .await?;

    tracing::info!(training_id = training.id, vendor_id = training.vendor_id, "Training recorded");

    Ok(ApiResponse::created(training).with_message("Training created"))
}

pub async fn list_trainings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<VendorPageQuery>,
) -> ApiResult<ApiResponse<Page<Training>>> {
    let principal = state.principal(&auth).await?;
    let page = PageRequest::new(query.page, query.limit)?;

    let trainings = Training::list(
        &state.db,
        principal.scope(Visibility::Tenant),
        query.vendor_id,
        page,
    )
    .await?;

    Ok(ApiResponse::ok(trainings))
}

pub async fn list_vendor_trainings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<VendorPageQuery>,
) -> ApiResult<ApiResponse<Page<Training>>> {
    let vendor_id = query.required_vendor()?;
    let principal = state.principal(&auth).await?;
    require_tenant(&principal, vendor_id)?;

    let page = PageRequest::new(query.page, query.limit)?;

    let trainings = Training::list(&state.db, RecordScope::Tenant(vendor_id), None, page).await?;

    Ok(ApiResponse::ok(trainings))
}
