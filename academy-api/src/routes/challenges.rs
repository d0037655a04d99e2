/// Challenge endpoints
///
/// - `POST /api/challenge/create` - New challenge (coach or admin)
/// - `GET /api/challenges`, `GET /api/challenges/vendor`
/// - `POST /api/challenge-log/create` - Record a result (coach or admin)
/// - `GET /api/challenge-logs` - Results visible to the caller

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
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
        account::Account,
        challenge::{Challenge, ChallengeLog, CreateChallenge, CreateChallengeLog},
        pagination::{Page, PageRequest},
    },
};
use axum::extract::{Extension, State};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateChallengeRequest {
    pub vendor_id: i64,
    pub event_id: Option<i64>,

    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,

    #[validate(length(min = 1, max = 100, message = "Category is required"))]
    pub category: String,

    #[validate(range(min = 1, message = "Max point must be positive"))]
    pub max_point: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateChallengeLogRequest {
    pub challenge_id: i64,
    pub user_id: i64,

    #[validate(range(min = 0.0, message = "Point cannot be negative"))]
    pub point: f64,

    #[serde(default)]
    #[validate(length(max = 1000, message = "Note must be at most 1000 characters"))]
    pub note: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChallengeLogQuery {
    pub challenge_id: Option<i64>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn create_challenge(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<CreateChallengeRequest>,
) -> ApiResult<ApiResponse<Challenge>> {
    req.validate()?;

    let principal = state.principal(&auth).await?;
    require_in_tenant(&principal, Capability::ManageSchedule, req.vendor_id)?;

    ensure_vendor(&state, req.vendor_id).await?;
    if let Some(event_id) = req.event_id {
        event_in_vendor(&state, event_id, req.vendor_id).await?;
    }

    let challenge = Challenge::create(
        &state.db,
        CreateChallenge {
            vendor_id: req.vendor_id,
            event_id: req.event_id,
            title: req.title,
            category: req.category,
            max_point: req.max_point,
        },
    )
    .await?;

    tracing::info!(challenge_id = challenge.id, vendor_id = challenge.vendor_id, "Challenge created");

    Ok(ApiResponse::created(challenge).with_message("Challenge created"))
}

pub async fn list_challenges(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<VendorPageQuery>,
) -> ApiResult<ApiResponse<Page<Challenge>>> {
    let principal = state.principal(&auth).await?;
    let page = PageRequest::new(query.page, query.limit)?;

    let challenges = Challenge::list(
        &state.db,
        principal.scope(Visibility::Tenant),
        query.vendor_id,
        page,
    )
    .await?;

    Ok(ApiResponse::ok(challenges))
}

pub async fn list_vendor_challenges(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<VendorPageQuery>,
) -> ApiResult<ApiResponse<Page<Challenge>>> {
    let vendor_id = query.required_vendor()?;
    let principal = state.principal(&auth).await?;
    require_tenant(&principal, vendor_id)?;

    let page = PageRequest::new(query.page, query.limit)?;

    let challenges =
        Challenge::list(&state.db, RecordScope::Tenant(vendor_id), None, page).await?;

    Ok(ApiResponse::ok(challenges))
}

/// Record a challenge result for an account
///
/// The account must belong to the challenge's academy; the log is filed
/// under that academy.
///
/// # Errors
///
/// - `400 Bad Request`: account from another academy
/// - `404 Not Found`: challenge or account missing
/// - `422 Unprocessable Entity`: point outside `0..=max_point`
pub async fn create_challenge_log(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<CreateChallengeLogRequest>,
) -> ApiResult<ApiResponse<ChallengeLog>> {
    req.validate()?;

    let principal = state.principal(&auth).await?;

    let challenge = Challenge::find_by_id(&state.db, req.challenge_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Challenge not found".to_string()))?;
    require_in_tenant(&principal, Capability::RecordChallengeResult, challenge.vendor_id)?;

    let account = Account::find_by_id(&state.db, req.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    if account.vendor_id != Some(challenge.vendor_id) {
        return Err(ApiError::BadRequest(
            "User and challenge belong to different vendors".to_string(),
        ));
    }

    if req.point > f64::from(challenge.max_point) {
        return Err(ApiError::invalid(
            "point",
            format!("Point cannot exceed {}", challenge.max_point),
        ));
    }

    let log = challenge
        .record(
            &state.db,
            CreateChallengeLog {
                account_id: account.id,
                point: req.point,
                note: req.note,
            },
        )
        .await?;

    tracing::info!(
        log_id = log.id,
        challenge_id = challenge.id,
        account_id = account.id,
        "Challenge result recorded"
    );

    Ok(ApiResponse::created(log).with_message("Challenge log created"))
}

/// Results visible to the caller: own for members, academy for coaches
pub async fn list_challenge_logs(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<ChallengeLogQuery>,
) -> ApiResult<ApiResponse<Page<ChallengeLog>>> {
    let principal = state.principal(&auth).await?;
    let page = PageRequest::new(query.page, query.limit)?;

    let logs = ChallengeLog::list(
        &state.db,
        principal.scope(Visibility::Personal),
        query.challenge_id,
        page,
    )
    .await?;

    Ok(ApiResponse::ok(logs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenge_request_bounds() {
        let req: CreateChallengeRequest = serde_json::from_value(serde_json::json!({
            "vendor_id": 1,
            "title": "Juggling",
            "category": "technique",
            "max_point": 0
        }))
        .unwrap();

        assert!(req.validate().is_err());
    }

    #[test]
    fn test_negative_point_rejected() {
        let req: CreateChallengeLogRequest = serde_json::from_value(serde_json::json!({
            "challenge_id": 1,
            "user_id": 2,
            "point": -3.0
        }))
        .unwrap();

        assert!(req.validate().is_err());
    }
}
