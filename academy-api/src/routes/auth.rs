/// Authentication endpoints
///
/// - `POST /api/register` - Create an account
/// - `POST /api/login` - Email and password login
/// - `POST /api/refresh` - New access token from a refresh token
/// - `POST /api/login/federated` - Sign in with an identity-provider token
///
/// The flows live in [`academy_shared::auth::credentials`]; these handlers
/// only shape requests and responses.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::AppJson,
    response::ApiResponse,
    routes::present_account,
};
use academy_shared::{
    auth::{
        credentials::{self, FederatedOutcome, RegisterInput},
        federated::FederatedProfile,
        jwt::TokenType,
    },
    models::account::{Account, Role},
};
use axum::extract::State;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Register request
///
/// Email format and password presence are checked by the registration flow
/// itself (400); the bounds below are request validation (422).
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,

    pub phone: Option<String>,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub name: String,

    /// `member` (default) or `coach`
    pub role: Option<Role>,

    pub vendor_id: Option<i64>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub position: Option<String>,
    pub foot: Option<String>,

    #[validate(range(min = 0, max = 999, message = "Number must be between 0 and 999"))]
    pub number: Option<i32>,

    pub age_category: Option<String>,
    pub fcm_token: Option<String>,
}

impl From<RegisterRequest> for RegisterInput {
    fn from(req: RegisterRequest) -> Self {
        RegisterInput {
            email: req.email.trim().to_string(),
            phone: req.phone,
            password: req.password,
            name: req.name,
            role: req.role,
            vendor_id: req.vendor_id,
            address: req.address,
            photo: None,
            gender: req.gender,
            birth_date: req.birth_date,
            position: req.position,
            foot: req.foot,
            number: req.number,
            age_category: req.age_category,
            fcm_token: req.fcm_token,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,

    /// Device push token, replaces the stored one
    pub fcm_token: Option<String>,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: Account,

    /// Access token (6h)
    pub access_token: String,

    /// Refresh token (14d)
    pub refresh_token: String,

    pub token_type: &'static str,

    /// Access token lifetime in seconds
    pub expires_in: i64,
}

impl LoginResponse {
    fn new(user: Account, access_token: String, refresh_token: String) -> Self {
        Self {
            user,
            access_token,
            refresh_token,
            token_type: "Bearer",
            expires_in: TokenType::Access.default_expiration().num_seconds(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (6h)
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
pub struct FederatedLoginRequest {
    #[serde(default)]
    pub id_token: String,

    pub fcm_token: Option<String>,
}

/// Federated login response
///
/// Unknown emails get `need_register: true` and the provider profile;
/// known accounts get the same tokens as a password login.
#[derive(Debug, Serialize)]
pub struct FederatedLoginResponse {
    pub need_register: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<FederatedProfile>,

    /// The account has not joined an academy yet
    pub must_complete_profile: bool,

    #[serde(flatten)]
    pub session: Option<LoginResponse>,
}

/// Register a new account
///
/// # Endpoint
///
/// ```text
/// POST /api/register
/// Content-Type: application/json
///
/// {
///   "email": "a@b.com",
///   "phone": "111",
///   "password": "pw",
///   "name": "Budi"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: malformed email or empty password
/// - `403 Forbidden`: `admin` role requested
/// - `404 Not Found`: unknown `vendor_id`
/// - `409 Conflict`: email or phone already registered
/// - `422 Unprocessable Entity`: field bounds
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> ApiResult<ApiResponse<Account>> {
    req.validate()?;

    let account = credentials::register(state.accounts.as_ref(), req.into()).await?;

    Ok(ApiResponse::created(present_account(&state.uploads, account))
        .with_message("Registration successful"))
}

/// Login with email and password
///
/// # Errors
///
/// - `401 Unauthorized`: unknown email or wrong password (same message)
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> ApiResult<ApiResponse<LoginResponse>> {
    let (account, tokens) = credentials::login(
        state.accounts.as_ref(),
        req.email.trim(),
        &req.password,
        req.fcm_token.as_deref(),
        state.jwt_secret(),
    )
    .await?;

    Ok(ApiResponse::ok(LoginResponse::new(
        present_account(&state.uploads, account),
        tokens.access_token,
        tokens.refresh_token,
    ))
    .with_message("Login successful"))
}

/// Exchange a refresh token for a new access token
///
/// The refresh token is not rotated.
///
/// # Errors
///
/// - `401 Unauthorized`: invalid or expired refresh token, or an access token
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(req): AppJson<RefreshRequest>,
) -> ApiResult<ApiResponse<RefreshResponse>> {
    let access_token = credentials::refresh(&req.refresh_token, state.jwt_secret())?;

    Ok(ApiResponse::ok(RefreshResponse {
        access_token,
        token_type: "Bearer",
        expires_in: TokenType::Access.default_expiration().num_seconds(),
    }))
}

/// Sign in with an identity-provider id token
///
/// # Errors
///
/// - `400 Bad Request`: missing `id_token`
/// - `401 Unauthorized`: the provider token doesn't verify
/// - `503 Service Unavailable`: federated login not configured
pub async fn federated_login(
    State(state): State<AppState>,
    AppJson(req): AppJson<FederatedLoginRequest>,
) -> ApiResult<ApiResponse<FederatedLoginResponse>> {
    let verifier = state.identity.clone().ok_or_else(|| {
        ApiError::ServiceUnavailable("Federated login is not configured".to_string())
    })?;

    if req.id_token.trim().is_empty() {
        return Err(ApiError::BadRequest("id_token is required".to_string()));
    }

    let outcome = credentials::federated_login(
        state.accounts.as_ref(),
        verifier.as_ref(),
        req.id_token.trim(),
        req.fcm_token.as_deref(),
        state.jwt_secret(),
    )
    .await?;

    let response = match outcome {
        FederatedOutcome::NeedRegister { profile } => {
            ApiResponse::ok(FederatedLoginResponse {
                need_register: true,
                profile: Some(profile),
                must_complete_profile: true,
                session: None,
            })
            .with_message("Registration required")
        }
        FederatedOutcome::SignedIn {
            account,
            tokens,
            must_complete_profile,
        } => ApiResponse::ok(FederatedLoginResponse {
            need_register: false,
            profile: None,
            must_complete_profile,
            session: Some(LoginResponse::new(
                present_account(&state.uploads, account),
                tokens.access_token,
                tokens.refresh_token,
            )),
        })
        .with_message("Login successful"),
    };

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_trims_email() {
        let req: RegisterRequest = serde_json::from_value(serde_json::json!({
            "email": " a@b.com ",
            "password": "pw",
            "role": "coach"
        }))
        .unwrap();

        let input = RegisterInput::from(req);
        assert_eq!(input.email, "a@b.com");
        assert_eq!(input.role, Some(Role::Coach));
        assert!(input.photo.is_none());
    }

    #[test]
    fn test_register_request_bounds() {
        let req: RegisterRequest = serde_json::from_value(serde_json::json!({
            "email": "a@b.com",
            "password": "pw",
            "number": 1000
        }))
        .unwrap();

        assert!(req.validate().is_err());
    }

    #[test]
    fn test_need_register_shape() {
        let body = FederatedLoginResponse {
            need_register: true,
            profile: Some(FederatedProfile {
                uid: "u1".to_string(),
                email: "new@club.id".to_string(),
                name: None,
                picture: None,
            }),
            must_complete_profile: true,
            session: None,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["need_register"], true);
        assert_eq!(json["profile"]["email"], "new@club.id");
        assert!(json.get("access_token").is_none());
    }
}
