/// Account endpoints
///
/// - `GET /api/user/profile` - Caller's account and academy
/// - `PUT /api/user/foto` - Upload the caller's photo
/// - `PUT /api/user/update` - Edit an account
/// - `GET /api/users` - Accounts visible to the caller
/// - `GET /api/users/vendor` - An academy's roster
/// - `GET /api/users/search` - Filter by name, email or role

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{AppJson, AppMultipart, AppQuery},
    response::ApiResponse,
    routes::{ensure_vendor, present_account, present_vendor, VendorPageQuery},
    uploads::{MultipartForm, UploadTarget},
};
use academy_shared::{
    auth::{
        authorization::{
            require, require_self_or, require_tenant, Capability, Principal, RecordScope,
            Visibility,
        },
        credentials::is_valid_email,
        middleware::AuthContext,
        password,
    },
    models::{
        account::{Account, AccountFilter, Role, UpdateAccount},
        pagination::{Page, PageRequest},
        vendor::Vendor,
    },
};
use axum::extract::{Extension, State};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Account statuses
const STATUSES: [&str; 2] = ["free", "pro"];

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: Account,
    pub vendor: Option<Vendor>,
}

#[derive(Debug, Serialize)]
pub struct PhotoResponse {
    pub photo: String,
}

/// Account update; absent fields are left untouched
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    pub id: i64,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,

    /// Admin only
    pub role: Option<Role>,

    pub vendor_id: Option<i64>,

    #[validate(length(min = 1, max = 255, message = "Name must be 1 to 255 characters"))]
    pub name: Option<String>,

    pub address: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,

    /// `free` or `pro`
    pub status: Option<String>,

    pub position: Option<String>,
    pub foot: Option<String>,

    #[validate(range(min = 0, max = 999, message = "Number must be between 0 and 999"))]
    pub number: Option<i32>,

    pub age_category: Option<String>,

    #[validate(range(min = 0.0, max = 5.0, message = "Star must be between 0 and 5"))]
    pub star: Option<f64>,

    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub vendor_id: Option<i64>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Caller's profile
///
/// Photo links are absolute. A missing or deleted academy is `null`.
pub async fn profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<ProfileResponse>> {
    let account = state.current_account(&auth).await?;

    let vendor = match account.vendor_id {
        Some(vendor_id) => Vendor::find_by_id(&state.db, vendor_id)
            .await?
            .map(|v| present_vendor(&state.uploads, v)),
        None => None,
    };

    Ok(ApiResponse::ok(ProfileResponse {
        user: present_account(&state.uploads, account),
        vendor,
    }))
}

/// Upload the caller's photo
///
/// Multipart with a `photo` file, stored under
/// `users/<vendor>/profile/<account>`.
pub async fn update_photo(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppMultipart(multipart): AppMultipart,
) -> ApiResult<ApiResponse<PhotoResponse>> {
    let account = state.current_account(&auth).await?;
    let form = MultipartForm::read(multipart).await?;
    let file = form.required_file("photo")?;

    let tenant = account
        .vendor_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "none".to_string());
    let target = UploadTarget::new("users", tenant, "profile", account.id);
    let path = state.uploads.save(&target, "photo", file).await?;

    if !Account::update_photo(&state.db, account.id, &path).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(account_id = account.id, "Profile photo updated");

    Ok(ApiResponse::ok(PhotoResponse {
        photo: state.uploads.public_url(&path),
    })
    .with_message("Photo updated"))
}

/// Edit an account
///
/// Allowed for the account itself, a coach of its academy when the account
/// is a member, or an admin.
///
/// # Errors
///
/// - `400 Bad Request`: malformed email, unknown status, nothing to update
/// - `403 Forbidden`: not allowed to edit this account (coaches only edit
///   members of their academy), a role change by a non-admin, or a coach
///   moved to another academy by a non-admin
/// - `404 Not Found`: account or target academy missing
/// - `409 Conflict`: email or phone taken by another account
pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<UpdateUserRequest>,
) -> ApiResult<ApiResponse<Account>> {
    req.validate()?;

    let principal = state.principal(&auth).await?;

    let target = state
        .accounts
        .find_by_id(req.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    require_self_or(&principal, &Principal::from(&target), Capability::ManageMembers)?;

    if req.role.is_some_and(|role| role != target.role) {
        require(&principal, Capability::Administer)?;
    }

    let email = req.email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty());
    if let Some(email) = email.as_deref() {
        if !is_valid_email(email) {
            return Err(ApiError::BadRequest("Invalid email format".to_string()));
        }
        if Account::email_taken(&state.db, email, Some(target.id)).await? {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }
    }

    let phone = req.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
    if let Some(phone) = phone.as_deref() {
        if Account::phone_taken(&state.db, phone, Some(target.id)).await? {
            return Err(ApiError::Conflict("Phone already registered".to_string()));
        }
    }

    if let Some(status) = req.status.as_deref() {
        if !STATUSES.contains(&status) {
            return Err(ApiError::BadRequest(format!("Unknown status: {}", status)));
        }
    }

    if let Some(vendor_id) = req.vendor_id {
        // Moving someone else into an academy needs access to that academy
        if principal.id != target.id {
            require_tenant(&principal, vendor_id)?;
        }
        // Coaches are attached to an academy by an admin only
        if target.role >= Role::Coach && target.vendor_id != Some(vendor_id) {
            require(&principal, Capability::Administer)?;
        }
        ensure_vendor(&state, vendor_id).await?;
    }

    let password_hash = match req.password.filter(|p| !p.is_empty()) {
        Some(plain) => Some(password::hash_password_blocking(plain).await?),
        None => None,
    };

    let update = UpdateAccount {
        email,
        phone,
        password_hash,
        role: req.role,
        vendor_id: req.vendor_id,
        name: req.name,
        address: req.address,
        gender: req.gender,
        birth_date: req.birth_date,
        status: req.status,
        position: req.position,
        foot: req.foot,
        number: req.number,
        age_category: req.age_category,
        star: req.star,
        active: req.active,
    };

    if update.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let account = Account::update(&state.db, target.id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(account_id = account.id, by = principal.id, "Account updated");

    Ok(ApiResponse::ok(present_account(&state.uploads, account)).with_message("User updated"))
}

/// Accounts visible to the caller
///
/// Members see only themselves, coaches their academy, admins everyone
/// (optionally narrowed by `vendor_id`).
pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<VendorPageQuery>,
) -> ApiResult<ApiResponse<Page<Account>>> {
    let principal = state.principal(&auth).await?;
    let page = PageRequest::new(query.page, query.limit)?;

    let filter = AccountFilter {
        vendor_id: query.vendor_id,
        ..Default::default()
    };

    let accounts = Account::list(
        &state.db,
        principal.scope(Visibility::Personal),
        &filter,
        page,
    )
    .await?;

    Ok(ApiResponse::ok(accounts.map(|a| present_account(&state.uploads, a))))
}

/// Roster of one academy
pub async fn list_vendor_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<VendorPageQuery>,
) -> ApiResult<ApiResponse<Page<Account>>> {
    let vendor_id = query.required_vendor()?;
    let principal = state.principal(&auth).await?;
    require_tenant(&principal, vendor_id)?;

    let page = PageRequest::new(query.page, query.limit)?;

    let accounts = Account::list(
        &state.db,
        RecordScope::Tenant(vendor_id),
        &AccountFilter::default(),
        page,
    )
    .await?;

    Ok(ApiResponse::ok(accounts.map(|a| present_account(&state.uploads, a))))
}

/// Case-insensitive substring search within the caller's scope
pub async fn search_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<SearchQuery>,
) -> ApiResult<ApiResponse<Page<Account>>> {
    let principal = state.principal(&auth).await?;
    let page = PageRequest::new(query.page, query.limit)?;

    let filter = AccountFilter {
        name: query.name,
        email: query.email,
        role: query.role,
        vendor_id: query.vendor_id,
    };

    let accounts = Account::list(
        &state.db,
        principal.scope(Visibility::Personal),
        &filter,
        page,
    )
    .await?;

    Ok(ApiResponse::ok(accounts.map(|a| present_account(&state.uploads, a))))
}
