/// Academy (vendor) endpoints
///
/// - `GET /api/vendor` - Public directory (public)
/// - `POST /api/vendor/create` - Register an academy (public)
/// - `PUT /api/vendor/foto` - Academy photo
/// - `PUT /api/vendor/bank` - Bank details
/// - `DELETE /api/vendor/:id` - Soft delete (admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{AppJson, AppMultipart, AppQuery},
    response::ApiResponse,
    routes::{ensure_vendor, present_vendor},
    uploads::{MultipartForm, UploadTarget},
};
use academy_shared::{
    auth::{
        authorization::{require, require_in_tenant, Capability},
        credentials::is_valid_email,
        middleware::AuthContext,
    },
    models::{
        pagination::{Page, PageRequest},
        vendor::{CreateVendor, UpdateVendorBank, Vendor},
    },
};
use axum::extract::{Extension, Path, State};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Default, Deserialize)]
pub struct VendorListQuery {
    pub name: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVendorRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "Phone is required"))]
    pub phone: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Category is required"))]
    pub category: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBankRequest {
    pub vendor_id: i64,

    #[validate(length(min = 1, max = 100, message = "Bank name is required"))]
    pub bank_name: String,

    #[validate(length(min = 1, max = 50, message = "Bank account is required"))]
    pub bank_account: String,

    #[validate(length(min = 1, max = 255, message = "Account holder is required"))]
    pub bank_holder: String,
}

#[derive(Debug, Serialize)]
pub struct VendorPhotoResponse {
    pub vendor_id: i64,
    pub photo: String,
}

/// Public academy directory, optionally filtered by name
pub async fn list_vendors(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<VendorListQuery>,
) -> ApiResult<ApiResponse<Page<Vendor>>> {
    let page = PageRequest::new(query.page, query.limit)?;

    let vendors = Vendor::list(&state.db, query.name.as_deref(), page).await?;

    Ok(ApiResponse::ok(vendors.map(|v| present_vendor(&state.uploads, v))))
}

/// Register an academy
///
/// # Errors
///
/// - `400 Bad Request`: malformed email
/// - `409 Conflict`: email or phone used by another live academy
/// - `422 Unprocessable Entity`: a required field is empty
pub async fn create_vendor(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateVendorRequest>,
) -> ApiResult<ApiResponse<Vendor>> {
    req.validate()?;

    let email = req.email.trim().to_string();
    if !is_valid_email(&email) {
        return Err(ApiError::BadRequest("Invalid email format".to_string()));
    }

    if let Some(field) = Vendor::find_duplicate(&state.db, &email, &req.phone).await? {
        return Err(ApiError::Conflict(format!("Vendor {} already registered", field)));
    }

    let vendor = Vendor::create(
        &state.db,
        CreateVendor {
            name: req.name,
            email,
            phone: req.phone,
            address: req.address,
            description: req.description,
            category: req.category,
        },
    )
    .await?;

    tracing::info!(vendor_id = vendor.id, "Vendor created");

    Ok(ApiResponse::created(vendor).with_message("Vendor created"))
}

/// Upload an academy photo
///
/// Multipart with `vendor_id` and a `photo` file.
pub async fn update_photo(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppMultipart(multipart): AppMultipart,
) -> ApiResult<ApiResponse<VendorPhotoResponse>> {
    let principal = state.principal(&auth).await?;
    let form = MultipartForm::read(multipart).await?;

    let vendor_id: i64 = form.parse_required("vendor_id")?;
    require_in_tenant(&principal, Capability::ManageVendor, vendor_id)?;

    ensure_vendor(&state, vendor_id).await?;

    let file = form.required_file("photo")?;
    let target = UploadTarget::new("vendors", vendor_id, "profile", principal.id);
    let path = state.uploads.save(&target, "photo", file).await?;

    if !Vendor::update_photo(&state.db, vendor_id, &path).await? {
        return Err(ApiError::NotFound("Vendor not found".to_string()));
    }

    Ok(ApiResponse::ok(VendorPhotoResponse {
        vendor_id,
        photo: state.uploads.public_url(&path),
    })
    .with_message("Photo updated"))
}

/// Set an academy's bank details (coach of the academy or admin)
pub async fn update_bank(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<UpdateBankRequest>,
) -> ApiResult<ApiResponse<Vendor>> {
    req.validate()?;

    let principal = state.principal(&auth).await?;
    require_in_tenant(&principal, Capability::ManageVendor, req.vendor_id)?;

    let vendor = Vendor::update_bank(
        &state.db,
        req.vendor_id,
        UpdateVendorBank {
            bank_name: req.bank_name,
            bank_account: req.bank_account,
            bank_holder: req.bank_holder,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Vendor not found".to_string()))?;

    tracing::info!(vendor_id = vendor.id, by = principal.id, "Vendor bank details updated");

    Ok(ApiResponse::ok(present_vendor(&state.uploads, vendor)).with_message("Bank details updated"))
}

/// Soft-delete an academy (admin)
pub async fn delete_vendor(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<ApiResponse<()>> {
    let principal = state.principal(&auth).await?;
    require(&principal, Capability::Administer)?;

    if !Vendor::soft_delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Vendor not found".to_string()));
    }

    tracing::info!(vendor_id = id, by = principal.id, "Vendor deleted");

    Ok(ApiResponse::message("Vendor deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_vendor_requires_fields() {
        let req: CreateVendorRequest = serde_json::from_value(serde_json::json!({
            "name": "Garuda FC",
            "email": "info@garuda.id"
        }))
        .unwrap();

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("phone"));
        assert!(fields.contains_key("address"));
        assert!(fields.contains_key("category"));
        assert!(!fields.contains_key("name"));
    }

    #[test]
    fn test_bank_request_validates() {
        let req: UpdateBankRequest = serde_json::from_value(serde_json::json!({
            "vendor_id": 1,
            "bank_name": "BCA",
            "bank_account": "1234567890",
            "bank_holder": "Garuda FC"
        }))
        .unwrap();

        assert!(req.validate().is_ok());
    }
}
