/// Payment endpoints
///
/// - `POST /api/payment/create` - Record a payment (multipart, optional proof)
/// - `POST /api/payment/bulk` - Bill everyone present at an event
/// - `PUT /api/payment/status` - Confirm or reject a payment
/// - `PUT /api/payment/proof` - Attach a proof photo (owner only)
/// - `GET /api/payments`, `GET /api/payments/user`, `GET /api/payments/vendor`
///
/// Proof photos are stored under `payment/<vendor>/<type>/<account>`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{AppJson, AppMultipart, AppQuery},
    response::ApiResponse,
    routes::{ensure_vendor, event_in_vendor},
    uploads::{MultipartForm, UploadStore, UploadTarget},
};
use academy_shared::{
    auth::{
        authorization::{
            require_in_tenant, require_tenant, AuthzError, Capability, RecordScope, Visibility,
        },
        middleware::AuthContext,
    },
    models::{
        account::Account,
        pagination::{Page, PageRequest},
        payment::{
            BulkPayment, CreatePayment, Payment, PaymentFilter, PaymentStatus, SortColumn,
            SortOrder,
        },
    },
};
use axum::extract::{Extension, State};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

const DEFAULT_METHOD: &str = "cash";
const DEFAULT_TYPE: &str = "event";

#[derive(Debug, Deserialize, Validate)]
pub struct BulkPaymentRequest {
    pub vendor_id: i64,
    pub event_id: i64,

    /// Defaults to the event fee
    #[validate(range(min = 0.0, message = "Amount cannot be negative"))]
    pub amount: Option<f64>,

    pub method: Option<String>,
    pub status: Option<PaymentStatus>,

    #[serde(rename = "type")]
    pub payment_type: Option<String>,

    /// Defaults to the event date
    pub date: Option<NaiveDate>,

    #[serde(default)]
    #[validate(length(max = 1000, message = "Note must be at most 1000 characters"))]
    pub note: String,
}

#[derive(Debug, Serialize)]
pub struct BulkPaymentResponse {
    pub count: usize,
    pub payments: Vec<Payment>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentStatusRequest {
    pub id: i64,
    pub status: PaymentStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentQuery {
    pub vendor_id: Option<i64>,
    pub user_id: Option<i64>,

    /// Substring of the note
    pub search: Option<String>,

    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub user_name: Option<String>,

    /// `created_at` (default), `date`, `amount` or `status`
    pub sort_by: Option<String>,

    /// `ASC` or `DESC` (default)
    pub sort_order: Option<String>,

    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PaymentQuery {
    /// Listing filter; unknown `sort_by` or `status` values are a 400
    fn filter(&self) -> ApiResult<PaymentFilter> {
        let sort_by = match self.sort_by.as_deref().filter(|s| !s.is_empty()) {
            Some(value) => {
                SortColumn::parse(value).map_err(|e| ApiError::BadRequest(e.to_string()))?
            }
            None => SortColumn::default(),
        };

        let status = self
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<PaymentStatus>())
            .transpose()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(ApiError::BadRequest(
                    "start_date must not be after end_date".to_string(),
                ));
            }
        }

        Ok(PaymentFilter {
            vendor_id: self.vendor_id,
            account_id: self.user_id,
            search: self.search.clone(),
            status,
            start_date: self.start_date,
            end_date: self.end_date,
            user_name: self.user_name.clone(),
            sort_by,
            sort_order: self
                .sort_order
                .as_deref()
                .map(SortOrder::parse)
                .unwrap_or_default(),
        })
    }
}

fn present_payment(uploads: &UploadStore, mut payment: Payment) -> Payment {
    payment.photo = uploads.public_url_opt(payment.photo.as_deref());
    payment
}

async fn find_payment(state: &AppState, id: i64) -> ApiResult<Payment> {
    Payment::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Payment not found".to_string()))
}

/// Record a payment
///
/// Multipart form: `vendor_id`, `amount`, `method`, `type`, `date`
/// (`YYYY-MM-DD`, default today), optional `user_id` (default the caller),
/// `event_id`, `status`, `note`, `user_name` and a `photo` file.
///
/// Members pay only for themselves and always start `pending`; coaches of
/// the academy and admins may record payments for its members with any
/// status.
///
/// # Errors
///
/// - `400 Bad Request`: event or account from another academy
/// - `403 Forbidden`: paying for someone else without permission
/// - `404 Not Found`: vendor, event or account missing
/// - `422 Unprocessable Entity`: missing or unparsable fields
pub async fn create_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppMultipart(multipart): AppMultipart,
) -> ApiResult<ApiResponse<Payment>> {
    let principal = state.principal(&auth).await?;
    let form = MultipartForm::read(multipart).await?;

    let vendor_id: i64 = form.parse_required("vendor_id")?;
    let account_id: i64 = form.parse("user_id")?.unwrap_or(principal.id);
    let event_id: Option<i64> = form.parse("event_id")?;
    let amount = positive_amount(form.parse_required("amount")?)?;

    let can_manage = require_in_tenant(&principal, Capability::ManagePayments, vendor_id).is_ok();
    if account_id == principal.id {
        require_tenant(&principal, vendor_id)?;
    } else if !can_manage {
        return Err(AuthzError::NotOwner.into());
    }

    ensure_vendor(&state, vendor_id).await?;
    if let Some(event_id) = event_id {
        event_in_vendor(&state, event_id, vendor_id).await?;
    }

    let account = Account::find_by_id(&state.db, account_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    if account.id != principal.id && account.vendor_id != Some(vendor_id) {
        return Err(ApiError::BadRequest(
            "User and payment belong to different vendors".to_string(),
        ));
    }

    let status = if can_manage {
        form.parse::<PaymentStatus>("status")?.unwrap_or_default()
    } else {
        PaymentStatus::Pending
    };

    let payment_type = form.text("type").unwrap_or(DEFAULT_TYPE).to_string();

    let photo = match form.file("photo") {
        Some(file) => {
            let target = UploadTarget::new("payment", vendor_id, payment_type.as_str(), account.id);
            Some(state.uploads.save(&target, "proof", file).await?)
        }
        None => None,
    };

    let payment = Payment::create(
        &state.db,
        CreatePayment {
            account_id: account.id,
            vendor_id,
            event_id,
            amount,
            method: form.text("method").unwrap_or(DEFAULT_METHOD).to_string(),
            status,
            payment_type,
            date: form
                .parse::<NaiveDate>("date")?
                .unwrap_or_else(|| Utc::now().date_naive()),
            note: form.text("note").unwrap_or_default().to_string(),
            photo,
            user_name: form
                .text("user_name")
                .map(str::to_string)
                .unwrap_or(account.name),
        },
    )
    .await?;

    tracing::info!(
        payment_id = payment.id,
        invoice = %payment.invoice,
        account_id = payment.account_id,
        vendor_id,
        "Payment recorded"
    );

    Ok(ApiResponse::created(present_payment(&state.uploads, payment))
        .with_message("Payment created"))
}

/// Bill every account marked present at an event
///
/// One payment per active log, all in one transaction. Accounts without a
/// present log are skipped.
pub async fn create_bulk_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<BulkPaymentRequest>,
) -> ApiResult<ApiResponse<BulkPaymentResponse>> {
    req.validate()?;

    let principal = state.principal(&auth).await?;
    require_in_tenant(&principal, Capability::ManagePayments, req.vendor_id)?;

    let event = event_in_vendor(&state, req.event_id, req.vendor_id).await?;

    let amount = positive_amount(req.amount.unwrap_or(event.fee))?;

    let payments = Payment::create_bulk_for_event(
        &state.db,
        BulkPayment {
            vendor_id: req.vendor_id,
            event_id: event.id,
            amount,
            method: req.method.unwrap_or_else(|| DEFAULT_METHOD.to_string()),
            status: req.status.unwrap_or_default(),
            payment_type: req
                .payment_type
                .or(event.payment_type)
                .unwrap_or_else(|| DEFAULT_TYPE.to_string()),
            date: req.date.unwrap_or(event.date),
            note: req.note,
        },
    )
    .await?;

    tracing::info!(
        event_id = event.id,
        count = payments.len(),
        by = principal.id,
        "Bulk payments created"
    );

    let payments: Vec<Payment> = payments
        .into_iter()
        .map(|p| present_payment(&state.uploads, p))
        .collect();

    Ok(ApiResponse::created(BulkPaymentResponse {
        count: payments.len(),
        payments,
    })
    .with_message("Bulk payments created"))
}

/// Set a payment's status (coach of its academy or admin)
pub async fn update_payment_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<PaymentStatusRequest>,
) -> ApiResult<ApiResponse<Payment>> {
    let principal = state.principal(&auth).await?;
    let payment = find_payment(&state, req.id).await?;
    require_in_tenant(&principal, Capability::ManagePayments, payment.vendor_id)?;

    let payment = Payment::update_status(&state.db, req.id, req.status)
        .await?
        .ok_or_else(|| ApiError::NotFound("Payment not found".to_string()))?;

    tracing::info!(payment_id = payment.id, status = %payment.status, by = principal.id, "Payment status updated");

    Ok(ApiResponse::ok(present_payment(&state.uploads, payment))
        .with_message("Payment status updated"))
}

/// Attach a proof photo to one's own payment
///
/// Multipart with `payment_id` and a `photo` file.
pub async fn upload_payment_proof(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppMultipart(multipart): AppMultipart,
) -> ApiResult<ApiResponse<Payment>> {
    let form = MultipartForm::read(multipart).await?;
    let payment_id: i64 = form.parse_required("payment_id")?;
    let file = form.required_file("photo")?;

    let payment = find_payment(&state, payment_id).await?;
    if payment.account_id != auth.user_id {
        return Err(AuthzError::NotOwner.into());
    }

    let target = UploadTarget::new(
        "payment",
        payment.vendor_id,
        payment.payment_type.as_str(),
        payment.account_id,
    );
    let path = state.uploads.save(&target, "proof", file).await?;

    let payment = Payment::update_photo(&state.db, payment.id, &path)
        .await?
        .ok_or_else(|| ApiError::NotFound("Payment not found".to_string()))?;

    Ok(ApiResponse::ok(present_payment(&state.uploads, payment)).with_message("Proof uploaded"))
}

/// Payments visible to the caller
pub async fn list_payments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<PaymentQuery>,
) -> ApiResult<ApiResponse<Page<Payment>>> {
    let principal = state.principal(&auth).await?;
    let page = PageRequest::new(query.page, query.limit)?;
    let filter = query.filter()?;

    let payments = Payment::list(
        &state.db,
        principal.scope(Visibility::Personal),
        &filter,
        page,
    )
    .await?;

    Ok(ApiResponse::ok(payments.map(|p| present_payment(&state.uploads, p))))
}

/// The caller's own payments
pub async fn list_own_payments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<PaymentQuery>,
) -> ApiResult<ApiResponse<Page<Payment>>> {
    let page = PageRequest::new(query.page, query.limit)?;
    let filter = query.filter()?;

    let payments = Payment::list(&state.db, RecordScope::Own(auth.user_id), &filter, page).await?;

    Ok(ApiResponse::ok(payments.map(|p| present_payment(&state.uploads, p))))
}

/// All payments of one academy (coach of the academy or admin)
pub async fn list_vendor_payments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<PaymentQuery>,
) -> ApiResult<ApiResponse<Page<Payment>>> {
    let vendor_id = query
        .vendor_id
        .ok_or_else(|| ApiError::BadRequest("vendor_id is required".to_string()))?;

    let principal = state.principal(&auth).await?;
    require_in_tenant(&principal, Capability::ManagePayments, vendor_id)?;

    let page = PageRequest::new(query.page, query.limit)?;
    let filter = query.filter()?;

    let payments =
        Payment::list(&state.db, RecordScope::Tenant(vendor_id), &filter, page).await?;

    Ok(ApiResponse::ok(payments.map(|p| present_payment(&state.uploads, p))))
}

/// Rejects zero, negative, NaN and infinite amounts
fn positive_amount(amount: f64) -> ApiResult<f64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ApiError::invalid("amount", "Amount must be positive"));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(json: serde_json::Value) -> PaymentQuery {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_filter_defaults() {
        let filter = query(serde_json::json!({})).filter().unwrap();

        assert_eq!(filter.sort_by, SortColumn::CreatedAt);
        assert_eq!(filter.sort_order, SortOrder::Desc);
        assert!(filter.status.is_none());
    }

    #[test]
    fn test_filter_sorting() {
        let filter = query(serde_json::json!({"sort_by": "amount", "sort_order": "asc"}))
            .filter()
            .unwrap();
        assert_eq!(filter.sort_by, SortColumn::Amount);
        assert_eq!(filter.sort_order, SortOrder::Asc);

        let filter = query(serde_json::json!({"sort_order": "sideways"}))
            .filter()
            .unwrap();
        assert_eq!(filter.sort_order, SortOrder::Desc);
    }

    #[test]
    fn test_filter_rejects_unknown_column() {
        let err = query(serde_json::json!({"sort_by": "invoice; DROP TABLE payments"}))
            .filter()
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_filter_status_and_dates() {
        let filter = query(serde_json::json!({"status": "success", "user_id": 4}))
            .filter()
            .unwrap();
        assert_eq!(filter.status, Some(PaymentStatus::Success));
        assert_eq!(filter.account_id, Some(4));

        assert!(query(serde_json::json!({"status": "refunded"})).filter().is_err());
        assert!(query(serde_json::json!({
            "start_date": "2025-02-01",
            "end_date": "2025-01-01"
        }))
        .filter()
        .is_err());
    }

    #[test]
    fn test_bulk_request_uses_type_key() {
        let req: BulkPaymentRequest = serde_json::from_value(serde_json::json!({
            "vendor_id": 1,
            "event_id": 2,
            "type": "monthly"
        }))
        .unwrap();

        assert_eq!(req.payment_type.as_deref(), Some("monthly"));
        assert!(req.amount.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_amount_must_be_finite_and_positive() {
        assert_eq!(positive_amount(5000.0).unwrap(), 5000.0);

        for raw in ["0", "-10", "NaN", "inf", "-inf"] {
            let amount: f64 = raw.parse().unwrap();
            assert!(
                matches!(positive_amount(amount), Err(ApiError::ValidationError(_))),
                "{} should be rejected",
                raw
            );
        }
    }
}
