/// API route handlers
///
/// - `health`: health check
/// - `auth`: register, login, refresh, federated login
/// - `users`: profiles, rosters, account updates
/// - `vendors`: academy directory and settings
/// - `events`: events and attendance logs
/// - `trainings`, `matches`: session records
/// - `challenges`: challenges and their results
/// - `payments`: fees, bulk billing, proofs

pub mod health;
pub mod auth;
pub mod users;
pub mod vendors;
pub mod events;
pub mod trainings;
pub mod matches;
pub mod challenges;
pub mod payments;

use academy_shared::models::account::Account;
use academy_shared::models::event::Event;
use academy_shared::models::vendor::Vendor;
use serde::Deserialize;

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::uploads::UploadStore;

/// `?vendor_id=&page=&limit=`, used by the per-academy listings
#[derive(Debug, Default, Deserialize)]
pub struct VendorPageQuery {
    pub vendor_id: Option<i64>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl VendorPageQuery {
    /// The vendor id, required on `/vendor` listings
    pub fn required_vendor(&self) -> ApiResult<i64> {
        self.vendor_id
            .ok_or_else(|| ApiError::BadRequest("vendor_id is required".to_string()))
    }
}

/// Account with its photo as a public link
pub(crate) fn present_account(uploads: &UploadStore, mut account: Account) -> Account {
    account.photo = uploads.public_url_opt(account.photo.as_deref());
    account
}

/// Vendor with its photo as a public link
pub(crate) fn present_vendor(uploads: &UploadStore, mut vendor: Vendor) -> Vendor {
    vendor.photo = uploads.public_url_opt(vendor.photo.as_deref());
    vendor
}

/// 404 unless a live academy with this id exists
pub(crate) async fn ensure_vendor(state: &AppState, vendor_id: i64) -> ApiResult<()> {
    if Vendor::exists(&state.db, vendor_id).await? {
        Ok(())
    } else {
        Err(ApiError::NotFound("Vendor not found".to_string()))
    }
}

/// Loads an event and checks it belongs to the academy
///
/// 404 for a missing event, 400 for another academy's event.
pub(crate) async fn event_in_vendor(
    state: &AppState,
    event_id: i64,
    vendor_id: i64,
) -> ApiResult<Event> {
    let event = Event::find_by_id(&state.db, event_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))?;

    if event.vendor_id != vendor_id {
        return Err(ApiError::BadRequest(
            "Event does not belong to this vendor".to_string(),
        ));
    }

    Ok(event)
}
