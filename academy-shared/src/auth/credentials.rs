/// Registration, login, token refresh and federated sign-in
///
/// These are the credential flows behind the public auth endpoints. They
/// work against any [`AccountStore`] and [`IdentityVerifier`], so the HTTP
/// layer stays a thin translation of [`CredentialError`] into status codes.
///
/// # Rules
///
/// - Emails must match `^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$`
/// - Email and phone are unique; the store's constraint is authoritative
/// - Self-registration may choose `member` (default) or `coach`, never `admin`
/// - A self-registered coach starts without an academy; only an admin
///   attaches a coach to one
/// - Unknown email and wrong password give the same error
/// - Accounts without a password (federated-only) cannot log in by password
/// - Federated sign-in never creates accounts: unknown emails get the
///   provider profile back so the client can complete registration
///
/// # Example
///
/// ```no_run
/// use academy_shared::auth::credentials::{login, register, RegisterInput};
/// use academy_shared::store::PgAccountStore;
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let store = PgAccountStore::new(pool);
/// let secret = "a-shared-secret-of-at-least-32-bytes!";
///
/// let account = register(&store, RegisterInput {
///     email: "a@b.com".to_string(),
///     phone: Some("111".to_string()),
///     password: "pw".to_string(),
///     ..Default::default()
/// }).await?;
///
/// let (_, tokens) = login(&store, "a@b.com", "pw", None, secret).await?;
/// # Ok(())
/// # }
/// ```

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::federated::{FederatedError, FederatedProfile, IdentityVerifier};
use super::jwt::{self, JwtError, TokenPair};
use super::password::{self, PasswordError};
use crate::models::account::{Account, CreateAccount, Role};
use crate::store::{AccountStore, StoreError};

const EMAIL_PATTERN: &str = r"^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$";

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Error taxonomy of the credential flows
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("{0}")]
    InvalidFormat(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for CredentialError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(field) => {
                CredentialError::Conflict(format!("{} already registered", capitalize(field)))
            }
            StoreError::Database(e) => CredentialError::Internal(format!("Database error: {}", e)),
        }
    }
}

impl From<PasswordError> for CredentialError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Empty => CredentialError::InvalidFormat(err.to_string()),
            other => CredentialError::Internal(other.to_string()),
        }
    }
}

impl From<JwtError> for CredentialError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => CredentialError::Internal(msg),
            JwtError::Expired => CredentialError::Unauthorized("Refresh token expired".to_string()),
            other => CredentialError::Unauthorized(format!("Invalid refresh token: {}", other)),
        }
    }
}

impl From<FederatedError> for CredentialError {
    fn from(err: FederatedError) -> Self {
        match err {
            FederatedError::InvalidToken(_)
            | FederatedError::MissingEmail
            | FederatedError::UnverifiedEmail => {
                CredentialError::Unauthorized(err.to_string())
            }
            FederatedError::KeyFetch(_) | FederatedError::Config(_) => {
                CredentialError::Internal(err.to_string())
            }
        }
    }
}

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Whether an email matches the accepted (lowercase) format
pub fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(EMAIL_PATTERN).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(email))
}

/// Registration data with the plaintext password
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub name: String,
    pub role: Option<Role>,
    pub vendor_id: Option<i64>,
    pub address: Option<String>,
    pub photo: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub position: Option<String>,
    pub foot: Option<String>,
    pub number: Option<i32>,
    pub age_category: Option<String>,
    pub fcm_token: Option<String>,
}

/// Result of a federated sign-in
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FederatedOutcome {
    /// No local account uses the email; the client must register first
    NeedRegister { profile: FederatedProfile },

    /// Existing account signed in
    SignedIn {
        account: Account,
        tokens: TokenPair,
        /// The account has no academy yet
        must_complete_profile: bool,
    },
}

/// Creates an account
///
/// # Errors
///
/// - `InvalidFormat`: bad email or empty password
/// - `Forbidden`: `admin` requested, or `coach` together with an academy
/// - `Conflict`: email or phone already registered
/// - `NotFound`: the requested academy doesn't exist
pub async fn register(
    store: &dyn AccountStore,
    input: RegisterInput,
) -> Result<Account, CredentialError> {
    if !is_valid_email(&input.email) {
        return Err(CredentialError::InvalidFormat("Invalid email format".to_string()));
    }

    if input.password.is_empty() {
        return Err(CredentialError::InvalidFormat("Password is required".to_string()));
    }

    let role = input.role.unwrap_or_default();
    if role == Role::Admin {
        return Err(CredentialError::Forbidden(
            "Admin accounts cannot be self-registered".to_string(),
        ));
    }
    if role == Role::Coach && input.vendor_id.is_some() {
        return Err(CredentialError::Forbidden(
            "Coaches are assigned to a vendor by an admin".to_string(),
        ));
    }

    let phone = input.phone.filter(|p| !p.trim().is_empty());

    if store.find_by_email(&input.email).await?.is_some() {
        return Err(CredentialError::Conflict("Email already registered".to_string()));
    }
    if let Some(phone) = phone.as_deref() {
        if store.find_by_phone(phone).await?.is_some() {
            return Err(CredentialError::Conflict("Phone already registered".to_string()));
        }
    }

    if let Some(vendor_id) = input.vendor_id {
        if !store.vendor_exists(vendor_id).await? {
            return Err(CredentialError::NotFound("Vendor not found".to_string()));
        }
    }

    let password_hash = password::hash_password_blocking(input.password).await?;

    let account = store
        .create(CreateAccount {
            email: input.email,
            phone,
            password_hash,
            role,
            vendor_id: input.vendor_id,
            name: input.name,
            address: input.address,
            photo: input.photo,
            gender: input.gender,
            birth_date: input.birth_date,
            position: input.position,
            foot: input.foot,
            number: input.number,
            age_category: input.age_category,
            fcm_token: input.fcm_token,
        })
        .await?;

    tracing::info!(account_id = account.id, role = %account.role, "Account registered");

    Ok(account)
}

/// Verifies email and password and issues a token pair
///
/// A supplied push token replaces the stored one.
pub async fn login(
    store: &dyn AccountStore,
    email: &str,
    password: &str,
    fcm_token: Option<&str>,
    secret: &str,
) -> Result<(Account, TokenPair), CredentialError> {
    // Early rejections still run Argon2 once
    let Some(mut account) = store.find_by_email(email).await? else {
        password::verify_dummy_blocking(password.to_string()).await?;
        tracing::warn!("Login attempt for unknown email");
        return Err(CredentialError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    if !password::has_password(&account.password_hash) {
        password::verify_dummy_blocking(password.to_string()).await?;
        tracing::warn!(account_id = account.id, "Password login for account without password");
        return Err(CredentialError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let matches =
        password::verify_password_blocking(password.to_string(), account.password_hash.clone())
            .await?;
    if !matches {
        tracing::warn!(account_id = account.id, "Login with wrong password");
        return Err(CredentialError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    if let Some(token) = fcm_token.filter(|t| !t.is_empty()) {
        store.update_fcm_token(account.id, token).await?;
        account.fcm_token = Some(token.to_string());
    }

    let tokens = jwt::issue_token_pair(account.id, &account.email, secret)?;

    tracing::info!(account_id = account.id, "Login succeeded");

    Ok((account, tokens))
}

/// Mints a new access token; the refresh token itself stays valid
pub fn refresh(refresh_token: &str, secret: &str) -> Result<String, CredentialError> {
    Ok(jwt::refresh_access_token(refresh_token, secret)?)
}

/// Signs in with an identity-provider token
pub async fn federated_login(
    store: &dyn AccountStore,
    verifier: &dyn IdentityVerifier,
    id_token: &str,
    fcm_token: Option<&str>,
    secret: &str,
) -> Result<FederatedOutcome, CredentialError> {
    let profile = verifier.verify(id_token).await?;

    let Some(mut account) = store.find_by_email(&profile.email).await? else {
        tracing::info!("Federated sign-in for unregistered email");
        return Ok(FederatedOutcome::NeedRegister { profile });
    };

    if let Some(token) = fcm_token.filter(|t| !t.is_empty()) {
        store.update_fcm_token(account.id, token).await?;
        account.fcm_token = Some(token.to_string());
    }

    let tokens = jwt::issue_token_pair(account.id, &account.email, secret)?;
    let must_complete_profile = account.vendor_id.is_none();

    tracing::info!(account_id = account.id, must_complete_profile, "Federated sign-in succeeded");

    Ok(FederatedOutcome::SignedIn {
        account,
        tokens,
        must_complete_profile,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_format() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last+tag@mail.club.id"));

        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("A@B.COM"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_store_conflict_mapping() {
        let err = CredentialError::from(StoreError::Conflict("phone"));
        assert!(matches!(err, CredentialError::Conflict(ref m) if m == "Phone already registered"));
    }

    #[test]
    fn test_jwt_error_mapping() {
        assert!(matches!(
            CredentialError::from(JwtError::Expired),
            CredentialError::Unauthorized(_)
        ));
        assert!(matches!(
            CredentialError::from(JwtError::CreateError("boom".to_string())),
            CredentialError::Internal(_)
        ));
    }

    #[test]
    fn test_federated_error_mapping() {
        assert!(matches!(
            CredentialError::from(FederatedError::UnverifiedEmail),
            CredentialError::Unauthorized(_)
        ));
        assert!(matches!(
            CredentialError::from(FederatedError::KeyFetch("timeout".to_string())),
            CredentialError::Internal(_)
        ));
    }

    #[test]
    fn test_refresh_rejects_access_token() {
        let secret = "test-secret-key-at-least-32-bytes-long";
        let pair = jwt::issue_token_pair(1, "a@b.com", secret).unwrap();

        assert!(matches!(
            refresh(&pair.access_token, secret),
            Err(CredentialError::Unauthorized(_))
        ));
        assert!(refresh(&pair.refresh_token, secret).is_ok());
    }
}
