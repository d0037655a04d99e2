/// Bearer-token authentication for Axum
///
/// The API crate wraps [`authenticate`] in a `from_fn_with_state` layer; on
/// success the resulting [`AuthContext`] is inserted into the request
/// extensions and handlers pick it up with `Extension<AuthContext>`.
///
/// Role checks do not happen here. Handlers load the account and go through
/// [`crate::auth::authorization`].
///
/// # Example
///
/// ```
/// use axum::http::{header, HeaderMap, HeaderValue};
/// use academy_shared::auth::jwt::issue_token_pair;
/// use academy_shared::auth::middleware::authenticate;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-shared-secret-of-at-least-32-bytes!";
/// let pair = issue_token_pair(5, "a@b.com", secret)?;
///
/// let mut headers = HeaderMap::new();
/// headers.insert(
///     header::AUTHORIZATION,
///     HeaderValue::from_str(&format!("Bearer {}", pair.access_token))?,
/// );
///
/// let auth = authenticate(&headers, secret)?;
/// assert_eq!(auth.user_id, 5);
/// # Ok(())
/// # }
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};

use super::jwt::{validate_access_token, Claims, JwtError};

/// Authenticated subject, added to request extensions by the gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Account id from the token
    pub user_id: i64,

    /// Account email at token issue time
    pub email: String,
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email,
        }
    }
}

/// Error type for bearer authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingCredentials,

    #[error("Invalid authorization header: {0}")]
    InvalidFormat(String),

    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::Expired,
            other => AuthError::InvalidToken(other.to_string()),
        }
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("header is not valid ASCII".to_string()))?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("expected Bearer scheme".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(AuthError::InvalidFormat("empty bearer token".to_string()));
    }

    Ok(token)
}

/// Validates the bearer access token and builds the request's auth context
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;
    let claims = validate_access_token(token, secret)?;

    Ok(AuthContext::from(claims))
}
