/// Access and refresh token issuance
///
/// Tokens are stateless HS256 JWTs signed with one shared secret. Every token
/// carries the account id, the account email and its expiry; a `token_type`
/// claim keeps refresh tokens from being used as bearer credentials and the
/// other way round.
///
/// # Lifetimes
///
/// - **Access token**: 6 hours
/// - **Refresh token**: 14 days, never rotated
///
/// There is no revocation list: a token stays valid until it expires.
///
/// # Example
///
/// ```
/// use academy_shared::auth::jwt::{issue_token_pair, validate_access_token};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-shared-secret-of-at-least-32-bytes!";
/// let pair = issue_token_pair(1, "a@b.com", secret)?;
///
/// let claims = validate_access_token(&pair.access_token, secret)?;
/// assert_eq!(claims.user_id, 1);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Signature, format or required claims are wrong
    #[error("Invalid token: {0}")]
    Invalid(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token is valid but of the other kind
    #[error("Expected {expected} token, got {actual} token")]
    WrongType {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Bearer credential for protected routes
    Access,

    /// Only accepted by the refresh endpoint
    Refresh,
}

impl TokenType {
    /// Gets default expiration duration for token type
    pub fn default_expiration(&self) -> Duration {
        match self {
            TokenType::Access => Duration::hours(6),
            TokenType::Refresh => Duration::days(14),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// JWT claims structure
///
/// - `user_id`: account id (subject)
/// - `email`: account email at issue time
/// - `iat` / `exp`: Unix timestamps
/// - `token_type`: access or refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub token_type: TokenType,
}

impl Claims {
    /// Creates new claims with the default lifetime of the token type
    pub fn new(user_id: i64, email: impl Into<String>, token_type: TokenType) -> Self {
        Self::with_expiration(user_id, email, token_type, token_type.default_expiration())
    }

    /// Creates claims with a custom lifetime
    ///
    /// A negative duration produces an already expired token.
    pub fn with_expiration(
        user_id: i64,
        email: impl Into<String>,
        token_type: TokenType,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            user_id,
            email: email.into(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            token_type,
        }
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Access + refresh token pair returned by login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signs claims with HS256
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Issues an access token and a refresh token for one account
pub fn issue_token_pair(user_id: i64, email: &str, secret: &str) -> Result<TokenPair, JwtError> {
    let access_token = create_token(&Claims::new(user_id, email, TokenType::Access), secret)?;
    let refresh_token = create_token(&Claims::new(user_id, email, TokenType::Refresh), secret)?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Validates a token and extracts its claims
///
/// Verifies the signature, the algorithm and `exp` with zero leeway. A token
/// whose expiry lies in the past is rejected with `JwtError::Expired`.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.validate_exp = true;
    validation.set_required_spec_claims(&["exp"]);

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::Invalid(e.to_string()),
    })?;

    Ok(token_data.claims)
}

fn validate_typed(token: &str, secret: &str, expected: TokenType) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != expected {
        return Err(JwtError::WrongType {
            expected: expected.as_str(),
            actual: claims.token_type.as_str(),
        });
    }

    Ok(claims)
}

/// Validates a token and checks it's an access token
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Access)
}

/// Validates a token and checks it's a refresh token
pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Refresh)
}

/// Mints a new access token from a refresh token
///
/// The refresh token itself is not rotated and stays usable until its own
/// expiry.
///
/// # Example
///
/// ```
/// use academy_shared::auth::jwt::{issue_token_pair, refresh_access_token, validate_access_token};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-shared-secret-of-at-least-32-bytes!";
/// let pair = issue_token_pair(7, "coach@club.id", secret)?;
///
/// let access = refresh_access_token(&pair.refresh_token, secret)?;
/// assert_eq!(validate_access_token(&access, secret)?.user_id, 7);
/// # Ok(())
/// # }
/// ```
pub fn refresh_access_token(refresh_token: &str, secret: &str) -> Result<String, JwtError> {
    let refresh_claims = validate_refresh_token(refresh_token, secret)?;

    let access_claims = Claims::new(
        refresh_claims.user_id,
        refresh_claims.email,
        TokenType::Access,
    );

    create_token(&access_claims, secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_token_type_expiration() {
        assert_eq!(TokenType::Access.default_expiration(), Duration::hours(6));
        assert_eq!(TokenType::Refresh.default_expiration(), Duration::days(14));
    }

    #[test]
    fn test_claims_creation() {
        let claims = Claims::new(42, "a@b.com", TokenType::Access);

        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.exp - claims.iat, 6 * 3600);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_issue_pair_access_verifies_with_subject() {
        let pair = issue_token_pair(1, "a@b.com", SECRET).unwrap();

        let access = validate_access_token(&pair.access_token, SECRET).unwrap();
        assert_eq!(access.user_id, 1);
        assert_eq!(access.email, "a@b.com");

        let refresh = validate_refresh_token(&pair.refresh_token, SECRET).unwrap();
        assert_eq!(refresh.user_id, 1);
        assert_eq!(refresh.exp - refresh.iat, 14 * 24 * 3600);
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let token = create_token(&Claims::new(1, "a@b.com", TokenType::Access), SECRET).unwrap();

        let result = validate_token(&token, "another-secret-key-at-least-32-bytes");
        assert!(matches!(result, Err(JwtError::Invalid(_))));
    }

    #[test]
    fn test_validate_expired_token() {
        let claims = Claims::with_expiration(1, "a@b.com", TokenType::Access, Duration::seconds(-30));
        assert!(claims.is_expired());

        let token = create_token(&claims, SECRET).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::Expired)));
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(matches!(
            validate_token("not.a.jwt", SECRET),
            Err(JwtError::Invalid(_))
        ));
    }

    #[test]
    fn test_token_types_not_interchangeable() {
        let pair = issue_token_pair(3, "c@d.com", SECRET).unwrap();

        assert!(matches!(
            validate_access_token(&pair.refresh_token, SECRET),
            Err(JwtError::WrongType { expected: "access", .. })
        ));
        assert!(matches!(
            validate_refresh_token(&pair.access_token, SECRET),
            Err(JwtError::WrongType { expected: "refresh", .. })
        ));
    }

    #[test]
    fn test_refresh_keeps_refresh_token_valid() {
        let pair = issue_token_pair(9, "m@club.id", SECRET).unwrap();

        let first = refresh_access_token(&pair.refresh_token, SECRET).unwrap();
        let second = refresh_access_token(&pair.refresh_token, SECRET).unwrap();

        assert_eq!(validate_access_token(&first, SECRET).unwrap().user_id, 9);
        assert_eq!(validate_access_token(&second, SECRET).unwrap().user_id, 9);
    }

    #[test]
    fn test_refresh_with_access_token_fails() {
        let pair = issue_token_pair(9, "m@club.id", SECRET).unwrap();
        assert!(refresh_access_token(&pair.access_token, SECRET).is_err());
    }
}
