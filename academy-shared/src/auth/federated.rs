/// Federated sign-in through Firebase Authentication
///
/// Mobile clients sign in with Google via Firebase and send the resulting ID
/// token. [`FirebaseVerifier`] checks that token locally:
///
/// - RS256 signature against Google's published signing keys (JWKS)
/// - `aud` equals the Firebase project id
/// - `iss` equals `https://securetoken.google.com/<project id>`
/// - `exp` not passed
/// - `email_verified` is `true`
///
/// The key set is fetched over HTTPS and cached until its `Cache-Control:
/// max-age` runs out. An unknown `kid` triggers a refetch for key rotation,
/// but at most once per [`MIN_REFETCH_INTERVAL`]; inside that window tokens
/// with unknown key ids are rejected straight from the cache.
///
/// # Example
///
/// ```no_run
/// use academy_shared::auth::federated::{FirebaseVerifier, IdentityVerifier};
///
/// # async fn example(id_token: &str) -> Result<(), Box<dyn std::error::Error>> {
/// let verifier = FirebaseVerifier::from_credential_file("./firebase-service-account.json")?;
/// let profile = verifier.verify(id_token).await?;
/// println!("signed in as {}", profile.email);
/// # Ok(())
/// # }
/// ```

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, jwk::{Jwk, JwkSet}, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Google's signing keys for Firebase ID tokens, as a JWK set
pub const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const DEFAULT_KEY_TTL: Duration = Duration::from_secs(3600);

/// Minimum time between two key fetches triggered by an unknown `kid`
pub const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(60);

/// Error type for federated identity verification
#[derive(Debug, thiserror::Error)]
pub enum FederatedError {
    /// Signature, audience, issuer or expiry check failed
    #[error("Invalid identity token: {0}")]
    InvalidToken(String),

    /// Token is valid but carries no email
    #[error("Identity token has no email")]
    MissingEmail,

    /// Provider has not verified the email
    #[error("Identity provider email is not verified")]
    UnverifiedEmail,

    /// Signing keys could not be fetched
    #[error("Failed to fetch identity provider keys: {0}")]
    KeyFetch(String),

    /// Provider credential missing or unreadable
    #[error("Identity provider misconfigured: {0}")]
    Config(String),
}

/// Identity extracted from a verified provider token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederatedProfile {
    /// Provider user id (`sub`)
    pub uid: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Verifies identity-provider tokens
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<FederatedProfile, FederatedError>;
}

#[derive(Debug, Clone, Deserialize)]
struct FirebaseClaims {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServiceAccount {
    project_id: String,
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
    expires_at: Instant,
}

impl CachedKeys {
    fn is_fresh(&self) -> bool {
        self.expires_at > Instant::now()
    }
}

/// Firebase ID token verifier with a cached JWKS
pub struct FirebaseVerifier {
    project_id: String,
    jwks_url: String,
    http: reqwest::Client,
    min_refetch_interval: Duration,
    cache: RwLock<Option<CachedKeys>>,
}

impl std::fmt::Debug for FirebaseVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseVerifier")
            .field("project_id", &self.project_id)
            .field("jwks_url", &self.jwks_url)
            .finish()
    }
}

impl FirebaseVerifier {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            jwks_url: FIREBASE_JWKS_URL.to_string(),
            http: reqwest::Client::new(),
            min_refetch_interval: MIN_REFETCH_INTERVAL,
            cache: RwLock::new(None),
        }
    }

    /// Reads the project id from a Firebase service-account JSON file
    pub fn from_credential_file(path: impl AsRef<Path>) -> Result<Self, FederatedError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            FederatedError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;

        let project_id = project_id_from_credential(&raw)?;

        Ok(Self::new(project_id))
    }

    /// Points key fetching at another JWKS endpoint
    pub fn with_jwks_url(mut self, url: impl Into<String>) -> Self {
        self.jwks_url = url.into();
        self
    }

    /// Overrides [`MIN_REFETCH_INTERVAL`]
    pub fn with_min_refetch_interval(mut self, interval: Duration) -> Self {
        self.min_refetch_interval = interval;
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    async fn fetch_keys(&self) -> Result<CachedKeys, FederatedError> {
        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FederatedError::KeyFetch(e.to_string()))?;

        let ttl = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(DEFAULT_KEY_TTL);

        let keys: JwkSet = response
            .json()
            .await
            .map_err(|e| FederatedError::KeyFetch(e.to_string()))?;

        tracing::debug!(keys = keys.keys.len(), ttl_secs = ttl.as_secs(), "Fetched identity provider keys");

        let now = Instant::now();
        Ok(CachedKeys {
            keys,
            fetched_at: now,
            expires_at: now + ttl,
        })
    }

    /// Decoding key for `kid`
    ///
    /// Refetches the key set when it is stale, or when `kid` is unknown and
    /// the last fetch is older than the refetch interval. Fetches are
    /// serialized behind the cache's write lock.
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, FederatedError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| c.is_fresh()) {
                if let Some(jwk) = cached.keys.find(kid) {
                    return key_from_jwk(jwk);
                }
                if cached.fetched_at.elapsed() < self.min_refetch_interval {
                    return Err(unknown_kid(kid));
                }
            }
        }

        let mut cache = self.cache.write().await;

        // Another request may have refreshed the keys while we waited
        if let Some(cached) = cache.as_ref().filter(|c| c.is_fresh()) {
            if let Some(jwk) = cached.keys.find(kid) {
                return key_from_jwk(jwk);
            }
            if cached.fetched_at.elapsed() < self.min_refetch_interval {
                return Err(unknown_kid(kid));
            }
        }

        let fresh = self.fetch_keys().await?;
        let key = fresh.keys.find(kid).map(key_from_jwk).transpose()?;
        *cache = Some(fresh);

        key.ok_or_else(|| unknown_kid(kid))
    }
}

fn key_from_jwk(jwk: &Jwk) -> Result<DecodingKey, FederatedError> {
    DecodingKey::from_jwk(jwk).map_err(|e| FederatedError::InvalidToken(e.to_string()))
}

fn unknown_kid(kid: &str) -> FederatedError {
    FederatedError::InvalidToken(format!("unknown key id {}", kid))
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, id_token: &str) -> Result<FederatedProfile, FederatedError> {
        let header =
            decode_header(id_token).map_err(|e| FederatedError::InvalidToken(e.to_string()))?;

        if header.alg != Algorithm::RS256 {
            return Err(FederatedError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| FederatedError::InvalidToken("missing key id".to_string()))?;

        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[self.issuer()]);
        validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);

        let claims = decode::<FirebaseClaims>(id_token, &key, &validation)
            .map_err(|e| FederatedError::InvalidToken(e.to_string()))?
            .claims;

        let email = claims
            .email
            .filter(|e| !e.is_empty())
            .ok_or(FederatedError::MissingEmail)?;

        if claims.email_verified != Some(true) {
            return Err(FederatedError::UnverifiedEmail);
        }

        Ok(FederatedProfile {
            uid: claims.sub,
            email,
            name: claims.name,
            picture: claims.picture,
        })
    }
}

/// Extracts `project_id` from service-account JSON
pub fn project_id_from_credential(raw: &str) -> Result<String, FederatedError> {
    let account: ServiceAccount = serde_json::from_str(raw)
        .map_err(|e| FederatedError::Config(format!("invalid service account JSON: {}", e)))?;

    if account.project_id.is_empty() {
        return Err(FederatedError::Config("empty project_id".to_string()));
    }

    Ok(account.project_id)
}

/// Parses `max-age` out of a `Cache-Control` header value
pub fn parse_max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_max_age() {
        assert_eq!(
            parse_max_age("public, max-age=19204, must-revalidate, no-transform"),
            Some(Duration::from_secs(19204))
        );
        assert_eq!(parse_max_age("no-cache"), None);
        assert_eq!(parse_max_age("max-age=abc"), None);
    }

    #[test]
    fn test_project_id_from_credential() {
        let raw = r#"{"type": "service_account", "project_id": "academy-prod", "client_email": "x@y"}"#;
        assert_eq!(project_id_from_credential(raw).unwrap(), "academy-prod");

        assert!(matches!(
            project_id_from_credential("{}"),
            Err(FederatedError::Config(_))
        ));
        assert!(matches!(
            project_id_from_credential(r#"{"project_id": ""}"#),
            Err(FederatedError::Config(_))
        ));
    }

    #[test]
    fn test_from_missing_credential_file() {
        let result = FirebaseVerifier::from_credential_file("/nonexistent/firebase.json");
        assert!(matches!(result, Err(FederatedError::Config(_))));
    }

    #[test]
    fn test_issuer() {
        let verifier = FirebaseVerifier::new("academy-prod");
        assert_eq!(verifier.issuer(), "https://securetoken.google.com/academy-prod");
    }

    #[tokio::test]
    async fn test_malformed_token_rejected_without_fetching_keys() {
        let verifier = FirebaseVerifier::new("academy-prod").with_jwks_url("http://127.0.0.1:9/keys");

        let result = verifier.verify("definitely-not-a-jwt").await;
        assert!(matches!(result, Err(FederatedError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_hs256_token_rejected() {
        use crate::auth::jwt::issue_token_pair;

        let pair = issue_token_pair(1, "a@b.com", "test-secret-key-at-least-32-bytes-long").unwrap();
        let verifier = FirebaseVerifier::new("academy-prod").with_jwks_url("http://127.0.0.1:9/keys");

        let result = verifier.verify(&pair.access_token).await;
        assert!(matches!(result, Err(FederatedError::InvalidToken(_))));
    }
}
