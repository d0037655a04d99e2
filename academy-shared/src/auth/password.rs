/// Password hashing with Argon2id
///
/// Hashes are stored as PHC strings (`$argon2id$v=19$m=65536,t=3,p=4$...`), so
/// the parameters travel with the hash and verification needs no
/// configuration.
///
/// - **Memory**: 64 MB
/// - **Iterations**: 3
/// - **Parallelism**: 4 lanes
///
/// Accounts created through federated sign-in have no password; their stored
/// hash is the empty string and [`has_password`] returns `false` for it.
///
/// Login paths that have no hash to check (unknown email, password-less
/// account) call [`verify_dummy_blocking`] so every failed login pays the
/// same Argon2 cost.
///
/// # Example
///
/// ```
/// use academy_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("pw")?;
/// assert!(verify_password("pw", &hash)?);
/// assert!(!verify_password("nope", &hash)?);
/// # Ok(())
/// # }
/// ```

use std::sync::OnceLock;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),

    #[error("Password must not be empty")]
    Empty,
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let params = ParamsBuilder::new()
        .m_cost(65536)
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a non-empty password with a fresh random salt
///
/// # Errors
///
/// `PasswordError::Empty` for an empty password, `PasswordError::HashError`
/// if hashing fails.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::Empty);
    }

    let salt = SaltString::generate(&mut OsRng);

    let hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(hash.to_string())
}

/// Verifies a password against a stored PHC hash in constant time
///
/// Returns `Ok(false)` on mismatch. An empty stored hash (no password set)
/// never matches.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    if !has_password(hash) {
        return Ok(false);
    }

    let parsed = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Whether a stored hash belongs to an account that can log in by password
pub fn has_password(hash: &str) -> bool {
    !hash.is_empty()
}

/// PHC hash of a fixed throwaway password, built once with the real parameters
fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("academy-dummy-password").ok())
        .as_deref()
}

/// Runs a full verification against the dummy hash and discards the result
///
/// Always `Ok(false)`.
pub fn verify_dummy(password: &str) -> Result<bool, PasswordError> {
    let hash = dummy_hash()
        .ok_or_else(|| PasswordError::HashError("Dummy hash unavailable".to_string()))?;
    verify_password(password, hash)?;
    Ok(false)
}

/// [`verify_dummy`] on the blocking pool
pub async fn verify_dummy_blocking(password: String) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_dummy(&password))
        .await
        .map_err(|e| PasswordError::VerifyError(format!("Verification task failed: {}", e)))?
}

/// Hashes on the blocking pool so request tasks are not stalled by Argon2
pub async fn hash_password_blocking(password: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| PasswordError::HashError(format!("Hashing task failed: {}", e)))?
}

/// Verifies on the blocking pool
pub async fn verify_password_blocking(
    password: String,
    hash: String,
) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| PasswordError::VerifyError(format!("Verification task failed: {}", e)))?
}
