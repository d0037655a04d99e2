/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: HS256 access/refresh tokens
/// - [`middleware`]: bearer-token extraction for the request gate
/// - [`authorization`]: roles, capabilities and tenant scoping
/// - [`federated`]: Firebase ID token verification
/// - [`credentials`]: register, login, refresh and federated sign-in flows
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **JWT Tokens**: HS256, 6 hour access tokens, 14 day refresh tokens, no leeway
/// - **Tenancy**: non-admin principals only ever see rows of their own academy
///
/// # Example
///
/// ```no_run
/// use academy_shared::auth::password::{hash_password, verify_password};
/// use academy_shared::auth::jwt::{issue_token_pair, validate_access_token};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let secret = "a-shared-secret-of-at-least-32-bytes!";
/// let pair = issue_token_pair(1, "a@b.com", secret)?;
/// let claims = validate_access_token(&pair.access_token, secret)?;
/// assert_eq!(claims.user_id, 1);
/// # Ok(())
/// # }
/// ```

pub mod password;
pub mod jwt;
pub mod middleware;
pub mod authorization;
pub mod federated;
pub mod credentials;
