/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use academy_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = academy_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::{ApiError, ApiResult},
    middleware::security::SecurityHeadersLayer,
    uploads::UploadStore,
};
use academy_shared::auth::{
    authorization::Principal,
    federated::IdentityVerifier,
    middleware::{authenticate, AuthContext},
};
use academy_shared::models::account::Account;
use academy_shared::store::{AccountStore, PgAccountStore};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Largest accepted request body (photo uploads)
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Credential store used by the auth flows
    pub accounts: Arc<dyn AccountStore>,

    /// Federated login verifier; `None` when not configured
    pub identity: Option<Arc<dyn IdentityVerifier>>,

    pub uploads: UploadStore,
}

impl AppState {
    /// State backed by PostgreSQL, without federated login
    pub fn new(db: PgPool, config: Config) -> Self {
        let uploads = UploadStore::new(&config.upload.dir, &config.upload.public_base_url);

        Self {
            accounts: Arc::new(PgAccountStore::new(db.clone())),
            db,
            config: Arc::new(config),
            identity: None,
            uploads,
        }
    }

    pub fn with_account_store(mut self, accounts: Arc<dyn AccountStore>) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn with_identity_verifier(mut self, identity: Arc<dyn IdentityVerifier>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Loads the caller's account
    ///
    /// A valid token for an account that no longer exists is a 401.
    pub async fn current_account(&self, auth: &AuthContext) -> ApiResult<Account> {
        self.accounts
            .find_by_id(auth.user_id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))
    }

    /// Loads the caller as a permission-check principal
    pub async fn principal(&self, auth: &AuthContext) -> ApiResult<Principal> {
        let account = self.current_account(auth).await?;
        Ok(Principal::from(&account))
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                         # Health check (public)
/// ├── /uploads/*                      # Uploaded files (public)
/// └── /api/
///     ├── register, login, refresh,   # public
///     │   login/federated
///     ├── GET vendor, POST vendor/create   # public
///     └── everything else             # Bearer access token
/// ```
///
/// # Middleware Stack
///
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Security headers
/// 4. Authentication (protected routes only)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/login/federated", post(routes::auth::federated_login))
        .route("/vendor", get(routes::vendors::list_vendors))
        .route("/vendor/create", post(routes::vendors::create_vendor));

    let protected_routes = Router::new()
        // Users
        .route("/user/profile", get(routes::users::profile))
        .route("/user/foto", put(routes::users::update_photo))
        .route("/user/update", put(routes::users::update_user))
        .route("/users", get(routes::users::list_users))
        .route("/users/vendor", get(routes::users::list_vendor_users))
        .route("/users/search", get(routes::users::search_users))
        // Vendors
        .route("/vendor/foto", put(routes::vendors::update_photo))
        .route("/vendor/bank", put(routes::vendors::update_bank))
        .route("/vendor/:id", delete(routes::vendors::delete_vendor))
        // Events and attendance
        .route("/event/create", post(routes::events::create_event))
        .route("/event/:id", put(routes::events::update_event))
        .route("/events/finish", put(routes::events::finish_event))
        .route("/events", get(routes::events::list_events))
        .route("/event-log/create", post(routes::events::create_event_log))
        .route("/event-log/status", put(routes::events::update_event_log_status))
        .route("/event-logs", get(routes::events::list_event_logs))
        .route("/event-logs/user", get(routes::events::list_own_event_logs))
        // Trainings and matches
        .route("/training/create", post(routes::trainings::create_training))
        .route("/trainings", get(routes::trainings::list_trainings))
        .route("/trainings/vendor", get(routes::trainings::list_vendor_trainings))
        .route("/match/create", post(routes::matches::create_match))
        .route("/matches", get(routes::matches::list_matches))
        .route("/matches/vendor", get(routes::matches::list_vendor_matches))
        // Challenges
        .route("/challenge/create", post(routes::challenges::create_challenge))
        .route("/challenges", get(routes::challenges::list_challenges))
        .route("/challenges/vendor", get(routes::challenges::list_vendor_challenges))
        .route("/challenge-log/create", post(routes::challenges::create_challenge_log))
        .route("/challenge-logs", get(routes::challenges::list_challenge_logs))
        // Payments
        .route("/payment/create", post(routes::payments::create_payment))
        .route("/payment/bulk", post(routes::payments::create_bulk_payment))
        .route("/payment/status", put(routes::payments::update_payment_status))
        .route("/payment/proof", put(routes::payments::upload_payment_proof))
        .route("/payments", get(routes::payments::list_payments))
        .route("/payments/user", get(routes::payments::list_own_payments))
        .route("/payments/vendor", get(routes::payments::list_vendor_payments))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let api_routes = Router::new().merge(public_routes).merge(protected_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .nest_service("/uploads", ServeDir::new(state.uploads.root()))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Bearer token gate
///
/// Validates the access token and injects [`AuthContext`] into the request
/// extensions. Every failure is a 401.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(req.headers(), state.jwt_secret()).map_err(|e| {
        tracing::debug!(error = %e, path = %req.uri().path(), "Rejected request at auth gate");
        ApiError::from(e)
    })?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
