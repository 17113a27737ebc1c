use std::sync::Arc;

use garage_db::store::{CredentialStore, RefreshTokenStore};

use crate::auth::jwt::AccessTokenCodec;
use crate::auth::password::PasswordHasher;
use crate::auth::refresh::RefreshTokenService;
use crate::auth::service::AuthService;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (accessed by middleware and handlers).
    pub config: Arc<ServerConfig>,
    /// User, role and profile storage.
    pub credentials: Arc<dyn CredentialStore>,
    /// Access-token codec; the signing key is loaded once and never mutated.
    pub codec: Arc<AccessTokenCodec>,
    /// Login / refresh / register / logout orchestration.
    pub auth: AuthService,
}

impl AppState {
    /// Wire the authentication core on top of the given stores.
    pub fn new(
        config: ServerConfig,
        credentials: Arc<dyn CredentialStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        hasher: PasswordHasher,
    ) -> Self {
        let codec = Arc::new(AccessTokenCodec::new(&config.jwt));
        let refresh = RefreshTokenService::new(
            Arc::clone(&credentials),
            refresh_tokens,
            config.jwt.refresh_token_ttl(),
        );
        let auth = AuthService::new(Arc::clone(&credentials), refresh, Arc::clone(&codec), hasher);

        Self {
            config: Arc::new(config),
            credentials,
            codec,
            auth,
        }
    }
}
