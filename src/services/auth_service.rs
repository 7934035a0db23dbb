use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{generate_jwt, validate_jwt, verify_password, Claims};
use crate::config::SecurityConfig;
use crate::database::models::User;
use crate::database::store::Store;
use crate::services::{Principal, ServiceError, ServiceResult};

const BAD_CREDENTIALS: &str = "Invalid username or password";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
    pub expires_in: u64,
}

/// Credential checks and bearer-token resolution
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    security: SecurityConfig,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, security: SecurityConfig) -> Self {
        Self { store, security }
    }

    /// Unknown, inactive and wrong-password logins fail alike
    pub async fn login(&self, username: &str, password: &str) -> ServiceResult<LoginResponse> {
        let user = self
            .store
            .find_user_by_username(username.trim())
            .await?
            .filter(|user| user.active && verify_password(password, &user.password_hash))
            .ok_or_else(|| {
                warn!("Failed login for '{}'", username.trim());
                ServiceError::unauthenticated(BAD_CREDENTIALS)
            })?;

        let claims = Claims::new(&user, self.security.jwt_expiry_hours);
        let token = generate_jwt(&claims, &self.security).map_err(|e| {
            tracing::error!("Token generation failed for user {}: {}", user.id, e);
            ServiceError::unauthenticated(BAD_CREDENTIALS)
        })?;

        info!("User {} '{}' logged in as {}", user.id, user.username, user.role);
        Ok(LoginResponse {
            token,
            user,
            expires_in: self.security.jwt_expiry_hours * 3600,
        })
    }

    /// The stored user, not the token, decides role and area, so deactivation
    /// and role changes apply to tokens already issued.
    pub async fn resolve_principal(&self, token: &str) -> ServiceResult<Principal> {
        let claims = validate_jwt(token, &self.security)
            .map_err(|e| ServiceError::unauthenticated(e.to_string()))?;

        let user = self
            .store
            .find_user(claims.sub)
            .await?
            .filter(|user| user.active)
            .ok_or_else(|| ServiceError::unauthenticated("User not found or inactive"))?;

        Ok(Principal::from(&user))
    }

    pub async fn current_user(&self, principal: &Principal) -> ServiceResult<User> {
        self.store
            .find_user(principal.user_id)
            .await?
            .ok_or_else(|| ServiceError::unauthenticated("User not found or inactive"))
    }
}
