use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{DashboardError, DashboardResult};
use crate::gateway::{AccountGateway, CredentialStore};
use crate::types::{AuthResponse, LoginRequest, RegisterRequest, User};

/// Identity lifecycle on top of the gateway. The only writer of the session token
/// apart from the transport's 401 handling.
pub struct AuthSession {
    gateway: Arc<dyn AccountGateway>,
    credentials: Arc<dyn CredentialStore>,
}

impl AuthSession {
    pub fn new(gateway: Arc<dyn AccountGateway>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self { gateway, credentials }
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.token().is_some()
    }

    fn store_token(&self, response: AuthResponse) -> DashboardResult<User> {
        match (response.success, response.token) {
            (true, Some(token)) => {
                self.credentials.set_token(token);
                let user = response.user.unwrap_or_default();
                info!("Signed in as {}", user.username);
                Ok(user)
            }
            (true, None) => Err(DashboardError::Auth("gateway returned no session token".to_string())),
            (false, _) => Err(DashboardError::Auth(response.message)),
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> DashboardResult<User> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self.gateway.login(request).await?;
        self.store_token(response)
    }

    /// Validates locally first; an invalid request never reaches the gateway.
    pub async fn register(&self, request: RegisterRequest) -> DashboardResult<User> {
        request.validate()?;
        let response = self.gateway.register(request).await?;
        self.store_token(response)
    }

    /// Clears the local token even when the gateway call fails.
    pub async fn logout(&self) {
        if let Err(e) = self.gateway.logout().await {
            warn!("Gateway logout failed, clearing session anyway: {}", e);
        }
        self.credentials.clear();
        info!("Signed out");
    }

    pub async fn profile(&self) -> DashboardResult<User> {
        let response = self.gateway.profile().await?;
        if !response.success {
            self.credentials.clear();
            return Err(DashboardError::Auth(response.message));
        }
        response
            .user
            .ok_or_else(|| DashboardError::Decode("profile response carried no user".to_string()))
    }
}
