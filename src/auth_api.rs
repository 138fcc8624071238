use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::api::{ApiClient, REFRESH_PATH};
use crate::envelope::Envelope;
use crate::error::{ApiError, ApiResult};
use crate::session::{AuthPayload, AuthUser, SessionStore};
use crate::transport::Transport;

pub const LOCAL_LOGOUT_MESSAGE: &str = "Sesión cerrada localmente";

#[derive(Debug, Clone, Serialize)]
pub struct LoginDto {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterDto {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshedToken {
    pub access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetTokenStatus {
    #[serde(default)]
    pub valid: bool,
}

/// Session context built once at startup and handed to whoever talks to the backend.
pub struct AuthContext {
    api: ApiClient,
}

impl AuthContext {
    pub fn new(transport: Box<dyn Transport>, session: Arc<SessionStore>) -> Self {
        Self {
            api: ApiClient::new(transport, session),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn login(&self, email: &str, password: &str) -> ApiResult<Envelope<AuthPayload>> {
        let dto = LoginDto {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let env = self.api.post::<_, AuthPayload>("/auth/login", &dto)?;
        self.api.session().save_auth(&env.data, Utc::now());
        info!(user = %env.data.user.email, "login succeeded");
        Ok(env)
    }

    pub fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Option<&str>,
    ) -> ApiResult<Envelope<AuthPayload>> {
        let dto = RegisterDto {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
            role: role.map(str::to_string),
        };
        let env = self.api.post::<_, AuthPayload>("/auth/register", &dto)?;
        self.api.session().save_auth(&env.data, Utc::now());
        info!(user = %env.data.user.email, "registration succeeded");
        Ok(env)
    }

    /// Ends the session locally no matter what the server says.
    pub fn logout(&self) -> Envelope<()> {
        let result = self.api.post_empty::<Value>("/auth/logout");
        self.api.session().clear();
        match result {
            Ok(env) => Envelope {
                data: (),
                message: env.message,
            },
            Err(err) => {
                warn!(error = %err, "server logout failed, session closed locally");
                Envelope {
                    data: (),
                    message: Some(LOCAL_LOGOUT_MESSAGE.to_string()),
                }
            }
        }
    }

    pub fn refresh_token(&self, refresh_token: &str) -> ApiResult<Envelope<RefreshedToken>> {
        let env = self.api.post::<_, RefreshedToken>(
            REFRESH_PATH,
            &json!({ "refresh_token": refresh_token }),
        )?;
        self.api
            .session()
            .set_access_token(&env.data.access_token, Utc::now());
        Ok(env)
    }

    pub fn change_password(&self, current: &str, new: &str) -> ApiResult<Envelope<Value>> {
        self.api.post(
            "/auth/change-password",
            &json!({ "currentPassword": current, "newPassword": new }),
        )
    }

    pub fn request_password_reset(&self, email: &str) -> ApiResult<Envelope<Value>> {
        self.api
            .post("/auth/forgot-password", &json!({ "email": email.trim() }))
    }

    pub fn confirm_password_reset(&self, token: &str, new: &str) -> ApiResult<Envelope<Value>> {
        self.api.post(
            "/auth/reset-password",
            &json!({ "token": token, "newPassword": new }),
        )
    }

    pub fn verify_reset_token(&self, token: &str) -> ApiResult<bool> {
        let env = self
            .api
            .get::<ResetTokenStatus>(&format!("/auth/verify-reset-token/{token}"))?;
        Ok(env.data.valid)
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.api.session().user()
    }

    pub fn is_authenticated(&self) -> bool {
        self.api.session().is_authenticated()
    }

    pub fn access_token(&self) -> Option<String> {
        self.api.session().access_token()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.current_user().is_some_and(|u| u.role == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role("admin")
    }

    pub fn is_active(&self) -> bool {
        self.current_user().is_some_and(|u| u.is_active)
    }
}

/// Login/registration failures read better with the backend text when there is one.
pub fn auth_failure_message(err: &ApiError, fallback: &str) -> String {
    match err {
        ApiError::Network(_) => err.user_message(),
        _ => err
            .backend_message()
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string()),
    }
}
