use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::persist::KeyValueStore;

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_KEY: &str = "user";
const COOKIES_KEY: &str = "cookies";

pub const ACCESS_COOKIE_MAX_AGE_SECS: i64 = 24 * 60 * 60;
pub const REFRESH_COOKIE_MAX_AGE_SECS: i64 = 7 * 24 * 60 * 60;

pub const ENTRY_ROUTE: &str = "/";
pub const LOGIN_ROUTE: &str = "/login";
pub const DASHBOARD_ROUTE: &str = "/dashboard";
const PROTECTED_PREFIXES: &[&str] = &[DASHBOARD_ROUTE];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(rename = "isActive", default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPayload {
    pub access_token: String,
    pub refresh_token: String,
    pub user: AuthUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub value: String,
    pub expires_at: i64,
}

/// Short-lived token mirror read by the route guard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieJar {
    cookies: BTreeMap<String, Cookie>,
}

impl CookieJar {
    pub fn set(&mut self, name: &str, value: &str, max_age_secs: i64, now: DateTime<Utc>) {
        let expires_at = (now + ChronoDuration::seconds(max_age_secs)).timestamp();
        self.cookies.insert(
            name.to_string(),
            Cookie {
                value: value.to_string(),
                expires_at,
            },
        );
    }

    pub fn expire(&mut self, name: &str) {
        self.cookies.remove(name);
    }

    pub fn get(&self, name: &str, now: DateTime<Utc>) -> Option<&str> {
        self.cookies
            .get(name)
            .filter(|c| c.expires_at > now.timestamp() && !c.value.is_empty())
            .map(|c| c.value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    Redirect(&'static str),
}

/// Request-time guard: keeps anonymous users out of the dashboard and signed-in users
/// away from the entry/login pages.
pub fn guard_route(path: &str, jar: &CookieJar, now: DateTime<Utc>) -> RouteDecision {
    let has_token = jar.get(ACCESS_TOKEN_KEY, now).is_some();
    let protected = PROTECTED_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix));
    if protected && !has_token {
        return RouteDecision::Redirect(ENTRY_ROUTE);
    }
    if (path == ENTRY_ROUTE || path == LOGIN_ROUTE) && has_token {
        return RouteDecision::Redirect(DASHBOARD_ROUTE);
    }
    RouteDecision::Allow
}

/// Session tokens and user record on top of a durable key/value store.
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn access_token(&self) -> Option<String> {
        self.store
            .get(ACCESS_TOKEN_KEY)
            .filter(|token| !token.is_empty())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.store
            .get(REFRESH_TOKEN_KEY)
            .filter(|token| !token.is_empty())
    }

    pub fn user(&self) -> Option<AuthUser> {
        let raw = self.store.get(USER_KEY)?;
        serde_json::from_str(&raw).ok()
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some() && self.user().is_some()
    }

    pub fn cookies(&self) -> CookieJar {
        self.store
            .get(COOKIES_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    pub fn save_auth(&self, payload: &AuthPayload, now: DateTime<Utc>) {
        self.write(ACCESS_TOKEN_KEY, &payload.access_token);
        self.write(REFRESH_TOKEN_KEY, &payload.refresh_token);
        match serde_json::to_string(&payload.user) {
            Ok(user) => self.write(USER_KEY, &user),
            Err(err) => warn!(error = %err, "failed to serialize session user"),
        }

        let mut jar = self.cookies();
        jar.set(
            ACCESS_TOKEN_KEY,
            &payload.access_token,
            ACCESS_COOKIE_MAX_AGE_SECS,
            now,
        );
        jar.set(
            REFRESH_TOKEN_KEY,
            &payload.refresh_token,
            REFRESH_COOKIE_MAX_AGE_SECS,
            now,
        );
        self.write_cookies(&jar);
        info!(user = %payload.user.email, "session stored");
    }

    pub fn set_access_token(&self, token: &str, now: DateTime<Utc>) {
        self.write(ACCESS_TOKEN_KEY, token);
        let mut jar = self.cookies();
        jar.set(ACCESS_TOKEN_KEY, token, ACCESS_COOKIE_MAX_AGE_SECS, now);
        self.write_cookies(&jar);
    }

    pub fn clear(&self) {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
            if let Err(err) = self.store.remove(key) {
                warn!(key, error = %err, "failed to remove session key");
            }
        }
        let mut jar = self.cookies();
        jar.expire(ACCESS_TOKEN_KEY);
        jar.expire(REFRESH_TOKEN_KEY);
        self.write_cookies(&jar);
        info!("session cleared");
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(err) = self.store.set(key, value) {
            warn!(key, error = %err, "failed to persist session key");
        }
    }

    fn write_cookies(&self, jar: &CookieJar) {
        match serde_json::to_string(jar) {
            Ok(raw) => self.write(COOKIES_KEY, &raw),
            Err(err) => warn!(error = %err, "failed to serialize cookies"),
        }
    }
}
