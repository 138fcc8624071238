use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::envelope::{self, Envelope};
use crate::error::{ApiError, ApiResult, CONNECTION_ERROR};
use crate::session::SessionStore;
use crate::transport::{HttpRequest, HttpResponse, Method, Transport};

pub const REFRESH_PATH: &str = "/auth/refresh";

/// Endpoints reachable without a session; a 401 from them is a plain rejection.
const ANONYMOUS_PATHS: &[&str] = &[
    "/auth/login",
    "/auth/register",
    REFRESH_PATH,
    "/auth/forgot-password",
    "/auth/reset-password",
    "/auth/verify-reset-token",
];

/// Bearer-token client with one-shot transparent refresh on 401.
pub struct ApiClient {
    transport: Box<dyn Transport>,
    session: Arc<SessionStore>,
    login_required: AtomicBool,
}

impl ApiClient {
    pub fn new(transport: Box<dyn Transport>, session: Arc<SessionStore>) -> Self {
        Self {
            transport,
            session,
            login_required: AtomicBool::new(false),
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Set when a refresh failed and the user has to authenticate again.
    pub fn login_required(&self) -> bool {
        self.login_required.load(Ordering::SeqCst)
    }

    pub fn take_login_required(&self) -> bool {
        self.login_required.swap(false, Ordering::SeqCst)
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<Envelope<T>> {
        self.execute(HttpRequest::new(Method::Get, path))?.decode()
    }

    pub fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<Envelope<T>> {
        self.execute(HttpRequest::new(Method::Get, path).with_query(query))?
            .decode()
    }

    pub fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<Envelope<T>> {
        let req = HttpRequest::new(Method::Post, path).with_body(to_json(body)?);
        self.execute(req)?.decode()
    }

    pub fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ApiResult<Envelope<T>> {
        self.execute(HttpRequest::new(Method::Post, path))?.decode()
    }

    pub fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<Envelope<T>> {
        let req = HttpRequest::new(Method::Put, path).with_body(to_json(body)?);
        self.execute(req)?.decode()
    }

    pub fn patch<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<Envelope<T>> {
        let req = HttpRequest::new(Method::Patch, path).with_body(to_json(body)?);
        self.execute(req)?.decode()
    }

    pub fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResult<Envelope<T>> {
        self.execute(HttpRequest::new(Method::Delete, path))?.decode()
    }

    /// Sends `request`, refreshing the access token and replaying once on a 401.
    pub fn execute(&self, mut request: HttpRequest) -> ApiResult<Envelope<Value>> {
        request.bearer = self.session.access_token();
        let resp = self.transport.send(&request)?;
        if resp.status != 401 || is_anonymous(&request.path) {
            return finish(&request, resp);
        }

        debug!(path = %request.path, "401 received, refreshing access token");
        match self.refresh_access_token() {
            Ok(token) => {
                debug!(path = %request.path, "token refreshed, replaying request");
                request.bearer = Some(token);
                let replay = self.transport.send(&request)?;
                finish(&request, replay)
            }
            Err(err) => {
                warn!(path = %request.path, error = %err, "token refresh failed");
                self.session.clear();
                self.login_required.store(true, Ordering::SeqCst);
                Err(ApiError::SessionExpired)
            }
        }
    }

    fn refresh_access_token(&self) -> ApiResult<String> {
        let Some(refresh_token) = self.session.refresh_token() else {
            return Err(ApiError::Unauthorized {
                message: "no refresh token stored".to_string(),
            });
        };
        let req = HttpRequest::new(Method::Post, REFRESH_PATH)
            .with_body(json!({ "refresh_token": refresh_token }));
        let resp = self.transport.send(&req)?;
        let env = finish(&req, resp)?;
        let token = env
            .data
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Decode("refresh response without access_token".into()))?
            .to_string();
        self.session.set_access_token(&token, Utc::now());
        info!("access token refreshed");
        Ok(token)
    }
}

fn finish(request: &HttpRequest, resp: HttpResponse) -> ApiResult<Envelope<Value>> {
    if resp.is_success() {
        return envelope::normalize_body(resp.status, &resp.body);
    }
    let message = envelope::error_message(&resp.body).unwrap_or_else(|| CONNECTION_ERROR.into());
    debug!(
        method = request.method.as_str(),
        path = %request.path,
        status = resp.status,
        %message,
        "request rejected"
    );
    if resp.status == 401 {
        Err(ApiError::Unauthorized { message })
    } else {
        Err(ApiError::Rejected {
            status: resp.status,
            message,
        })
    }
}

fn is_anonymous(path: &str) -> bool {
    ANONYMOUS_PATHS.iter().any(|p| path.starts_with(p))
}

fn to_json<B: Serialize>(body: &B) -> ApiResult<Value> {
    serde_json::to_value(body).map_err(|err| ApiError::Decode(err.to_string()))
}
