use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::{Value, json};

use judstat_terminal::api::{ApiClient, REFRESH_PATH};
use judstat_terminal::auth_api::AuthContext;
use judstat_terminal::error::{ApiError, CONNECTION_ERROR};
use judstat_terminal::fake_backend::{DEMO_EMAIL, DEMO_PASSWORD, DemoBackend};
use judstat_terminal::persist::{KeyValueStore, MemoryStore};
use judstat_terminal::session::{AuthPayload, AuthUser, SessionStore};
use judstat_terminal::stats_api;
use judstat_terminal::transport::{HttpRequest, HttpResponse, Transport};

/// Replays canned responses in order and records every request it sees.
#[derive(Clone, Default)]
struct Scripted {
    responses: Arc<Mutex<VecDeque<Result<HttpResponse, ApiError>>>>,
    calls: Arc<Mutex<Vec<HttpRequest>>>,
}

impl Scripted {
    fn new(responses: Vec<Result<HttpResponse, ApiError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            calls: Arc::default(),
        }
    }

    fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }
}

impl Transport for Scripted {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.calls.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Network("script exhausted".to_string())))
    }
}

fn ok(body: Value) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::json(200, &body))
}

fn status(code: u16, message: &str) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::json(
        code,
        &json!({ "statusCode": code, "message": message }),
    ))
}

fn signed_in_session() -> Arc<SessionStore> {
    let session = Arc::new(SessionStore::new(Arc::new(MemoryStore::new())));
    session.save_auth(
        &AuthPayload {
            access_token: "old-access".to_string(),
            refresh_token: "refresh-1".to_string(),
            user: AuthUser {
                id: 1,
                name: "Admin".to_string(),
                email: "admin@pj.gob.pe".to_string(),
                role: "admin".to_string(),
                is_active: true,
            },
        },
        Utc::now(),
    );
    session
}

#[test]
fn expired_token_is_refreshed_once_and_request_replayed_once() {
    let transport = Scripted::new(vec![
        status(401, "Unauthorized"),
        ok(json!({ "access_token": "new-access" })),
        ok(json!({ "success": true, "data": [1, 2], "message": "ok" })),
    ]);
    let session = signed_in_session();
    let api = ApiClient::new(Box::new(transport.clone()), Arc::clone(&session));

    let env = api.get::<Vec<i64>>("/solicitudes").unwrap();
    assert_eq!(env.data, vec![1, 2]);

    let calls = transport.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].path, "/solicitudes");
    assert_eq!(calls[0].bearer.as_deref(), Some("old-access"));
    assert_eq!(calls[1].path, REFRESH_PATH);
    assert_eq!(
        calls[1].body,
        Some(json!({ "refresh_token": "refresh-1" }))
    );
    assert_eq!(calls[2].path, "/solicitudes");
    assert_eq!(calls[2].bearer.as_deref(), Some("new-access"));

    assert_eq!(session.access_token().as_deref(), Some("new-access"));
    assert_eq!(session.refresh_token().as_deref(), Some("refresh-1"));
    assert!(!api.login_required());
}

#[test]
fn enveloped_refresh_response_is_accepted() {
    let transport = Scripted::new(vec![
        status(401, "Unauthorized"),
        ok(json!({ "success": true, "data": { "access_token": "wrapped" }, "message": "ok" })),
        ok(json!({ "total": 0 })),
    ]);
    let session = signed_in_session();
    let api = ApiClient::new(Box::new(transport.clone()), Arc::clone(&session));

    api.get::<Value>("/solicitudes/estadisticas").unwrap();
    assert_eq!(session.access_token().as_deref(), Some("wrapped"));
    assert_eq!(transport.calls().len(), 3);
}

#[test]
fn missing_refresh_token_clears_session_without_replay() {
    let store = Arc::new(MemoryStore::new());
    store.set("accessToken", "stale").unwrap();
    let session = Arc::new(SessionStore::new(store));
    let transport = Scripted::new(vec![status(401, "Unauthorized")]);
    let api = ApiClient::new(Box::new(transport.clone()), Arc::clone(&session));

    let err = api.get::<Value>("/users").unwrap_err();
    assert_eq!(err, ApiError::SessionExpired);
    assert_eq!(transport.calls().len(), 1);
    assert!(session.access_token().is_none());
    assert!(api.take_login_required());
    assert!(!api.take_login_required());
}

#[test]
fn rejected_refresh_clears_tokens_and_never_replays() {
    let transport = Scripted::new(vec![
        status(401, "Unauthorized"),
        status(401, "Refresh token inválido"),
    ]);
    let session = signed_in_session();
    let api = ApiClient::new(Box::new(transport.clone()), Arc::clone(&session));

    let err = api.get::<Value>("/solicitudes").unwrap_err();
    assert_eq!(err, ApiError::SessionExpired);

    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].path, REFRESH_PATH);
    assert!(session.access_token().is_none());
    assert!(session.refresh_token().is_none());
    assert!(session.user().is_none());
    assert!(api.login_required());
}

#[test]
fn refresh_response_without_token_counts_as_failure() {
    let transport = Scripted::new(vec![status(401, "Unauthorized"), ok(json!({}))]);
    let session = signed_in_session();
    let api = ApiClient::new(Box::new(transport.clone()), Arc::clone(&session));

    assert_eq!(
        api.get::<Value>("/users").unwrap_err(),
        ApiError::SessionExpired
    );
    assert_eq!(transport.calls().len(), 2);
    assert!(session.refresh_token().is_none());
}

#[test]
fn second_401_after_replay_is_surfaced_without_another_refresh() {
    let transport = Scripted::new(vec![
        status(401, "Unauthorized"),
        ok(json!({ "access_token": "new-access" })),
        status(401, "Token revocado"),
    ]);
    let session = signed_in_session();
    let api = ApiClient::new(Box::new(transport.clone()), Arc::clone(&session));

    let err = api.get::<Value>("/users").unwrap_err();
    assert_eq!(
        err,
        ApiError::Unauthorized {
            message: "Token revocado".to_string(),
        }
    );
    let refreshes = transport
        .calls()
        .iter()
        .filter(|c| c.path == REFRESH_PATH)
        .count();
    assert_eq!(refreshes, 1);
    assert_eq!(transport.calls().len(), 3);
    assert!(!api.login_required());
}

#[test]
fn login_401_is_a_plain_rejection() {
    let transport = Scripted::new(vec![status(401, "Credenciales inválidas")]);
    let session = signed_in_session();
    let auth = AuthContext::new(Box::new(transport.clone()), Arc::clone(&session));

    let err = auth.login("admin@pj.gob.pe", "wrong").unwrap_err();
    assert_eq!(err.backend_message(), Some("Credenciales inválidas"));
    assert_eq!(transport.calls().len(), 1);
    assert_eq!(session.access_token().as_deref(), Some("old-access"));
    assert!(!auth.api().login_required());
}

#[test]
fn network_failure_does_not_trigger_refresh() {
    let transport = Scripted::new(vec![Err(ApiError::Network("connection refused".into()))]);
    let session = signed_in_session();
    let api = ApiClient::new(Box::new(transport.clone()), Arc::clone(&session));

    let err = api.get::<Value>("/users").unwrap_err();
    assert_eq!(err.user_message(), CONNECTION_ERROR);
    assert_eq!(transport.calls().len(), 1);
    assert_eq!(session.access_token().as_deref(), Some("old-access"));
}

#[test]
fn requests_without_session_carry_no_bearer() {
    let transport = Scripted::new(vec![ok(json!([]))]);
    let session = Arc::new(SessionStore::new(Arc::new(MemoryStore::new())));
    let api = ApiClient::new(Box::new(transport.clone()), session);

    api.get::<Value>("/jueces/activos").unwrap();
    assert_eq!(transport.calls()[0].bearer, None);
}

#[test]
fn demo_backend_refreshes_expired_access_tokens() {
    let backend = Arc::new(DemoBackend::default());
    let session = Arc::new(SessionStore::new(Arc::new(MemoryStore::new())));
    let auth = AuthContext::new(Box::new(SharedDemo(Arc::clone(&backend))), Arc::clone(&session));

    auth.login(DEMO_EMAIL, DEMO_PASSWORD).unwrap();
    let first_token = session.access_token().unwrap();
    backend.expire_access_tokens();

    let cuadro = stats_api::fetch_cuadro_anual(auth.api(), 2025, 6).unwrap();
    assert!(!cuadro.filas.is_empty());
    assert_ne!(session.access_token().unwrap(), first_token);

    backend.expire_access_tokens();
    backend.revoke_refresh_tokens();
    let err = stats_api::fetch_cuadro_anual(auth.api(), 2025, 6).unwrap_err();
    assert_eq!(err, ApiError::SessionExpired);
    assert!(!auth.is_authenticated());
    assert!(auth.api().take_login_required());
}

struct SharedDemo(Arc<DemoBackend>);

impl Transport for SharedDemo {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.0.send(request)
    }
}
