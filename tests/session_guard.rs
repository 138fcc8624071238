use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use judstat_terminal::auth_api::{AuthContext, LOCAL_LOGOUT_MESSAGE, auth_failure_message};
use judstat_terminal::error::ApiError;
use judstat_terminal::fake_backend::{DEMO_EMAIL, DEMO_PASSWORD, DemoBackend};
use judstat_terminal::persist::{FileStore, MemoryStore, session_file_in};
use judstat_terminal::session::{
    ACCESS_TOKEN_KEY, AuthPayload, AuthUser, CookieJar, DASHBOARD_ROUTE, ENTRY_ROUTE, LOGIN_ROUTE,
    RouteDecision, SessionStore, guard_route,
};
use judstat_terminal::state::{AppState, Screen, screen_route};
use judstat_terminal::transport::{HttpRequest, HttpResponse, Transport};

fn payload() -> AuthPayload {
    AuthPayload {
        access_token: "access-1".to_string(),
        refresh_token: "refresh-1".to_string(),
        user: AuthUser {
            id: 7,
            name: "Operador".to_string(),
            email: "operador@pj.gob.pe".to_string(),
            role: "user".to_string(),
            is_active: true,
        },
    }
}

fn memory_session() -> SessionStore {
    SessionStore::new(Arc::new(MemoryStore::new()))
}

#[test]
fn anonymous_requests_to_dashboard_are_sent_to_entry() {
    let now = Utc::now();
    let jar = CookieJar::default();
    assert_eq!(
        guard_route(DASHBOARD_ROUTE, &jar, now),
        RouteDecision::Redirect(ENTRY_ROUTE)
    );
    assert_eq!(
        guard_route("/dashboard/cuadro-anual", &jar, now),
        RouteDecision::Redirect(ENTRY_ROUTE)
    );
    assert_eq!(guard_route(LOGIN_ROUTE, &jar, now), RouteDecision::Allow);
    assert_eq!(guard_route(ENTRY_ROUTE, &jar, now), RouteDecision::Allow);
}

#[test]
fn signed_in_requests_skip_entry_and_login() {
    let now = Utc::now();
    let session = memory_session();
    session.save_auth(&payload(), now);
    let jar = session.cookies();

    assert_eq!(guard_route(DASHBOARD_ROUTE, &jar, now), RouteDecision::Allow);
    assert_eq!(
        guard_route(LOGIN_ROUTE, &jar, now),
        RouteDecision::Redirect(DASHBOARD_ROUTE)
    );
    assert_eq!(
        guard_route(ENTRY_ROUTE, &jar, now),
        RouteDecision::Redirect(DASHBOARD_ROUTE)
    );
}

#[test]
fn access_cookie_expires_after_a_day() {
    let issued = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
    let session = memory_session();
    session.save_auth(&payload(), issued);
    let jar = session.cookies();

    let later = issued + Duration::hours(23);
    assert_eq!(jar.get(ACCESS_TOKEN_KEY, later), Some("access-1"));
    assert_eq!(guard_route(DASHBOARD_ROUTE, &jar, later), RouteDecision::Allow);

    let next_day = issued + Duration::hours(25);
    assert_eq!(jar.get(ACCESS_TOKEN_KEY, next_day), None);
    assert_eq!(jar.get("refreshToken", next_day), Some("refresh-1"));
    assert_eq!(
        guard_route(DASHBOARD_ROUTE, &jar, next_day),
        RouteDecision::Redirect(ENTRY_ROUTE)
    );
    assert_eq!(jar.get("refreshToken", issued + Duration::days(8)), None);
}

#[test]
fn clearing_the_session_expires_cookies() {
    let now = Utc::now();
    let session = memory_session();
    session.save_auth(&payload(), now);
    assert!(session.is_authenticated());

    session.clear();
    assert!(!session.is_authenticated());
    assert!(session.user().is_none());
    assert_eq!(
        guard_route(DASHBOARD_ROUTE, &session.cookies(), now),
        RouteDecision::Redirect(ENTRY_ROUTE)
    );
}

#[test]
fn refreshed_token_updates_storage_and_cookie() {
    let now = Utc::now();
    let session = memory_session();
    session.save_auth(&payload(), now);
    session.set_access_token("access-2", now);
    assert_eq!(session.access_token().as_deref(), Some("access-2"));
    assert_eq!(session.cookies().get(ACCESS_TOKEN_KEY, now), Some("access-2"));
}

#[test]
fn file_backed_session_survives_restart() {
    let dir = std::env::temp_dir().join(format!("judstat_guard_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    let path: PathBuf = session_file_in(&dir);
    let now = Utc::now();
    {
        let session = SessionStore::new(Arc::new(FileStore::open(&path)));
        session.save_auth(&payload(), now);
    }
    let reopened = SessionStore::new(Arc::new(FileStore::open(&path)));
    assert_eq!(reopened.user(), Some(payload().user));
    assert_eq!(reopened.refresh_token().as_deref(), Some("refresh-1"));
    assert_eq!(
        guard_route(DASHBOARD_ROUTE, &reopened.cookies(), now),
        RouteDecision::Allow
    );
    let _ = fs::remove_dir_all(&dir);
}

struct Unreachable;

impl Transport for Unreachable {
    fn send(&self, _request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        Err(ApiError::Network("connection refused".to_string()))
    }
}

#[test]
fn logout_ends_the_session_even_when_the_server_is_down() {
    let session = Arc::new(memory_session());
    session.save_auth(&payload(), Utc::now());
    let auth = AuthContext::new(Box::new(Unreachable), Arc::clone(&session));

    let env = auth.logout();
    assert_eq!(env.message.as_deref(), Some(LOCAL_LOGOUT_MESSAGE));
    assert!(!auth.is_authenticated());
    assert!(session.access_token().is_none());
}

#[test]
fn login_and_logout_against_demo_backend() {
    let session = Arc::new(memory_session());
    let auth = AuthContext::new(Box::new(DemoBackend::default()), Arc::clone(&session));

    let env = auth.login(DEMO_EMAIL, DEMO_PASSWORD).unwrap();
    assert_eq!(env.message.as_deref(), Some("Inicio de sesión exitoso"));
    assert!(auth.is_authenticated());
    assert!(auth.is_admin());
    assert!(auth.is_active());
    assert_eq!(auth.current_user().map(|u| u.email), Some(DEMO_EMAIL.to_string()));

    let env = auth.logout();
    assert_eq!(env.message.as_deref(), Some("Sesión cerrada exitosamente"));
    assert!(!auth.is_authenticated());
    assert!(session.refresh_token().is_none());
}

#[test]
fn failed_login_prefers_backend_message() {
    let auth = AuthContext::new(Box::new(DemoBackend::default()), Arc::new(memory_session()));
    let err = auth.login(DEMO_EMAIL, "wrong").unwrap_err();
    assert_eq!(
        auth_failure_message(&err, "Error en el login"),
        "Credenciales inválidas"
    );
    assert!(!auth.is_authenticated());
}

#[test]
fn register_validation_messages_are_joined() {
    let auth = AuthContext::new(Box::new(DemoBackend::default()), Arc::new(memory_session()));
    let err = auth.register("", "not-an-email", "123", None).unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(
        auth_failure_message(&err, "Error en el registro"),
        "name should not be empty; email must be an email; password must be longer than or equal to 6 characters"
    );

    let env = auth
        .register("Nueva Usuaria", "nueva@pj.gob.pe", "secreto", None)
        .unwrap();
    assert_eq!(env.data.user.role, "user");
    assert!(auth.is_authenticated());
    assert!(!auth.is_admin());

    let dup = auth
        .register("Otra", "nueva@pj.gob.pe", "secreto", None)
        .unwrap_err();
    assert_eq!(dup.status(), Some(409));
}

#[test]
fn network_failure_during_login_reads_as_connection_error() {
    let auth = AuthContext::new(Box::new(Unreachable), Arc::new(memory_session()));
    let err = auth.login(DEMO_EMAIL, DEMO_PASSWORD).unwrap_err();
    assert_eq!(
        auth_failure_message(&err, "Error en el login"),
        judstat_terminal::error::CONNECTION_ERROR
    );
}

#[test]
fn every_dashboard_screen_maps_to_a_protected_route() {
    let jar = CookieJar::default();
    let now = Utc::now();
    for screen in [
        Screen::Dashboard,
        Screen::Cuadro,
        Screen::Judges,
        Screen::Solicitudes,
        Screen::Users,
    ] {
        assert_eq!(
            guard_route(screen_route(screen), &jar, now),
            RouteDecision::Redirect(ENTRY_ROUTE),
            "{screen:?}"
        );
    }
    assert_eq!(screen_route(Screen::Login), LOGIN_ROUTE);
}

#[test]
fn screen_change_after_cookie_expiry_returns_to_login() {
    let issued = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
    let session = memory_session();
    session.save_auth(&payload(), issued);
    let jar = session.cookies();

    let mut state = AppState::new();
    state.user = Some(payload().user);
    state.screen = Screen::Dashboard;

    assert!(state.navigate(Screen::Cuadro, &jar, issued + Duration::hours(2)));
    assert_eq!(state.screen, Screen::Cuadro);

    let expired = issued + Duration::hours(24) + Duration::seconds(1);
    assert!(!state.navigate(Screen::Judges, &jar, expired));
    assert_eq!(state.screen, Screen::Login);
    assert!(state.user.is_none());
    assert!(state.toast.is_some());
}

#[test]
fn signed_in_navigation_to_login_lands_on_dashboard() {
    let now = Utc::now();
    let session = memory_session();
    session.save_auth(&payload(), now);

    let mut state = AppState::new();
    state.screen = Screen::Solicitudes;
    assert!(!state.navigate(Screen::Login, &session.cookies(), now));
    assert_eq!(state.screen, Screen::Dashboard);
}
