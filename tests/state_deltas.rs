use chrono::NaiveDate;
use serde_json::json;

use judstat_terminal::session::AuthUser;
use judstat_terminal::state::{
    AppState, Delta, LoginField, MessageDialog, Screen, ToastKind, apply_delta,
};
use judstat_terminal::stats_api::CuadroAnual;

fn state() -> AppState {
    AppState::for_date(NaiveDate::from_ymd_opt(2025, 6, 14).unwrap())
}

fn admin() -> AuthUser {
    AuthUser {
        id: 1,
        name: "Admin".to_string(),
        email: "admin@pj.gob.pe".to_string(),
        role: "admin".to_string(),
        is_active: true,
    }
}

fn cuadro() -> CuadroAnual {
    serde_json::from_value(json!({
        "fecha_consulta": "2025-06-14",
        "filas": [
            {
                "org_jurisd": "LIMA NORTE",
                "instancia": "A",
                "modulo_nom": "CIVIL",
                "jueces": "Ana Ruiz",
                "jueces_objetos": [{ "id": 1, "nombre_completo": "Ana Ruiz", "telefono": "9", "l_mensaje": true }],
                "res_total": 10,
                "pct_real_avance": 40.0,
                "nivel_prod": "BUENO"
            },
            {
                "org_jurisd": "LIMA NORTE",
                "instancia": "B",
                "modulo_nom": "CIVIL",
                "jueces": "Beto Paz",
                "jueces_objetos": [{ "id": 2, "nombre_completo": "Beto Paz", "telefono": "9", "l_mensaje": false }],
                "res_total": 20,
                "pct_real_avance": 60.0,
                "nivel_prod": "REGULAR"
            },
            {
                "org_jurisd": "LIMA NORTE",
                "instancia": "C",
                "modulo_nom": "CIVIL",
                "jueces": "Carmen Quispe, Diego Flores",
                "jueces_objetos": [
                    { "id": 3, "nombre_completo": "Carmen Quispe", "telefono": "9", "l_mensaje": true },
                    { "id": 4, "nombre_completo": "Diego Flores", "telefono": "9", "l_mensaje": true }
                ],
                "res_total": 30,
                "pct_real_avance": 80.0,
                "nivel_prod": "MUY BUENO"
            }
        ]
    }))
    .unwrap()
}

fn loaded() -> AppState {
    let mut state = state();
    state.user = Some(admin());
    state.screen = Screen::Cuadro;
    apply_delta(
        &mut state,
        Delta::SetCuadro {
            period: (2025, 6),
            cuadro: cuadro(),
        },
    );
    state
}

#[test]
fn login_moves_to_dashboard_and_resets_form() {
    let mut state = state();
    state.login.email = "admin@pj.gob.pe".to_string();
    state.login.password = "secret".to_string();
    state.login.submitting = true;

    apply_delta(
        &mut state,
        Delta::LoggedIn {
            user: admin(),
            message: "Inicio de sesión exitoso".to_string(),
        },
    );
    assert_eq!(state.screen, Screen::Dashboard);
    assert!(state.is_admin());
    assert!(state.login.password.is_empty());
    assert!(!state.login.submitting);
    let toast = state.toast.as_ref().unwrap();
    assert_eq!(toast.kind, ToastKind::Success);
    assert_eq!(toast.message, "Inicio de sesión exitoso");
}

#[test]
fn auth_failure_keeps_form_and_shows_message() {
    let mut state = state();
    state.login.submitting = true;
    apply_delta(&mut state, Delta::AuthFailed("Credenciales inválidas".to_string()));
    assert_eq!(state.screen, Screen::Login);
    assert!(!state.login.submitting);
    assert_eq!(state.login.error.as_deref(), Some("Credenciales inválidas"));
    assert_eq!(state.toast.as_ref().unwrap().kind, ToastKind::Error);
}

#[test]
fn session_expiry_returns_to_login_and_drops_data() {
    let mut state = loaded();
    state.select_all_visible();
    apply_delta(&mut state, Delta::SessionExpired);
    assert_eq!(state.screen, Screen::Login);
    assert!(state.user.is_none());
    assert!(state.rows.is_empty());
    assert!(state.selection.is_empty());
}

#[test]
fn cuadro_for_another_period_is_ignored() {
    let mut state = state();
    state.cuadro_loading = true;
    apply_delta(
        &mut state,
        Delta::SetCuadro {
            period: (2025, 5),
            cuadro: cuadro(),
        },
    );
    assert!(state.rows.is_empty());
    assert!(state.cuadro_loading);
}

#[test]
fn failed_cuadro_load_clears_the_table() {
    let mut state = loaded();
    state.select_all_visible();
    assert_eq!(state.selection.len(), 3);

    apply_delta(
        &mut state,
        Delta::CuadroFailed {
            period: (2025, 6),
            message: "Error de conexión".to_string(),
        },
    );
    assert!(state.rows.is_empty());
    assert!(state.selection.is_empty());
    assert!(!state.cuadro_loading);
    assert_eq!(state.summary().total_rows, 0);
}

#[test]
fn filter_change_revalidates_selection() {
    let mut state = loaded();
    state.select_all_visible();
    assert_eq!(state.selection.len(), 3);

    // Row C stays visible, so both of its judges keep their marks.
    state.set_filter("carmen".to_string());
    assert_eq!(state.filtered_rows().len(), 1);
    assert_eq!(state.selection.len(), 2);
    assert_eq!(state.cursor_row, 0);

    state.set_filter(String::new());
    assert_eq!(state.filtered_rows().len(), 3);
    assert_eq!(state.selection.len(), 2);
}

#[test]
fn cursor_toggle_respects_message_channel() {
    let mut state = loaded();
    assert!(state.toggle_at_cursor());
    assert_eq!(state.selection.len(), 1);

    state.select_next_row();
    assert!(!state.toggle_at_cursor());
    assert_eq!(state.selection.len(), 1);

    state.select_next_row();
    state.select_next_judge();
    assert_eq!(state.cursor_judge, 1);
    assert!(state.toggle_at_cursor());
    assert_eq!(state.selection.len(), 2);

    state.select_next_judge();
    assert_eq!(state.cursor_judge, 0);
    state.deselect_all();
    assert!(state.selection.is_empty());
}

#[test]
fn selected_first_puts_marked_rows_on_top() {
    let mut state = loaded();
    state.select_next_row();
    state.select_next_row();
    state.toggle_at_cursor();
    state.selected_first = true;

    let order: Vec<&str> = state
        .display_rows()
        .iter()
        .map(|r| r.instancia.as_str())
        .collect();
    assert_eq!(order, vec!["C", "A", "B"]);
}

#[test]
fn batch_finished_clears_selection_and_reports_counts() {
    let mut state = loaded();
    state.select_all_visible();
    state.dialog.open = true;

    apply_delta(&mut state, Delta::BatchStarted { total: 3 });
    apply_delta(
        &mut state,
        Delta::BatchProgress {
            current: 1,
            total: 3,
            success: false,
        },
    );
    assert!(state.batch.active);
    assert_eq!(state.batch.failed, 1);

    apply_delta(
        &mut state,
        Delta::BatchFinished {
            sent: 3,
            succeeded: 2,
            failed: 1,
        },
    );
    assert!(!state.batch.active);
    assert!(!state.dialog.open);
    assert!(state.selection.is_empty());
    let toast = state.toast.as_ref().unwrap();
    assert_eq!(toast.message, "2/3 solicitudes enviadas");
    assert_eq!(toast.kind, ToastKind::Success);
}

#[test]
fn period_shift_wraps_years() {
    let mut state = state();
    state.period = (2025, 1);
    state.shift_period(-1);
    assert_eq!(state.period, (2024, 12));
    state.shift_period(13);
    assert_eq!(state.period, (2026, 1));
}

#[test]
fn dialog_validates_dates_and_time() {
    let today = NaiveDate::from_ymd_opt(2025, 6, 14).unwrap();
    let mut dialog = MessageDialog::new("https://e", "(01) 410", "943", today);
    let fields = dialog.to_fields().unwrap();
    assert_eq!(fields.fecha_corte, Some(today));
    assert_eq!(fields.fecha_envio, None);

    dialog.values[3] = "2025-13-01".to_string();
    assert!(dialog.to_fields().is_err());
    dialog.values[3] = "2025-07-01".to_string();
    dialog.values[4] = "9h".to_string();
    assert!(dialog.to_fields().is_err());
    dialog.values[4] = "09:00".to_string();
    let fields = dialog.to_fields().unwrap();
    assert_eq!(fields.hora_envio, "09:00");

    dialog.values[0] = "  ".to_string();
    assert_eq!(dialog.to_fields().unwrap_err(), "Encuesta es requerida");
    let blank = MessageDialog::new("", "(01) 410", "943", today);
    assert!(blank.to_fields().is_err());

    dialog.prev_field();
    assert_eq!(dialog.focus, 5);
    dialog.next_field();
    assert_eq!(dialog.focus, 0);
}

#[test]
fn register_mode_cycles_through_name() {
    let mut state = state();
    assert!(state.login.validate().is_some());
    state.login.toggle_mode();
    assert_eq!(state.login.focus, LoginField::Name);
    state.login.focused_mut().push_str("Ana");
    state.login.next_field();
    state.login.focused_mut().push_str("ana@pj.gob.pe");
    state.login.next_field();
    state.login.focused_mut().push_str("secreto");
    assert!(state.login.validate().is_none());
    state.login.next_field();
    assert_eq!(state.login.focus, LoginField::Name);
}

#[test]
fn logs_are_capped() {
    let mut state = state();
    for idx in 0..250 {
        state.push_log(format!("line {idx}"));
    }
    assert_eq!(state.logs.len(), 200);
    assert_eq!(state.logs.front().map(String::as_str), Some("line 50"));
}
