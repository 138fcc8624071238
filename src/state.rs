use std::collections::VecDeque;
use std::time::Instant;

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::config::{DEFAULT_CONTACT_PHONE, DEFAULT_WHATSAPP};
use crate::session::{
    AuthUser, CookieJar, DASHBOARD_ROUTE, LOGIN_ROUTE, RouteDecision, guard_route,
};
use crate::solicitudes_api::{Solicitud, SolicitudStats};
use crate::stats_api::{CuadroAnual, Fila, JuezConMetaResumen};
use crate::stats_view::{
    self, CuadroSummary, JudgeSortField, JudgeSummaryStats, MessageFields, Selection,
    SortDirection,
};
use crate::users_api::User;

pub const TOAST_SECS: u64 = 6;
const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Dashboard,
    Cuadro,
    Judges,
    Solicitudes,
    Users,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Name,
    Email,
    Password,
}

#[derive(Debug, Clone)]
pub struct LoginForm {
    pub register_mode: bool,
    pub name: String,
    pub email: String,
    pub password: String,
    pub focus: LoginField,
    pub submitting: bool,
    pub error: Option<String>,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            register_mode: false,
            name: String::new(),
            email: String::new(),
            password: String::new(),
            focus: LoginField::Email,
            submitting: false,
            error: None,
        }
    }
}

impl LoginForm {
    pub fn next_field(&mut self) {
        self.focus = match (self.focus, self.register_mode) {
            (LoginField::Name, _) => LoginField::Email,
            (LoginField::Email, _) => LoginField::Password,
            (LoginField::Password, true) => LoginField::Name,
            (LoginField::Password, false) => LoginField::Email,
        };
    }

    pub fn toggle_mode(&mut self) {
        self.register_mode = !self.register_mode;
        self.focus = if self.register_mode {
            LoginField::Name
        } else {
            LoginField::Email
        };
        self.error = None;
    }

    pub fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            LoginField::Name => &mut self.name,
            LoginField::Email => &mut self.email,
            LoginField::Password => &mut self.password,
        }
    }

    /// Returns a validation message when the form can't be submitted yet.
    pub fn validate(&self) -> Option<&'static str> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Some("Email y contraseña son requeridos");
        }
        if self.register_mode && self.name.trim().is_empty() {
            return Some("El nombre es requerido");
        }
        None
    }
}

pub const DIALOG_FIELDS: [&str; 6] = [
    "Encuesta",
    "Teléfono",
    "WhatsApp",
    "Fecha de envío",
    "Hora de envío",
    "Fecha de corte",
];

/// Text-input state of the message dialog; converted to `MessageFields` on submit.
#[derive(Debug, Clone)]
pub struct MessageDialog {
    pub open: bool,
    pub focus: usize,
    pub values: [String; 6],
}

impl MessageDialog {
    pub fn new(survey_url: &str, phone: &str, whatsapp: &str, today: NaiveDate) -> Self {
        Self {
            open: false,
            focus: 0,
            values: [
                survey_url.to_string(),
                phone.to_string(),
                whatsapp.to_string(),
                String::new(),
                String::new(),
                today.format("%Y-%m-%d").to_string(),
            ],
        }
    }

    pub fn next_field(&mut self) {
        self.focus = (self.focus + 1) % self.values.len();
    }

    pub fn prev_field(&mut self) {
        self.focus = (self.focus + self.values.len() - 1) % self.values.len();
    }

    pub fn focused_mut(&mut self) -> &mut String {
        &mut self.values[self.focus % 6]
    }

    pub fn to_fields(&self) -> Result<MessageFields, String> {
        let encuesta = self.values[0].trim();
        if encuesta.is_empty() {
            return Err(format!("{} es requerida", DIALOG_FIELDS[0]));
        }
        let fecha_envio = parse_opt_date(&self.values[3], DIALOG_FIELDS[3])?;
        let fecha_corte = parse_opt_date(&self.values[5], DIALOG_FIELDS[5])?;
        let hora = self.values[4].trim();
        if !hora.is_empty() && chrono::NaiveTime::parse_from_str(hora, "%H:%M").is_err() {
            return Err(format!("{} inválida (HH:MM)", DIALOG_FIELDS[4]));
        }
        Ok(MessageFields {
            encuesta: encuesta.to_string(),
            telefono: self.values[1].clone(),
            whatsapp: self.values[2].clone(),
            fecha_envio,
            hora_envio: hora.to_string(),
            fecha_corte,
        })
    }
}

fn parse_opt_date(raw: &str, label: &str) -> Result<Option<NaiveDate>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| format!("{label} inválida (AAAA-MM-DD)"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    pub shown_at: Instant,
}

#[derive(Debug, Clone, Default)]
pub struct BatchState {
    pub active: bool,
    pub current: usize,
    pub total: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ExportState {
    pub active: bool,
    pub done: bool,
    pub path: Option<String>,
    pub message: String,
    pub last_updated: Option<Instant>,
}

impl ExportState {
    pub fn clear_if_done_for(&mut self, now: Instant, keep_secs: u64) {
        if !self.active || !self.done {
            return;
        }
        let Some(last) = self.last_updated else {
            return;
        };
        if now.duration_since(last).as_secs() >= keep_secs {
            *self = Self::default();
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub screen: Screen,
    pub user: Option<AuthUser>,
    pub period: (i32, u32),
    pub rows: Vec<Fila>,
    pub fecha_consulta: String,
    pub cuadro_loading: bool,
    pub filter: String,
    pub filter_active: bool,
    pub selection: Selection,
    pub selected_first: bool,
    pub cursor_row: usize,
    pub cursor_judge: usize,
    pub judges: Vec<JuezConMetaResumen>,
    pub judges_loading: bool,
    pub judge_filter: String,
    pub judge_sort: JudgeSortField,
    pub judge_dir: SortDirection,
    pub judge_selected: usize,
    pub solicitudes: Vec<Solicitud>,
    pub solicitud_stats: Option<SolicitudStats>,
    pub solicitudes_loading: bool,
    pub solicitud_scroll: usize,
    pub users: Vec<User>,
    pub users_loading: bool,
    pub user_selected: usize,
    pub login: LoginForm,
    pub dialog: MessageDialog,
    pub batch: BatchState,
    pub export: ExportState,
    pub logs: VecDeque<String>,
    pub toast: Option<Toast>,
    pub help_overlay: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::for_date(Utc::now().date_naive())
    }

    pub fn for_date(today: NaiveDate) -> Self {
        Self {
            screen: Screen::Login,
            user: None,
            period: (today.year(), today.month()),
            rows: Vec::new(),
            fecha_consulta: String::new(),
            cuadro_loading: false,
            filter: String::new(),
            filter_active: false,
            selection: Selection::new(),
            selected_first: false,
            cursor_row: 0,
            cursor_judge: 0,
            judges: Vec::new(),
            judges_loading: false,
            judge_filter: String::new(),
            judge_sort: JudgeSortField::Name,
            judge_dir: SortDirection::Asc,
            judge_selected: 0,
            solicitudes: Vec::new(),
            solicitud_stats: None,
            solicitudes_loading: false,
            solicitud_scroll: 0,
            users: Vec::new(),
            users_loading: false,
            user_selected: 0,
            login: LoginForm::default(),
            dialog: MessageDialog::new("", DEFAULT_CONTACT_PHONE, DEFAULT_WHATSAPP, today),
            batch: BatchState::default(),
            export: ExportState::default(),
            logs: VecDeque::with_capacity(MAX_LOGS),
            toast: None,
            help_overlay: false,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn show_toast(&mut self, kind: ToastKind, message: impl Into<String>) {
        self.toast = Some(Toast {
            kind,
            message: message.into(),
            shown_at: Instant::now(),
        });
    }

    pub fn maybe_clear_toast(&mut self, now: Instant) {
        if self
            .toast
            .as_ref()
            .is_some_and(|t| now.duration_since(t.shown_at).as_secs() >= TOAST_SECS)
        {
            self.toast = None;
        }
        self.export.clear_if_done_for(now, 8);
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.role == "admin")
    }

    pub fn filtered_rows(&self) -> Vec<&Fila> {
        stats_view::filter_rows(&self.rows, &self.filter)
    }

    /// Filtered rows in display order.
    pub fn display_rows(&self) -> Vec<&Fila> {
        let filtered = self.filtered_rows();
        if self.selected_first {
            stats_view::selected_first(&filtered, &self.selection)
        } else {
            filtered
        }
    }

    pub fn summary(&self) -> CuadroSummary {
        stats_view::summarize_rows(&self.filtered_rows())
    }

    pub fn set_filter(&mut self, filter: String) {
        self.filter = filter;
        self.revalidate_selection();
        self.cursor_row = 0;
        self.cursor_judge = 0;
    }

    fn revalidate_selection(&mut self) {
        let visible = stats_view::filter_rows(&self.rows, &self.filter);
        let dropped = self.selection.retain_visible(&visible);
        if dropped > 0 {
            let msg = format!("[INFO] {dropped} juez(es) fuera del filtro deseleccionados");
            self.push_log(msg);
        }
    }

    pub fn toggle_at_cursor(&mut self) -> bool {
        let rows = self.display_rows();
        let Some(key) = Selection::key_at(&rows, self.cursor_row, self.cursor_judge) else {
            return false;
        };
        let eligible = rows
            .get(self.cursor_row)
            .and_then(|row| row.jueces_objetos.get(self.cursor_judge))
            .is_some_and(|j| j.l_mensaje);
        let mut selection = self.selection.clone();
        selection.toggle(&rows, key);
        self.selection = selection;
        if !eligible {
            self.push_log("[INFO] El juez no tiene canal de mensajería habilitado");
        }
        eligible
    }

    pub fn select_all_visible(&mut self) {
        let rows = self.filtered_rows();
        let mut selection = self.selection.clone();
        selection.select_all(&rows);
        self.selection = selection;
    }

    pub fn deselect_all(&mut self) {
        self.selection.deselect_all();
    }

    pub fn select_next_row(&mut self) {
        let total = self.filtered_rows().len();
        if total == 0 {
            return;
        }
        self.cursor_row = (self.cursor_row + 1).min(total - 1);
        self.cursor_judge = 0;
    }

    pub fn select_prev_row(&mut self) {
        self.cursor_row = self.cursor_row.saturating_sub(1);
        self.cursor_judge = 0;
    }

    pub fn select_next_judge(&mut self) {
        let count = self
            .display_rows()
            .get(self.cursor_row)
            .map_or(0, |row| row.jueces_objetos.len());
        if count > 0 {
            self.cursor_judge = (self.cursor_judge + 1) % count;
        }
    }

    pub fn clamp_cursor(&mut self) {
        let rows = self.display_rows();
        if rows.is_empty() {
            self.cursor_row = 0;
            self.cursor_judge = 0;
            return;
        }
        let row_idx = self.cursor_row.min(rows.len() - 1);
        let judges = rows[row_idx].jueces_objetos.len();
        self.cursor_row = row_idx;
        if self.cursor_judge >= judges {
            self.cursor_judge = 0;
        }
    }

    pub fn shift_period(&mut self, months: i32) {
        let (year, month) = self.period;
        let index = year * 12 + (month as i32 - 1) + months;
        self.period = (index.div_euclid(12), index.rem_euclid(12) as u32 + 1);
    }

    pub fn visible_judges(&self) -> Vec<&JuezConMetaResumen> {
        let mut judges = stats_view::filter_judges(&self.judges, &self.judge_filter);
        stats_view::sort_judges(&mut judges, self.judge_sort, self.judge_dir);
        judges
    }

    pub fn judge_summary(&self) -> JudgeSummaryStats {
        stats_view::summarize_judges(&self.visible_judges())
    }

    pub fn cycle_judge_sort(&mut self) {
        self.judge_sort = self.judge_sort.next();
        self.judge_selected = 0;
    }

    pub fn flip_judge_dir(&mut self) {
        self.judge_dir = self.judge_dir.flip();
    }

    pub fn active_filter_mut(&mut self) -> Option<&mut String> {
        match self.screen {
            Screen::Cuadro => Some(&mut self.filter),
            Screen::Judges => Some(&mut self.judge_filter),
            _ => None,
        }
    }

    /// Runs the route guard before switching screens. Returns whether `target` is now shown.
    pub fn navigate(&mut self, target: Screen, jar: &CookieJar, now: DateTime<Utc>) -> bool {
        match guard_route(screen_route(target), jar, now) {
            RouteDecision::Allow => {
                self.screen = target;
                true
            }
            RouteDecision::Redirect(DASHBOARD_ROUTE) => {
                self.screen = Screen::Dashboard;
                target == Screen::Dashboard
            }
            RouteDecision::Redirect(_) => {
                if self.screen != Screen::Login {
                    self.reset_session_views();
                    self.push_log("[WARN] Sesión vencida, redirigiendo al login");
                    self.show_toast(
                        ToastKind::Error,
                        "Sesión expirada, inicie sesión nuevamente",
                    );
                }
                target == Screen::Login
            }
        }
    }

    pub fn reset_session_views(&mut self) {
        self.user = None;
        self.rows.clear();
        self.judges.clear();
        self.solicitudes.clear();
        self.solicitud_stats = None;
        self.users.clear();
        self.selection.deselect_all();
        self.dialog.open = false;
        self.login.password.clear();
        self.login.submitting = false;
        self.screen = Screen::Login;
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    LoggedIn {
        user: AuthUser,
        message: String,
    },
    Registered {
        user: AuthUser,
        message: String,
    },
    AuthFailed(String),
    LoggedOut(String),
    SessionExpired,
    SetCuadro {
        period: (i32, u32),
        cuadro: CuadroAnual,
    },
    CuadroFailed {
        period: (i32, u32),
        message: String,
    },
    SetJudges {
        period: (i32, u32),
        judges: Vec<JuezConMetaResumen>,
    },
    JudgesFailed(String),
    SetSolicitudes {
        items: Vec<Solicitud>,
        stats: Option<SolicitudStats>,
    },
    SolicitudesFailed(String),
    SetUsers(Vec<User>),
    UserUpdated(User),
    UsersFailed(String),
    BatchStarted {
        total: usize,
    },
    BatchProgress {
        current: usize,
        total: usize,
        success: bool,
    },
    BatchFinished {
        sent: usize,
        succeeded: usize,
        failed: usize,
    },
    ExportStarted {
        path: String,
    },
    ExportFinished {
        path: String,
        rows: usize,
        judges: usize,
    },
    ExportFailed(String),
    Log(String),
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    Login {
        email: String,
        password: String,
    },
    Register {
        name: String,
        email: String,
        password: String,
    },
    Logout,
    FetchCuadro {
        year: i32,
        month: u32,
    },
    FetchJudges {
        year: i32,
        month: u32,
    },
    FetchSolicitudes,
    FetchUsers,
    SetUserActive {
        id: i64,
        active: bool,
    },
    SubmitSelection {
        rows: Vec<Fila>,
        selection: Selection,
        fields: MessageFields,
    },
    ExportCuadro {
        path: String,
        period: (i32, u32),
        rows: Vec<Fila>,
    },
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::LoggedIn { user, message } | Delta::Registered { user, message } => {
            state.push_log(format!("[INFO] Sesión iniciada: {}", user.email));
            state.user = Some(user);
            state.login = LoginForm::default();
            state.screen = Screen::Dashboard;
            state.show_toast(ToastKind::Success, message);
        }
        Delta::AuthFailed(message) => {
            state.login.submitting = false;
            state.login.error = Some(message.clone());
            state.push_log(format!("[WARN] {message}"));
            state.show_toast(ToastKind::Error, message);
        }
        Delta::LoggedOut(message) => {
            state.reset_session_views();
            state.push_log("[INFO] Sesión cerrada");
            state.show_toast(ToastKind::Info, message);
        }
        Delta::SessionExpired => {
            state.reset_session_views();
            state.push_log("[WARN] Sesión expirada, redirigiendo al login");
            state.show_toast(ToastKind::Error, "Sesión expirada, inicie sesión nuevamente");
        }
        Delta::SetCuadro { period, cuadro } => {
            if period != state.period {
                return;
            }
            state.cuadro_loading = false;
            state.fecha_consulta = cuadro.fecha_consulta;
            state.rows = cuadro.filas;
            state.revalidate_selection();
            state.clamp_cursor();
            let msg = format!(
                "[INFO] Cuadro {}-{:02}: {} filas",
                period.0,
                period.1,
                state.rows.len()
            );
            state.push_log(msg);
        }
        Delta::CuadroFailed { period, message } => {
            if period != state.period {
                return;
            }
            // A failed load never leaves a stale table on screen.
            state.cuadro_loading = false;
            state.rows.clear();
            state.selection.deselect_all();
            state.clamp_cursor();
            state.push_log(format!("[WARN] Cuadro: {message}"));
            state.show_toast(ToastKind::Error, message);
        }
        Delta::SetJudges { period, judges } => {
            if period != state.period {
                return;
            }
            state.judges_loading = false;
            state.judges = judges;
            state.judge_selected = 0;
            let dups = stats_view::duplicate_judge_ids(&state.judges);
            if !dups.is_empty() {
                state.push_log(format!("[WARN] IDs de juez duplicados: {dups:?}"));
            }
        }
        Delta::JudgesFailed(message) => {
            state.judges_loading = false;
            state.judges.clear();
            state.push_log(format!("[WARN] Jueces: {message}"));
            state.show_toast(ToastKind::Error, message);
        }
        Delta::SetSolicitudes { items, stats } => {
            state.solicitudes_loading = false;
            state.solicitudes = items;
            state.solicitud_stats = stats;
            state.solicitud_scroll = 0;
        }
        Delta::SolicitudesFailed(message) => {
            state.solicitudes_loading = false;
            state.solicitudes.clear();
            state.push_log(format!("[WARN] Solicitudes: {message}"));
            state.show_toast(ToastKind::Error, message);
        }
        Delta::SetUsers(users) => {
            state.users_loading = false;
            state.users = users;
            state.user_selected = state.user_selected.min(state.users.len().saturating_sub(1));
        }
        Delta::UserUpdated(user) => {
            let label = if user.is_active { "activado" } else { "desactivado" };
            state.push_log(format!("[INFO] Usuario {} {label}", user.email));
            if let Some(existing) = state.users.iter_mut().find(|u| u.id == user.id) {
                *existing = user;
            }
        }
        Delta::UsersFailed(message) => {
            state.users_loading = false;
            state.push_log(format!("[WARN] Usuarios: {message}"));
            state.show_toast(ToastKind::Error, message);
        }
        Delta::BatchStarted { total } => {
            state.batch = BatchState {
                active: true,
                current: 0,
                total,
                failed: 0,
            };
            state.push_log(format!("[INFO] Enviando {total} solicitudes"));
        }
        Delta::BatchProgress {
            current,
            total,
            success,
        } => {
            state.batch.current = current;
            state.batch.total = total;
            if !success {
                state.batch.failed += 1;
            }
        }
        Delta::BatchFinished {
            sent,
            succeeded,
            failed,
        } => {
            state.batch = BatchState::default();
            state.selection.deselect_all();
            state.dialog.open = false;
            state.push_log(format!(
                "[INFO] Envío terminado: {succeeded} exitosas, {failed} fallidas de {sent}"
            ));
            let kind = if succeeded > 0 {
                ToastKind::Success
            } else {
                ToastKind::Error
            };
            state.show_toast(kind, format!("{succeeded}/{sent} solicitudes enviadas"));
        }
        Delta::ExportStarted { path } => {
            state.export = ExportState {
                active: true,
                done: false,
                path: Some(path),
                message: "Exportando".to_string(),
                last_updated: Some(Instant::now()),
            };
        }
        Delta::ExportFinished { path, rows, judges } => {
            state.export.done = true;
            state.export.message = format!("{rows} filas, {judges} jueces");
            state.export.last_updated = Some(Instant::now());
            state.push_log(format!("[INFO] Exportado {path} ({rows} filas)"));
            state.show_toast(ToastKind::Success, format!("Exportado a {path}"));
        }
        Delta::ExportFailed(message) => {
            state.export = ExportState::default();
            state.push_log(format!("[WARN] Exportación fallida: {message}"));
            state.show_toast(ToastKind::Error, "No se pudo exportar el cuadro");
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}

/// Route each screen stands for when the session guard runs.
pub fn screen_route(screen: Screen) -> &'static str {
    match screen {
        Screen::Login => LOGIN_ROUTE,
        Screen::Dashboard => DASHBOARD_ROUTE,
        Screen::Cuadro => "/dashboard/cuadro-anual",
        Screen::Judges => "/dashboard/estadisticas",
        Screen::Solicitudes => "/dashboard/solicitudes",
        Screen::Users => "/dashboard/usuarios",
    }
}

pub fn screen_label(screen: Screen) -> &'static str {
    match screen {
        Screen::Login => "LOGIN",
        Screen::Dashboard => "DASHBOARD",
        Screen::Cuadro => "CUADRO ANUAL",
        Screen::Judges => "JUECES",
        Screen::Solicitudes => "SOLICITUDES",
        Screen::Users => "USUARIOS",
    }
}

pub fn month_label(month: u32) -> &'static str {
    match month {
        1 => "Enero",
        2 => "Febrero",
        3 => "Marzo",
        4 => "Abril",
        5 => "Mayo",
        6 => "Junio",
        7 => "Julio",
        8 => "Agosto",
        9 => "Septiembre",
        10 => "Octubre",
        11 => "Noviembre",
        12 => "Diciembre",
        _ => "-",
    }
}
