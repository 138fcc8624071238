use std::fs::{self, OpenOptions};
use std::io;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use judstat_terminal::auth_api::AuthContext;
use judstat_terminal::config::{self, AppConfig};
use judstat_terminal::cuadro_export;
use judstat_terminal::fake_backend::DemoBackend;
use judstat_terminal::http_client::ReqwestTransport;
use judstat_terminal::persist::{FileStore, KeyValueStore};
use judstat_terminal::provider;
use judstat_terminal::session::{DASHBOARD_ROUTE, RouteDecision, SessionStore, guard_route};
use judstat_terminal::state::{
    AppState, DIALOG_FIELDS, Delta, LoginField, MessageDialog, ProviderCommand, Screen,
    ToastKind, apply_delta, month_label, screen_label,
};
use judstat_terminal::stats_api::Fila;
use judstat_terminal::stats_view::SortDirection;
use judstat_terminal::transport::Transport;

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
    session: Arc<SessionStore>,
}

impl App {
    fn new(
        cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
        session: Arc<SessionStore>,
        cfg: &AppConfig,
    ) -> Self {
        let mut state = AppState::new();
        state.dialog = MessageDialog::new(
            &cfg.survey_url,
            &cfg.contact_phone,
            &cfg.whatsapp,
            Utc::now().date_naive(),
        );
        Self {
            state,
            should_quit: false,
            cmd_tx,
            session,
        }
    }

    fn go(&mut self, target: Screen) -> bool {
        let jar = self.session.cookies();
        self.state.navigate(target, &jar, Utc::now())
    }

    fn send(&mut self, cmd: ProviderCommand, what: &str) -> bool {
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log(format!("[INFO] {what} unavailable"));
            return false;
        };
        if tx.send(cmd).is_err() {
            self.state.push_log(format!("[WARN] {what} request failed"));
            return false;
        }
        true
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.help_overlay {
            if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc) {
                self.state.help_overlay = false;
            }
            return;
        }
        if self.state.screen == Screen::Login {
            self.on_login_key(key);
            return;
        }
        if self.state.dialog.open {
            self.on_dialog_key(key);
            return;
        }
        if self.state.filter_active {
            self.on_filter_key(key);
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = true,
            KeyCode::Char('1') => {
                self.go(Screen::Dashboard);
            }
            KeyCode::Char('2') => {
                if self.go(Screen::Cuadro)
                    && self.state.rows.is_empty()
                    && !self.state.cuadro_loading
                {
                    self.request_cuadro();
                }
            }
            KeyCode::Char('3') => {
                if self.go(Screen::Judges)
                    && self.state.judges.is_empty()
                    && !self.state.judges_loading
                {
                    self.request_judges();
                }
            }
            KeyCode::Char('4') => {
                if self.go(Screen::Solicitudes) {
                    self.request_solicitudes();
                }
            }
            KeyCode::Char('5') => {
                if self.state.is_admin() {
                    if self.go(Screen::Users) {
                        self.request_users();
                    }
                } else {
                    self.state
                        .show_toast(ToastKind::Info, "Solo administradores pueden ver usuarios");
                }
            }
            KeyCode::Char('/') => {
                if self.state.active_filter_mut().is_some() {
                    self.state.filter_active = true;
                }
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_down(),
            KeyCode::Char('k') | KeyCode::Up => self.move_up(),
            KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => {
                if self.state.screen == Screen::Cuadro {
                    self.state.select_next_judge();
                }
            }
            KeyCode::Char(' ') => {
                if self.state.screen == Screen::Cuadro {
                    self.state.toggle_at_cursor();
                }
            }
            KeyCode::Char('a') => {
                if self.state.screen == Screen::Cuadro {
                    self.state.select_all_visible();
                }
            }
            KeyCode::Char('A') => {
                if self.state.screen == Screen::Cuadro {
                    self.state.deselect_all();
                }
            }
            KeyCode::Char('o') => {
                if self.state.screen == Screen::Cuadro {
                    self.state.selected_first = !self.state.selected_first;
                    self.state.clamp_cursor();
                }
            }
            KeyCode::Char('m') => self.open_dialog(),
            KeyCode::Char('r') => self.reload(),
            KeyCode::Char('[') => self.shift_period(-1),
            KeyCode::Char(']') => self.shift_period(1),
            KeyCode::Char('x') => self.request_export(),
            KeyCode::Char('L') => {
                self.send(ProviderCommand::Logout, "Logout");
            }
            KeyCode::Char('s') if self.state.screen == Screen::Judges => {
                self.state.cycle_judge_sort()
            }
            KeyCode::Char('S') if self.state.screen == Screen::Judges => {
                self.state.flip_judge_dir()
            }
            KeyCode::Char('t') if self.state.screen == Screen::Users => self.toggle_user_active(),
            _ => {}
        }
    }

    fn on_login_key(&mut self, key: KeyEvent) {
        if self.state.login.submitting {
            if key.code == KeyCode::Esc {
                self.should_quit = true;
            }
            return;
        }
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::Down => self.state.login.next_field(),
            KeyCode::F(2) => self.state.login.toggle_mode(),
            KeyCode::Backspace => {
                self.state.login.focused_mut().pop();
            }
            KeyCode::Enter => self.submit_login(),
            KeyCode::Char(c) => self.state.login.focused_mut().push(c),
            _ => {}
        }
    }

    fn submit_login(&mut self) {
        if let Some(problem) = self.state.login.validate() {
            self.state.login.error = Some(problem.to_string());
            return;
        }
        let form = self.state.login.clone();
        let cmd = if form.register_mode {
            ProviderCommand::Register {
                name: form.name,
                email: form.email,
                password: form.password,
            }
        } else {
            ProviderCommand::Login {
                email: form.email,
                password: form.password,
            }
        };
        if self.send(cmd, "Login") {
            self.state.login.submitting = true;
            self.state.login.error = None;
        }
    }

    fn on_dialog_key(&mut self, key: KeyEvent) {
        if self.state.batch.active {
            return;
        }
        match key.code {
            KeyCode::Esc => self.state.dialog.open = false,
            KeyCode::Tab | KeyCode::Down => self.state.dialog.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.state.dialog.prev_field(),
            KeyCode::Backspace => {
                self.state.dialog.focused_mut().pop();
            }
            KeyCode::Enter => self.submit_batch(),
            KeyCode::Char(c) => self.state.dialog.focused_mut().push(c),
            _ => {}
        }
    }

    fn on_filter_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => self.state.filter_active = false,
            KeyCode::Backspace => self.edit_filter(|f| {
                f.pop();
            }),
            KeyCode::Char(c) => self.edit_filter(|f| f.push(c)),
            _ => {}
        }
    }

    fn edit_filter(&mut self, edit: impl FnOnce(&mut String)) {
        match self.state.screen {
            Screen::Cuadro => {
                let mut filter = self.state.filter.clone();
                edit(&mut filter);
                self.state.set_filter(filter);
            }
            Screen::Judges => {
                edit(&mut self.state.judge_filter);
                self.state.judge_selected = 0;
            }
            _ => {}
        }
    }

    fn move_down(&mut self) {
        match self.state.screen {
            Screen::Cuadro => self.state.select_next_row(),
            Screen::Judges => {
                let total = self.state.visible_judges().len();
                if total > 0 {
                    self.state.judge_selected = (self.state.judge_selected + 1).min(total - 1);
                }
            }
            Screen::Solicitudes => {
                let total = self.state.solicitudes.len();
                if total > 0 {
                    self.state.solicitud_scroll = (self.state.solicitud_scroll + 1).min(total - 1);
                }
            }
            Screen::Users => {
                let total = self.state.users.len();
                if total > 0 {
                    self.state.user_selected = (self.state.user_selected + 1).min(total - 1);
                }
            }
            _ => {}
        }
    }

    fn move_up(&mut self) {
        match self.state.screen {
            Screen::Cuadro => self.state.select_prev_row(),
            Screen::Judges => {
                self.state.judge_selected = self.state.judge_selected.saturating_sub(1)
            }
            Screen::Solicitudes => {
                self.state.solicitud_scroll = self.state.solicitud_scroll.saturating_sub(1)
            }
            Screen::Users => self.state.user_selected = self.state.user_selected.saturating_sub(1),
            _ => {}
        }
    }

    fn open_dialog(&mut self) {
        if self.state.screen != Screen::Cuadro {
            return;
        }
        if self.state.selection.is_empty() {
            self.state
                .show_toast(ToastKind::Info, "Seleccione al menos un juez con canal de mensaje");
            return;
        }
        self.state.dialog.open = true;
        self.state.dialog.focus = 0;
    }

    fn submit_batch(&mut self) {
        let fields = match self.state.dialog.to_fields() {
            Ok(fields) => fields,
            Err(problem) => {
                self.state.show_toast(ToastKind::Error, problem);
                return;
            }
        };
        let rows: Vec<Fila> = self.state.filtered_rows().into_iter().cloned().collect();
        let cmd = ProviderCommand::SubmitSelection {
            rows,
            selection: self.state.selection.clone(),
            fields,
        };
        if self.send(cmd, "Envío de solicitudes") {
            self.state.batch.active = true;
            self.state.batch.total = self.state.selection.len();
        }
    }

    fn request_cuadro(&mut self) {
        let (year, month) = self.state.period;
        if self.send(ProviderCommand::FetchCuadro { year, month }, "Cuadro") {
            self.state.cuadro_loading = true;
        }
    }

    fn request_judges(&mut self) {
        let (year, month) = self.state.period;
        if self.send(ProviderCommand::FetchJudges { year, month }, "Jueces") {
            self.state.judges_loading = true;
        }
    }

    fn request_solicitudes(&mut self) {
        if self.send(ProviderCommand::FetchSolicitudes, "Solicitudes") {
            self.state.solicitudes_loading = true;
        }
    }

    fn request_users(&mut self) {
        if self.send(ProviderCommand::FetchUsers, "Usuarios") {
            self.state.users_loading = true;
        }
    }

    fn reload(&mut self) {
        match self.state.screen {
            Screen::Dashboard | Screen::Cuadro => self.request_cuadro(),
            Screen::Judges => self.request_judges(),
            Screen::Solicitudes => self.request_solicitudes(),
            Screen::Users => self.request_users(),
            Screen::Login => {}
        }
    }

    fn shift_period(&mut self, months: i32) {
        if !matches!(
            self.state.screen,
            Screen::Dashboard | Screen::Cuadro | Screen::Judges
        ) {
            return;
        }
        self.state.shift_period(months);
        self.state.judges.clear();
        match self.state.screen {
            Screen::Judges => self.request_judges(),
            _ => self.request_cuadro(),
        }
    }

    fn request_export(&mut self) {
        if self.state.screen != Screen::Cuadro {
            return;
        }
        let rows: Vec<Fila> = self.state.filtered_rows().into_iter().cloned().collect();
        if rows.is_empty() {
            self.state.push_log("[INFO] Nada que exportar");
            return;
        }
        let period = self.state.period;
        let path = cuadro_export::default_export_name(period);
        self.send(ProviderCommand::ExportCuadro { path, period, rows }, "Export");
    }

    fn toggle_user_active(&mut self) {
        if !self.state.is_admin() {
            return;
        }
        let Some(user) = self.state.users.get(self.state.user_selected) else {
            return;
        };
        let cmd = ProviderCommand::SetUserActive {
            id: user.id,
            active: !user.is_active,
        };
        self.send(cmd, "Usuario");
    }

    fn on_delta(&mut self, delta: Delta) {
        let logged_in = matches!(delta, Delta::LoggedIn { .. } | Delta::Registered { .. });
        apply_delta(&mut self.state, delta);
        if logged_in {
            self.request_cuadro();
        }
    }
}

fn init_tracing(cfg: &AppConfig) {
    if let Some(dir) = cfg.log_file.parent() {
        let _ = fs::create_dir_all(dir);
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&cfg.log_file)
    else {
        return;
    };
    let filter = EnvFilter::try_new(&cfg.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn main() -> io::Result<()> {
    config::load_dotenv();
    let cfg = AppConfig::from_env();
    init_tracing(&cfg);

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(cfg.session_file()));
    let session = Arc::new(SessionStore::new(store));
    let transport: Box<dyn Transport> = if cfg.demo {
        info!("serving requests from the demo backend");
        Box::new(DemoBackend::default())
    } else {
        match ReqwestTransport::new(&cfg.api_url, cfg.timeout_secs) {
            Ok(transport) => Box::new(transport),
            Err(err) => {
                eprintln!("error: {err:#}");
                return Ok(());
            }
        }
    };
    let start = guard_route(DASHBOARD_ROUTE, &session.cookies(), Utc::now());
    let stored_user = session.user();
    let auth = AuthContext::new(transport, Arc::clone(&session));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let _worker = provider::spawn_provider(auth, tx, cmd_rx);

    let mut app = App::new(Some(cmd_tx), Arc::clone(&session), &cfg);
    if cfg.demo {
        app.state.push_log("[INFO] Modo demo: admin@demo.pj / demo123");
    }
    match (start, stored_user) {
        (RouteDecision::Allow, Some(user)) => {
            info!(user = %user.email, "resuming stored session");
            app.state.user = Some(user);
            app.state.screen = Screen::Dashboard;
            app.request_cuadro();
        }
        (decision, _) => {
            if decision != RouteDecision::Allow {
                info!(?decision, "no valid session, showing login");
            } else {
                warn!("session cookie without stored user, showing login");
            }
            app.state.screen = Screen::Login;
        }
    }

    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            app.on_delta(delta);
        }
        app.state.maybe_clear_toast(Instant::now());

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match app.state.screen {
        Screen::Login => render_login(frame, chunks[1], &app.state),
        Screen::Dashboard => render_dashboard(frame, chunks[1], &app.state),
        Screen::Cuadro => render_cuadro(frame, chunks[1], &app.state),
        Screen::Judges => render_judges(frame, chunks[1], &app.state),
        Screen::Solicitudes => render_solicitudes(frame, chunks[1], &app.state),
        Screen::Users => render_users(frame, chunks[1], &app.state),
    }

    render_footer(frame, chunks[2], &app.state);

    if app.state.dialog.open {
        render_dialog(frame, frame.size(), &app.state);
    }
    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let (year, month) = state.period;
    let user = state
        .user
        .as_ref()
        .map(|u| format!("{} ({})", u.name, u.role))
        .unwrap_or_else(|| "sin sesión".to_string());
    let line1 = format!(
        "  |=|  JUDSTAT | {} | {} {} | {}",
        screen_label(state.screen),
        month_label(month),
        year,
        user
    );
    let line2 = " /___\\".to_string();
    format!("{line1}\n{line2}")
}

fn render_footer(frame: &mut Frame, area: Rect, state: &AppState) {
    if let Some(toast) = &state.toast {
        let color = match toast.kind {
            ToastKind::Success => Color::Green,
            ToastKind::Error => Color::Red,
            ToastKind::Info => Color::Cyan,
        };
        let widget = Paragraph::new(toast.message.as_str())
            .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::TOP));
        frame.render_widget(widget, area);
        return;
    }
    let widget = Paragraph::new(footer_text(state)).block(Block::default().borders(Borders::TOP));
    frame.render_widget(widget, area);
}

fn footer_text(state: &AppState) -> String {
    if state.filter_active {
        return format!("Filtro: {}_ | Enter/Esc terminar", current_filter(state));
    }
    match state.screen {
        Screen::Login => "Tab Campo | Enter Ingresar | F2 Login/Registro | Esc Salir".to_string(),
        Screen::Dashboard => {
            "1-5 Pantallas | [ ] Mes | r Recargar | L Logout | ? Ayuda | q Salir".to_string()
        }
        Screen::Cuadro => concat!(
            "/ Filtro | j/k Fila | Tab Juez | Espacio Marcar | a/A Todos/Ninguno | ",
            "o Marcados primero | m Mensaje | x Exportar | ? Ayuda"
        )
        .to_string(),
        Screen::Judges => {
            "/ Filtro | j/k Mover | s Ordenar | S Dirección | [ ] Mes | r Recargar | ? Ayuda"
                .to_string()
        }
        Screen::Solicitudes => "j/k Desplazar | r Recargar | ? Ayuda | q Salir".to_string(),
        Screen::Users => "j/k Mover | t Activar/Desactivar | r Recargar | ? Ayuda".to_string(),
    }
}

fn current_filter(state: &AppState) -> &str {
    match state.screen {
        Screen::Judges => &state.judge_filter,
        _ => &state.filter,
    }
}

fn render_login(frame: &mut Frame, area: Rect, state: &AppState) {
    let popup = centered_rect(50, 60, area);
    let form = &state.login;
    let title = if form.register_mode {
        "Registro"
    } else {
        "Iniciar sesión"
    };
    let mut lines = Vec::new();
    let field_line = |label: &str, value: String, focused: bool| {
        let marker = if focused { ">" } else { " " };
        format!("{marker} {label:<11} {value}")
    };
    if form.register_mode {
        lines.push(field_line(
            "Nombre",
            form.name.clone(),
            form.focus == LoginField::Name,
        ));
    }
    lines.push(field_line(
        "Email",
        form.email.clone(),
        form.focus == LoginField::Email,
    ));
    lines.push(field_line(
        "Contraseña",
        "*".repeat(form.password.chars().count()),
        form.focus == LoginField::Password,
    ));
    lines.push(String::new());
    if form.submitting {
        lines.push("Conectando...".to_string());
    } else if let Some(err) = &form.error {
        lines.push(format!("! {err}"));
    }
    lines.push(String::new());
    lines.extend(state.logs.iter().rev().take(3).rev().cloned());

    frame.render_widget(Clear, popup);
    let widget = Paragraph::new(lines.join("\n"))
        .block(Block::default().title(title).borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, popup);
}

fn render_dashboard(frame: &mut Frame, area: Rect, state: &AppState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(8)])
        .split(area);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(sections[0]);

    let summary = state.summary();
    let cuadro = if state.cuadro_loading {
        "Cargando cuadro...".to_string()
    } else {
        [
            format!("Filas:              {}", summary.total_rows),
            format!("Total resoluciones: {}", summary.total_resolutions),
            format!("Total ingresos:     {}", summary.total_income),
            format!("Promedio avance:    {:.2}%", summary.mean_advance),
            format!("MUY BUENO:          {}", summary.very_good),
            format!("BUENO:              {}", summary.good),
            format!("REGULAR:            {}", summary.regular),
        ]
        .join("\n")
    };
    frame.render_widget(
        Paragraph::new(cuadro).block(Block::default().title("Cuadro anual").borders(Borders::ALL)),
        columns[0],
    );

    let judges = state.judge_summary();
    let mut right = vec![
        format!("Jueces cargados:   {}", judges.total),
        format!("Con meta:          {}", judges.with_goal),
        format!("Avance promedio:   {:.2}%", judges.mean_advance),
        format!("Seleccionados:     {}", state.selection.len()),
    ];
    if let Some(stats) = &state.solicitud_stats {
        right.push(format!("Solicitudes:       {}", stats.total));
    }
    if state.export.active {
        right.push(format!(
            "Export: {} {}",
            state.export.path.as_deref().unwrap_or("-"),
            state.export.message
        ));
    }
    frame.render_widget(
        Paragraph::new(right.join("\n"))
            .block(Block::default().title("Resumen").borders(Borders::ALL)),
        columns[1],
    );

    frame.render_widget(
        Paragraph::new(console_text(state, sections[1].height.saturating_sub(2) as usize))
            .block(Block::default().title("Consola").borders(Borders::ALL)),
        sections[1],
    );
}

fn cuadro_columns() -> [Constraint; 8] {
    [
        Constraint::Min(24),
        Constraint::Length(30),
        Constraint::Length(7),
        Constraint::Length(7),
        Constraint::Length(7),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(10),
    ]
}

fn render_cuadro(frame: &mut Frame, area: Rect, state: &AppState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(area);

    let summary = state.summary();
    let status = format!(
        "{} filas | Res {} | Ing {} | Avance {:.2}% | MB {} B {} R {} | Marcados {}{}{}",
        summary.total_rows,
        summary.total_resolutions,
        summary.total_income,
        summary.mean_advance,
        summary.very_good,
        summary.good,
        summary.regular,
        state.selection.len(),
        if state.selected_first {
            " | marcados primero"
        } else {
            ""
        },
        if state.filter.is_empty() {
            String::new()
        } else {
            format!(" | filtro \"{}\"", state.filter)
        }
    );
    render_cell_text(frame, sections[0], &status, Style::default().fg(Color::Cyan));

    let widths = cuadro_columns();
    render_header_row(
        frame,
        sections[1],
        &widths,
        &["Instancia", "Juez", "Res", "Ing", "Meta", "%Real", "%Ideal", "Nivel"],
    );

    let list_area = sections[2];
    if state.cuadro_loading {
        render_empty(frame, list_area, "Cargando...");
        return;
    }
    let rows = state.display_rows();
    if rows.is_empty() {
        render_empty(frame, list_area, "Sin filas para este periodo o filtro");
        return;
    }

    let lines = cuadro_lines(&rows);
    let cursor_line = lines
        .iter()
        .position(|(r, j)| *r == state.cursor_row && j.unwrap_or(0) == state.cursor_judge)
        .unwrap_or(0);
    let (start, end) = visible_range(cursor_line, lines.len(), list_area.height as usize);

    for (i, line_idx) in (start..end).enumerate() {
        let (row_idx, judge_idx) = lines[line_idx];
        let row = rows[row_idx];
        let line_area = Rect {
            x: list_area.x,
            y: list_area.y + i as u16,
            width: list_area.width,
            height: 1,
        };
        let on_cursor = line_idx == cursor_line;
        let style = if on_cursor {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        if on_cursor {
            frame.render_widget(Block::default().style(style), line_area);
        }
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(widths)
            .split(line_area);

        let first = judge_idx.is_none_or(|j| j == 0);
        let judge_text = match judge_idx.and_then(|j| row.jueces_objetos.get(j)) {
            Some(judge) => {
                let mark = if !judge.l_mensaje {
                    "[-]"
                } else if state.selection.is_selected(row, judge) {
                    "[x]"
                } else {
                    "[ ]"
                };
                format!("{mark} {}", judge.nombre_completo)
            }
            None => row.jueces.clone(),
        };
        render_cell_text(frame, cols[1], &judge_text, style);
        if !first {
            continue;
        }
        render_cell_text(frame, cols[0], &row.instancia, style);
        render_cell_text(frame, cols[2], &row.res_total.to_string(), style);
        render_cell_text(frame, cols[3], &row.ing_total.to_string(), style);
        render_cell_text(frame, cols[4], &format!("{:.0}", row.meta_preliminar), style);
        render_cell_text(frame, cols[5], &format!("{:.2}", row.pct_real_avance), style);
        render_cell_text(frame, cols[6], &format!("{:.2}", row.pct_ideal_avance), style);
        render_cell_text(frame, cols[7], &row.nivel_prod, style.fg(level_color(&row.nivel_prod)));
    }
}

/// One display line per judge; rows without judges get a single line.
fn cuadro_lines(rows: &[&Fila]) -> Vec<(usize, Option<usize>)> {
    let mut lines = Vec::new();
    for (row_idx, row) in rows.iter().enumerate() {
        if row.jueces_objetos.is_empty() {
            lines.push((row_idx, None));
        }
        for judge_idx in 0..row.jueces_objetos.len() {
            lines.push((row_idx, Some(judge_idx)));
        }
    }
    lines
}

fn render_judges(frame: &mut Frame, area: Rect, state: &AppState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(area);

    let stats = state.judge_summary();
    let status = format!(
        "{} jueces | con meta {} | avance {:.2}% | MB {} B {} R {} | orden {} {}",
        stats.total,
        stats.with_goal,
        stats.mean_advance,
        stats.very_good,
        stats.good,
        stats.regular,
        state.judge_sort.label(),
        match state.judge_dir {
            SortDirection::Asc => "↑",
            SortDirection::Desc => "↓",
        }
    );
    render_cell_text(frame, sections[0], &status, Style::default().fg(Color::Cyan));

    let widths = [
        Constraint::Min(26),
        Constraint::Length(28),
        Constraint::Length(9),
        Constraint::Length(10),
        Constraint::Length(9),
        Constraint::Length(8),
        Constraint::Length(4),
    ];
    render_header_row(
        frame,
        sections[1],
        &widths,
        &["Juez", "Instancia", "Avance", "Nivel", "Resueltos", "Meta", "Msg"],
    );

    let list_area = sections[2];
    if state.judges_loading {
        render_empty(frame, list_area, "Cargando...");
        return;
    }
    let judges = state.visible_judges();
    if judges.is_empty() {
        render_empty(frame, list_area, "Sin jueces para este periodo o filtro");
        return;
    }
    let (start, end) = visible_range(state.judge_selected, judges.len(), list_area.height as usize);
    for (i, idx) in (start..end).enumerate() {
        let judge = judges[idx];
        let line_area = Rect {
            x: list_area.x,
            y: list_area.y + i as u16,
            width: list_area.width,
            height: 1,
        };
        let style = if idx == state.judge_selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        if idx == state.judge_selected {
            frame.render_widget(Block::default().style(style), line_area);
        }
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(widths)
            .split(line_area);
        let advance = if judge.tiene_meta_resumen {
            format!("{:.2}%", judge.advance())
        } else {
            "sin meta".to_string()
        };
        render_cell_text(frame, cols[0], &judge.full_name(), style);
        render_cell_text(frame, cols[1], &judge.x_nom_instancia, style);
        render_cell_text(frame, cols[2], &advance, style);
        let level_style = style.fg(level_color(&judge.x_niv_produc));
        render_cell_text(frame, cols[3], &judge.x_niv_produc, level_style);
        render_cell_text(frame, cols[4], &format!("{:.0}", judge.m_t_resuelto), style);
        render_cell_text(frame, cols[5], &format!("{:.0}", judge.m_meta_preliminar), style);
        render_cell_text(frame, cols[6], if judge.l_mensaje { "SÍ" } else { "NO" }, style);
    }
}

fn render_solicitudes(frame: &mut Frame, area: Rect, state: &AppState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);
    let status = match &state.solicitud_stats {
        Some(stats) => {
            let extra = stats
                .extra
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect::<Vec<_>>()
                .join(" | ");
            format!("Total {} | {extra}", stats.total)
        }
        None => format!("{} solicitudes", state.solicitudes.len()),
    };
    render_cell_text(frame, sections[0], &status, Style::default().fg(Color::Cyan));

    if state.solicitudes_loading {
        render_empty(frame, sections[1], "Cargando...");
        return;
    }
    if state.solicitudes.is_empty() {
        render_empty(frame, sections[1], "No hay solicitudes registradas");
        return;
    }
    let text = state
        .solicitudes
        .iter()
        .skip(state.solicitud_scroll)
        .map(|s| {
            format!(
                "#{:<5} {:<32} {:<12} {:<8} {}",
                s.id.map(|id| id.to_string()).unwrap_or_default(),
                s.nombre_completo.as_deref().unwrap_or("-"),
                s.estado.as_deref().unwrap_or("-"),
                s.prioridad.as_deref().unwrap_or("-"),
                s.instancia.as_deref().unwrap_or("-"),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    frame.render_widget(
        Paragraph::new(text).block(Block::default().borders(Borders::ALL)),
        sections[1],
    );
}

fn render_users(frame: &mut Frame, area: Rect, state: &AppState) {
    if state.users_loading && state.users.is_empty() {
        render_empty(frame, area, "Cargando...");
        return;
    }
    let visible = area.height.saturating_sub(2) as usize;
    let (start, end) = visible_range(state.user_selected, state.users.len(), visible);
    let lines = (start..end)
        .map(|idx| {
            let user = &state.users[idx];
            let marker = if idx == state.user_selected { ">" } else { " " };
            format!(
                "{marker} {:<4} {:<28} {:<32} {:<8} {}",
                user.id,
                user.name,
                user.email,
                user.role,
                if user.is_active { "activo" } else { "inactivo" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().title("Usuarios").borders(Borders::ALL)),
        area,
    );
}

fn render_dialog(frame: &mut Frame, area: Rect, state: &AppState) {
    let popup = centered_rect(60, 50, area);
    frame.render_widget(Clear, popup);
    let dialog = &state.dialog;
    let mut lines = vec![
        format!("Destinatarios: {} juez(es)", state.selection.len()),
        String::new(),
    ];
    for (idx, label) in DIALOG_FIELDS.iter().enumerate() {
        let marker = if idx == dialog.focus { ">" } else { " " };
        lines.push(format!("{marker} {label:<15} {}", dialog.values[idx]));
    }
    lines.push(String::new());
    if state.batch.active {
        lines.push(format!(
            "Enviando {}/{} (fallidas {})",
            state.batch.current, state.batch.total, state.batch.failed
        ));
    } else {
        lines.push("Enter enviar | Tab campo | Esc cancelar".to_string());
    }
    frame.render_widget(
        Paragraph::new(lines.join("\n"))
            .block(Block::default().title("Enviar mensaje").borders(Borders::ALL)),
        popup,
    );
}

fn render_header_row(frame: &mut Frame, area: Rect, widths: &[Constraint], labels: &[&str]) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(widths.to_vec())
        .split(area);
    let style = Style::default().add_modifier(Modifier::BOLD);
    for (idx, label) in labels.iter().enumerate() {
        if let Some(col) = cols.get(idx) {
            render_cell_text(frame, *col, label, style);
        }
    }
}

fn render_cell_text(frame: &mut Frame, area: Rect, text: &str, style: Style) {
    let text_area = Rect {
        x: area.x,
        y: area.y + (area.height / 2),
        width: area.width,
        height: 1,
    };
    let paragraph = Paragraph::new(text).style(style);
    frame.render_widget(paragraph, text_area);
}

fn render_empty(frame: &mut Frame, area: Rect, text: &str) {
    let empty = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(empty, area);
}

fn level_color(level: &str) -> Color {
    match level.trim() {
        "MUY BUENO" => Color::Green,
        "BUENO" => Color::LightGreen,
        "REGULAR" => Color::Yellow,
        "" => Color::DarkGray,
        _ => Color::Red,
    }
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn console_text(state: &AppState, lines: usize) -> String {
    if state.logs.is_empty() {
        return "Sin eventos".to_string();
    }
    let skip = state.logs.len().saturating_sub(lines.max(1));
    state
        .logs
        .iter()
        .skip(skip)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "JUDSTAT - Ayuda",
        "",
        "Global:",
        "  1-5          Dashboard / Cuadro / Jueces / Solicitudes / Usuarios",
        "  [ / ]        Mes anterior / siguiente",
        "  r            Recargar",
        "  L            Cerrar sesión",
        "  ?            Ayuda",
        "  q            Salir",
        "",
        "Cuadro:",
        "  /            Filtrar por juez",
        "  j/k, Tab     Fila / juez",
        "  Espacio      Marcar juez",
        "  a / A        Marcar todos / ninguno",
        "  o            Marcados primero",
        "  m            Enviar mensaje",
        "  x            Exportar a xlsx",
        "",
        "Jueces:",
        "  s / S        Campo de orden / dirección",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Ayuda").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
