use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use tracing::{info, warn};

use crate::auth_api::{AuthContext, auth_failure_message};
use crate::cuadro_export;
use crate::solicitudes_api;
use crate::state::{Delta, ProviderCommand};
use crate::stats_api;
use crate::stats_view;
use crate::users_api;

const LOGIN_FAILED: &str = "Error en el login";
const REGISTER_FAILED: &str = "Error en el registro";

/// Runs backend commands one at a time on a worker thread.
pub fn spawn_provider(
    auth: AuthContext,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(cmd) = cmd_rx.recv() {
            handle_command(&auth, &tx, cmd);
            if auth.api().take_login_required() {
                let _ = tx.send(Delta::SessionExpired);
            }
        }
        info!("provider channel closed, worker exiting");
    })
}

pub fn handle_command(auth: &AuthContext, tx: &Sender<Delta>, cmd: ProviderCommand) {
    match cmd {
        ProviderCommand::Login { email, password } => match auth.login(&email, &password) {
            Ok(env) => {
                let _ = tx.send(Delta::LoggedIn {
                    user: env.data.user,
                    message: env
                        .message
                        .unwrap_or_else(|| "Inicio de sesión exitoso".to_string()),
                });
            }
            Err(err) => {
                warn!(error = %err, "login failed");
                let _ = tx.send(Delta::AuthFailed(auth_failure_message(&err, LOGIN_FAILED)));
            }
        },
        ProviderCommand::Register {
            name,
            email,
            password,
        } => match auth.register(&name, &email, &password, None) {
            Ok(env) => {
                let _ = tx.send(Delta::Registered {
                    user: env.data.user,
                    message: env
                        .message
                        .unwrap_or_else(|| "Registro exitoso".to_string()),
                });
            }
            Err(err) => {
                warn!(error = %err, "registration failed");
                let _ = tx.send(Delta::AuthFailed(auth_failure_message(
                    &err,
                    REGISTER_FAILED,
                )));
            }
        },
        ProviderCommand::Logout => {
            let env = auth.logout();
            let message = env
                .message
                .unwrap_or_else(|| "Sesión cerrada".to_string());
            let _ = tx.send(Delta::LoggedOut(message));
        }
        ProviderCommand::FetchCuadro { year, month } => {
            let period = (year, month);
            match stats_api::fetch_cuadro_anual(auth.api(), year, month) {
                Ok(cuadro) => {
                    let _ = tx.send(Delta::SetCuadro { period, cuadro });
                }
                Err(err) => {
                    let _ = tx.send(Delta::CuadroFailed {
                        period,
                        message: err.user_message(),
                    });
                }
            }
        }
        ProviderCommand::FetchJudges { year, month } => {
            match stats_api::fetch_jueces_con_meta(auth.api(), year, month) {
                Ok(judges) => {
                    let _ = tx.send(Delta::SetJudges {
                        period: (year, month),
                        judges,
                    });
                }
                Err(err) => {
                    let _ = tx.send(Delta::JudgesFailed(err.user_message()));
                }
            }
        }
        ProviderCommand::FetchSolicitudes => {
            match solicitudes_api::fetch_solicitudes(auth.api()) {
                Ok(items) => {
                    // Stats are optional; the list is still useful without them.
                    let stats = match solicitudes_api::fetch_solicitud_stats(auth.api()) {
                        Ok(stats) => Some(stats),
                        Err(err) => {
                            let _ = tx.send(Delta::Log(format!(
                                "[WARN] Estadísticas de solicitudes: {}",
                                err.user_message()
                            )));
                            None
                        }
                    };
                    let _ = tx.send(Delta::SetSolicitudes { items, stats });
                }
                Err(err) => {
                    let _ = tx.send(Delta::SolicitudesFailed(err.user_message()));
                }
            }
        }
        ProviderCommand::FetchUsers => match users_api::find_all(auth.api()) {
            Ok(env) => {
                let _ = tx.send(Delta::SetUsers(env.data));
            }
            Err(err) => {
                let _ = tx.send(Delta::UsersFailed(err.user_message()));
            }
        },
        ProviderCommand::SetUserActive { id, active } => {
            match users_api::toggle_active(auth.api(), id, active) {
                Ok(env) => {
                    let _ = tx.send(Delta::UserUpdated(env.data));
                }
                Err(err) => {
                    let _ = tx.send(Delta::UsersFailed(err.user_message()));
                }
            }
        }
        ProviderCommand::SubmitSelection {
            rows,
            mut selection,
            fields,
        } => {
            let total = selection.len();
            let _ = tx.send(Delta::BatchStarted { total });
            let report = solicitudes_api::submit_selection(
                auth.api(),
                &rows,
                &mut selection,
                &fields,
                |current, total, outcome| {
                    let _ = tx.send(Delta::BatchProgress {
                        current,
                        total,
                        success: outcome.success,
                    });
                    if !outcome.success {
                        let _ = tx.send(Delta::Log(format!(
                            "[WARN] Solicitud {current}/{total}: {}",
                            outcome.message
                        )));
                    }
                },
            );
            let _ = tx.send(Delta::BatchFinished {
                sent: report.total_sent,
                succeeded: report.total_succeeded,
                failed: report.total_failed,
            });
        }
        ProviderCommand::ExportCuadro { path, period, rows } => {
            let _ = tx.send(Delta::ExportStarted { path: path.clone() });
            let visible: Vec<_> = rows.iter().collect();
            let summary = stats_view::summarize_rows(&visible);
            match cuadro_export::export_cuadro(&PathBuf::from(&path), period, &visible, &summary) {
                Ok(report) => {
                    let _ = tx.send(Delta::ExportFinished {
                        path,
                        rows: report.rows,
                        judges: report.judges,
                    });
                }
                Err(err) => {
                    warn!(error = %err, "cuadro export failed");
                    let _ = tx.send(Delta::ExportFailed(err.to_string()));
                }
            }
        }
    }
}

