use std::env;
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::{Datelike, Utc};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use judstat_terminal::auth_api::AuthContext;
use judstat_terminal::config::{self, AppConfig};
use judstat_terminal::fake_backend::{DEMO_EMAIL, DEMO_PASSWORD, DemoBackend};
use judstat_terminal::http_client::ReqwestTransport;
use judstat_terminal::persist::{FileStore, KeyValueStore, MemoryStore};
use judstat_terminal::session::SessionStore;
use judstat_terminal::stats_api;
use judstat_terminal::stats_view;
use judstat_terminal::transport::Transport;

/// Prints the cuadro anual for one period without the TUI.
///
/// Usage: `cuadro_report [year] [month] [filter]`
fn main() -> anyhow::Result<()> {
    config::load_dotenv();
    let cfg = AppConfig::from_env();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_new(&cfg.log_filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let today = Utc::now().date_naive();
    let mut args = env::args().skip(1);
    let year = match args.next() {
        Some(raw) => raw.parse::<i32>().context("year must be a number")?,
        None => today.year(),
    };
    let month = match args.next() {
        Some(raw) => raw.parse::<u32>().context("month must be a number")?,
        None => today.month(),
    };
    if !(1..=12).contains(&month) {
        bail!("month must be between 1 and 12, got {month}");
    }
    let filter = args.next().unwrap_or_default();

    // The demo backend issues fresh tokens per process, so a stored session is useless there.
    let store: Arc<dyn KeyValueStore> = if cfg.demo {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(FileStore::open(cfg.session_file()))
    };
    let session = Arc::new(SessionStore::new(store));
    let transport: Box<dyn Transport> = if cfg.demo {
        Box::new(DemoBackend::default())
    } else {
        Box::new(ReqwestTransport::new(&cfg.api_url, cfg.timeout_secs)?)
    };
    let auth = AuthContext::new(transport, Arc::clone(&session));

    if !auth.is_authenticated() {
        let (email, password) = if cfg.demo {
            (DEMO_EMAIL.to_string(), DEMO_PASSWORD.to_string())
        } else {
            (
                env::var("JUDSTAT_EMAIL")
                    .context("JUDSTAT_EMAIL is required without a stored session")?,
                env::var("JUDSTAT_PASSWORD")
                    .context("JUDSTAT_PASSWORD is required without a stored session")?,
            )
        };
        let env = auth
            .login(&email, &password)
            .map_err(|err| anyhow::anyhow!(err.user_message()))?;
        info!(user = %env.data.user.email, "logged in");
    }

    let cuadro = stats_api::fetch_cuadro_anual(auth.api(), year, month)
        .map_err(|err| anyhow::anyhow!(err.user_message()))?;
    let rows = stats_view::filter_rows(&cuadro.filas, &filter);
    let summary = stats_view::summarize_rows(&rows);

    println!("Cuadro anual {year}-{month:02} (consulta {})", cuadro.fecha_consulta);
    if !filter.is_empty() {
        println!("Filtro: {filter}");
    }
    println!(
        "filas={} resoluciones={} ingresos={} avance_promedio={:.2}% muy_bueno={} bueno={} regular={}",
        summary.total_rows,
        summary.total_resolutions,
        summary.total_income,
        summary.mean_advance,
        summary.very_good,
        summary.good,
        summary.regular
    );
    println!();
    for row in rows {
        println!(
            "{:<36} {:<28} res={:<6} ing={:<6} avance={:>7.2}% {}",
            row.instancia,
            row.modulo_nom,
            row.res_total,
            row.ing_total,
            row.pct_real_avance,
            row.nivel_prod
        );
        for judge in &row.jueces_objetos {
            let channel = if judge.l_mensaje { "msg" } else { "-" };
            println!("    {:<40} {:<14} {channel}", judge.nombre_completo, judge.telefono);
        }
    }
    Ok(())
}
