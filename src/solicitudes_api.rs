use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::stats_api::Fila;
use crate::stats_view::{MessageFields, Selection, build_requests};

pub const CREATED_MESSAGE: &str = "Solicitud creada exitosamente";
pub const CREATE_FAILED_MESSAGE: &str = "Error al crear solicitud";

/// Outbound message request. Absent fields are left out of the JSON body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateSolicitud {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encuesta: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefono: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
    #[serde(rename = "fechaEnvio", skip_serializing_if = "Option::is_none")]
    pub fecha_envio: Option<String>,
    #[serde(rename = "horaEnvio", skip_serializing_if = "Option::is_none")]
    pub hora_envio: Option<String>,
    #[serde(rename = "fechaCorte", skip_serializing_if = "Option::is_none")]
    pub fecha_corte: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub instancia: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modulo_nom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_preliminar: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nivel_prod: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pct_real_avance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub niv_bueno: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub niv_muy_bueno: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nombre_completo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefono_juez: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub l_mensaje: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sexo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prioridad: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolicitudOutcome {
    pub success: bool,
    pub message: String,
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub results: Vec<SolicitudOutcome>,
    pub total_sent: usize,
    pub total_succeeded: usize,
    pub total_failed: usize,
}

impl BatchReport {
    pub fn success(&self) -> bool {
        self.total_succeeded > 0
    }

    pub fn summary_line(&self) -> String {
        format!(
            "{}/{} solicitudes enviadas",
            self.total_succeeded, self.total_sent
        )
    }
}

/// Stored solicitud as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solicitud {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub nombre_completo: Option<String>,
    #[serde(default)]
    pub instancia: Option<String>,
    #[serde(default)]
    pub estado: Option<String>,
    #[serde(default)]
    pub prioridad: Option<String>,
    #[serde(default, rename = "fechaEnvio")]
    pub fecha_envio: Option<String>,
    #[serde(default, rename = "horaEnvio")]
    pub hora_envio: Option<String>,
    #[serde(default)]
    pub telefono_juez: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolicitudStats {
    #[serde(default)]
    pub total: i64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Never fails: a rejected call becomes an unsuccessful outcome.
pub fn create_solicitud(api: &ApiClient, dto: &CreateSolicitud) -> SolicitudOutcome {
    match api.post::<_, Value>("/solicitudes", dto) {
        Ok(env) => SolicitudOutcome {
            success: true,
            message: CREATED_MESSAGE.to_string(),
            data: Some(env.data),
        },
        Err(err) => {
            warn!(error = %err, judge = ?dto.nombre_completo, "create solicitud failed");
            SolicitudOutcome {
                success: false,
                message: err
                    .backend_message()
                    .unwrap_or(CREATE_FAILED_MESSAGE)
                    .to_string(),
                data: None,
            }
        }
    }
}

/// Sends each request in order, waiting for one before the next.
pub fn create_many(
    api: &ApiClient,
    dtos: &[CreateSolicitud],
    mut on_progress: impl FnMut(usize, usize, &SolicitudOutcome),
) -> BatchReport {
    let total = dtos.len();
    let mut report = BatchReport {
        results: Vec::with_capacity(total),
        total_sent: total,
        ..BatchReport::default()
    };
    for (idx, dto) in dtos.iter().enumerate() {
        debug!(current = idx + 1, total, judge = ?dto.nombre_completo, "sending solicitud");
        let outcome = create_solicitud(api, dto);
        if outcome.success {
            report.total_succeeded += 1;
        } else {
            report.total_failed += 1;
        }
        on_progress(idx + 1, total, &outcome);
        report.results.push(outcome);
    }
    info!(
        sent = report.total_sent,
        succeeded = report.total_succeeded,
        failed = report.total_failed,
        "solicitud batch finished"
    );
    report
}

/// Builds one request per selected judge, submits them, then empties the selection.
pub fn submit_selection<R: AsRef<Fila>>(
    api: &ApiClient,
    rows: &[R],
    selection: &mut Selection,
    fields: &MessageFields,
    on_progress: impl FnMut(usize, usize, &SolicitudOutcome),
) -> BatchReport {
    let dtos = build_requests(rows, selection, fields);
    let report = create_many(api, &dtos, on_progress);
    selection.deselect_all();
    report
}

pub fn fetch_solicitudes(api: &ApiClient) -> ApiResult<Vec<Solicitud>> {
    let env = api.get::<Value>("/solicitudes")?;
    if env.data.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(env.data)
        .map_err(|err| ApiError::Decode(format!("invalid solicitudes: {err}")))
}

pub fn fetch_solicitud_stats(api: &ApiClient) -> ApiResult<SolicitudStats> {
    let env = api.get::<Value>("/solicitudes/estadisticas")?;
    if env.data.is_null() {
        return Ok(SolicitudStats::default());
    }
    serde_json::from_value(env.data)
        .map_err(|err| ApiError::Decode(format!("invalid solicitud stats: {err}")))
}
