use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::api::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::stats_view::{JudgeSummaryStats, summarize_judges};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductionLevel {
    VeryGood,
    Good,
    Regular,
    Other,
}

impl ProductionLevel {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "MUY BUENO" => ProductionLevel::VeryGood,
            "BUENO" => ProductionLevel::Good,
            "REGULAR" => ProductionLevel::Regular,
            _ => ProductionLevel::Other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProductionLevel::VeryGood => "MUY BUENO",
            ProductionLevel::Good => "BUENO",
            ProductionLevel::Regular => "REGULAR",
            ProductionLevel::Other => "-",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeRecord {
    #[serde(default, alias = "n_id_juez")]
    pub id: Option<i64>,
    #[serde(default)]
    pub nombre_completo: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub telefono: String,
    #[serde(default, deserialize_with = "flag")]
    pub l_mensaje: bool,
    #[serde(default, deserialize_with = "string_or_null")]
    pub sexo: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthCell {
    #[serde(default, deserialize_with = "number")]
    pub val: f64,
    #[serde(default, deserialize_with = "string_or_null")]
    pub nivel: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub cls: String,
}

/// One jurisdiction/instance row of the annual table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fila {
    #[serde(default, deserialize_with = "string_or_null")]
    pub org_jurisd: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub instancia: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub jueces: String,
    #[serde(default)]
    pub jueces_objetos: Vec<JudgeRecord>,
    #[serde(default, deserialize_with = "integer")]
    pub res_total: i64,
    #[serde(default, deserialize_with = "integer")]
    pub ing_total: i64,
    #[serde(default, deserialize_with = "number")]
    pub meta_preliminar: f64,
    #[serde(default, deserialize_with = "number")]
    pub estandar: f64,
    #[serde(default, deserialize_with = "number")]
    pub carga_inicial: f64,
    #[serde(default, deserialize_with = "number")]
    pub pct_real_avance: f64,
    #[serde(default, deserialize_with = "number")]
    pub pct_ideal_avance: f64,
    #[serde(default, deserialize_with = "string_or_null")]
    pub nivel_prod: String,
    #[serde(default, deserialize_with = "number")]
    pub niv_bueno: f64,
    #[serde(default, deserialize_with = "number")]
    pub niv_muy_bueno: f64,
    #[serde(default, deserialize_with = "string_or_null")]
    pub modulo_nom: String,
    #[serde(default)]
    pub res_cells: Vec<MonthCell>,
    #[serde(default)]
    pub ing_cells: Vec<MonthCell>,
}

impl Fila {
    pub fn level(&self) -> ProductionLevel {
        ProductionLevel::from_label(&self.nivel_prod)
    }
}

impl AsRef<Fila> for Fila {
    fn as_ref(&self) -> &Fila {
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CuadroAnual {
    #[serde(default, deserialize_with = "string_or_null")]
    pub fecha_consulta: String,
    #[serde(default)]
    pub mes_actual: Option<Value>,
    #[serde(default)]
    pub meses: Vec<Value>,
    #[serde(default)]
    pub filas: Vec<Fila>,
}

/// One judge with the goal summary of a single period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JuezConMetaResumen {
    pub n_id_juez: i64,
    #[serde(default, deserialize_with = "string_or_null")]
    pub l_activo: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub usuario_id: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub x_juez_tipo_descripcion: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub x_nombres: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub x_app_paterno: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub x_app_materno: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub x_dni: String,
    #[serde(default)]
    pub x_telefono: Option<String>,
    #[serde(default, deserialize_with = "string_or_null")]
    pub email: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub username: String,
    #[serde(default, deserialize_with = "flag")]
    pub l_mensaje: bool,
    #[serde(default, deserialize_with = "string_or_null")]
    pub x_sexo_descripcion: String,
    #[serde(default)]
    pub n_instancia_id: Option<i64>,
    #[serde(default, deserialize_with = "string_or_null")]
    pub x_nom_instancia: String,
    #[serde(default, deserialize_with = "number")]
    pub m_niv_bueno: f64,
    #[serde(default, deserialize_with = "number")]
    pub m_niv_muy_bueno: f64,
    #[serde(default, deserialize_with = "string_or_null")]
    pub m_avan_meta: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub x_niv_produc: String,
    #[serde(default, deserialize_with = "number")]
    pub m_meta_preliminar: f64,
    #[serde(default, deserialize_with = "number")]
    pub m_t_resuelto: f64,
    #[serde(default)]
    pub n_anio_est: Option<i32>,
    #[serde(default)]
    pub n_mes_est: Option<u32>,
    #[serde(default, deserialize_with = "flag")]
    pub tiene_meta_resumen: bool,
}

impl JuezConMetaResumen {
    pub fn full_name(&self) -> String {
        [&self.x_nombres, &self.x_app_paterno, &self.x_app_materno]
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `m_avan_meta` is a numeric string; unparseable values count as 0.
    pub fn advance(&self) -> f64 {
        self.m_avan_meta.trim().parse::<f64>().unwrap_or(0.0)
    }

    pub fn level(&self) -> ProductionLevel {
        ProductionLevel::from_label(&self.x_niv_produc)
    }
}

pub fn fetch_cuadro_anual(api: &ApiClient, year: i32, month: u32) -> ApiResult<CuadroAnual> {
    let env = api.get_with_query::<Value>(
        "/estadistica/cuadro-anual",
        &[("year", year.to_string()), ("month", month.to_string())],
    )?;
    parse_cuadro_anual(env.data)
}

pub fn fetch_cuadro_anual_actual(api: &ApiClient) -> ApiResult<CuadroAnual> {
    let env = api.get::<Value>("/estadistica/cuadro-anual/actual")?;
    parse_cuadro_anual(env.data)
}

pub fn fetch_cuadro_anual_by_year(api: &ApiClient, year: i32) -> ApiResult<CuadroAnual> {
    let env = api.get::<Value>(&format!("/estadistica/cuadro-anual/{year}"))?;
    parse_cuadro_anual(env.data)
}

pub fn fetch_jueces_con_meta(
    api: &ApiClient,
    year: i32,
    month: u32,
) -> ApiResult<Vec<JuezConMetaResumen>> {
    let env = api.get::<Value>(&format!("/jueces/con-meta-resumenes/{year}/{month}"))?;
    parse_jueces(env.data)
}

pub fn fetch_jueces_activos(api: &ApiClient) -> ApiResult<Vec<JuezConMetaResumen>> {
    let env = api.get::<Value>("/jueces/activos")?;
    parse_jueces(env.data)
}

pub fn fetch_juez_by_usuario(api: &ApiClient, usuario_id: &str) -> ApiResult<JuezConMetaResumen> {
    Ok(api
        .get::<JuezConMetaResumen>(&format!("/jueces/usuario/{usuario_id}"))?
        .data)
}

pub fn fetch_jueces_by_tipo(api: &ApiClient, tipo_id: i64) -> ApiResult<Vec<JuezConMetaResumen>> {
    let env = api.get::<Value>(&format!("/jueces/tipo/{tipo_id}"))?;
    parse_jueces(env.data)
}

pub fn fetch_meta_resumen_by_instancia(
    api: &ApiClient,
    year: i32,
    month: u32,
    instancia_id: i64,
) -> ApiResult<Vec<JuezConMetaResumen>> {
    let env = api.get::<Value>(&format!(
        "/jueces/meta-resumen/{year}/{month}/{instancia_id}"
    ))?;
    parse_jueces(env.data)
}

pub fn fetch_jueces_completos(api: &ApiClient) -> ApiResult<Vec<JuezConMetaResumen>> {
    let env = api.get::<Value>("/jueces/completos")?;
    parse_jueces(env.data)
}

/// Every judge with goal summaries, no period filter.
pub fn fetch_jueces_with_meta_resumenes(api: &ApiClient) -> ApiResult<Vec<JuezConMetaResumen>> {
    let env = api.get::<Value>("/jueces/meta-resumenes")?;
    parse_jueces(env.data)
}

pub fn fetch_juez_with_meta_resumenes(
    api: &ApiClient,
    juez_id: i64,
) -> ApiResult<JuezConMetaResumen> {
    Ok(api
        .get::<JuezConMetaResumen>(&format!("/jueces/{juez_id}/meta-resumenes"))?
        .data)
}

/// Summary counters for a period, computed client-side from the judge list.
pub fn fetch_estadisticas_resumen(
    api: &ApiClient,
    year: i32,
    month: u32,
) -> ApiResult<JudgeSummaryStats> {
    let judges = fetch_jueces_con_meta(api, year, month)?;
    let refs: Vec<&JuezConMetaResumen> = judges.iter().collect();
    let stats = summarize_judges(&refs);
    debug!(year, month, total = stats.total, "judge summary computed");
    Ok(stats)
}

/// Accepts the cuadro object itself or a bare list of rows.
pub fn parse_cuadro_anual(data: Value) -> ApiResult<CuadroAnual> {
    match data {
        Value::Null => Ok(CuadroAnual::default()),
        Value::Array(_) => {
            let filas = serde_json::from_value::<Vec<Fila>>(data)
                .map_err(|err| ApiError::Decode(format!("invalid filas: {err}")))?;
            Ok(CuadroAnual {
                filas,
                ..CuadroAnual::default()
            })
        }
        other => {
            let cuadro = serde_json::from_value::<CuadroAnual>(other)
                .map_err(|err| ApiError::Decode(format!("invalid cuadro anual: {err}")))?;
            debug!(filas = cuadro.filas.len(), "cuadro anual parsed");
            Ok(cuadro)
        }
    }
}

pub fn parse_jueces(data: Value) -> ApiResult<Vec<JuezConMetaResumen>> {
    if data.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(data).map_err(|err| ApiError::Decode(format!("invalid jueces: {err}")))
}

fn string_or_null<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    let value = Value::deserialize(de)?;
    Ok(match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn flag<'de, D: Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(de)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => matches!(s.trim(), "1" | "true" | "S" | "SI" | "SÍ"),
        _ => false,
    })
}

fn number<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(de)?;
    Ok(match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    })
}

fn integer<'de, D: Deserializer<'de>>(de: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(de)?;
    Ok(match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|v| v.round() as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    })
}
