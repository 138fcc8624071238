use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;
use tracing::warn;

use crate::solicitudes_api::CreateSolicitud;
use crate::stats_api::{Fila, JudgeRecord, JuezConMetaResumen, ProductionLevel};

pub const INITIAL_ESTADO: &str = "PENDIENTE";
pub const INITIAL_PRIORIDAD: &str = "NORMAL";

/// Rows whose judge names contain `filter` (case-insensitive, trimmed). Order is kept.
pub fn filter_rows<'a>(rows: &'a [Fila], filter: &str) -> Vec<&'a Fila> {
    let needle = filter.trim().to_lowercase();
    if needle.is_empty() {
        return rows.iter().collect();
    }
    rows.iter().filter(|row| row_matches(row, &needle)).collect()
}

fn row_matches(row: &Fila, needle: &str) -> bool {
    row.jueces.to_lowercase().contains(needle)
        || row
            .jueces_objetos
            .iter()
            .any(|j| j.nombre_completo.to_lowercase().contains(needle))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CuadroSummary {
    pub total_rows: usize,
    pub total_resolutions: i64,
    pub total_income: i64,
    pub mean_advance: f64,
    pub very_good: usize,
    pub good: usize,
    pub regular: usize,
}

pub fn summarize_rows(rows: &[&Fila]) -> CuadroSummary {
    let mut summary = CuadroSummary {
        total_rows: rows.len(),
        ..CuadroSummary::default()
    };
    let mut advance_sum = 0.0;
    for row in rows {
        summary.total_resolutions += row.res_total;
        summary.total_income += row.ing_total;
        advance_sum += row.pct_real_avance;
        match row.level() {
            ProductionLevel::VeryGood => summary.very_good += 1,
            ProductionLevel::Good => summary.good += 1,
            ProductionLevel::Regular => summary.regular += 1,
            ProductionLevel::Other => {}
        }
    }
    if !rows.is_empty() {
        summary.mean_advance = round2(advance_sum / rows.len() as f64);
    }
    summary
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Identifying fields of a row; stable across refilters of the same period.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowKey {
    pub org_jurisd: String,
    pub instancia: String,
    pub modulo_nom: String,
}

impl RowKey {
    pub fn of(row: &Fila) -> Self {
        Self {
            org_jurisd: row.org_jurisd.clone(),
            instancia: row.instancia.clone(),
            modulo_nom: row.modulo_nom.clone(),
        }
    }

    fn matches(&self, row: &Fila) -> bool {
        self.org_jurisd == row.org_jurisd
            && self.instancia == row.instancia
            && self.modulo_nom == row.modulo_nom
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JudgeRef {
    Id(i64),
    Name(String),
}

impl JudgeRef {
    pub fn of(judge: &JudgeRecord) -> Self {
        match judge.id {
            Some(id) => JudgeRef::Id(id),
            None => JudgeRef::Name(judge.nombre_completo.trim().to_lowercase()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JudgeKey {
    pub row: RowKey,
    pub judge: JudgeRef,
}

impl JudgeKey {
    pub fn of(row: &Fila, judge: &JudgeRecord) -> Self {
        Self {
            row: RowKey::of(row),
            judge: JudgeRef::of(judge),
        }
    }

    /// First eligible judge the key points at. Rows sharing identifying fields, or
    /// judges without an id sharing a name, collapse onto this one judge.
    fn resolve_eligible<'a, R: AsRef<Fila>>(&self, rows: &'a [R]) -> Option<&'a JudgeRecord> {
        rows.iter()
            .map(|r| r.as_ref())
            .filter(|row| self.row.matches(row))
            .flat_map(|row| row.jueces_objetos.iter())
            .find(|judge| judge.l_mensaje && JudgeRef::of(judge) == self.judge)
    }
}

/// Judges chosen for the next message batch. Only judges with a message channel get in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    keys: BTreeSet<JudgeKey>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &JudgeKey) -> bool {
        self.keys.contains(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &JudgeKey> {
        self.keys.iter()
    }

    pub fn is_selected(&self, row: &Fila, judge: &JudgeRecord) -> bool {
        self.keys.contains(&JudgeKey::of(row, judge))
    }

    pub fn row_has_selection(&self, row: &Fila) -> bool {
        row.jueces_objetos.iter().any(|j| self.is_selected(row, j))
    }

    /// Returns whether the key is selected afterwards.
    pub fn toggle<R: AsRef<Fila>>(&mut self, rows: &[R], key: JudgeKey) -> bool {
        if key.resolve_eligible(rows).is_none() {
            return false;
        }
        if self.keys.remove(&key) {
            false
        } else {
            self.keys.insert(key);
            true
        }
    }

    pub fn select_all<R: AsRef<Fila>>(&mut self, rows: &[R]) {
        for row in rows.iter().map(|r| r.as_ref()) {
            for judge in row.jueces_objetos.iter().filter(|j| j.l_mensaje) {
                self.keys.insert(JudgeKey::of(row, judge));
            }
        }
    }

    pub fn deselect_all(&mut self) {
        self.keys.clear();
    }

    /// Drops keys that no longer point at an eligible judge of `rows`.
    pub fn retain_visible<R: AsRef<Fila>>(&mut self, rows: &[R]) -> usize {
        let before = self.keys.len();
        self.keys
            .retain(|key| key.resolve_eligible(rows).is_some());
        before - self.keys.len()
    }

    pub fn key_at<R: AsRef<Fila>>(
        rows: &[R],
        row_idx: usize,
        judge_idx: usize,
    ) -> Option<JudgeKey> {
        let row = rows.get(row_idx)?.as_ref();
        let judge = row.jueces_objetos.get(judge_idx)?;
        Some(JudgeKey::of(row, judge))
    }
}

/// Stable partition: rows with at least one selected judge come first.
pub fn selected_first<'a>(rows: &[&'a Fila], selection: &Selection) -> Vec<&'a Fila> {
    let (mut picked, rest): (Vec<&Fila>, Vec<&Fila>) = rows
        .iter()
        .copied()
        .partition(|row| selection.row_has_selection(row));
    picked.extend(rest);
    picked
}

/// Message-level fields shared by every request of a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageFields {
    pub encuesta: String,
    pub telefono: String,
    pub whatsapp: String,
    pub fecha_envio: Option<NaiveDate>,
    pub hora_envio: String,
    pub fecha_corte: Option<NaiveDate>,
}

impl MessageFields {
    pub fn with_defaults(telefono: &str, whatsapp: &str, encuesta: &str) -> Self {
        Self {
            encuesta: encuesta.to_string(),
            telefono: telefono.to_string(),
            whatsapp: whatsapp.to_string(),
            fecha_envio: None,
            hora_envio: String::new(),
            fecha_corte: None,
        }
    }
}

pub fn iso_date(date: NaiveDate) -> String {
    format!("{}T00:00:00.000Z", date.format("%Y-%m-%d"))
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// One request per selected key, in row order then judge order. A key is sent once even
/// when several rows or judges collapse onto it.
pub fn build_requests<R: AsRef<Fila>>(
    rows: &[R],
    selection: &Selection,
    fields: &MessageFields,
) -> Vec<CreateSolicitud> {
    let mut out = Vec::with_capacity(selection.len());
    let mut sent: HashSet<JudgeKey> = HashSet::with_capacity(selection.len());
    for row in rows.iter().map(|r| r.as_ref()) {
        for judge in &row.jueces_objetos {
            if !judge.l_mensaje {
                continue;
            }
            let key = JudgeKey::of(row, judge);
            if !selection.contains(&key) || !sent.insert(key) {
                continue;
            }
            out.push(CreateSolicitud {
                encuesta: non_empty(&fields.encuesta),
                telefono: non_empty(&fields.telefono),
                whatsapp: non_empty(&fields.whatsapp),
                fecha_envio: fields.fecha_envio.map(iso_date),
                hora_envio: non_empty(&fields.hora_envio),
                fecha_corte: fields.fecha_corte.map(iso_date),
                instancia: non_empty(&row.instancia),
                modulo_nom: non_empty(&row.modulo_nom),
                meta_preliminar: Some(row.meta_preliminar),
                nivel_prod: non_empty(&row.nivel_prod),
                pct_real_avance: Some(row.pct_real_avance),
                niv_bueno: Some(row.niv_bueno),
                niv_muy_bueno: Some(row.niv_muy_bueno),
                nombre_completo: non_empty(&judge.nombre_completo),
                telefono_juez: non_empty(&judge.telefono),
                l_mensaje: Some(judge.l_mensaje),
                sexo: non_empty(&judge.sexo),
                estado: Some(INITIAL_ESTADO.to_string()),
                prioridad: Some(INITIAL_PRIORIDAD.to_string()),
            });
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeSortField {
    Name,
    Advance,
    Level,
    Resolved,
    Goal,
}

impl JudgeSortField {
    pub fn next(self) -> Self {
        match self {
            JudgeSortField::Name => JudgeSortField::Advance,
            JudgeSortField::Advance => JudgeSortField::Level,
            JudgeSortField::Level => JudgeSortField::Resolved,
            JudgeSortField::Resolved => JudgeSortField::Goal,
            JudgeSortField::Goal => JudgeSortField::Name,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            JudgeSortField::Name => "Nombre",
            JudgeSortField::Advance => "Avance",
            JudgeSortField::Level => "Nivel",
            JudgeSortField::Resolved => "Resueltos",
            JudgeSortField::Goal => "Meta",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

pub fn filter_judges<'a>(
    judges: &'a [JuezConMetaResumen],
    filter: &str,
) -> Vec<&'a JuezConMetaResumen> {
    let needle = filter.trim().to_lowercase();
    if needle.is_empty() {
        return judges.iter().collect();
    }
    judges
        .iter()
        .filter(|j| {
            j.full_name().to_lowercase().contains(&needle)
                || j.username.to_lowercase().contains(&needle)
        })
        .collect()
}

pub fn sort_judges(judges: &mut [&JuezConMetaResumen], field: JudgeSortField, dir: SortDirection) {
    judges.sort_by(|a, b| {
        let ord = compare_judges(a, b, field);
        match dir {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

fn compare_judges(
    a: &JuezConMetaResumen,
    b: &JuezConMetaResumen,
    field: JudgeSortField,
) -> Ordering {
    match field {
        JudgeSortField::Name => a.full_name().to_lowercase().cmp(&b.full_name().to_lowercase()),
        JudgeSortField::Advance => a.advance().total_cmp(&b.advance()),
        JudgeSortField::Level => level_rank(a.level()).cmp(&level_rank(b.level())),
        JudgeSortField::Resolved => a.m_t_resuelto.total_cmp(&b.m_t_resuelto),
        JudgeSortField::Goal => a.m_meta_preliminar.total_cmp(&b.m_meta_preliminar),
    }
}

fn level_rank(level: ProductionLevel) -> u8 {
    match level {
        ProductionLevel::Other => 0,
        ProductionLevel::Regular => 1,
        ProductionLevel::Good => 2,
        ProductionLevel::VeryGood => 3,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JudgeSummaryStats {
    pub total: usize,
    pub with_goal: usize,
    pub mean_advance: f64,
    pub very_good: usize,
    pub good: usize,
    pub regular: usize,
}

/// Advance is averaged over judges that have goal data for the period.
pub fn summarize_judges(judges: &[&JuezConMetaResumen]) -> JudgeSummaryStats {
    let mut stats = JudgeSummaryStats {
        total: judges.len(),
        ..JudgeSummaryStats::default()
    };
    let mut advance_sum = 0.0;
    for judge in judges {
        if judge.tiene_meta_resumen {
            stats.with_goal += 1;
            advance_sum += judge.advance();
        }
        match judge.level() {
            ProductionLevel::VeryGood => stats.very_good += 1,
            ProductionLevel::Good => stats.good += 1,
            ProductionLevel::Regular => stats.regular += 1,
            ProductionLevel::Other => {}
        }
    }
    if stats.with_goal > 0 {
        stats.mean_advance = round2(advance_sum / stats.with_goal as f64);
    }
    stats
}

pub fn duplicate_judge_ids(judges: &[JuezConMetaResumen]) -> Vec<i64> {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for judge in judges {
        *counts.entry(judge.n_id_juez).or_default() += 1;
    }
    let mut dups: Vec<i64> = counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(id, _)| id)
        .collect();
    dups.sort_unstable();
    if !dups.is_empty() {
        warn!(ids = ?dups, "duplicate judge ids in summary list");
    }
    dups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_matches_half_up_for_positive_values() {
        assert_eq!(round2(66.665_000_1), 66.67);
        assert_eq!(round2(10.0 / 3.0), 3.33);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn iso_date_is_midnight_utc() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(iso_date(date), "2025-03-07T00:00:00.000Z");
    }

    #[test]
    fn judge_ref_falls_back_to_normalized_name() {
        let judge = JudgeRecord {
            id: None,
            nombre_completo: "  Ana RUIZ ".to_string(),
            telefono: String::new(),
            l_mensaje: true,
            sexo: String::new(),
        };
        assert_eq!(JudgeRef::of(&judge), JudgeRef::Name("ana ruiz".to_string()));
    }

    #[test]
    fn sort_direction_flips() {
        assert_eq!(SortDirection::Asc.flip(), SortDirection::Desc);
        assert_eq!(JudgeSortField::Goal.next(), JudgeSortField::Name);
    }
}
