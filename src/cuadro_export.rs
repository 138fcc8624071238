use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::stats_api::{Fila, JudgeRecord};
use crate::stats_view::CuadroSummary;

pub struct ExportReport {
    pub rows: usize,
    pub judges: usize,
    pub month_cells: usize,
}

/// Writes the visible cuadro rows to an xlsx workbook.
pub fn export_cuadro(
    path: &Path,
    period: (i32, u32),
    rows: &[&Fila],
    summary: &CuadroSummary,
) -> Result<ExportReport> {
    let mut cuadro_rows = vec![
        [
            "Org. jurisdiccional",
            "Instancia",
            "Módulo",
            "Juez",
            "Teléfono",
            "Mensaje",
            "Sexo",
            "Resoluciones",
            "Ingresos",
            "Meta preliminar",
            "% Avance real",
            "% Avance ideal",
            "Nivel",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>(),
    ];
    let mut month_rows = vec![
        ["Instancia", "Módulo", "Mes", "Resueltos", "Clase", "Ingresos"]
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>(),
    ];

    let mut judges = 0usize;
    for row in rows {
        if row.jueces_objetos.is_empty() {
            cuadro_rows.push(cuadro_row(row, None));
        }
        for judge in &row.jueces_objetos {
            judges += 1;
            cuadro_rows.push(cuadro_row(row, Some(judge)));
        }
        let months = row.res_cells.len().max(row.ing_cells.len());
        for idx in 0..months {
            let res = row.res_cells.get(idx);
            let ing = row.ing_cells.get(idx);
            month_rows.push(vec![
                row.instancia.clone(),
                row.modulo_nom.clone(),
                (idx + 1).to_string(),
                res.map(|c| format_number(c.val)).unwrap_or_default(),
                res.map(|c| c.cls.clone()).unwrap_or_default(),
                ing.map(|c| format_number(c.val)).unwrap_or_default(),
            ]);
        }
    }

    let summary_rows = vec![
        vec!["Periodo".to_string(), format!("{}-{:02}", period.0, period.1)],
        vec!["Filas".to_string(), summary.total_rows.to_string()],
        vec![
            "Total resoluciones".to_string(),
            summary.total_resolutions.to_string(),
        ],
        vec!["Total ingresos".to_string(), summary.total_income.to_string()],
        vec![
            "Promedio avance".to_string(),
            format!("{:.2}", summary.mean_advance),
        ],
        vec!["MUY BUENO".to_string(), summary.very_good.to_string()],
        vec!["BUENO".to_string(), summary.good.to_string()],
        vec!["REGULAR".to_string(), summary.regular.to_string()],
    ];

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Cuadro")?;
        write_rows(sheet, &cuadro_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Resumen")?;
        write_rows(sheet, &summary_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Meses")?;
        write_rows(sheet, &month_rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        rows: rows.len(),
        judges,
        month_cells: month_rows.len().saturating_sub(1),
    })
}

pub fn default_export_name(period: (i32, u32)) -> String {
    format!("cuadro_{}_{:02}.xlsx", period.0, period.1)
}

fn cuadro_row(row: &Fila, judge: Option<&JudgeRecord>) -> Vec<String> {
    vec![
        row.org_jurisd.clone(),
        row.instancia.clone(),
        row.modulo_nom.clone(),
        judge
            .map(|j| j.nombre_completo.clone())
            .unwrap_or_else(|| row.jueces.clone()),
        judge.map(|j| j.telefono.clone()).unwrap_or_default(),
        judge
            .map(|j| (if j.l_mensaje { "SÍ" } else { "NO" }).to_string())
            .unwrap_or_default(),
        judge.map(|j| j.sexo.clone()).unwrap_or_default(),
        row.res_total.to_string(),
        row.ing_total.to_string(),
        format_number(row.meta_preliminar),
        format!("{:.2}", row.pct_real_avance),
        format!("{:.2}", row.pct_ideal_avance),
        row.nivel_prod.clone(),
    ]
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
