use std::fs;
use std::path::PathBuf;

use serde_json::{Value, json};

use judstat_terminal::envelope::normalize_body;
use judstat_terminal::stats_api::{ProductionLevel, parse_cuadro_anual, parse_jueces};
use judstat_terminal::stats_view::{JudgeSortField, SortDirection, sort_judges, summarize_judges};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_enveloped_cuadro_fixture() {
    let raw = read_fixture("cuadro_anual.json");
    let env = normalize_body(200, &raw).expect("fixture should normalize");
    assert_eq!(env.message.as_deref(), Some("Cuadro anual obtenido"));

    let cuadro = parse_cuadro_anual(env.data).expect("fixture should parse");
    assert_eq!(cuadro.fecha_consulta, "2025-06-14T10:22:31.000Z");
    assert_eq!(cuadro.meses.len(), 6);
    assert_eq!(cuadro.filas.len(), 2);

    let first = &cuadro.filas[0];
    assert_eq!(first.res_total, 412);
    assert_eq!(first.ing_total, 380);
    assert_eq!(first.meta_preliminar, 1100.0);
    assert_eq!(first.level(), ProductionLevel::Regular);
    assert_eq!(first.jueces_objetos.len(), 2);
    assert!(first.jueces_objetos[0].l_mensaje);
    assert_eq!(first.jueces_objetos[1].telefono, "");
    assert_eq!(first.res_cells.len(), 6);
    assert_eq!(first.res_cells[2].val, 71.0);
    assert_eq!(first.res_cells[1].nivel, "");
    let cells: f64 = first.res_cells.iter().map(|c| c.val).sum();
    assert_eq!(cells as i64, first.res_total);
}

#[test]
fn lenient_numbers_and_missing_fields_default() {
    let raw = read_fixture("cuadro_anual.json");
    let env = normalize_body(200, &raw).unwrap();
    let cuadro = parse_cuadro_anual(env.data).unwrap();

    let second = &cuadro.filas[1];
    assert_eq!(second.jueces, "");
    assert!(second.jueces_objetos.is_empty());
    assert_eq!(second.res_total, 530);
    assert_eq!(second.pct_real_avance, 58.9);
    assert_eq!(second.niv_bueno, 0.0);
    assert!(second.res_cells.is_empty());
    assert_eq!(second.level(), ProductionLevel::VeryGood);
}

#[test]
fn bare_row_list_and_null_are_accepted() {
    let cuadro = parse_cuadro_anual(json!([{ "instancia": "X", "res_total": 3 }])).unwrap();
    assert_eq!(cuadro.filas.len(), 1);
    assert_eq!(cuadro.fecha_consulta, "");

    let empty = parse_cuadro_anual(Value::Null).unwrap();
    assert!(empty.filas.is_empty());

    assert!(parse_cuadro_anual(json!("nope")).is_err());
}

#[test]
fn parses_raw_judge_array_fixture() {
    let raw = read_fixture("jueces_con_meta.json");
    let env = normalize_body(200, &raw).expect("bare arrays normalize");
    let judges = parse_jueces(env.data).expect("fixture should parse");
    assert_eq!(judges.len(), 2);

    let ana = &judges[0];
    assert_eq!(ana.full_name(), "Ana Ruiz Quispe");
    assert!(ana.l_mensaje);
    assert_eq!(ana.advance(), 37.45);
    assert_eq!(ana.m_niv_bueno, 80.0);
    assert_eq!(ana.m_t_resuelto, 412.0);
    assert_eq!(ana.n_anio_est, Some(2025));
    assert_eq!(ana.level(), ProductionLevel::Regular);

    let beto = &judges[1];
    assert_eq!(beto.full_name(), "Beto Paz");
    assert!(!beto.l_mensaje);
    assert_eq!(beto.usuario_id, "");
    assert_eq!(beto.x_telefono, None);
    assert_eq!(beto.n_instancia_id, None);
    assert_eq!(beto.advance(), 0.0);
    assert_eq!(beto.x_niv_produc, "");
    assert!(!beto.tiene_meta_resumen);
}

#[test]
fn judge_summary_averages_only_judges_with_goal() {
    let raw = read_fixture("jueces_con_meta.json");
    let judges = parse_jueces(serde_json::from_str(&raw).unwrap()).unwrap();
    let refs: Vec<_> = judges.iter().collect();
    let stats = summarize_judges(&refs);
    assert_eq!(stats.total, 2);
    assert_eq!(stats.with_goal, 1);
    assert_eq!(stats.mean_advance, 37.45);
    assert_eq!(stats.regular, 1);
}

#[test]
fn judges_sort_by_advance_both_ways() {
    let raw = read_fixture("jueces_con_meta.json");
    let judges = parse_jueces(serde_json::from_str(&raw).unwrap()).unwrap();
    let mut refs: Vec<_> = judges.iter().collect();

    sort_judges(&mut refs, JudgeSortField::Advance, SortDirection::Asc);
    assert_eq!(refs[0].n_id_juez, 102);
    sort_judges(&mut refs, JudgeSortField::Advance, SortDirection::Desc);
    assert_eq!(refs[0].n_id_juez, 101);
    sort_judges(&mut refs, JudgeSortField::Name, SortDirection::Asc);
    assert_eq!(refs[0].full_name(), "Ana Ruiz Quispe");
}

#[test]
fn null_judge_payload_is_an_empty_list() {
    assert!(parse_jueces(Value::Null).unwrap().is_empty());
}
