use serde_json::json;

use judstat_terminal::stats_api::Fila;
use judstat_terminal::stats_view::{JudgeKey, Selection, filter_rows};

fn row(instancia: &str, judges: serde_json::Value) -> Fila {
    serde_json::from_value(json!({
        "org_jurisd": "CALLAO",
        "instancia": instancia,
        "jueces_objetos": judges,
        "modulo_nom": "MODULO FAMILIA",
        "nivel_prod": "BUENO",
    }))
    .unwrap()
}

fn rows() -> Vec<Fila> {
    vec![
        row(
            "1° JUZGADO DE FAMILIA",
            json!([
                { "id": 11, "nombre_completo": "Ana Ruiz", "l_mensaje": true },
                { "id": 12, "nombre_completo": "Beto Paz", "l_mensaje": false },
            ]),
        ),
        row(
            "2° JUZGADO DE FAMILIA",
            json!([
                { "id": 21, "nombre_completo": "Carmen Quispe", "l_mensaje": "S" },
                { "nombre_completo": "Diego Flores", "l_mensaje": 1 },
            ]),
        ),
        row("3° JUZGADO DE FAMILIA", json!([])),
    ]
}

fn assert_only_eligible(selection: &Selection, rows: &[Fila]) {
    let mut resolved = 0;
    for row in rows {
        for judge in &row.jueces_objetos {
            if selection.is_selected(row, judge) {
                resolved += 1;
                assert!(judge.l_mensaje, "{} has no message channel", judge.nombre_completo);
            }
        }
    }
    assert_eq!(resolved, selection.len());
}

#[test]
fn toggle_flips_eligible_judges_only() {
    let rows = rows();
    let mut selection = Selection::new();

    let ana = Selection::key_at(&rows, 0, 0).unwrap();
    let beto = Selection::key_at(&rows, 0, 1).unwrap();
    assert!(selection.toggle(&rows, ana.clone()));
    assert!(selection.contains(&ana));
    assert!(!selection.toggle(&rows, beto.clone()));
    assert!(!selection.contains(&beto));

    assert!(!selection.toggle(&rows, ana.clone()));
    assert!(selection.is_empty());
}

#[test]
fn no_toggle_sequence_selects_a_judge_without_channel() {
    let rows = rows();
    let mut selection = Selection::new();
    let keys: Vec<JudgeKey> = [(0, 0), (0, 1), (1, 0), (1, 1)]
        .iter()
        .filter_map(|(r, j)| Selection::key_at(&rows, *r, *j))
        .collect();
    for round in 0..5 {
        for (idx, key) in keys.iter().enumerate() {
            if (round + idx) % 2 == 0 {
                selection.toggle(&rows, key.clone());
            }
        }
        assert_only_eligible(&selection, &rows);
    }
}

#[test]
fn string_and_numeric_channel_flags_are_eligible() {
    let rows = rows();
    let mut selection = Selection::new();
    selection.select_all(&rows);
    assert_eq!(selection.len(), 3);
    assert!(selection.is_selected(&rows[1], &rows[1].jueces_objetos[0]));
    assert!(selection.is_selected(&rows[1], &rows[1].jueces_objetos[1]));
}

#[test]
fn select_all_and_deselect_all_are_idempotent() {
    let rows = rows();
    let mut selection = Selection::new();
    selection.select_all(&rows);
    let once = selection.clone();
    selection.select_all(&rows);
    assert_eq!(selection, once);

    selection.deselect_all();
    assert!(selection.is_empty());
    selection.deselect_all();
    assert!(selection.is_empty());
}

#[test]
fn key_at_out_of_range_is_none() {
    let rows = rows();
    assert!(Selection::key_at(&rows, 2, 0).is_none());
    assert!(Selection::key_at(&rows, 9, 0).is_none());
    assert!(Selection::key_at(&rows, 0, 5).is_none());
}

#[test]
fn selection_survives_refilter_that_keeps_the_judge_visible() {
    let rows = rows();
    let mut selection = Selection::new();
    let carmen = Selection::key_at(&rows, 1, 0).unwrap();
    selection.toggle(&rows, carmen.clone());

    // Carmen moves from row index 1 to row index 0 under this filter.
    let visible = filter_rows(&rows, "carmen");
    assert_eq!(visible.len(), 1);
    assert_eq!(selection.retain_visible(&visible), 0);
    assert!(selection.contains(&carmen));
    assert_eq!(Selection::key_at(&visible, 0, 0), Some(carmen));
}

#[test]
fn refilter_drops_judges_no_longer_visible() {
    let rows = rows();
    let mut selection = Selection::new();
    selection.select_all(&rows);

    let visible = filter_rows(&rows, "ana");
    let dropped = selection.retain_visible(&visible);
    assert_eq!(dropped, 2);
    assert_eq!(selection.len(), 1);
    assert!(selection.is_selected(&rows[0], &rows[0].jueces_objetos[0]));
}

#[test]
fn judges_without_id_are_keyed_by_normalized_name() {
    let rows = rows();
    let diego = Selection::key_at(&rows, 1, 1).unwrap();
    let mut renamed = rows.clone();
    renamed[1].jueces_objetos[1].nombre_completo = "  DIEGO FLORES ".to_string();
    assert_eq!(Selection::key_at(&renamed, 1, 1), Some(diego));
}
