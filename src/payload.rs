//! Wire format of the budget-execution endpoint and its decode step.
//!
//! Field names follow the API exactly (`matriz`, `proyectos`, `meses`, ...).
//! Decoding is strict: ids must be integers, month keys must fall in 1..=12,
//! and any missing required field is an error rather than a silent zero.

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use log::{debug, warn};
use serde::Deserialize;

use crate::aggregator::check_consistency;
use crate::error::{BudgetError, Result};
use crate::models::{
    BudgetItem, BudgetMatrix, CurrentState, GrandTotals, InitialBudget, ItemAggregate, MonthCell,
    Project, ProjectMatrix, Summary, MONTHS,
};

#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<WirePayload>,
}

#[derive(Debug, Deserialize)]
pub struct WirePayload {
    pub matriz: BTreeMap<String, WireProject>,
    pub proyectos: Vec<WireProjectRef>,
    pub items: Vec<WireItemRef>,
    #[serde(default)]
    pub totales: Option<WireTotals>,
    #[serde(default)]
    pub resumen: Option<WireSummary>,
}

#[derive(Debug, Deserialize)]
pub struct WireProject {
    pub nombre: String,
    #[serde(default)]
    pub items: BTreeMap<String, WireItem>,
}

#[derive(Debug, Deserialize)]
pub struct WireItem {
    pub nombre: String,
    pub total_presupuesto: f64,
    pub total_real: f64,
    #[serde(default)]
    pub meses: BTreeMap<String, WireMonth>,
}

#[derive(Debug, Deserialize)]
pub struct WireMonth {
    pub presupuesto: f64,
    pub real: f64,
    pub diferencia: f64,
}

#[derive(Debug, Deserialize)]
pub struct WireProjectRef {
    pub id: i64,
    pub proyecto: String,
}

#[derive(Debug, Deserialize)]
pub struct WireItemRef {
    pub id: i64,
    pub item: String,
}

#[derive(Debug, Deserialize)]
pub struct WireTotals {
    pub presupuesto_total: f64,
    pub real_total: f64,
    pub diferencia_total: f64,
}

#[derive(Debug, Deserialize)]
pub struct WireSummary {
    pub presupuesto_inicial: WireInitialBudget,
    pub estado_actual: WireCurrentState,
    #[serde(default)]
    pub indicadores: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct WireInitialBudget {
    pub venta: f64,
    pub gasto: f64,
    pub saldo: f64,
}

#[derive(Debug, Deserialize)]
pub struct WireCurrentState {
    pub produccion: f64,
    pub gasto: f64,
    pub saldo: f64,
}

/// Parse a full API response (`{ success, data }`) into a `BudgetMatrix`.
pub fn decode_response(json: &str) -> Result<BudgetMatrix> {
    debug!("event=payload_decode module=payload status=start bytes={}", json.len());
    let response: ApiResponse = serde_json::from_str(json)?;
    if !response.success {
        return Err(BudgetError::Api(
            response
                .message
                .unwrap_or_else(|| "request was not successful".to_string()),
        ));
    }
    let data = response
        .data
        .ok_or_else(|| BudgetError::Decode("response has no `data` field".into()))?;
    let matrix = decode_payload(data)?;

    let report = check_consistency(&matrix);
    for m in &report.item_mismatches {
        warn!(
            "event=totals_mismatch module=payload project={} item={} field={} total={} month_sum={}",
            m.project_id,
            m.item_id,
            m.field.as_str(),
            m.reported,
            m.month_sum
        );
    }
    if let Some(m) = &report.server_mismatch {
        warn!(
            "event=server_totals_mismatch module=payload planned={}/{} actual={}/{}",
            m.reported.total_planned, m.computed.total_planned, m.reported.total_actual, m.computed.total_actual
        );
    }

    debug!(
        "event=payload_decode module=payload status=ok projects={} items={}",
        matrix.projects.len(),
        matrix.items.len()
    );
    Ok(matrix)
}

/// Read a response from a path, or from stdin when `path` is `-`.
pub fn load_response(path: &Path) -> Result<BudgetMatrix> {
    let json = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)?
    };
    decode_response(&json)
}

pub fn decode_payload(data: WirePayload) -> Result<BudgetMatrix> {
    let mut projects: Vec<Project> = data
        .proyectos
        .into_iter()
        .map(|p| Project {
            id: p.id,
            name: p.proyecto,
        })
        .collect();
    let items: Vec<BudgetItem> = data
        .items
        .into_iter()
        .map(|i| BudgetItem {
            id: i.id,
            name: i.item,
        })
        .collect();

    let mut matrix = HashMap::new();
    let mut orphans = Vec::new();
    for (key, wire) in data.matriz {
        let project_id = parse_id("project", &key)?;
        let mut project = ProjectMatrix::empty(project_id, wire.nombre);
        for (item_key, item) in wire.items {
            let item_id = parse_id("item", &item_key)?;
            let aggregate = decode_item(project_id, item_id, item)?;
            if project.items.insert(item_id, aggregate).is_some() {
                return Err(BudgetError::Decode(format!(
                    "project {project_id}: duplicate item key `{item_key}`"
                )));
            }
        }
        if !projects.iter().any(|p| p.id == project_id) {
            debug!(
                "event=project_not_in_catalog module=payload project={project_id} name={}",
                project.display_name
            );
            orphans.push(Project {
                id: project_id,
                name: project.display_name.clone(),
            });
        }
        if matrix.insert(project_id, project).is_some() {
            return Err(BudgetError::Decode(format!("duplicate project key `{key}`")));
        }
    }
    // Map keys are strings, so "10" sorts before "7" until re-ordered by id.
    orphans.sort_by_key(|p| p.id);
    projects.extend(orphans);

    Ok(BudgetMatrix {
        projects,
        items,
        matrix,
        server_totals: data.totales.map(|t| GrandTotals {
            total_planned: t.presupuesto_total,
            total_actual: t.real_total,
            total_variance: t.diferencia_total,
        }),
        summary: data.resumen.map(decode_summary),
    })
}

fn decode_item(project_id: i64, item_id: i64, item: WireItem) -> Result<ItemAggregate> {
    let mut month_cells = BTreeMap::new();
    for (month_key, cell) in item.meses {
        let month: u32 = month_key.trim().parse().map_err(|_| {
            BudgetError::Decode(format!(
                "project {project_id} item {item_id}: month key `{month_key}` is not a number"
            ))
        })?;
        if !MONTHS.contains(&month) {
            return Err(BudgetError::Decode(format!(
                "project {project_id} item {item_id}: month {month} outside 1..12"
            )));
        }
        let previous = month_cells.insert(
            month,
            MonthCell {
                month,
                planned: cell.presupuesto,
                actual: cell.real,
                variance: cell.diferencia,
            },
        );
        if previous.is_some() {
            return Err(BudgetError::Decode(format!(
                "project {project_id} item {item_id}: duplicate month key `{month_key}`"
            )));
        }
    }
    Ok(ItemAggregate {
        item_id,
        display_name: item.nombre,
        total_planned: item.total_presupuesto,
        total_actual: item.total_real,
        month_cells,
    })
}

fn decode_summary(wire: WireSummary) -> Summary {
    let mut indicators = BTreeMap::new();
    for (key, value) in wire.indicadores {
        match value.as_f64() {
            Some(v) => {
                indicators.insert(key, v);
            }
            None => debug!("event=indicator_skipped module=payload key={key} value={value}"),
        }
    }
    Summary {
        initial: InitialBudget {
            sale: wire.presupuesto_inicial.venta,
            expense: wire.presupuesto_inicial.gasto,
            balance: wire.presupuesto_inicial.saldo,
        },
        current: CurrentState {
            production: wire.estado_actual.produccion,
            expense: wire.estado_actual.gasto,
            balance: wire.estado_actual.saldo,
        },
        indicators,
    }
}

fn parse_id(kind: &str, key: &str) -> Result<i64> {
    key.trim()
        .parse()
        .map_err(|_| BudgetError::Decode(format!("{kind} key `{key}` is not an integer id")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "success": true,
        "data": {
            "matriz": {
                "1": {
                    "nombre": "Bridge Repair",
                    "items": {
                        "10": {
                            "nombre": "Materials",
                            "total_presupuesto": 1000,
                            "total_real": 800,
                            "meses": {
                                "1": {"presupuesto": 600, "real": 500, "diferencia": 100},
                                "2": {"presupuesto": 400, "real": 300, "diferencia": 100}
                            }
                        }
                    }
                }
            },
            "proyectos": [{"id": 1, "proyecto": "Bridge Repair"}, {"id": 2, "proyecto": "Depot"}],
            "items": [{"id": 10, "item": "Materials"}, {"id": 20, "item": "Labor"}],
            "totales": {"presupuesto_total": 1000, "real_total": 800, "diferencia_total": 200},
            "resumen": {
                "presupuesto_inicial": {"venta": 5000, "gasto": 1000, "saldo": 4000},
                "estado_actual": {"produccion": 3000, "gasto": 800, "saldo": 2200},
                "indicadores": {"margen": 73.3, "nota": "n/a"}
            }
        }
    }"#;

    #[test]
    fn test_decode_sample() {
        let m = decode_response(SAMPLE).unwrap();
        assert_eq!(m.projects.len(), 2);
        assert_eq!(m.items[1].name, "Labor");
        let p1 = &m.matrix[&1];
        assert_eq!(p1.display_name, "Bridge Repair");
        let materials = &p1.items[&10];
        assert_eq!(materials.total_planned, 1000.0);
        assert_eq!(materials.month(2).variance, 100.0);
        assert_eq!(materials.month(12), MonthCell::zero(12));
        assert!(!m.matrix.contains_key(&2));
        let totals = m.server_totals.unwrap();
        assert_eq!(totals.total_variance, 200.0);
    }

    #[test]
    fn test_decode_summary_keeps_numeric_indicators() {
        let m = decode_response(SAMPLE).unwrap();
        let s = m.summary.unwrap();
        assert_eq!(s.initial.sale, 5000.0);
        assert_eq!(s.current.balance, 2200.0);
        assert_eq!(s.indicators.get("margen"), Some(&73.3));
        assert!(!s.indicators.contains_key("nota"));
    }

    #[test]
    fn test_unsuccessful_response_is_api_error() {
        let err = decode_response(r#"{"success": false, "message": "token expired"}"#).unwrap_err();
        assert!(matches!(err, BudgetError::Api(ref msg) if msg == "token expired"));
    }

    #[test]
    fn test_missing_data_is_decode_error() {
        let err = decode_response(r#"{"success": true}"#).unwrap_err();
        assert!(matches!(err, BudgetError::Decode(_)));
    }

    #[test]
    fn test_month_out_of_range_rejected() {
        let json = r#"{"success": true, "data": {
            "matriz": {"1": {"nombre": "P", "items": {"1": {
                "nombre": "I", "total_presupuesto": 1, "total_real": 0,
                "meses": {"13": {"presupuesto": 1, "real": 0, "diferencia": 1}}}}}},
            "proyectos": [], "items": []}}"#;
        let err = decode_response(json).unwrap_err();
        assert!(err.to_string().contains("outside 1..12"), "got: {err}");
    }

    #[test]
    fn test_non_integer_project_key_rejected() {
        let json = r#"{"success": true, "data": {
            "matriz": {"abc": {"nombre": "P", "items": {}}},
            "proyectos": [], "items": []}}"#;
        let err = decode_response(json).unwrap_err();
        assert!(err.to_string().contains("`abc`"), "got: {err}");
    }

    #[test]
    fn test_missing_total_fails_fast() {
        let json = r#"{"success": true, "data": {
            "matriz": {"1": {"nombre": "P", "items": {"1": {"nombre": "I", "total_real": 0}}}},
            "proyectos": [], "items": []}}"#;
        assert!(matches!(decode_response(json), Err(BudgetError::Json(_))));
    }

    #[test]
    fn test_matrix_project_missing_from_catalog_is_appended() {
        let json = r#"{"success": true, "data": {
            "matriz": {"7": {"nombre": "Orphan", "items": {}}},
            "proyectos": [{"id": 1, "proyecto": "Listed"}], "items": []}}"#;
        let m = decode_response(json).unwrap();
        assert_eq!(m.projects.len(), 2);
        assert_eq!(m.projects[1].name, "Orphan");
    }

    #[test]
    fn test_load_response_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.json");
        std::fs::write(&path, SAMPLE).unwrap();
        let m = load_response(&path).unwrap();
        assert_eq!(m.items.len(), 2);
    }

    #[test]
    fn test_duplicate_project_key_rejected() {
        let json = r#"{"success": true, "data": {
            "matriz": {"1": {"nombre": "P", "items": {}}, "01": {"nombre": "Q", "items": {}}},
            "proyectos": [], "items": []}}"#;
        let err = decode_response(json).unwrap_err();
        assert!(matches!(err, BudgetError::Decode(_)));
        assert!(err.to_string().contains("duplicate project key"), "got: {err}");
    }

    #[test]
    fn test_duplicate_item_key_rejected() {
        let json = r#"{"success": true, "data": {
            "matriz": {"1": {"nombre": "P", "items": {
                "2": {"nombre": "I", "total_presupuesto": 1, "total_real": 0, "meses": {}},
                " 2": {"nombre": "J", "total_presupuesto": 5, "total_real": 0, "meses": {}}}}},
            "proyectos": [], "items": []}}"#;
        let err = decode_response(json).unwrap_err();
        assert!(err.to_string().contains("duplicate item key"), "got: {err}");
    }

    #[test]
    fn test_duplicate_month_key_rejected() {
        let json = r#"{"success": true, "data": {
            "matriz": {"1": {"nombre": "P", "items": {"1": {
                "nombre": "I", "total_presupuesto": 100, "total_real": 0,
                "meses": {"1": {"presupuesto": 60, "real": 0, "diferencia": 60},
                          "01": {"presupuesto": 40, "real": 0, "diferencia": 40}}}}}},
            "proyectos": [], "items": []}}"#;
        let err = decode_response(json).unwrap_err();
        assert!(err.to_string().contains("duplicate month key"), "got: {err}");
    }

    #[test]
    fn test_orphan_projects_appended_in_id_order() {
        let json = r#"{"success": true, "data": {
            "matriz": {"10": {"nombre": "Ten", "items": {}}, "7": {"nombre": "Seven", "items": {}}},
            "proyectos": [{"id": 1, "proyecto": "Listed"}], "items": []}}"#;
        let m = decode_response(json).unwrap();
        let ids: Vec<i64> = m.projects.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 7, 10]);
    }
}
