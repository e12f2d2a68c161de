use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{BudgetError, Result};
use crate::models::{
    BudgetItem, BudgetMatrix, GrandTotals, ItemAggregate, ItemId, MonthCell, MonthTotals,
    ProjectId, ProjectMatrix, ProjectSelection, VarianceClass, ViewMode, MONTHS,
};

/// Largest gap between a reported total and its month sum that is still
/// treated as rounding.
pub const CONSISTENCY_TOLERANCE: f64 = 0.005;

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

fn passes(item: &ItemAggregate, mode: ViewMode) -> bool {
    match mode {
        ViewMode::Comparative => item.total_planned > 0.0 || item.total_actual > 0.0,
        ViewMode::PlannedOnly => item.total_planned > 0.0,
        ViewMode::ActualOnly => item.total_actual > 0.0,
    }
}

/// Items of `project` that pass `mode`, in catalog order. Items the project
/// has no entry for are skipped, as are entries the catalog does not list.
pub fn filter_items_for_project<'a>(
    project: &'a ProjectMatrix,
    items: &[BudgetItem],
    mode: ViewMode,
) -> Vec<&'a ItemAggregate> {
    items
        .iter()
        .filter_map(|item| project.items.get(&item.id))
        .filter(|agg| passes(agg, mode))
        .collect()
}

/// Project matrices under `selection`, in project catalog order. A catalog
/// project without a matrix entry is skipped.
pub fn select_projects(matrix: &BudgetMatrix, selection: ProjectSelection) -> Vec<&ProjectMatrix> {
    matrix
        .projects
        .iter()
        .filter(|p| match selection {
            ProjectSelection::All => true,
            ProjectSelection::One(id) => p.id == id,
        })
        .filter_map(|p| matrix.matrix.get(&p.id))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectRows<'a> {
    #[serde(skip)]
    pub project: &'a ProjectMatrix,
    pub project_id: ProjectId,
    pub project_name: &'a str,
    pub rows: Vec<&'a ItemAggregate>,
}

/// Row groups to render. Projects with no passing item are dropped.
pub fn visible_projects<'a>(
    projects: &[&'a ProjectMatrix],
    items: &[BudgetItem],
    mode: ViewMode,
) -> Vec<ProjectRows<'a>> {
    projects
        .iter()
        .map(|&p| ProjectRows {
            project: p,
            project_id: p.project_id,
            project_name: &p.display_name,
            rows: filter_items_for_project(p, items, mode),
        })
        .filter(|g| !g.rows.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

/// Per-month sums over every filtered (project, item) pair. All twelve months
/// are present, zero when nothing contributes.
pub fn compute_monthly_totals(
    projects: &[&ProjectMatrix],
    items: &[BudgetItem],
    mode: ViewMode,
) -> BTreeMap<u32, MonthTotals> {
    let mut totals: BTreeMap<u32, MonthTotals> =
        MONTHS.map(|m| (m, MonthTotals::default())).collect();
    for project in projects {
        for agg in filter_items_for_project(project, items, mode) {
            for month in MONTHS {
                let cell = agg.month(month);
                let slot = totals.entry(month).or_default();
                slot.planned += cell.planned;
                slot.actual += cell.actual;
                slot.variance += cell.variance;
            }
        }
    }
    totals
}

/// Sum of the trusted item totals over the filtered rows. The variance is
/// derived from the two sums, not accumulated per row.
pub fn compute_grand_totals(
    projects: &[&ProjectMatrix],
    items: &[BudgetItem],
    mode: ViewMode,
) -> GrandTotals {
    let (total_planned, total_actual) = projects
        .iter()
        .flat_map(|p| filter_items_for_project(p, items, mode))
        .fold((0.0, 0.0), |(planned, actual), agg| {
            (planned + agg.total_planned, actual + agg.total_actual)
        });
    GrandTotals {
        total_planned,
        total_actual,
        total_variance: total_planned - total_actual,
    }
}

pub fn classify_variance(variance: f64) -> VarianceClass {
    if variance > 0.0 {
        VarianceClass::Positive
    } else if variance < 0.0 {
        VarianceClass::Negative
    } else {
        VarianceClass::Neutral
    }
}

/// Share of the plan already spent, as a percentage. `None` without a plan.
pub fn execution_pct(planned: f64, actual: f64) -> Option<f64> {
    if planned > 0.0 {
        Some(actual / planned * 100.0)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Composite view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct BudgetView<'a> {
    pub mode: ViewMode,
    pub groups: Vec<ProjectRows<'a>>,
    pub monthly: BTreeMap<u32, MonthTotals>,
    pub grand: GrandTotals,
}

pub fn build_view(
    matrix: &BudgetMatrix,
    selection: ProjectSelection,
    mode: ViewMode,
) -> BudgetView<'_> {
    let projects = select_projects(matrix, selection);
    BudgetView {
        mode,
        groups: visible_projects(&projects, &matrix.items, mode),
        monthly: compute_monthly_totals(&projects, &matrix.items, mode),
        grand: compute_grand_totals(&projects, &matrix.items, mode),
    }
}

// ---------------------------------------------------------------------------
// Drill-down
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ItemDetail {
    pub project_id: ProjectId,
    pub project_name: String,
    pub item_id: ItemId,
    pub item_name: String,
    pub months: Vec<MonthCell>,
    pub total_planned: f64,
    pub total_actual: f64,
    pub total_variance: f64,
    pub month_sum_planned: f64,
    pub month_sum_actual: f64,
    pub class: VarianceClass,
}

/// Month-by-month view of one (project, item) pair. A pair with no data
/// comes back zero-filled.
pub fn item_detail(matrix: &BudgetMatrix, project_id: ProjectId, item_id: ItemId) -> Result<ItemDetail> {
    let project_name = matrix
        .project(project_id)
        .map(|p| p.name.clone())
        .or_else(|| matrix.matrix.get(&project_id).map(|p| p.display_name.clone()))
        .ok_or(BudgetError::UnknownProject(project_id))?;
    let catalog_item = matrix.item(item_id).ok_or(BudgetError::UnknownItem(item_id))?;

    let agg = matrix
        .matrix
        .get(&project_id)
        .and_then(|p| p.items.get(&item_id));

    let (item_name, total_planned, total_actual, months) = match agg {
        Some(agg) => (
            agg.display_name.clone(),
            agg.total_planned,
            agg.total_actual,
            MONTHS.map(|m| agg.month(m)).collect::<Vec<_>>(),
        ),
        None => (
            catalog_item.name.clone(),
            0.0,
            0.0,
            MONTHS.map(MonthCell::zero).collect(),
        ),
    };
    let total_variance = total_planned - total_actual;

    Ok(ItemDetail {
        project_id,
        project_name,
        item_id,
        item_name,
        month_sum_planned: months.iter().map(|c| c.planned).sum(),
        month_sum_actual: months.iter().map(|c| c.actual).sum(),
        months,
        total_planned,
        total_actual,
        total_variance,
        class: classify_variance(total_variance),
    })
}

// ---------------------------------------------------------------------------
// Consistency check (read-only; never alters the trusted totals)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalField {
    Planned,
    Actual,
}

impl TotalField {
    pub fn as_str(self) -> &'static str {
        match self {
            TotalField::Planned => "planned",
            TotalField::Actual => "actual",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemMismatch {
    pub project_id: ProjectId,
    pub item_id: ItemId,
    pub field: TotalField,
    pub reported: f64,
    pub month_sum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerTotalsMismatch {
    pub reported: GrandTotals,
    pub computed: GrandTotals,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ConsistencyReport {
    pub item_mismatches: Vec<ItemMismatch>,
    pub server_mismatch: Option<ServerTotalsMismatch>,
}

impl ConsistencyReport {
    pub fn is_clean(&self) -> bool {
        self.item_mismatches.is_empty() && self.server_mismatch.is_none()
    }
}

fn differs(a: f64, b: f64) -> bool {
    (a - b).abs() > CONSISTENCY_TOLERANCE
}

/// Compare each item's reported totals with the sum of its month cells, and
/// the server's grand totals with comparative totals over all projects.
pub fn check_consistency(matrix: &BudgetMatrix) -> ConsistencyReport {
    let mut project_ids: Vec<&ProjectId> = matrix.matrix.keys().collect();
    project_ids.sort();

    let mut item_mismatches = Vec::new();
    for project_id in project_ids {
        let project = &matrix.matrix[project_id];
        let mut item_ids: Vec<&ItemId> = project.items.keys().collect();
        item_ids.sort();
        for item_id in item_ids {
            let agg = &project.items[item_id];
            let checks = [
                (TotalField::Planned, agg.total_planned, agg.month_sum_planned()),
                (TotalField::Actual, agg.total_actual, agg.month_sum_actual()),
            ];
            for (field, reported, month_sum) in checks {
                if differs(reported, month_sum) {
                    item_mismatches.push(ItemMismatch {
                        project_id: *project_id,
                        item_id: *item_id,
                        field,
                        reported,
                        month_sum,
                    });
                }
            }
        }
    }

    let server_mismatch = matrix.server_totals.and_then(|reported| {
        let projects = select_projects(matrix, ProjectSelection::All);
        let computed = compute_grand_totals(&projects, &matrix.items, ViewMode::Comparative);
        let mismatch = differs(reported.total_planned, computed.total_planned)
            || differs(reported.total_actual, computed.total_actual);
        mismatch.then_some(ServerTotalsMismatch { reported, computed })
    });

    ConsistencyReport {
        item_mismatches,
        server_mismatch,
    }
}
