use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::BudgetError;

pub type ProjectId = i64;
pub type ItemId = i64;

/// Calendar months covered by the matrix, in display order.
pub const MONTHS: std::ops::RangeInclusive<u32> = 1..=12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetItem {
    pub id: ItemId,
    pub name: String,
}

/// Planned vs actual for one project-item-month. `variance` is
/// `planned - actual` as computed upstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthCell {
    pub month: u32,
    pub planned: f64,
    pub actual: f64,
    pub variance: f64,
}

impl MonthCell {
    pub fn zero(month: u32) -> Self {
        Self {
            month,
            planned: 0.0,
            actual: 0.0,
            variance: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemAggregate {
    pub item_id: ItemId,
    pub display_name: String,
    /// Server-computed; not reconciled against `month_cells`.
    pub total_planned: f64,
    pub total_actual: f64,
    pub month_cells: BTreeMap<u32, MonthCell>,
}

impl ItemAggregate {
    /// Month cell with zero-fill for months the server left out.
    pub fn month(&self, month: u32) -> MonthCell {
        self.month_cells
            .get(&month)
            .copied()
            .unwrap_or_else(|| MonthCell::zero(month))
    }

    pub fn month_sum_planned(&self) -> f64 {
        self.month_cells.values().map(|c| c.planned).sum()
    }

    pub fn month_sum_actual(&self) -> f64 {
        self.month_cells.values().map(|c| c.actual).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectMatrix {
    pub project_id: ProjectId,
    pub display_name: String,
    pub items: HashMap<ItemId, ItemAggregate>,
}

impl ProjectMatrix {
    pub fn empty(project_id: ProjectId, display_name: impl Into<String>) -> Self {
        Self {
            project_id,
            display_name: display_name.into(),
            items: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct GrandTotals {
    pub total_planned: f64,
    pub total_actual: f64,
    pub total_variance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MonthTotals {
    pub planned: f64,
    pub actual: f64,
    pub variance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct InitialBudget {
    pub sale: f64,
    pub expense: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CurrentState {
    pub production: f64,
    pub expense: f64,
    pub balance: f64,
}

/// Server-side summary block shown above the matrix.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Summary {
    pub initial: InitialBudget,
    pub current: CurrentState,
    pub indicators: BTreeMap<String, f64>,
}

/// Decoded budget-execution payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BudgetMatrix {
    pub projects: Vec<Project>,
    pub items: Vec<BudgetItem>,
    pub matrix: HashMap<ProjectId, ProjectMatrix>,
    pub server_totals: Option<GrandTotals>,
    pub summary: Option<Summary>,
}

impl BudgetMatrix {
    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn item(&self, id: ItemId) -> Option<&BudgetItem> {
        self.items.iter().find(|i| i.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    Comparative,
    PlannedOnly,
    ActualOnly,
}

impl ViewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::Comparative => "comparative",
            ViewMode::PlannedOnly => "planned_only",
            ViewMode::ActualOnly => "actual_only",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Comparative => "Planned vs Actual",
            ViewMode::PlannedOnly => "Planned only",
            ViewMode::ActualOnly => "Actual only",
        }
    }
}

impl FromStr for ViewMode {
    type Err = BudgetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "comparative" => Ok(ViewMode::Comparative),
            "planned_only" => Ok(ViewMode::PlannedOnly),
            "actual_only" => Ok(ViewMode::ActualOnly),
            other => Err(BudgetError::InvalidViewMode(other.to_string())),
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VarianceClass {
    Positive,
    Negative,
    Neutral,
}

impl VarianceClass {
    pub fn as_str(self) -> &'static str {
        match self {
            VarianceClass::Positive => "positive",
            VarianceClass::Negative => "negative",
            VarianceClass::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectSelection {
    All,
    One(ProjectId),
}

impl From<Option<ProjectId>> for ProjectSelection {
    fn from(id: Option<ProjectId>) -> Self {
        id.map_or(ProjectSelection::All, ProjectSelection::One)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_mode_parses_known_values() {
        assert_eq!("comparative".parse::<ViewMode>().unwrap(), ViewMode::Comparative);
        assert_eq!("planned_only".parse::<ViewMode>().unwrap(), ViewMode::PlannedOnly);
        assert_eq!(" actual_only ".parse::<ViewMode>().unwrap(), ViewMode::ActualOnly);
    }

    #[test]
    fn test_view_mode_rejects_unknown() {
        let err = "budget".parse::<ViewMode>().unwrap_err();
        assert!(matches!(err, BudgetError::InvalidViewMode(ref m) if m == "budget"));
        assert!("Comparative".parse::<ViewMode>().is_err());
    }

    #[test]
    fn test_view_mode_display_matches_wire_name() {
        for mode in [ViewMode::Comparative, ViewMode::PlannedOnly, ViewMode::ActualOnly] {
            assert_eq!(mode.to_string().parse::<ViewMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_month_zero_fill() {
        let mut cells = BTreeMap::new();
        cells.insert(
            3,
            MonthCell {
                month: 3,
                planned: 10.0,
                actual: 4.0,
                variance: 6.0,
            },
        );
        let agg = ItemAggregate {
            item_id: 1,
            display_name: "Materials".into(),
            total_planned: 10.0,
            total_actual: 4.0,
            month_cells: cells,
        };
        assert_eq!(agg.month(3).planned, 10.0);
        assert_eq!(agg.month(7), MonthCell::zero(7));
    }

    #[test]
    fn test_selection_from_option() {
        assert_eq!(ProjectSelection::from(None), ProjectSelection::All);
        assert_eq!(ProjectSelection::from(Some(4)), ProjectSelection::One(4));
    }
}
