use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::aggregator::{self, BudgetView, ConsistencyReport, ItemDetail};
use crate::cli::{resolve_mode, resolve_payload_path, resolve_selection, SourceArgs, ViewArgs};
use crate::error::{BudgetError, Result};
use crate::fmt::{money, month_label, pct, variance};
use crate::models::{BudgetMatrix, GrandTotals, Summary, ViewMode};
use crate::payload::load_response;
use crate::settings::load_settings;

fn load(source: &SourceArgs) -> Result<BudgetMatrix> {
    load_response(&resolve_payload_path(source, &load_settings())?)
}

/// Settings are read once and the mode is validated before the payload is
/// touched, so a bad `--mode` is reported even when the file is also bad.
fn load_view_inputs(args: &ViewArgs) -> Result<(BudgetMatrix, ViewMode)> {
    let settings = load_settings();
    let mode = resolve_mode(args.mode.as_deref(), &settings)?;
    let data = load_response(&resolve_payload_path(&args.source, &settings)?)?;
    Ok((data, mode))
}

fn amount_cell(text: impl ToString) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

pub fn matrix(args: &ViewArgs) -> Result<()> {
    let (data, mode) = load_view_inputs(args)?;
    let view = aggregator::build_view(&data, resolve_selection(&data, args.project)?, mode);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        println!("{}", format_matrix(&view));
    }
    Ok(())
}

pub fn months(args: &ViewArgs) -> Result<()> {
    let (data, mode) = load_view_inputs(args)?;
    let view = aggregator::build_view(&data, resolve_selection(&data, args.project)?, mode);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&view.monthly)?);
    } else {
        println!("{}", format_months(&view));
    }
    Ok(())
}

pub fn totals(args: &ViewArgs) -> Result<()> {
    let (data, mode) = load_view_inputs(args)?;
    let view = aggregator::build_view(&data, resolve_selection(&data, args.project)?, mode);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&view.grand)?);
    } else {
        println!("{}", format_totals(&view.grand, view.mode.label()));
    }
    Ok(())
}

pub fn detail(source: &SourceArgs, project: i64, item: i64, json: bool) -> Result<()> {
    let data = load(source)?;
    let detail = aggregator::item_detail(&data, project, item)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        println!("{}", format_detail(&detail));
    }
    Ok(())
}

pub fn summary(source: &SourceArgs) -> Result<()> {
    let data = load(source)?;
    println!("{}", format_summary(data.summary.as_ref(), data.server_totals.as_ref()));
    Ok(())
}

pub fn check(source: &SourceArgs) -> Result<()> {
    let data = load(source)?;
    let report = aggregator::check_consistency(&data);
    println!("{}", format_check(&report));
    if report.is_clean() {
        Ok(())
    } else {
        let count = report.item_mismatches.len() + usize::from(report.server_mismatch.is_some());
        Err(BudgetError::Other(format!("{count} inconsistencies found")))
    }
}

// ---------------------------------------------------------------------------
// Pure formatting functions (aggregated data → String)
// ---------------------------------------------------------------------------

pub fn format_matrix(view: &BudgetView<'_>) -> String {
    if view.groups.is_empty() {
        return format!("No budget rows for view: {}", view.mode.label());
    }

    let mut table = Table::new();
    table.set_header(vec!["Project / Item", "Planned", "Actual", "Variance", "Exec %"]);

    for group in &view.groups {
        table.add_row(vec![
            Cell::new(group.project_name.bold()),
            Cell::new(""),
            Cell::new(""),
            Cell::new(""),
            Cell::new(""),
        ]);
        for row in &group.rows {
            let diff = row.total_planned - row.total_actual;
            table.add_row(vec![
                Cell::new(format!("  {}", row.display_name)),
                amount_cell(money(row.total_planned)),
                amount_cell(money(row.total_actual)),
                amount_cell(variance(diff)),
                amount_cell(pct(aggregator::execution_pct(row.total_planned, row.total_actual))),
            ]);
        }
    }

    let g = &view.grand;
    table.add_row(vec![
        Cell::new("TOTAL".bold()),
        amount_cell(money(g.total_planned)),
        amount_cell(money(g.total_actual)),
        amount_cell(variance(g.total_variance)),
        amount_cell(pct(aggregator::execution_pct(g.total_planned, g.total_actual))),
    ]);

    format!("Budget Execution — {}\n{table}", view.mode.label())
}

pub fn format_months(view: &BudgetView<'_>) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Month", "Planned", "Actual", "Variance"]);
    for (month, t) in &view.monthly {
        table.add_row(vec![
            Cell::new(month_label(*month)),
            amount_cell(money(t.planned)),
            amount_cell(money(t.actual)),
            amount_cell(variance(t.variance)),
        ]);
    }
    let g = &view.grand;
    table.add_row(vec![
        Cell::new("Total".bold()),
        amount_cell(money(g.total_planned)),
        amount_cell(money(g.total_actual)),
        amount_cell(variance(g.total_variance)),
    ]);
    format!("Monthly Totals — {}\n{table}", view.mode.label())
}

pub fn format_totals(g: &GrandTotals, label: &str) -> String {
    let mut table = Table::new();
    table.set_header(vec!["", "Amount"]);
    table.add_row(vec![Cell::new("Planned"), amount_cell(money(g.total_planned))]);
    table.add_row(vec![Cell::new("Actual"), amount_cell(money(g.total_actual))]);
    table.add_row(vec![Cell::new("Variance".bold()), amount_cell(variance(g.total_variance))]);
    table.add_row(vec![
        Cell::new("Execution"),
        amount_cell(pct(aggregator::execution_pct(g.total_planned, g.total_actual))),
    ]);
    format!("Grand Totals — {label}\n{table}")
}

pub fn format_detail(d: &ItemDetail) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Month", "Planned", "Actual", "Variance"]);
    for cell in &d.months {
        table.add_row(vec![
            Cell::new(month_label(cell.month)),
            amount_cell(money(cell.planned)),
            amount_cell(money(cell.actual)),
            amount_cell(variance(cell.variance)),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total".bold()),
        amount_cell(money(d.total_planned)),
        amount_cell(money(d.total_actual)),
        amount_cell(variance(d.total_variance)),
    ]);

    let mut out = format!("{} — {}\n{table}", d.project_name, d.item_name);
    if (d.total_planned - d.month_sum_planned).abs() > aggregator::CONSISTENCY_TOLERANCE
        || (d.total_actual - d.month_sum_actual).abs() > aggregator::CONSISTENCY_TOLERANCE
    {
        out.push_str(&format!(
            "\n{}",
            format!(
                "Note: months add up to {} planned / {} actual",
                money(d.month_sum_planned),
                money(d.month_sum_actual)
            )
            .yellow()
        ));
    }
    out
}

pub fn format_summary(summary: Option<&Summary>, server_totals: Option<&GrandTotals>) -> String {
    let mut sections = Vec::new();

    if let Some(s) = summary {
        let mut table = Table::new();
        table.set_header(vec!["", "Initial Budget", "Current"]);
        table.add_row(vec![
            Cell::new("Sales / Production"),
            amount_cell(money(s.initial.sale)),
            amount_cell(money(s.current.production)),
        ]);
        table.add_row(vec![
            Cell::new("Expense"),
            amount_cell(money(s.initial.expense)),
            amount_cell(money(s.current.expense)),
        ]);
        table.add_row(vec![
            Cell::new("Balance".bold()),
            amount_cell(variance(s.initial.balance)),
            amount_cell(variance(s.current.balance)),
        ]);
        sections.push(format!("Budget Summary\n{table}"));

        if !s.indicators.is_empty() {
            let mut ind = Table::new();
            ind.set_header(vec!["Indicator", "Value"]);
            for (name, value) in &s.indicators {
                ind.add_row(vec![Cell::new(name), amount_cell(format!("{value:.2}"))]);
            }
            sections.push(format!("Indicators\n{ind}"));
        }
    }

    if let Some(t) = server_totals {
        sections.push(format_totals(t, "as reported"));
    }

    if sections.is_empty() {
        "No summary in payload.".to_string()
    } else {
        sections.join("\n\n")
    }
}

pub fn format_check(report: &ConsistencyReport) -> String {
    if report.is_clean() {
        return "All totals match their monthly breakdown.".green().to_string();
    }

    let mut sections = Vec::new();
    if !report.item_mismatches.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Project", "Item", "Field", "Reported", "Month Sum", "Gap"]);
        for m in &report.item_mismatches {
            table.add_row(vec![
                Cell::new(m.project_id),
                Cell::new(m.item_id),
                Cell::new(m.field.as_str()),
                amount_cell(money(m.reported)),
                amount_cell(money(m.month_sum)),
                amount_cell(money(m.reported - m.month_sum).red()),
            ]);
        }
        sections.push(format!("Item Totals vs Months ({})\n{table}", report.item_mismatches.len()));
    }
    if let Some(m) = &report.server_mismatch {
        let mut table = Table::new();
        table.set_header(vec!["", "Reported", "Computed"]);
        table.add_row(vec![
            Cell::new("Planned"),
            amount_cell(money(m.reported.total_planned)),
            amount_cell(money(m.computed.total_planned)),
        ]);
        table.add_row(vec![
            Cell::new("Actual"),
            amount_cell(money(m.reported.total_actual)),
            amount_cell(money(m.computed.total_actual)),
        ]);
        sections.push(format!("Server Grand Totals\n{table}"));
    }
    sections.join("\n\n")
}
