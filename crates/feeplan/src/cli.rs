//! Output formatting for feeplan commands
//!
//! Every formatter renders either a comfy-table for the terminal or
//! pretty-printed JSON, chosen by the `json` flag.

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table};
use feeplan_core::money::format_dollars;
use feeplan_core::{BillingSummary, ClinicPlan, CodeRegistry, ShiftPlan, SummaryReport};
use feeplan_types::{BillingEntry, BillingResult, ServiceCodeDefinition, UnitBasis};
use serde_json::json;

// ============================================================================
// Fee
// ============================================================================

pub fn format_fee(result: &BillingResult, json: bool) -> Result<String> {
    if json {
        return serde_json::to_string_pretty(result).context("Failed to serialize fee");
    }

    let mut table = new_table(&["Code", "Units", "Modifiers", "Fee"]);
    table.add_row(vec![
        Cell::new(&result.base_code).fg(Color::Cyan),
        Cell::new(result.units),
        Cell::new(modifier_list(&result.modifiers_applied)),
        Cell::new(format_dollars(result.base_fee)),
    ]);
    for addon in &result.add_on_codes {
        table.add_row(vec![
            Cell::new(&addon.code).fg(Color::Cyan),
            Cell::new(addon.units),
            Cell::new(if result.virtual_care { "TELES" } else { "-" }),
            Cell::new(format_dollars(addon.fee)),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total").fg(Color::Green),
        Cell::new(result.units + result.addon_units()),
        Cell::new(""),
        Cell::new(format_dollars(result.total_fee)).fg(Color::Green),
    ]);

    Ok(table.to_string())
}

// ============================================================================
// Clinic
// ============================================================================

pub fn format_clinic(plan: &ClinicPlan, json: bool) -> Result<String> {
    if json {
        return serde_json::to_string_pretty(plan).context("Failed to serialize clinic plan");
    }

    let mut out = entries_table(&plan.entries).to_string();
    out.push_str("\n\n");
    out.push_str(&format!(
        "Average time per patient: {} min\n",
        plan.average_minutes
    ));
    out.push_str(&format!(
        "Units: {} available, {} redistributed as add-ons, {} unbillable\n",
        plan.available_units, plan.added_units, plan.unbillable_units
    ));
    if plan.overbooked_units > 0 {
        out.push_str(&format!(
            "Warning: encounters already use {} units more than the clinic length\n",
            plan.overbooked_units
        ));
    }
    if plan.rrnp_applied {
        out.push_str("RRNP uplift applied\n");
    }
    out.push_str(&format!(
        "Total: {}",
        format_dollars(plan.summary.overall.fee)
    ));

    Ok(out)
}

// ============================================================================
// Shift
// ============================================================================

pub fn format_shift(plan: &ShiftPlan, json: bool) -> Result<String> {
    if json {
        return serde_json::to_string_pretty(plan).context("Failed to serialize shift plan");
    }

    let mut out = entries_table(&plan.entries).to_string();

    let mut usage = new_table(&["Block", "Hours", "Used", "Capacity", "Load"]);
    for block in &plan.block_usage {
        let load = format!("{:.0}%", block.percent_used());
        let load_cell = if block.used > block.capacity {
            Cell::new(load).fg(Color::Red)
        } else if block.is_saturated() {
            Cell::new(load).fg(Color::Yellow)
        } else {
            Cell::new(load)
        };
        usage.add_row(vec![
            Cell::new(block.block.name()).fg(Color::Cyan),
            Cell::new(block.block.label(plan.mode)),
            Cell::new(block.used),
            Cell::new(block.capacity),
            load_cell,
        ]);
    }
    out.push_str("\n\n");
    out.push_str(&usage.to_string());

    out.push_str(&format!(
        "\n\nUnits: {} available, {} filled with {}, {} unbillable\n",
        plan.available_units,
        plan.filler_units,
        feeplan_core::allocator::FILLER_CODE,
        plan.unbillable_units
    ));
    for warning in &plan.warnings {
        out.push_str(&format!("Warning: {}\n", warning));
    }
    out.push_str(&format!(
        "Total: {} ({} of {} block units billed, {:.1}%)",
        format_dollars(plan.summary.overall.fee),
        plan.summary.overall.units,
        plan.summary.available_units,
        plan.summary.utilization_pct
    ));

    Ok(out)
}

// ============================================================================
// Summary
// ============================================================================

/// Summary plus the records that were skipped while reading
pub fn format_summary_report(
    summary: &BillingSummary,
    report: &SummaryReport,
    json: bool,
) -> Result<String> {
    if json {
        let skipped: Vec<_> = report
            .errors
            .iter()
            .map(|e| json!({ "source": e.source, "message": e.message }))
            .collect();
        let value = json!({
            "summary": summary,
            "records_scanned": report.records_scanned,
            "records_skipped": report.records_skipped,
            "skipped": skipped,
        });
        return serde_json::to_string_pretty(&value).context("Failed to serialize summary");
    }

    let mut out = format_summary(summary);
    if report.records_skipped > 0 {
        out.push_str(&format!(
            "\n\nSkipped {} of {} records:",
            report.records_skipped, report.records_scanned
        ));
        for error in &report.errors {
            out.push_str(&format!("\n  {}: {}", error.source, error.message));
            if let Some(suggestion) = &error.suggestion {
                out.push_str(&format!(" ({})", suggestion));
            }
        }
    }
    Ok(out)
}

fn format_summary(summary: &BillingSummary) -> String {
    if summary.is_empty() {
        return "No billing entries".to_string();
    }

    let mut table = new_table(&["Block", "Code", "Source", "Calls", "Units", "Fee"]);
    for row in &summary.rows {
        let block = row
            .key
            .time_block
            .map(|b| b.name().to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(block),
            Cell::new(&row.key.code).fg(Color::Cyan),
            Cell::new(row.key.source.to_string()),
            Cell::new(row.totals.calls),
            Cell::new(row.totals.units),
            Cell::new(format_dollars(row.totals.fee)),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total").fg(Color::Green),
        Cell::new(""),
        Cell::new(""),
        Cell::new(summary.overall.calls),
        Cell::new(summary.overall.units),
        Cell::new(format_dollars(summary.overall.fee)).fg(Color::Green),
    ]);

    format!(
        "{}\n\n{} of {} units billed ({:.1}%)",
        table, summary.overall.units, summary.available_units, summary.utilization_pct
    )
}

// ============================================================================
// Codes
// ============================================================================

pub fn format_codes(registry: &CodeRegistry, json: bool) -> Result<String> {
    if json {
        let codes: Vec<&ServiceCodeDefinition> = registry.codes().collect();
        let value = json!({
            "schedule": registry.schedule(),
            "codes": codes,
        });
        return serde_json::to_string_pretty(&value).context("Failed to serialize codes");
    }

    let mut table = new_table(&["Code", "Description", "Category", "Fee", "Basis", "Modifiers"]);
    for def in registry.codes() {
        let basis = match def.unit_basis {
            UnitBasis::PerCall => format!("per call ({} min)", def.included_minutes),
            UnitBasis::PerUnit => format!("per {} min", def.unit_minutes),
        };
        table.add_row(vec![
            Cell::new(&def.code).fg(Color::Cyan),
            Cell::new(&def.description),
            Cell::new(def.category.label()),
            Cell::new(format_dollars(def.base_fee)),
            Cell::new(basis),
            Cell::new(modifier_list(&def.allowed_modifiers)),
        ]);
    }

    Ok(format!(
        "{} schedule ({} codes)\n{}",
        registry.schedule().display_name(),
        registry.len(),
        table
    ))
}

// ============================================================================
// Helpers
// ============================================================================

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(h).fg(Color::Cyan)));
    table
}

fn entries_table(entries: &[BillingEntry]) -> Table {
    let mut table = new_table(&["Block", "Code", "Modifiers", "Units", "Add-on", "Fee"]);
    for entry in entries {
        let block = entry
            .time_block
            .map(|b| b.name().to_string())
            .unwrap_or_else(|| "-".to_string());
        let code = if entry.is_filler() {
            Cell::new(&entry.code).fg(Color::Yellow)
        } else {
            Cell::new(&entry.code).fg(Color::Cyan)
        };
        table.add_row(vec![
            Cell::new(block),
            code,
            Cell::new(modifier_list(&entry.modifiers)),
            Cell::new(entry.units),
            Cell::new(entry.addon_units),
            Cell::new(format_dollars(entry.fee)),
        ]);
    }
    table
}

fn modifier_list(modifiers: &[String]) -> String {
    if modifiers.is_empty() {
        "-".to_string()
    } else {
        modifiers.join(", ")
    }
}
