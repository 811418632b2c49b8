//! Output formatting module

use packcheck_app::simulation::SimulationReport;
use packcheck_app::PreparedOrder;
use packcheck_domain::service::{generate_checklist_report, generate_plan_report};
use packcheck_types::{OutputFormat, Result};
use serde::Serialize;

/// One row of a batch planning run
#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub file: String,
    pub order_id: String,
    pub boxes: usize,
    pub portions: u32,
    pub unallocated: u32,
    pub weighing_enabled: bool,
    pub issues: Vec<String>,
}

impl PlanSummary {
    pub fn from_prepared(file: String, prepared: &PreparedOrder) -> Self {
        Self {
            file,
            order_id: prepared.order_id().to_string(),
            boxes: prepared.plan.boxes.len(),
            portions: prepared.plan.total_portions,
            unallocated: prepared.plan.unallocated_portions,
            weighing_enabled: prepared.weighing_enabled,
            issues: prepared.issues.clone(),
        }
    }
}

/// Tolerance band for one expected weight
#[derive(Debug, Clone, Serialize)]
pub struct ToleranceOutput {
    pub expected: f64,
    pub portions: u32,
    pub tolerance: f64,
    pub lower: f64,
    pub upper: f64,
    pub actual: Option<f64>,
    pub within: Option<bool>,
}

pub fn output_plan(output_format: OutputFormat, prepared: &PreparedOrder, with_checklist: bool) -> Result<()> {
    if output_format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(prepared)?);
        return Ok(());
    }

    print!("{}", generate_plan_report(prepared.order_id(), &prepared.plan));
    if with_checklist {
        println!();
        print!("{}", generate_checklist_report(&prepared.checklist));
    }
    print_issues(prepared);
    Ok(())
}

pub fn output_batch(output_format: OutputFormat, summaries: &[PlanSummary]) -> Result<()> {
    if output_format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(summaries)?);
        return Ok(());
    }

    println!("\n{:<16} {:>6} {:>9} {:>12} {:>9}", "Order", "Boxes", "Portions", "Unallocated", "Weighing");
    println!("{}", "-".repeat(56));
    for summary in summaries {
        println!(
            "{:<16} {:>6} {:>9} {:>12} {:>9}",
            summary.order_id,
            summary.boxes,
            summary.portions,
            summary.unallocated,
            if summary.weighing_enabled { "on" } else { "off" }
        );
    }
    let blocked = summaries.iter().filter(|s| s.unallocated > 0).count();
    println!("\n{} order(s), {} with unallocated portions", summaries.len(), blocked);
    Ok(())
}

pub fn output_tolerance(output_format: OutputFormat, result: &ToleranceOutput) -> Result<()> {
    if output_format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!("\nTolerance");
    println!("=========");
    println!("Expected:        {:.3} kg ({} portion(s))", result.expected, result.portions);
    println!("Tolerance:       ±{:.1} g", result.tolerance * 1000.0);
    println!("Accepted range:  {:.3} - {:.3} kg", result.lower, result.upper);
    if let (Some(actual), Some(within)) = (result.actual, result.within) {
        println!(
            "Actual:          {:.3} kg ({})",
            actual,
            if within { "within tolerance" } else { "OUT OF TOLERANCE" }
        );
    }
    Ok(())
}

pub fn output_simulation(output_format: OutputFormat, report: &SimulationReport) -> Result<()> {
    if output_format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let snapshot = &report.snapshot;
    println!();
    print!("{}", generate_checklist_report(&report.checklist));
    println!("\nSimulation Result");
    println!("=================");
    println!("Order:           {}", snapshot.order_id.as_deref().unwrap_or("-"));
    println!("Simulated time:  {:.1} s", report.elapsed_ms as f64 / 1000.0);
    println!("Transitions:     {}", report.transitions);
    println!("Portions:        {}/{}", snapshot.portions_done, snapshot.portions_total);
    println!("Polling:         {}", snapshot.polling_mode.label());
    if snapshot.weighing_paused {
        println!("Weighing:        paused");
    }
    if snapshot.unallocated_portions > 0 {
        println!("Unallocated:     {}", snapshot.unallocated_portions);
    }
    println!("Ready:           {}", if snapshot.ready { "Yes" } else { "No" });
    Ok(())
}

fn print_issues(prepared: &PreparedOrder) {
    if prepared.issues.is_empty() {
        return;
    }
    println!("\n[Issues]");
    for issue in &prepared.issues {
        println!("  - {}", issue);
    }
    if !prepared.weighing_enabled {
        println!("  Weighing is disabled for this order");
    }
}
