//! Command handlers

use std::path::{Path, PathBuf};

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use walkdir::WalkDir;

use crate::cli::{Cli, Commands, OrderSource};
use crate::output::{output_batch, output_plan, output_simulation, output_tolerance, PlanSummary, ToleranceOutput};
use packcheck_app::export::export_pick_list;
use packcheck_app::repository::{open_catalog, open_catalog_at, open_order_provider, open_tolerance_settings};
use packcheck_app::simulation::{apply_script_event, run_script, SimulationReport};
use packcheck_app::{prepare_order, AssemblySession, Config, PreparedOrder};
use packcheck_domain::model::{BoxSettings, Order, WeightTolerancePolicy};
use packcheck_domain::repository::{NotificationSink, OrderProvider, ToleranceSettingsProvider};
use packcheck_domain::service::{calculate_tolerance, is_within_tolerance};
use packcheck_infra::order_json::load_order_file;
use packcheck_infra::{load_box_set, ConsoleSink, CsvCatalog, FileToleranceSettings, ScriptedScale, SimulationScript};
use packcheck_types::{Error, OutputFormat, PackingMode, Result, ValidationError};

/// Execute CLI command
pub fn execute(cli: Cli) -> Result<()> {
    // Load config
    let mut config = Config::load()?;

    // Override from CLI args
    if let Some(ref store) = cli.store {
        config.store_dir = Some(store.clone());
    }
    let mode = cli.mode.unwrap_or(config.packing_mode);
    let output_format = cli.format.unwrap_or(config.output_format);

    match &cli.command {
        Commands::Plan { source, checklist } => cmd_plan(&config, source, mode, output_format, *checklist),

        Commands::PlanBatch {
            folder,
            catalog,
            boxes,
            output,
        } => cmd_plan_batch(
            &cli,
            &config,
            folder,
            catalog.as_deref(),
            boxes.as_deref(),
            output.clone(),
            mode,
            output_format,
        ),

        Commands::Tolerance {
            expected,
            portions,
            actual,
            settings,
        } => cmd_tolerance(&config, *expected, *portions, *actual, settings.clone(), output_format),

        Commands::Simulate {
            source,
            script,
            settings,
            realtime,
            step_ms,
        } => cmd_simulate(
            &cli,
            &config,
            source,
            script,
            settings.clone(),
            *realtime,
            *step_ms,
            mode,
            output_format,
        ),

        Commands::Export { source, output } => cmd_export(&config, source, output.clone(), mode),

        Commands::Config {
            show,
            set_mode,
            set_output,
            set_store,
            set_debug_scan,
            set_auto_advance,
            set_success_settle,
            set_error_settle,
            set_scan_cooldown,
            set_active_timeout,
            reset,
        } => cmd_config(ConfigUpdate {
            show: *show,
            set_mode: *set_mode,
            set_output: *set_output,
            set_store: set_store.clone(),
            set_debug_scan: *set_debug_scan,
            set_auto_advance: *set_auto_advance,
            set_success_settle: *set_success_settle,
            set_error_settle: *set_error_settle,
            set_scan_cooldown: *set_scan_cooldown,
            set_active_timeout: *set_active_timeout,
            reset: *reset,
        }),
    }
}

/// Load an order from a file path, or from the store by id
fn load_order(config: &Config, order: &str) -> Result<Order> {
    let path = Path::new(order);
    if path.is_file() {
        return load_order_file(path);
    }
    let provider = open_order_provider(config)?;
    provider.load_order(order)
}

fn load_catalog(config: &Config, catalog: Option<&Path>) -> Result<CsvCatalog> {
    match catalog {
        Some(path) => open_catalog_at(path, None),
        None => open_catalog(config),
    }
}

fn load_boxes(boxes: Option<&Path>) -> Result<Option<Vec<BoxSettings>>> {
    boxes.map(load_box_set).transpose()
}

fn prepare(config: &Config, source: &OrderSource, mode: PackingMode) -> Result<PreparedOrder> {
    let order = load_order(config, &source.order)?;
    let catalog = load_catalog(config, source.catalog.as_deref())?;
    let boxes = load_boxes(source.boxes.as_deref())?;
    Ok(prepare_order(order, &catalog, boxes.as_deref(), mode))
}

/// Tolerance policy from an explicit settings file or the store
fn load_policy(config: &Config, settings: Option<PathBuf>) -> Result<WeightTolerancePolicy> {
    match settings {
        Some(path) => FileToleranceSettings::new(path).tolerance_policy(),
        None => open_tolerance_settings(config)?.tolerance_policy(),
    }
}

fn cmd_plan(
    config: &Config,
    source: &OrderSource,
    mode: PackingMode,
    output_format: OutputFormat,
    with_checklist: bool,
) -> Result<()> {
    let prepared = prepare(config, source, mode)?;
    output_plan(output_format, &prepared, with_checklist)
}

#[allow(clippy::too_many_arguments)]
fn cmd_plan_batch(
    cli: &Cli,
    config: &Config,
    folder: &Path,
    catalog: Option<&Path>,
    boxes: Option<&Path>,
    output: Option<PathBuf>,
    mode: PackingMode,
    output_format: OutputFormat,
) -> Result<()> {
    let files: Vec<PathBuf> = WalkDir::new(folder)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();

    if files.is_empty() {
        return Err(Error::FileNotFound(format!(
            "No order files found in {}",
            folder.display()
        )));
    }

    if cli.verbose {
        eprintln!("Found {} order files", files.len());
    }

    let catalog = load_catalog(config, catalog)?;
    let boxes = load_boxes(boxes)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .map_err(|e| ValidationError::new("progress template", e.to_string()))?
            .progress_chars("#>-"),
    );

    let mut summaries = Vec::with_capacity(files.len());
    let mut failed = 0;
    for path in &files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        pb.set_message(name.clone());

        match load_order_file(path) {
            Ok(order) => {
                let prepared = prepare_order(order, &catalog, boxes.as_deref(), mode);
                summaries.push(PlanSummary::from_prepared(name, &prepared));
            }
            Err(e) => {
                failed += 1;
                pb.println(format!("✗ {}: {}", name, e));
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    if let Some(output_path) = output {
        let content = serde_json::to_string_pretty(&summaries)?;
        std::fs::write(&output_path, content)?;
        println!("Results saved to: {}", output_path.display());
    }

    output_batch(output_format, &summaries)?;
    if failed > 0 {
        eprintln!("{} file(s) could not be read", failed);
    }
    Ok(())
}

fn cmd_tolerance(
    config: &Config,
    expected: f64,
    portions: u32,
    actual: Option<f64>,
    settings: Option<PathBuf>,
    output_format: OutputFormat,
) -> Result<()> {
    let policy = load_policy(config, settings)?;
    policy.validate()?;

    let tolerance = calculate_tolerance(expected, portions, &policy);
    let result = ToleranceOutput {
        expected,
        portions,
        tolerance,
        lower: expected - tolerance,
        upper: expected + tolerance,
        actual,
        within: actual.map(|a| is_within_tolerance(a, expected, tolerance)),
    };
    output_tolerance(output_format, &result)
}

#[allow(clippy::too_many_arguments)]
fn cmd_simulate(
    cli: &Cli,
    config: &Config,
    source: &OrderSource,
    script_path: &Path,
    settings: Option<PathBuf>,
    realtime: bool,
    step_ms: u64,
    mode: PackingMode,
    output_format: OutputFormat,
) -> Result<()> {
    let mut prepared = prepare(config, source, mode)?;
    let script = SimulationScript::load(script_path)?;

    let policy = match load_policy(config, settings) {
        Ok(policy) => policy,
        Err(e) => {
            tracing::warn!("tolerance settings unavailable: {}", e);
            prepared.issues.push(format!("tolerance settings unavailable: {}", e));
            prepared.weighing_enabled = false;
            WeightTolerancePolicy::default()
        }
    };

    let sink = if cli.quiet || output_format == OutputFormat::Json {
        ConsoleSink::quiet()
    } else {
        ConsoleSink::new()
    };

    let start = Utc::now();
    let mut session = AssemblySession::new(ScriptedScale::new(start), sink, config.clone(), policy);
    tracing::info!(session = %session.id(), order = %prepared.order_id(), "simulation started");
    session.load_order(prepared, start);

    let report = if realtime {
        run_realtime(&mut session, &script, step_ms)?
    } else {
        run_script(&mut session, &script, start, step_ms)
    };

    output_simulation(output_format, &report)
}

/// Replay `script` on the wall clock until it ends or Ctrl+C
fn run_realtime<N: NotificationSink>(
    session: &mut AssemblySession<ScriptedScale, N>,
    script: &SimulationScript,
    step_ms: u64,
) -> Result<SimulationReport> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let config = session.config();
    let end_ms = script.duration_ms() + config.success_settle_ms + config.error_settle_ms + config.active_poll_ms * 2;

    let elapsed_ms = runtime.block_on(async {
        let start = Utc::now();
        let mut interval = tokio::time::interval(std::time::Duration::from_millis(step_ms.max(1)));
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut next_event = 0;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = Utc::now();
                    let elapsed = (now - start).num_milliseconds().max(0) as u64;
                    session.device_mut().advance_to(now);
                    while let Some(timed) = script.events.get(next_event) {
                        if timed.at_ms > elapsed {
                            break;
                        }
                        apply_script_event(session, &timed.event, now);
                        next_event += 1;
                    }
                    session.tick(now);
                    if elapsed >= end_ms {
                        return elapsed;
                    }
                }
                _ = &mut ctrl_c => {
                    eprintln!("Interrupted");
                    session.leave();
                    return (Utc::now() - start).num_milliseconds().max(0) as u64;
                }
            }
        }
    });

    Ok(SimulationReport {
        snapshot: session.snapshot(),
        checklist: session.checklist().clone(),
        transitions: session.transitions(),
        elapsed_ms,
    })
}

fn cmd_export(config: &Config, source: &OrderSource, output: Option<PathBuf>, mode: PackingMode) -> Result<()> {
    let prepared = prepare(config, source, mode)?;

    // Determine output path
    let output_path = output.unwrap_or_else(|| PathBuf::from(format!("{}-picklist.xlsx", prepared.order_id())));

    export_pick_list(prepared.order_id(), &prepared.plan, &prepared.checklist, &output_path)?;

    println!("Exported to: {}", output_path.display());
    if prepared.plan.has_overflow() {
        eprintln!(
            "Warning: {} portion(s) do not fit the selected boxes",
            prepared.plan.unallocated_portions
        );
    }
    Ok(())
}

struct ConfigUpdate {
    show: bool,
    set_mode: Option<PackingMode>,
    set_output: Option<OutputFormat>,
    set_store: Option<PathBuf>,
    set_debug_scan: Option<bool>,
    set_auto_advance: Option<bool>,
    set_success_settle: Option<u64>,
    set_error_settle: Option<u64>,
    set_scan_cooldown: Option<u64>,
    set_active_timeout: Option<u64>,
    reset: bool,
}

fn cmd_config(update: ConfigUpdate) -> Result<()> {
    if update.reset {
        let config = Config::default();
        config.save()?;
        println!("Configuration reset to defaults");
        println!("\n{}", config);
        return Ok(());
    }

    let mut config = Config::load()?;
    let modified = apply_config_update(&mut config, &update);

    if modified {
        config.validate()?;
        config.save()?;
        println!("Configuration saved");
    }

    if update.show || !modified {
        println!("{}", config);
        if let Ok(path) = Config::config_path() {
            println!("Config file: {}", path.display());
        }
    }

    Ok(())
}

fn apply_config_update(config: &mut Config, update: &ConfigUpdate) -> bool {
    let mut modified = false;

    if let Some(mode) = update.set_mode {
        config.packing_mode = mode;
        modified = true;
    }

    if let Some(output_format) = update.set_output {
        config.output_format = output_format;
        modified = true;
    }

    if let Some(ref store) = update.set_store {
        config.store_dir = Some(store.clone());
        modified = true;
    }

    if let Some(debug_scan) = update.set_debug_scan {
        config.debug_scan = debug_scan;
        modified = true;
    }

    if let Some(auto_advance) = update.set_auto_advance {
        config.auto_advance_box = auto_advance;
        modified = true;
    }

    if let Some(ms) = update.set_success_settle {
        config.success_settle_ms = ms;
        modified = true;
    }

    if let Some(ms) = update.set_error_settle {
        config.error_settle_ms = ms;
        modified = true;
    }

    if let Some(ms) = update.set_scan_cooldown {
        config.scan_cooldown_ms = ms;
        modified = true;
    }

    if let Some(ms) = update.set_active_timeout {
        config.active_timeout_ms = ms;
        modified = true;
    }

    modified
}
