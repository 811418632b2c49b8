//! CLI definition using clap

use clap::{Parser, Subcommand};
use packcheck_types::{OutputFormat, PackingMode};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "packcheck")]
#[command(author = "yuuji")]
#[command(version)]
#[command(about = "Order assembly verification: box planning, scan matching and weight checks")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json, table). Uses config value if not specified.
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Data directory (orders, catalog.csv, boxes.toml, settings.toml)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Packing mode. Uses config value if not specified.
    #[arg(long, short = 'm', global = true)]
    pub mode: Option<PackingMode>,

    /// Verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

/// Where order data comes from
#[derive(clap::Args, Debug, Clone)]
pub struct OrderSource {
    /// Order JSON file, or an order id in the store
    pub order: String,

    /// Catalog CSV (sku,name,unit_weight_kg,barcode). Defaults to the store catalog.
    #[arg(long, short = 'c')]
    pub catalog: Option<PathBuf>,

    /// Box set TOML to pack into. Without it box types are chosen from the catalog.
    #[arg(long, short = 'b')]
    pub boxes: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Plan how an order is distributed across boxes
    Plan {
        #[command(flatten)]
        source: OrderSource,

        /// Also print the checklist
        #[arg(long)]
        checklist: bool,
    },

    /// Plan every order file in a folder
    PlanBatch {
        /// Folder containing order JSON files
        folder: PathBuf,

        /// Catalog CSV. Defaults to the store catalog.
        #[arg(long, short = 'c')]
        catalog: Option<PathBuf>,

        /// Box set TOML to pack into
        #[arg(long, short = 'b')]
        boxes: Option<PathBuf>,

        /// Write the summaries as JSON
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Compute the tolerance band for an expected weight
    Tolerance {
        /// Expected weight of the item in kg
        expected: f64,

        /// Portion count of the item
        #[arg(long, short = 'p', default_value = "1")]
        portions: u32,

        /// Actual reading in kg to check against the band
        #[arg(long, short = 'a')]
        actual: Option<f64>,

        /// Tolerance settings TOML. Defaults to the store settings.
        #[arg(long, short = 's')]
        settings: Option<PathBuf>,
    },

    /// Replay a scale/scanner timeline against an order
    Simulate {
        #[command(flatten)]
        source: OrderSource,

        /// Simulation script (JSON timeline)
        script: PathBuf,

        /// Tolerance settings TOML. Defaults to the store settings.
        #[arg(long, short = 's')]
        settings: Option<PathBuf>,

        /// Run on the wall clock instead of a simulated one
        #[arg(long)]
        realtime: bool,

        /// Clock step in milliseconds
        #[arg(long, default_value = "50")]
        step_ms: u64,
    },

    /// Export an order's pick list to Excel
    Export {
        #[command(flatten)]
        source: OrderSource,

        /// Output Excel file path
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Set default packing mode
        #[arg(long)]
        set_mode: Option<PackingMode>,

        /// Set default output format
        #[arg(long)]
        set_output: Option<OutputFormat>,

        /// Set data directory
        #[arg(long)]
        set_store: Option<PathBuf>,

        /// Enable/disable scan debounce bypass
        #[arg(long)]
        set_debug_scan: Option<bool>,

        /// Enable/disable switching to the next box when one completes
        #[arg(long)]
        set_auto_advance: Option<bool>,

        /// Set success settle delay (ms)
        #[arg(long)]
        set_success_settle: Option<u64>,

        /// Set error settle delay (ms)
        #[arg(long)]
        set_error_settle: Option<u64>,

        /// Set scan cooldown (ms)
        #[arg(long)]
        set_scan_cooldown: Option<u64>,

        /// Set active polling timeout (ms)
        #[arg(long)]
        set_active_timeout: Option<u64>,

        /// Reset to defaults
        #[arg(long)]
        reset: bool,
    },
}
