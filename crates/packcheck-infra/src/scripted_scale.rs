//! Scripted scale and scanner for simulation runs
//!
//! A simulation script is a JSON timeline:
//!
//! ```json
//! {
//!   "description": "single box, two items",
//!   "events": [
//!     { "at_ms": 0,    "type": "reading", "weight": 0.2 },
//!     { "at_ms": 1200, "type": "scan", "code": "4901234567894" },
//!     { "at_ms": 1800, "type": "reading", "weight": 0.86, "stable": false },
//!     { "at_ms": 2100, "type": "reading", "weight": 0.86 }
//!   ]
//! }
//! ```

use std::collections::VecDeque;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use packcheck_domain::model::{PollingMode, ScaleReading};
use packcheck_domain::repository::ScaleDevice;
use packcheck_types::{Error, Result};

fn default_stable() -> bool {
    true
}

/// One step of a simulation timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptEvent {
    /// The scale settles on a new weight
    Reading {
        weight: f64,
        #[serde(default = "default_stable")]
        stable: bool,
    },
    /// A barcode arrives from the scanner
    Scan { code: String },
    /// Operator taps a checklist row
    Select { item_id: String },
    ConfirmBox { box_index: usize },
    SetActiveBox { box_index: usize },
    /// The scale stops answering
    Disconnect,
    Reconnect,
    /// Operator leaves the assembly view
    Leave,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    /// Offset from the start of the run
    pub at_ms: u64,
    #[serde(flatten)]
    pub event: ScriptEvent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationScript {
    #[serde(default)]
    pub description: String,
    pub events: Vec<TimedEvent>,
}

impl SimulationScript {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parse a script; events are ordered by time, ties keep file order
    pub fn from_json_str(content: &str) -> Result<Self> {
        let mut script: SimulationScript = serde_json::from_str(content)?;
        script.events.sort_by_key(|e| e.at_ms);
        Ok(script)
    }

    /// Offset of the last event
    pub fn duration_ms(&self) -> u64 {
        self.events.last().map(|e| e.at_ms).unwrap_or(0)
    }
}

/// In-memory scale driven by a simulation timeline
///
/// Every poll returns the current weight stamped with the simulated clock, the
/// way a real scale answers each request with a fresh sample.
#[derive(Debug)]
pub struct ScriptedScale {
    now: DateTime<Utc>,
    weight: Option<(f64, bool)>,
    connected: bool,
    barcodes: VecDeque<String>,
    mode: PollingMode,
    /// Every polling mode change, in order
    pub polling_log: Vec<PollingMode>,
    /// Number of `current_weight` calls
    pub polls: usize,
}

impl ScriptedScale {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: start,
            weight: None,
            connected: true,
            barcodes: VecDeque::new(),
            mode: PollingMode::Idle,
            polling_log: Vec::new(),
            polls: 0,
        }
    }

    pub fn advance_to(&mut self, now: DateTime<Utc>) {
        if now > self.now {
            self.now = now;
        }
    }

    pub fn place(&mut self, weight: f64, stable: bool) {
        self.weight = Some((weight, stable));
    }

    pub fn queue_barcode(&mut self, code: impl Into<String>) {
        self.barcodes.push_back(code.into());
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn mode(&self) -> PollingMode {
        self.mode
    }

    fn set_mode(&mut self, mode: PollingMode) {
        if self.mode != mode {
            tracing::debug!(from = self.mode.label(), to = mode.label(), "scale polling mode");
            self.mode = mode;
            self.polling_log.push(mode);
        }
    }
}

impl ScaleDevice for ScriptedScale {
    fn current_weight(&mut self) -> Result<ScaleReading> {
        self.polls += 1;
        if !self.connected {
            return Err(Error::HardwareUnavailable("scale disconnected".to_string()));
        }
        match self.weight {
            Some((weight, true)) => Ok(ScaleReading::stable(weight, self.now)),
            Some((weight, false)) => Ok(ScaleReading::unstable(weight, self.now)),
            None => Err(Error::HardwareUnavailable("no reading yet".to_string())),
        }
    }

    fn start_active_polling(&mut self) {
        self.set_mode(PollingMode::Active);
    }

    fn start_reserve_polling(&mut self) {
        self.set_mode(PollingMode::Reserve);
    }

    fn stop_active_polling(&mut self) {
        self.set_mode(PollingMode::Idle);
    }

    fn take_barcode(&mut self) -> Option<String> {
        self.barcodes.pop_front()
    }
}
