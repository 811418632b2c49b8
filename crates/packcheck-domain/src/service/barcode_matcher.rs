//! Scanned code resolution and scan debouncing

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Checklist, ChecklistItem, ItemStatus};

/// Why a scan did not select an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanRejection {
    /// No product in the checklist carries this code
    UnknownCode { code: String },
    /// Every matching product is already done
    AlreadyDone { code: String, name: String },
    /// The product belongs to a box other than the active one
    OtherBox { code: String, name: String, box_index: usize, active_box: usize },
    /// The product's box has not been confirmed yet
    BoxNotConfirmed { code: String, name: String, box_index: usize },
}

impl ScanRejection {
    /// Semantic key for notification deduplication
    pub fn dedupe_key(&self) -> String {
        match self {
            ScanRejection::UnknownCode { code } => format!("scan:unknown:{}", code),
            ScanRejection::AlreadyDone { code, .. } => format!("scan:done:{}", code),
            ScanRejection::OtherBox { code, box_index, .. } => {
                format!("scan:other-box:{}:{}", code, box_index)
            }
            ScanRejection::BoxNotConfirmed { box_index, .. } => {
                format!("scan:box-unconfirmed:{}", box_index)
            }
        }
    }

    pub fn message(&self) -> String {
        match self {
            ScanRejection::UnknownCode { code } => format!("Code {} is not part of this order", code),
            ScanRejection::AlreadyDone { name, .. } => format!("{} is already packed", name),
            ScanRejection::OtherBox { name, box_index, active_box, .. } => format!(
                "{} belongs to box {}, active box is {}",
                name,
                box_index + 1,
                active_box + 1
            ),
            ScanRejection::BoxNotConfirmed { name, box_index, .. } => {
                format!("Confirm box {} before packing {}", box_index + 1, name)
            }
        }
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_lowercase()
}

fn matches_code(item: &ChecklistItem, normalized: &str) -> bool {
    let sku = item.sku.as_deref().map(normalize);
    let barcode = item.barcode.as_deref().map(normalize);
    sku.as_deref() == Some(normalized) || barcode.as_deref() == Some(normalized)
}

/// Resolve a scanned code to a product item in the active box
///
/// Only product items are considered. Among products in the active box that
/// are not done, the first in list order wins.
pub fn match_barcode(code: &str, checklist: &Checklist, active_box: usize) -> Result<String, ScanRejection> {
    let normalized = normalize(code);
    let candidates: Vec<&ChecklistItem> = checklist
        .products()
        .filter(|item| matches_code(item, &normalized))
        .collect();

    let Some(first) = candidates.first() else {
        return Err(ScanRejection::UnknownCode {
            code: code.trim().to_string(),
        });
    };

    let open: Vec<&&ChecklistItem> = candidates
        .iter()
        .filter(|item| item.status != ItemStatus::Done)
        .collect();
    if open.is_empty() {
        return Err(ScanRejection::AlreadyDone {
            code: code.trim().to_string(),
            name: first.name.clone(),
        });
    }

    match open.iter().find(|item| item.box_index == active_box) {
        Some(item) => {
            if !checklist.is_box_confirmed(active_box) {
                return Err(ScanRejection::BoxNotConfirmed {
                    code: code.trim().to_string(),
                    name: item.name.clone(),
                    box_index: active_box,
                });
            }
            Ok(item.id.clone())
        }
        None => {
            let elsewhere = open[0];
            Err(ScanRejection::OtherBox {
                code: code.trim().to_string(),
                name: elsewhere.name.clone(),
                box_index: elsewhere.box_index,
                active_box,
            })
        }
    }
}

/// Drops repeats of the same code inside a cooldown window
#[derive(Debug, Clone)]
pub struct ScanDebounce {
    cooldown: Duration,
    last: Option<(String, DateTime<Utc>)>,
}

impl ScanDebounce {
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown, last: None }
    }

    /// Whether `code` should be processed. Debug mode admits everything.
    pub fn admit(&mut self, code: &str, now: DateTime<Utc>, debug: bool) -> bool {
        let normalized = normalize(code);
        if !debug {
            if let Some((last_code, at)) = &self.last {
                if *last_code == normalized && now - *at < self.cooldown {
                    return false;
                }
            }
        }
        self.last = Some((normalized, now));
        true
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
