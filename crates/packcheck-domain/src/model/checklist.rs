//! Checklist items and the per-item status machine
//!
//! A checklist holds one box item per planned box followed by the product
//! items assigned to it. Statuses only move along the edges listed in
//! [`ItemStatus::can_transition_to`]; `Done` has no outgoing edge.

use serde::{Deserialize, Serialize};

use super::box_settings::BoxSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Product,
    Box,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Default,
    Pending,
    Success,
    Error,
    Done,
    AwaitingConfirmation,
    Confirmed,
}

impl ItemStatus {
    /// Transition table for products and boxes
    pub fn can_transition_to(self, kind: ItemKind, to: ItemStatus) -> bool {
        use ItemStatus::*;
        match kind {
            ItemKind::Product => matches!(
                (self, to),
                (Default, Pending)
                    | (Pending, Success)
                    | (Pending, Error)
                    | (Pending, Default)
                    | (Success, Done)
                    | (Error, Pending)
                    | (Error, Default)
            ),
            ItemKind::Box => matches!(
                (self, to),
                (AwaitingConfirmation, Pending)
                    | (AwaitingConfirmation, Confirmed)
                    | (Pending, Success)
                    | (Pending, Error)
                    | (Pending, AwaitingConfirmation)
                    | (Pending, Confirmed)
                    | (Success, Confirmed)
                    | (Error, Pending)
                    | (Error, AwaitingConfirmation)
                    | (Error, Confirmed)
                    | (Confirmed, Done)
            ),
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ItemStatus::Done
    }

    pub fn label(&self) -> &'static str {
        match self {
            ItemStatus::Default => "default",
            ItemStatus::Pending => "pending",
            ItemStatus::Success => "success",
            ItemStatus::Error => "error",
            ItemStatus::Done => "done",
            ItemStatus::AwaitingConfirmation => "awaiting_confirmation",
            ItemStatus::Confirmed => "confirmed",
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub name: String,
    /// Portions (>= 1)
    pub quantity: u32,
    /// Expected weight in kg; for box items, the box's own weight
    pub expected_weight: f64,
    pub status: ItemStatus,
    pub kind: ItemKind,
    pub box_index: usize,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub box_settings: Option<BoxSettings>,
}

impl ChecklistItem {
    pub fn is_product(&self) -> bool {
        self.kind == ItemKind::Product
    }

    pub fn is_box(&self) -> bool {
        self.kind == ItemKind::Box
    }

    /// Status an item falls back to when its pending selection is dropped
    pub fn rest_status(&self) -> ItemStatus {
        match self.kind {
            ItemKind::Product => ItemStatus::Default,
            ItemKind::Box => ItemStatus::AwaitingConfirmation,
        }
    }

    /// Whether this box item lets products be scanned into it
    pub fn is_confirmed_box(&self) -> bool {
        self.is_box() && matches!(self.status, ItemStatus::Confirmed | ItemStatus::Done)
    }

    /// Whether this item counts as finished for order completion
    pub fn is_finished(&self) -> bool {
        match self.kind {
            ItemKind::Product => matches!(self.status, ItemStatus::Done | ItemStatus::Success),
            ItemKind::Box => matches!(self.status, ItemStatus::Confirmed | ItemStatus::Done),
        }
    }
}

/// Number of items per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub default: usize,
    pub pending: usize,
    pub success: usize,
    pub error: usize,
    pub done: usize,
    pub awaiting_confirmation: usize,
    pub confirmed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    items: Vec<ChecklistItem>,
}

impl Checklist {
    pub fn new(items: Vec<ChecklistItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn get(&self, id: &str) -> Option<&ChecklistItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ChecklistItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    pub fn products(&self) -> impl Iterator<Item = &ChecklistItem> {
        self.items.iter().filter(|item| item.is_product())
    }

    pub fn box_item(&self, box_index: usize) -> Option<&ChecklistItem> {
        self.items
            .iter()
            .find(|item| item.is_box() && item.box_index == box_index)
    }

    pub fn box_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_box()).count()
    }

    pub fn products_in_box(&self, box_index: usize) -> impl Iterator<Item = &ChecklistItem> {
        self.items
            .iter()
            .filter(move |item| item.is_product() && item.box_index == box_index)
    }

    /// Whether products may be scanned into this box. A checklist without
    /// box items treats box 0 as always confirmed.
    pub fn is_box_confirmed(&self, box_index: usize) -> bool {
        match self.box_item(box_index) {
            Some(item) => item.is_confirmed_box(),
            None => self.box_count() == 0,
        }
    }

    pub fn box_own_weight(&self, box_index: usize) -> f64 {
        self.box_item(box_index)
            .map(|item| item.expected_weight)
            .unwrap_or(0.0)
    }

    /// Expected weight already sitting in the box: own weight plus done products
    pub fn settled_weight(&self, box_index: usize) -> f64 {
        let done: f64 = self
            .products_in_box(box_index)
            .filter(|item| item.status == ItemStatus::Done)
            .map(|item| item.expected_weight)
            .sum();
        self.box_own_weight(box_index) + done
    }

    pub fn pending_in_box(&self, box_index: usize) -> Option<&ChecklistItem> {
        self.items
            .iter()
            .find(|item| item.box_index == box_index && item.status == ItemStatus::Pending)
    }

    pub fn pending_items(&self) -> impl Iterator<Item = &ChecklistItem> {
        self.items
            .iter()
            .filter(|item| item.status == ItemStatus::Pending)
    }

    pub fn has_pending(&self) -> bool {
        self.pending_items().next().is_some()
    }

    /// First product in the box still waiting to be picked, in list order
    pub fn first_eligible(&self, box_index: usize) -> Option<&ChecklistItem> {
        self.products_in_box(box_index)
            .find(|item| item.status == ItemStatus::Default)
    }

    pub fn box_products_done(&self, box_index: usize) -> bool {
        self.products_in_box(box_index)
            .all(|item| item.status == ItemStatus::Done)
    }

    /// All products verified and all boxes confirmed
    pub fn is_complete(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(ChecklistItem::is_finished)
    }

    /// At most one pending item per box
    pub fn pending_invariant_holds(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.pending_items().all(|item| seen.insert(item.box_index))
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for item in &self.items {
            match item.status {
                ItemStatus::Default => counts.default += 1,
                ItemStatus::Pending => counts.pending += 1,
                ItemStatus::Success => counts.success += 1,
                ItemStatus::Error => counts.error += 1,
                ItemStatus::Done => counts.done += 1,
                ItemStatus::AwaitingConfirmation => counts.awaiting_confirmation += 1,
                ItemStatus::Confirmed => counts.confirmed += 1,
            }
        }
        counts
    }

    /// Portions already verified out of the order total
    pub fn portions_progress(&self) -> (u32, u32) {
        let total = self.products().map(|item| item.quantity).sum();
        let done = self
            .products()
            .filter(|item| item.is_finished())
            .map(|item| item.quantity)
            .sum();
        (done, total)
    }

    /// Move an item along the transition table. Returns `false` without
    /// touching the item when the edge does not exist.
    pub fn transition(&mut self, id: &str, to: ItemStatus) -> bool {
        let Some(item) = self.get_mut(id) else {
            return false;
        };
        if !item.status.can_transition_to(item.kind, to) {
            tracing::debug!(item = %id, from = %item.status, to = %to, "transition refused");
            return false;
        }
        item.status = to;
        true
    }
}
