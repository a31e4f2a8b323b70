//! Cost ledger for one generation run.
//!
//! The ledger is an append-only list of [`UsageLineItem`]s plus a running
//! total. The total is maintained incrementally on every append and is
//! never recomputed from persisted state.

use serde::{Deserialize, Serialize};

use crate::pricing::MODEL_REMBG;
use crate::types::TokenAmount;

// ---------------------------------------------------------------------------
// Line items
// ---------------------------------------------------------------------------

/// Token cost split for an image cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub generation: TokenAmount,
    pub background_removal: TokenAmount,
}

impl CostBreakdown {
    pub fn total(&self) -> TokenAmount {
        self.generation + self.background_removal
    }
}

/// Ledger label of an image cell, e.g. `全身画像（normal）（anything-v4.0 + rembg）`.
pub fn image_label(pose_label: &str, expression: &str, model: &str, transparent: bool) -> String {
    let rembg = if transparent {
        format!(" + {MODEL_REMBG}")
    } else {
        String::new()
    };
    format!("{pose_label}画像（{expression}）（{model}{rembg}）")
}

/// Usage audit detail of an image cell: `{pose}_{expression}`, with a
/// `_transparent` suffix for background removal.
pub fn cell_usage_detail(pose: &str, expression: &str, transparent: bool) -> String {
    if transparent {
        format!("{pose}_{expression}_transparent")
    } else {
        format!("{pose}_{expression}")
    }
}

/// One billable sub-operation of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLineItem {
    pub label: String,
    pub token_cost: TokenAmount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<CostBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pose_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
}

impl UsageLineItem {
    /// Line item for a generated image cell.
    pub fn image(
        label: impl Into<String>,
        breakdown: CostBreakdown,
        seed: i64,
        pose_type: &str,
        expression_type: &str,
    ) -> Self {
        Self {
            label: label.into(),
            token_cost: breakdown.total(),
            breakdown: Some(breakdown),
            seed: Some(seed),
            pose_type: Some(pose_type.to_string()),
            expression_type: Some(expression_type.to_string()),
            event_type: None,
        }
    }

    /// Line item for a generated comment.
    pub fn comment(label: impl Into<String>, token_cost: TokenAmount, event_type: &str) -> Self {
        Self {
            label: label.into(),
            token_cost,
            breakdown: None,
            seed: None,
            pose_type: None,
            expression_type: None,
            event_type: Some(event_type.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// CostLedger
// ---------------------------------------------------------------------------

/// Itemized usage plus running total for a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CostLedger {
    items: Vec<UsageLineItem>,
    total: TokenAmount,
}

impl CostLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item and add its cost to the running total.
    pub fn append(&mut self, item: UsageLineItem) {
        self.total += item.token_cost;
        self.items.push(item);
    }

    pub fn total(&self) -> TokenAmount {
        self.total
    }

    pub fn items(&self) -> &[UsageLineItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<UsageLineItem> {
        self.items
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
