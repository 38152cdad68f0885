use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a tailoring run. `idle` and `streaming` are the only
/// non-terminal values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Idle,
    Streaming,
    Complete,
    Error,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Complete | RunStatus::Error | RunStatus::Cancelled
        )
    }
}

/// One step of a tailored recipe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstructionBlock {
    pub id: String,
    pub order: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appliance_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

/// Cache identity of a tailoring run: the recipe plus the selected appliances.
///
/// Appliance selection is order-independent, so ids are trimmed, deduplicated
/// and sorted on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TailorKey {
    recipe_id: String,
    appliance_ids: Vec<String>,
}

impl TailorKey {
    pub fn new<I, S>(recipe_id: impl Into<String>, appliance_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ids: Vec<String> = appliance_ids
            .into_iter()
            .map(|id| id.as_ref().trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        ids.sort();
        ids.dedup();
        Self {
            recipe_id: recipe_id.into(),
            appliance_ids: ids,
        }
    }

    pub fn recipe_id(&self) -> &str {
        &self.recipe_id
    }

    pub fn appliance_ids(&self) -> &[String] {
        &self.appliance_ids
    }

    /// Comma-separated appliance ids as sent in the history query string.
    pub fn appliances_param(&self) -> String {
        self.appliance_ids.join(",")
    }
}

impl fmt::Display for TailorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.recipe_id, self.appliances_param())
    }
}

/// One execution of the tailoring operation and its accumulated result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TailoringRun {
    pub run_id: String,
    pub recipe_id: String,
    #[serde(default)]
    pub appliance_ids: Vec<String>,
    #[serde(default)]
    pub status: RunStatus,
    #[serde(default)]
    pub blocks: Vec<InstructionBlock>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub recommended_appliances: Vec<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TailoringRun {
    /// Create an idle run for the given key.
    pub fn new(key: &TailorKey) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            recipe_id: key.recipe_id().to_string(),
            appliance_ids: key.appliance_ids().to_vec(),
            status: RunStatus::Idle,
            blocks: Vec::new(),
            summary: None,
            recommended_appliances: Vec::new(),
            error_message: None,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn key(&self) -> TailorKey {
        TailorKey::new(self.recipe_id.clone(), &self.appliance_ids)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Insert a block unless one with the same id is already present, then
    /// keep the sequence sorted by `order`. Returns true if it was inserted.
    pub fn insert_block(&mut self, block: InstructionBlock) -> bool {
        if self.blocks.iter().any(|existing| existing.id == block.id) {
            return false;
        }
        self.blocks.push(block);
        self.blocks
            .sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        true
    }

    /// Overwrite summary and recommendations with the fields present in a
    /// metadata frame. Nothing else is touched.
    pub fn apply_meta(&mut self, summary: Option<String>, recommended: Option<Vec<String>>) {
        if let Some(summary) = summary {
            self.summary = Some(summary);
        }
        if let Some(recommended) = recommended {
            self.recommended_appliances = recommended;
        }
    }

    pub(crate) fn mark_streaming(&mut self, now: DateTime<Utc>) {
        self.status = RunStatus::Streaming;
        self.started_at = Some(now);
        self.completed_at = None;
        self.error_message = None;
    }

    /// Returns false (no-op) when the run is already terminal.
    pub(crate) fn mark_complete(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = RunStatus::Complete;
        self.completed_at = Some(now);
        true
    }

    pub(crate) fn mark_error(&mut self, message: String, now: DateTime<Utc>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = RunStatus::Error;
        self.error_message = Some(message);
        self.completed_at = Some(now);
        true
    }

    pub(crate) fn mark_cancelled(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = RunStatus::Cancelled;
        self.error_message = None;
        self.completed_at = Some(now);
        true
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TailorRequest<'a> {
    pub appliances: &'a [String],
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryEnvelope {
    #[serde(default)]
    pub history: Option<TailoringRun>,
}
