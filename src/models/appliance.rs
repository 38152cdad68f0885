use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{deserialize_id, deserialize_nullable_string};

/// Prefix of client-generated ids for appliances not yet confirmed by the server.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Manual-processing lifecycle of an appliance.
///
/// `queued -> processing -> {ready | error}`; `error -> queued` only through
/// an explicit retry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ApplianceStatus {
    Queued,
    Processing,
    Ready,
    Error,
}

impl ApplianceStatus {
    /// `ready` and `error` are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, ApplianceStatus::Ready | ApplianceStatus::Error)
    }

    /// Position in the forward lifecycle. Terminal states share the last rank.
    pub(crate) fn rank(self) -> u8 {
        match self {
            ApplianceStatus::Queued => 0,
            ApplianceStatus::Processing => 1,
            ApplianceStatus::Ready | ApplianceStatus::Error => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApplianceStatus::Queued => "queued",
            ApplianceStatus::Processing => "processing",
            ApplianceStatus::Ready => "ready",
            ApplianceStatus::Error => "error",
        }
    }
}

impl fmt::Display for ApplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time snapshot of an appliance and its manual processing state.
///
/// Deserialization normalizes server payloads so that `progress == 100`
/// whenever the status is `ready` and `detail` is only set for `error`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", from = "ApplianceRecord")]
pub struct Appliance {
    pub id: String,
    pub brand: String,
    pub model: String,
    pub nickname: Option<String>,
    pub status: ApplianceStatus,
    #[serde(rename = "processingProgress")]
    pub progress: u8,
    #[serde(rename = "uploadedAt")]
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub manual_file_name: Option<String>,
    pub manual_url: Option<String>,
    #[serde(rename = "statusDetail")]
    pub detail: Option<String>,
}

/// Wire shape of an appliance as the backend sends it.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplianceRecord {
    #[serde(deserialize_with = "deserialize_id")]
    id: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    brand: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    model: String,
    #[serde(default)]
    nickname: Option<String>,
    status: ApplianceStatus,
    #[serde(default)]
    processing_progress: Option<f64>,
    #[serde(alias = "createdAt")]
    uploaded_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    manual_file_name: Option<String>,
    #[serde(default)]
    manual_url: Option<String>,
    #[serde(default)]
    status_detail: Option<String>,
}

impl From<ApplianceRecord> for Appliance {
    fn from(record: ApplianceRecord) -> Self {
        let progress = record
            .processing_progress
            .map(|p| p.round().clamp(0.0, 100.0) as u8)
            .unwrap_or(0);
        Appliance {
            id: record.id,
            brand: record.brand,
            model: record.model,
            nickname: record.nickname,
            status: record.status,
            progress,
            created_at: record.uploaded_at,
            updated_at: record.updated_at,
            manual_file_name: record.manual_file_name,
            manual_url: record.manual_url,
            detail: record.status_detail,
        }
        .normalized()
    }
}

impl Appliance {
    /// Enforce the snapshot invariants.
    pub fn normalized(mut self) -> Self {
        self.progress = self.progress.min(100);
        if self.status == ApplianceStatus::Ready {
            self.progress = 100;
        }
        if self.status != ApplianceStatus::Error {
            self.detail = None;
        }
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// True for snapshots inserted optimistically that the server has not confirmed.
    pub fn is_provisional(&self) -> bool {
        self.id.starts_with(TEMP_ID_PREFIX)
    }

    /// Name shown in notifications: the nickname if set, otherwise brand and model.
    pub fn display_name(&self) -> String {
        match self.nickname.as_deref() {
            Some(nickname) if !nickname.trim().is_empty() => nickname.to_string(),
            _ => format!("{} {}", self.brand, self.model).trim().to_string(),
        }
    }

    /// Build the provisional snapshot used while an upload is in flight.
    pub fn provisional(input: &NewAppliance, now: DateTime<Utc>) -> Self {
        Appliance {
            id: format!("{}{}", TEMP_ID_PREFIX, Uuid::new_v4()),
            brand: input.brand.clone(),
            model: input.model.clone(),
            nickname: input.nickname.clone(),
            status: ApplianceStatus::Queued,
            progress: 0,
            created_at: now,
            updated_at: now,
            manual_file_name: Some(input.manual_file_name.clone()),
            manual_url: None,
            detail: None,
        }
    }

    /// Copy of this snapshot re-entering `queued` after a retry request.
    pub fn requeued(&self, now: DateTime<Utc>) -> Self {
        Appliance {
            status: ApplianceStatus::Queued,
            progress: 0,
            detail: None,
            manual_url: None,
            updated_at: now.max(self.updated_at),
            ..self.clone()
        }
    }
}

/// Input for registering a new appliance and its manual.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewAppliance {
    pub brand: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    pub manual_file_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApplianceEnvelope {
    pub appliance: Appliance,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApplianceListEnvelope {
    pub appliances: Vec<Appliance>,
}
