//! Analytics output types.

use chrono::{DateTime, Utc};
use quarry_core::{MessageId, SourceDataset};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::reports::{BestYear, CombinedReport, PopulationStats};

/// Identity of one input object, so two results can be compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFingerprint {
    pub dataset: SourceDataset,
    pub key: String,
    pub sha256: String,
    pub size: u64,
}

impl InputFingerprint {
    #[must_use]
    pub fn of(dataset: SourceDataset, key: &str, bytes: &[u8]) -> Self {
        Self {
            dataset,
            key: key.to_string(),
            sha256: format!("{:x}", Sha256::digest(bytes)),
            size: bytes.len() as u64,
        }
    }
}

/// Everything derived from one pair of latest objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsResult {
    pub inputs: Vec<InputFingerprint>,
    /// Series rows skipped as unparseable.
    pub skipped_rows: usize,
    pub population: PopulationStats,
    pub best_years: Vec<BestYear>,
    pub combined: CombinedReport,
}

/// One entry in the observability sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Triggering message; `None` for manual runs.
    pub message_id: Option<MessageId>,
    pub event_key: Option<String>,
    pub emitted_at: DateTime<Utc>,
    pub result: AnalyticsResult,
}
