//! Transfer data types

use serde::{Deserialize, Serialize};

/// Transfer direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    /// Local to remote
    Upload,
    /// Remote to local
    Download,
}

/// Transfer status
///
/// ```text
/// pending -> transferring -> completed | failed | cancelled
///               |    ^
///               v    |
///              paused
/// ```
/// `pending` may also go straight to `failed` or `cancelled` when the
/// transfer never starts streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    /// Waiting in queue
    Pending,
    /// Stream running
    Transferring,
    /// Stream suspended by the user
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl TransferStatus {
    /// No further updates are accepted once terminal
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferStatus::Completed | TransferStatus::Failed | TransferStatus::Cancelled
        )
    }

    /// Whether the state machine allows `self -> next`
    pub fn can_transition_to(&self, next: TransferStatus) -> bool {
        use TransferStatus::*;
        matches!(
            (*self, next),
            (Pending, Transferring)
                | (Pending, Failed)
                | (Pending, Cancelled)
                | (Transferring, Paused)
                | (Transferring, Completed)
                | (Transferring, Failed)
                | (Transferring, Cancelled)
                | (Paused, Transferring)
                | (Paused, Failed)
                | (Paused, Cancelled)
        )
    }

    /// Whether "clear completed" removes items in this status
    pub fn is_clearable(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Failed)
    }
}

/// Byte progress of one transfer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferProgress {
    pub bytes: u64,
    pub total_bytes: u64,
    /// `round(bytes / total_bytes * 100)`, clamped to 0..=100
    pub percentage: u8,
}

impl TransferProgress {
    pub fn new(bytes: u64, total_bytes: u64) -> Self {
        Self {
            bytes,
            total_bytes,
            percentage: percentage(bytes, total_bytes),
        }
    }
}

/// Rounded completion percentage. An unknown (zero) total reports 0.
pub fn percentage(bytes: u64, total_bytes: u64) -> u8 {
    if total_bytes == 0 {
        return 0;
    }
    let pct = (bytes as f64 / total_bytes as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// One queued file copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferItem {
    pub id: String,
    pub direction: TransferDirection,
    pub file_name: String,
    pub file_size: u64,
    pub source_path: String,
    pub destination_path: String,
    /// Tab whose destination panel is refreshed on completion
    pub tab_id: String,
    pub progress: TransferProgress,
    pub status: TransferStatus,
    pub error: Option<String>,
}

impl TransferItem {
    /// New item in `pending`
    pub fn new(
        tab_id: impl Into<String>,
        direction: TransferDirection,
        file_name: impl Into<String>,
        file_size: u64,
        source_path: impl Into<String>,
        destination_path: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            direction,
            file_name: file_name.into(),
            file_size,
            source_path: source_path.into(),
            destination_path: destination_path.into(),
            tab_id: tab_id.into(),
            progress: TransferProgress::new(0, file_size),
            status: TransferStatus::Pending,
            error: None,
        }
    }
}

/// Signals streamed by a transfer backend, in stream order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferSignal {
    /// The underlying stream has begun
    Started,
    Progress { bytes: u64, total_bytes: u64 },
}
