use std::str::FromStr;

use scanledger_core::AppError;
use serde::{Deserialize, Serialize};

use super::pipeline::CiJobStatus;

/// Aggregated status of one analyzer type for a project.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerStatus {
    /// The analyzer is not set up or no longer reports.
    NotConfigured,
    /// The analyzer ran and succeeded.
    Success,
    /// The analyzer ran and failed.
    Failed,
}

impl AnalyzerStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Priority used when several jobs report for the same analyzer type:
    /// any failure anywhere dominates.
    #[must_use]
    pub fn priority(&self) -> u8 {
        match self {
            Self::NotConfigured => 0,
            Self::Success => 1,
            Self::Failed => 2,
        }
    }

    /// Returns the higher-priority of two statuses.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        if other.priority() > self.priority() {
            other
        } else {
            self
        }
    }

    /// Maps a completed CI job status onto an analyzer status.
    #[must_use]
    pub fn from_ci_status(status: CiJobStatus) -> Self {
        match status {
            CiJobStatus::Success => Self::Success,
            CiJobStatus::Failed | CiJobStatus::Canceled | CiJobStatus::Skipped => Self::Failed,
        }
    }
}

impl FromStr for AnalyzerStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "not_configured" => Ok(Self::NotConfigured),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(AppError::Validation(format!(
                "unknown analyzer status value '{value}'"
            ))),
        }
    }
}
