use std::str::FromStr;

use scanledger_core::AppError;
use serde::{Deserialize, Serialize};

/// Categories of security scanners tracked per project and per namespace.
///
/// Pipeline-based types are derived from completed CI scan jobs,
/// settings-based types from project security toggles. The two umbrella
/// types (`SecretDetection`, `ContainerScanning`) aggregate a pipeline-based
/// and a settings-based member each.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerType {
    /// Static application security testing.
    Sast,
    /// GitLab advanced SAST engine, tracked separately from plain SAST.
    SastAdvanced,
    /// Infrastructure-as-code SAST.
    SastIac,
    /// Dynamic application security testing.
    Dast,
    /// Dependency scanning.
    DependencyScanning,
    /// Coverage-guided fuzz testing.
    CoverageFuzzing,
    /// Pipeline-based secret detection.
    SecretDetectionPipelineBased,
    /// Pipeline-based container scanning.
    ContainerScanningPipelineBased,
    /// Pre-receive secret push protection (settings toggle).
    SecretPushProtection,
    /// Registry-triggered container scanning (settings toggle).
    ContainerScanningForRegistry,
    /// Umbrella over both secret detection members.
    SecretDetection,
    /// Umbrella over both container scanning members.
    ContainerScanning,
}

/// Analyzer types whose status is derived from completed pipeline jobs.
const PIPELINE_BASED: &[AnalyzerType] = &[
    AnalyzerType::Sast,
    AnalyzerType::SastAdvanced,
    AnalyzerType::SastIac,
    AnalyzerType::Dast,
    AnalyzerType::DependencyScanning,
    AnalyzerType::CoverageFuzzing,
    AnalyzerType::SecretDetectionPipelineBased,
    AnalyzerType::ContainerScanningPipelineBased,
];

const SECRET_DETECTION_MEMBERS: &[AnalyzerType] = &[
    AnalyzerType::SecretDetectionPipelineBased,
    AnalyzerType::SecretPushProtection,
];

const CONTAINER_SCANNING_MEMBERS: &[AnalyzerType] = &[
    AnalyzerType::ContainerScanningPipelineBased,
    AnalyzerType::ContainerScanningForRegistry,
];

impl AnalyzerType {
    /// Returns a stable storage value for this analyzer type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sast => "sast",
            Self::SastAdvanced => "sast_advanced",
            Self::SastIac => "sast_iac",
            Self::Dast => "dast",
            Self::DependencyScanning => "dependency_scanning",
            Self::CoverageFuzzing => "coverage_fuzzing",
            Self::SecretDetectionPipelineBased => "secret_detection_pipeline_based",
            Self::ContainerScanningPipelineBased => "container_scanning_pipeline_based",
            Self::SecretPushProtection => "secret_push_protection",
            Self::ContainerScanningForRegistry => "container_scanning_for_registry",
            Self::SecretDetection => "secret_detection",
            Self::ContainerScanning => "container_scanning",
        }
    }

    /// Returns all known analyzer types.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[AnalyzerType] = &[
            AnalyzerType::Sast,
            AnalyzerType::SastAdvanced,
            AnalyzerType::SastIac,
            AnalyzerType::Dast,
            AnalyzerType::DependencyScanning,
            AnalyzerType::CoverageFuzzing,
            AnalyzerType::SecretDetectionPipelineBased,
            AnalyzerType::ContainerScanningPipelineBased,
            AnalyzerType::SecretPushProtection,
            AnalyzerType::ContainerScanningForRegistry,
            AnalyzerType::SecretDetection,
            AnalyzerType::ContainerScanning,
        ];

        ALL
    }

    /// Returns the analyzer types derived from pipeline scan jobs.
    #[must_use]
    pub fn pipeline_based() -> &'static [Self] {
        PIPELINE_BASED
    }

    /// Returns `true` when this type is derived from pipeline scan jobs.
    #[must_use]
    pub fn is_pipeline_based(&self) -> bool {
        PIPELINE_BASED.contains(self)
    }

    /// Returns `true` when this type is driven by a project security toggle.
    #[must_use]
    pub fn is_settings_based(&self) -> bool {
        matches!(
            self,
            Self::SecretPushProtection | Self::ContainerScanningForRegistry
        )
    }

    /// Returns the umbrella type this member rolls up into, if any.
    #[must_use]
    pub fn umbrella(&self) -> Option<Self> {
        match self {
            Self::SecretDetectionPipelineBased | Self::SecretPushProtection => {
                Some(Self::SecretDetection)
            }
            Self::ContainerScanningPipelineBased | Self::ContainerScanningForRegistry => {
                Some(Self::ContainerScanning)
            }
            _ => None,
        }
    }

    /// Returns the member types of an umbrella type, if this is one.
    #[must_use]
    pub fn members(&self) -> Option<&'static [Self]> {
        match self {
            Self::SecretDetection => Some(SECRET_DETECTION_MEMBERS),
            Self::ContainerScanning => Some(CONTAINER_SCANNING_MEMBERS),
            _ => None,
        }
    }
}

impl FromStr for AnalyzerType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "sast" => Ok(Self::Sast),
            "sast_advanced" => Ok(Self::SastAdvanced),
            "sast_iac" => Ok(Self::SastIac),
            "dast" => Ok(Self::Dast),
            "dependency_scanning" => Ok(Self::DependencyScanning),
            "coverage_fuzzing" => Ok(Self::CoverageFuzzing),
            "secret_detection_pipeline_based" => Ok(Self::SecretDetectionPipelineBased),
            "container_scanning_pipeline_based" => Ok(Self::ContainerScanningPipelineBased),
            "secret_push_protection" => Ok(Self::SecretPushProtection),
            "container_scanning_for_registry" => Ok(Self::ContainerScanningForRegistry),
            "secret_detection" => Ok(Self::SecretDetection),
            "container_scanning" => Ok(Self::ContainerScanning),
            _ => Err(AppError::Validation(format!(
                "unknown analyzer type value '{value}'"
            ))),
        }
    }
}
