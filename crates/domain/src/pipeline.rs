use std::collections::BTreeMap;
use std::str::FromStr;

use scanledger_core::AppError;
use serde::{Deserialize, Serialize};

use super::analyzer::AnalyzerType;
use super::status::AnalyzerStatus;

/// Job name of the advanced SAST engine, tracked as `sast_advanced`.
const ADVANCED_SAST_JOB_NAME: &str = "gitlab-advanced-sast";

/// Job name of the KICS IaC scanner, which declares a SAST report but is
/// tracked as `sast_iac` and excluded from plain `sast`.
const IAC_SAST_JOB_NAME: &str = "kics-iac-sast";

/// Terminal CI job statuses considered by the aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CiJobStatus {
    /// Job finished successfully.
    Success,
    /// Job finished with a failure.
    Failed,
    /// Job was canceled before completion.
    Canceled,
    /// Job was skipped.
    Skipped,
}

impl CiJobStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Skipped => "skipped",
        }
    }
}

impl FromStr for CiJobStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "canceled" => Ok(Self::Canceled),
            "skipped" => Ok(Self::Skipped),
            _ => Err(AppError::Validation(format!(
                "unknown ci job status value '{value}'"
            ))),
        }
    }
}

/// Security report artifact types a scan job can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    /// SAST report.
    Sast,
    /// DAST report.
    Dast,
    /// Secret detection report.
    SecretDetection,
    /// Dependency scanning report.
    DependencyScanning,
    /// Container scanning report.
    ContainerScanning,
    /// Coverage fuzzing report.
    CoverageFuzzing,
}

impl ReportType {
    /// Returns a stable storage value for this report type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sast => "sast",
            Self::Dast => "dast",
            Self::SecretDetection => "secret_detection",
            Self::DependencyScanning => "dependency_scanning",
            Self::ContainerScanning => "container_scanning",
            Self::CoverageFuzzing => "coverage_fuzzing",
        }
    }
}

impl FromStr for ReportType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "sast" => Ok(Self::Sast),
            "dast" => Ok(Self::Dast),
            "secret_detection" => Ok(Self::SecretDetection),
            "dependency_scanning" => Ok(Self::DependencyScanning),
            "container_scanning" => Ok(Self::ContainerScanning),
            "coverage_fuzzing" => Ok(Self::CoverageFuzzing),
            _ => Err(AppError::Validation(format!(
                "unknown report type value '{value}'"
            ))),
        }
    }
}

/// One completed security-scanning job of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityJob {
    name: String,
    status: CiJobStatus,
    report_types: Vec<ReportType>,
}

impl SecurityJob {
    /// Creates a completed security job record.
    #[must_use]
    pub fn new(name: impl Into<String>, status: CiJobStatus, report_types: Vec<ReportType>) -> Self {
        Self {
            name: name.into(),
            status,
            report_types,
        }
    }

    /// Returns the job name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the terminal CI status of the job.
    #[must_use]
    pub fn status(&self) -> CiJobStatus {
        self.status
    }

    /// Returns the analyzer types this job reports for.
    ///
    /// A job maps to one analyzer type per declared report, with two SAST
    /// special cases: the advanced SAST job reports under `sast_advanced`
    /// and the KICS IaC job under `sast_iac`, so neither feeds the plain
    /// `sast` status of the ordinary SAST jobs.
    #[must_use]
    pub fn analyzer_types(&self) -> Vec<AnalyzerType> {
        let mut types = Vec::new();

        for report_type in &self.report_types {
            match report_type {
                ReportType::Sast => match self.name.as_str() {
                    IAC_SAST_JOB_NAME => types.push(AnalyzerType::SastIac),
                    ADVANCED_SAST_JOB_NAME => types.push(AnalyzerType::SastAdvanced),
                    _ => types.push(AnalyzerType::Sast),
                },
                ReportType::Dast => types.push(AnalyzerType::Dast),
                ReportType::SecretDetection => {
                    types.push(AnalyzerType::SecretDetectionPipelineBased);
                }
                ReportType::DependencyScanning => types.push(AnalyzerType::DependencyScanning),
                ReportType::ContainerScanning => {
                    types.push(AnalyzerType::ContainerScanningPipelineBased);
                }
                ReportType::CoverageFuzzing => types.push(AnalyzerType::CoverageFuzzing),
            }
        }

        types
    }

    /// Returns the analyzer status this job contributes.
    #[must_use]
    pub fn analyzer_status(&self) -> AnalyzerStatus {
        AnalyzerStatus::from_ci_status(self.status)
    }
}

/// Merges completed jobs into one observed status per analyzer type.
///
/// When multiple jobs report for the same type the highest-priority status
/// wins (failed > success > not_configured).
#[must_use]
pub fn observed_statuses(jobs: &[SecurityJob]) -> BTreeMap<AnalyzerType, AnalyzerStatus> {
    let mut statuses = BTreeMap::new();

    for job in jobs {
        let job_status = job.analyzer_status();
        for analyzer_type in job.analyzer_types() {
            statuses
                .entry(analyzer_type)
                .and_modify(|current: &mut AnalyzerStatus| *current = current.merge(job_status))
                .or_insert(job_status);
        }
    }

    statuses
}
