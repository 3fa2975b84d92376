use std::collections::BTreeMap;

use super::analyzer::AnalyzerType;
use super::status::AnalyzerStatus;

/// Signed per-status delta counts for one analyzer type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusDelta {
    not_configured: i64,
    success: i64,
    failed: i64,
}

impl StatusDelta {
    /// Returns the delta recorded for a status.
    #[must_use]
    pub fn get(&self, status: AnalyzerStatus) -> i64 {
        match status {
            AnalyzerStatus::NotConfigured => self.not_configured,
            AnalyzerStatus::Success => self.success,
            AnalyzerStatus::Failed => self.failed,
        }
    }

    fn add(&mut self, status: AnalyzerStatus, amount: i64) {
        match status {
            AnalyzerStatus::NotConfigured => self.not_configured += amount,
            AnalyzerStatus::Success => self.success += amount,
            AnalyzerStatus::Failed => self.failed += amount,
        }
    }

    fn is_zero(&self) -> bool {
        self.not_configured == 0 && self.success == 0 && self.failed == 0
    }
}

/// Net change to the success/failure counters of every ancestor namespace
/// for one analyzer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerCounterDelta {
    /// Analyzer type the deltas apply to.
    pub analyzer_type: AnalyzerType,
    /// Signed change to the success counter.
    pub success: i64,
    /// Signed change to the failure counter.
    pub failure: i64,
}

/// Net status-transition deltas for one project, keyed by analyzer type.
///
/// Represents how namespace-level aggregate counters must change in
/// response to the project's status transitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusDiff {
    changes: BTreeMap<AnalyzerType, StatusDelta>,
}

impl StatusDiff {
    /// Computes the diff between previously persisted statuses and a newly
    /// observed set.
    ///
    /// Each changed type records `+1` for the new status and `-1` for the
    /// prior status when one existed. Types present before but absent from
    /// the new observation transition to `not_configured`.
    #[must_use]
    pub fn between(
        existing: &BTreeMap<AnalyzerType, AnalyzerStatus>,
        observed: &BTreeMap<AnalyzerType, AnalyzerStatus>,
    ) -> Self {
        let mut diff = Self::default();

        for (analyzer_type, new_status) in observed {
            diff.record(*analyzer_type, existing.get(analyzer_type).copied(), *new_status);
        }

        for (analyzer_type, old_status) in existing {
            if !observed.contains_key(analyzer_type) {
                diff.record(*analyzer_type, Some(*old_status), AnalyzerStatus::NotConfigured);
            }
        }

        diff
    }

    /// Records one status transition for an analyzer type.
    ///
    /// A transition with no prior status contributes only the `+1`.
    /// Unchanged statuses contribute nothing.
    pub fn record(
        &mut self,
        analyzer_type: AnalyzerType,
        old_status: Option<AnalyzerStatus>,
        new_status: AnalyzerStatus,
    ) {
        if old_status == Some(new_status) {
            return;
        }

        let delta = self.changes.entry(analyzer_type).or_default();
        delta.add(new_status, 1);
        if let Some(old_status) = old_status {
            delta.add(old_status, -1);
        }
    }

    /// Returns the delta recorded for one analyzer type.
    #[must_use]
    pub fn delta(&self, analyzer_type: AnalyzerType) -> Option<&StatusDelta> {
        self.changes.get(&analyzer_type)
    }

    /// Returns `true` when no transition was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.values().all(StatusDelta::is_zero)
    }

    /// Returns the success/failure counter deltas for every analyzer type
    /// with a nonzero counter change. `not_configured` transitions do not
    /// touch namespace counters.
    #[must_use]
    pub fn counter_deltas(&self) -> Vec<AnalyzerCounterDelta> {
        self.changes
            .iter()
            .map(|(analyzer_type, delta)| AnalyzerCounterDelta {
                analyzer_type: *analyzer_type,
                success: delta.get(AnalyzerStatus::Success),
                failure: delta.get(AnalyzerStatus::Failed),
            })
            .filter(|delta| delta.success != 0 || delta.failure != 0)
            .collect()
    }
}
