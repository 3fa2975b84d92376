use serde::{Deserialize, Serialize};

use super::analyzer::AnalyzerType;
use super::status::AnalyzerStatus;

/// Boolean security toggles of one project, driving the settings-based
/// analyzer types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecuritySettings {
    /// Pre-receive secret push protection toggle.
    pub secret_push_protection_enabled: bool,
    /// Registry-triggered container scanning toggle.
    pub container_scanning_for_registry_enabled: bool,
}

impl SecuritySettings {
    /// Returns the toggle value backing a settings-based analyzer type, or
    /// `None` for types not driven by a setting.
    #[must_use]
    pub fn toggle(&self, analyzer_type: AnalyzerType) -> Option<bool> {
        match analyzer_type {
            AnalyzerType::SecretPushProtection => Some(self.secret_push_protection_enabled),
            AnalyzerType::ContainerScanningForRegistry => {
                Some(self.container_scanning_for_registry_enabled)
            }
            _ => None,
        }
    }

    /// Maps a settings-based analyzer type onto its status: an enabled
    /// toggle counts as success, a disabled one as not configured.
    #[must_use]
    pub fn status_for(&self, analyzer_type: AnalyzerType) -> Option<AnalyzerStatus> {
        self.toggle(analyzer_type).map(|enabled| {
            if enabled {
                AnalyzerStatus::Success
            } else {
                AnalyzerStatus::NotConfigured
            }
        })
    }
}
