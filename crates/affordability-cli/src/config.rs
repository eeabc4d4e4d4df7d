use serde::Deserialize;

use affordability_core::policy::{AssessmentSettings, PolicySet};
use affordability_core::scenario::ApplicationSnapshot;

use crate::input;

/// Overrides loaded from `--policy-file`. Absent sections keep the built-in presets.
#[derive(Debug, Default, Deserialize)]
pub struct PolicyFile {
    #[serde(default)]
    pub policies: Option<PolicySet>,
    #[serde(default)]
    pub settings: Option<AssessmentSettings>,
}

impl PolicyFile {
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        match path {
            Some(path) => {
                let file: PolicyFile = input::file::read_structured(path)?;
                tracing::debug!(
                    path,
                    policies = file.policies.is_some(),
                    settings = file.settings.is_some(),
                    "loaded policy file"
                );
                Ok(file)
            }
            None => Ok(PolicyFile::default()),
        }
    }

    pub fn policies(&self) -> PolicySet {
        self.policies.clone().unwrap_or_default()
    }

    pub fn settings(&self) -> AssessmentSettings {
        self.settings.clone().unwrap_or_default()
    }

    /// Replace the snapshot's policies and settings with any loaded overrides.
    pub fn apply(&self, snapshot: &mut ApplicationSnapshot) {
        if let Some(policies) = &self.policies {
            snapshot.policies = policies.clone();
        }
        if let Some(settings) = &self.settings {
            snapshot.settings = settings.clone();
        }
    }
}
