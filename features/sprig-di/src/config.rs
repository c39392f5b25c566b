use sprig_config::{Properties, PropertyError};

/// Property enabling the lazy-field pass
pub const ALLOW_CIRCULAR_REFERENCES: &str = "sprig.allow-circular-references";

/// Default property listing the active profiles
pub const DEFAULT_PROFILE_KEY: &str = "profile";

/// Container behaviour switches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerConfig {
    /// Fill `,lazy` fields after the main pass instead of failing the refresh
    pub allow_circular_references: bool,
    /// Property holding the comma separated active profiles
    pub profile_key: String,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        ContainerConfig {
            allow_circular_references: false,
            profile_key: DEFAULT_PROFILE_KEY.to_string(),
        }
    }
}

impl ContainerConfig {
    /// Reads the switches from properties, keeping defaults for missing keys
    pub fn from_properties(properties: &Properties) -> Result<Self, PropertyError> {
        let mut config = ContainerConfig::default();
        let tag = format!("${{{ALLOW_CIRCULAR_REFERENCES}}}");
        if let Some(allow) = properties.bind::<Option<bool>>(&tag)? {
            config.allow_circular_references = allow;
        }
        Ok(config)
    }

    pub fn allow_circular_references(mut self, allow: bool) -> Self {
        self.allow_circular_references = allow;
        self
    }

    pub fn profile_key(mut self, key: impl Into<String>) -> Self {
        self.profile_key = key.into();
        self
    }

    /// Active profiles, lower-cased
    pub(crate) fn active_profiles(&self, properties: &Properties) -> Vec<String> {
        let Some(raw) = properties.get(&self.profile_key) else {
            return Vec::new();
        };
        let raw = properties.resolve(raw).unwrap_or_else(|err| {
            tracing::warn!("can't resolve active profiles: {err}");
            raw.to_string()
        });
        raw.split(',')
            .map(|profile| profile.trim().to_lowercase())
            .filter(|profile| !profile.is_empty())
            .collect()
    }
}
