//! Scene configuration

use serde::{Deserialize, Serialize};

use crate::error::{EcsError, Result};

/// Scene construction settings.
///
/// Loadable from JSON; missing fields fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Name used in logs and inspector output
    pub name: String,

    /// Entities to reserve room for up front
    pub entity_capacity: usize,

    /// Stage entities from `create_entity` for system registration.
    /// `create_empty_entity` never does.
    pub register_on_create: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            name: "scene".to_string(),
            entity_capacity: 256,
            register_on_create: true,
        }
    }
}

impl SceneConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SceneConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(EcsError::ConfigError("scene name must not be empty".into()));
        }
        // Entity indices are u32 and u32::MAX is the null sentinel.
        if self.entity_capacity >= u32::MAX as usize {
            return Err(EcsError::ConfigError(format!(
                "entity_capacity {} exceeds the index space",
                self.entity_capacity
            )));
        }
        Ok(())
    }
}
