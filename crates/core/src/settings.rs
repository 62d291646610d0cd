//! User display settings and named saved configurations.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::request::{GenerationForm, GenerationParams, Text2ImageParams, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::types::Timestamp;

/// Largest width/height accepted for the default dimensions.
pub const MAX_DIMENSION: u32 = 8192;

/// Persisted under `userSettings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(default = "default_width")]
    pub default_width: u32,
    #[serde(default = "default_height")]
    pub default_height: u32,
}

fn default_width() -> u32 {
    DEFAULT_WIDTH
}

fn default_height() -> u32 {
    DEFAULT_HEIGHT
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            default_width: DEFAULT_WIDTH,
            default_height: DEFAULT_HEIGHT,
        }
    }
}

impl UserSettings {
    pub fn validate(&self) -> Result<(), CoreError> {
        for (field, value) in [
            ("default width", self.default_width),
            ("default height", self.default_height),
        ] {
            if value == 0 || value > MAX_DIMENSION {
                return Err(CoreError::Validation(format!(
                    "{field} must be between 1 and {MAX_DIMENSION}, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// A reset generation form using these dimensions.
    pub fn new_form(&self) -> GenerationForm {
        GenerationForm::with_dimensions(self.default_width, self.default_height)
    }
}

/// A named text-to-image configuration, persisted in `savedConfigs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedConfig {
    pub name: String,
    pub timestamp: Timestamp,
    pub config: Text2ImageParams,
}

impl SavedConfig {
    pub fn new(name: &str, config: Text2ImageParams, timestamp: Timestamp) -> Result<Self, CoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation(
                "Configuration name must not be empty".into(),
            ));
        }
        Ok(Self {
            name: name.to_string(),
            timestamp,
            config,
        })
    }

    /// Load this configuration into a form.
    pub fn apply_to(&self, form: &mut GenerationForm) {
        form.fill(&GenerationParams::Text2Image(self.config.clone()));
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::request::{build_params, GenerationMode};

    #[test]
    fn settings_use_camel_case_keys_and_defaults() {
        let settings: UserSettings =
            serde_json::from_value(serde_json::json!({"defaultWidth": 768})).unwrap();
        assert_eq!(settings.default_width, 768);
        assert_eq!(settings.default_height, DEFAULT_HEIGHT);
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let settings = UserSettings {
            default_width: 0,
            default_height: 512,
        };
        assert!(settings.validate().is_err());
        assert!(UserSettings::default().validate().is_ok());
    }

    #[test]
    fn new_form_uses_configured_dimensions() {
        let settings = UserSettings {
            default_width: 1024,
            default_height: 768,
        };
        let form = settings.new_form();
        assert_eq!(form.width, "1024");
        assert_eq!(form.height, "768");
        assert!(form.random_seed);
    }

    #[test]
    fn saved_config_requires_a_name_and_applies_back() {
        let mut form = GenerationForm::default();
        form.prompt = "harbor".into();
        form.width = "640".into();
        let GenerationParams::Text2Image(params) = build_params(GenerationMode::Text2Image, &form)
        else {
            panic!("expected text-to-image params");
        };

        assert!(SavedConfig::new("  ", params.clone(), Utc::now()).is_err());

        let saved = SavedConfig::new(" evening ", params, Utc::now()).unwrap();
        assert_eq!(saved.name, "evening");

        let mut target = GenerationForm::default();
        saved.apply_to(&mut target);
        assert_eq!(target.prompt, "harbor");
        assert_eq!(target.width, "640");
    }
}
