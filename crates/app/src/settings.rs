//! `userSettings` and `savedConfigs` persistence.

use std::sync::Arc;

use aimg_core::request::{build_params, GenerationForm, GenerationMode, GenerationParams};
use aimg_core::settings::{SavedConfig, UserSettings};
use aimg_core::types::Timestamp;
use aimg_core::CoreError;
use aimg_store::{keys, load_json, save_json, LocalStore, StoreError};

use crate::error::ConsoleError;

pub struct SettingsStore {
    store: Arc<dyn LocalStore>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Current display settings; defaults when absent or unreadable.
    pub fn user_settings(&self) -> UserSettings {
        match load_json(self.store.as_ref(), keys::USER_SETTINGS) {
            Ok(Some(settings)) => settings,
            Ok(None) => UserSettings::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable user settings");
                UserSettings::default()
            }
        }
    }

    pub fn save_user_settings(&self, settings: &UserSettings) -> Result<(), ConsoleError> {
        settings.validate()?;
        save_json(self.store.as_ref(), keys::USER_SETTINGS, settings)?;
        Ok(())
    }

    /// A reset generation form using the saved default dimensions.
    pub fn new_form(&self) -> GenerationForm {
        self.user_settings().new_form()
    }

    /// Saved configurations in the order they were first saved.
    pub fn saved_configs(&self) -> Vec<SavedConfig> {
        match load_json(self.store.as_ref(), keys::SAVED_CONFIGS) {
            Ok(Some(configs)) => configs,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable saved configurations");
                Vec::new()
            }
        }
    }

    /// Save the text-to-image fields of `form` under `name`.
    ///
    /// Saving under an existing name replaces that configuration in place.
    pub fn save_config(
        &self,
        name: &str,
        form: &GenerationForm,
        now: Timestamp,
    ) -> Result<SavedConfig, ConsoleError> {
        let params = match build_params(GenerationMode::Text2Image, form) {
            GenerationParams::Text2Image(params) => params,
            GenerationParams::Image2Image(_) => {
                return Err(CoreError::Validation("Only text-to-image forms can be saved".into()).into())
            }
        };
        let saved = SavedConfig::new(name, params, now)?;

        let mut configs = self.saved_configs();
        match configs.iter_mut().find(|c| c.name == saved.name) {
            Some(existing) => *existing = saved.clone(),
            None => configs.push(saved.clone()),
        }
        self.write_configs(&configs)?;
        tracing::info!(name = %saved.name, "Saved generation configuration");
        Ok(saved)
    }

    pub fn find_config(&self, name: &str) -> Option<SavedConfig> {
        let name = name.trim();
        self.saved_configs().into_iter().find(|c| c.name == name)
    }

    /// Remove a saved configuration. Returns whether one was removed.
    pub fn delete_config(&self, name: &str) -> Result<bool, ConsoleError> {
        let mut configs = self.saved_configs();
        let before = configs.len();
        configs.retain(|c| c.name != name.trim());
        if configs.len() == before {
            return Ok(false);
        }
        self.write_configs(&configs)?;
        Ok(true)
    }

    fn write_configs(&self, configs: &[SavedConfig]) -> Result<(), StoreError> {
        save_json(self.store.as_ref(), keys::SAVED_CONFIGS, configs)
    }
}
