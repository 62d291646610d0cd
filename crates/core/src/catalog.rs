//! Server status and the resource catalog used to populate form selectors.
//!
//! The catalog is always replaced wholesale from a single
//! `GET /api/status` response. Selector projections are pure functions of
//! the catalog plus the caller's current selection.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Status response
// ---------------------------------------------------------------------------

/// Health of one generation server as reported by `/api/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerHealth {
    pub name: String,
    #[serde(default)]
    pub healthy: bool,
    #[serde(default)]
    pub busy: bool,
}

/// Display state derived from a server's health flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Online,
    Busy,
    Offline,
}

impl ServerState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Busy => "busy",
            Self::Offline => "offline",
        }
    }
}

impl ServerHealth {
    pub fn state(&self) -> ServerState {
        match (self.healthy, self.busy) {
            (false, _) => ServerState::Offline,
            (true, true) => ServerState::Busy,
            (true, false) => ServerState::Online,
        }
    }
}

/// Full body of `GET /api/status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub servers: Vec<ServerHealth>,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub loras: Vec<String>,
    #[serde(default)]
    pub samplers: Vec<String>,
    #[serde(default)]
    pub schedulers: Vec<String>,
    #[serde(default)]
    pub workflows: Vec<String>,
    #[serde(default)]
    pub default_sampler: Option<String>,
    #[serde(default)]
    pub default_scheduler: Option<String>,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Server-reported selectable options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceCatalog {
    pub models: Vec<String>,
    pub loras: Vec<String>,
    pub samplers: Vec<String>,
    pub schedulers: Vec<String>,
    pub workflows: Vec<String>,
    pub default_sampler: Option<String>,
    pub default_scheduler: Option<String>,
}

impl From<&StatusResponse> for ResourceCatalog {
    fn from(status: &StatusResponse) -> Self {
        Self {
            models: status.models.clone(),
            loras: status.loras.clone(),
            samplers: status.samplers.clone(),
            schedulers: status.schedulers.clone(),
            workflows: status.workflows.clone(),
            default_sampler: status.default_sampler.clone(),
            default_scheduler: status.default_scheduler.clone(),
        }
    }
}

/// Label of the sentinel first option of every selector.
pub const DEFAULT_MODEL_LABEL: &str = "Default model";
pub const DEFAULT_SAMPLER_LABEL: &str = "Default sampler";
pub const DEFAULT_SCHEDULER_LABEL: &str = "Default scheduler";
pub const DEFAULT_LORA_LABEL: &str = "Select LoRA";

/// One entry of a selector. The sentinel "use default" option has an empty
/// `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn is_default(&self) -> bool {
        self.value.is_empty()
    }
}

/// Project a list of names into selector options.
///
/// The first option is always the sentinel. `selected` marks the matching
/// option; when it is empty or absent from `items` the sentinel is selected.
pub fn selector_options(items: &[String], default_label: &str, selected: &str) -> Vec<SelectOption> {
    let matched = !selected.is_empty() && items.iter().any(|i| i == selected);

    let mut options = Vec::with_capacity(items.len() + 1);
    options.push(SelectOption {
        value: String::new(),
        label: default_label.to_string(),
        selected: !matched,
    });
    options.extend(items.iter().map(|item| SelectOption {
        value: item.clone(),
        label: item.clone(),
        selected: matched && item == selected,
    }));
    options
}

impl ResourceCatalog {
    pub fn model_options(&self, selected: &str) -> Vec<SelectOption> {
        selector_options(&self.models, DEFAULT_MODEL_LABEL, selected)
    }

    pub fn lora_options(&self, selected: &str) -> Vec<SelectOption> {
        selector_options(&self.loras, DEFAULT_LORA_LABEL, selected)
    }

    /// Sampler options; an empty selection preselects the server default.
    pub fn sampler_options(&self, selected: &str) -> Vec<SelectOption> {
        let selected = effective_selection(selected, self.default_sampler.as_deref());
        selector_options(&self.samplers, DEFAULT_SAMPLER_LABEL, selected)
    }

    /// Scheduler options; an empty selection preselects the server default.
    pub fn scheduler_options(&self, selected: &str) -> Vec<SelectOption> {
        let selected = effective_selection(selected, self.default_scheduler.as_deref());
        selector_options(&self.schedulers, DEFAULT_SCHEDULER_LABEL, selected)
    }
}

fn effective_selection<'a>(selected: &'a str, server_default: Option<&'a str>) -> &'a str {
    if selected.is_empty() {
        server_default.unwrap_or("")
    } else {
        selected
    }
}
