//! Plain-text views rendered from the models.
//!
//! Every function here is a pure projection of its input, so front ends can
//! print the result and tests can assert on it without a terminal.

use std::fmt::Write;

use chrono::Local;

use crate::backend_config::BackendConfig;
use crate::catalog::{ResourceCatalog, SelectOption, ServerHealth};
use crate::history::HistoryEntry;
use crate::result::GenerationResult;
use crate::workflow::WorkflowIndex;

const NOT_AVAILABLE: &str = "N/A";

pub fn render_server_status(servers: &[ServerHealth]) -> String {
    if servers.is_empty() {
        return "No generation servers reported\n".to_string();
    }
    let mut out = String::new();
    for server in servers {
        let _ = writeln!(out, "[{:<7}] {}", server.state().label(), server.name);
    }
    out
}

pub fn render_options(title: &str, options: &[SelectOption]) -> String {
    let mut out = format!("{title}:\n");
    for option in options {
        let marker = if option.selected { '*' } else { ' ' };
        let _ = writeln!(out, "  {marker} {}", option.label);
    }
    out
}

pub fn render_catalog(catalog: &ResourceCatalog) -> String {
    let mut out = String::new();
    out.push_str(&render_options("Models", &catalog.model_options("")));
    out.push_str(&render_options("LoRAs", &catalog.lora_options("")));
    out.push_str(&render_options("Samplers", &catalog.sampler_options("")));
    out.push_str(&render_options("Schedulers", &catalog.scheduler_options("")));
    if catalog.workflows.is_empty() {
        out.push_str("Workflows: none available\n");
    } else {
        let _ = writeln!(out, "Workflows: {}", catalog.workflows.join(", "));
    }
    out
}

pub fn render_result(result: &GenerationResult) -> String {
    let mut out = String::new();
    for (index, url) in result.images.iter().enumerate() {
        let _ = writeln!(out, "Image {}: {url}", index + 1);
    }
    let _ = writeln!(
        out,
        "Prompt: {}",
        result.prompt.as_deref().unwrap_or(NOT_AVAILABLE)
    );
    let _ = writeln!(
        out,
        "Seed: {}",
        result
            .seed
            .map(|s| s.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    );
    let _ = writeln!(out, "Model: {}", result.model.as_deref().unwrap_or("default"));
    let _ = writeln!(out, "Width: {}", optional_number(result.width));
    let _ = writeln!(out, "Height: {}", optional_number(result.height));
    let _ = writeln!(out, "LoRA count: {}", result.lora_count);
    out
}

pub fn render_history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "No generation history yet. Generated images will be listed here.\n".to_string();
    }
    let mut out = String::new();
    for entry in entries {
        let local = entry.timestamp.with_timezone(&Local);
        let _ = writeln!(
            out,
            "#{} {} [{}] {}",
            entry.id,
            local.format("%Y-%m-%d %H:%M:%S"),
            entry.mode().label(),
            entry.params.common().prompt
        );
        if let Some(image) = entry.preview_image() {
            let _ = writeln!(out, "    {image}");
        }
    }
    out
}

pub fn render_workflows(index: &WorkflowIndex) -> String {
    if index.is_empty() {
        return "No workflows available. Ask an administrator to add one.\n".to_string();
    }
    let mut out = String::new();
    for (prefix, meta) in index {
        let _ = writeln!(out, "{prefix} (v{}) {}", meta.version, meta.name);
        if !meta.description.is_empty() {
            let _ = writeln!(out, "    {}", meta.description);
        }
    }
    out
}

pub fn render_backend_config(config: &BackendConfig) -> String {
    let mut out = String::from("Servers:\n");
    if config.servers.is_empty() {
        out.push_str("  (none)\n");
    }
    for server in &config.servers {
        let _ = writeln!(
            out,
            "  {} weight={} {}",
            server.address,
            server.weight,
            if server.enabled { "enabled" } else { "disabled" }
        );
    }
    let _ = writeln!(out, "Auto save: {}", on_off(config.auto_save));
    let _ = writeln!(out, "Auto zip: {}", on_off(config.auto_zip));
    let _ = writeln!(
        out,
        "Default workflow: {}",
        if config.default_workflow.is_empty() {
            "(none)"
        } else {
            &config.default_workflow
        }
    );
    out
}

fn optional_number(value: Option<u32>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}
