use serde::{Deserialize, Serialize};

use crate::seed::Seed;

/// Response of `/api/aimg` and `/api/img2img`.
///
/// Immutable once received. A body with `success: false` (or a non-2xx
/// response, which the transport passes through) carries `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub seed: Option<Seed>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub lora_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationResult {
    /// File names used when downloading every image of the result.
    pub fn download_file_names(&self) -> Vec<String> {
        (1..=self.images.len())
            .map(|n| format!("generated_image_{n}.png"))
            .collect()
    }
}
