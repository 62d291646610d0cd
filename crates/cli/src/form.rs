//! Command-line generation arguments and their mapping onto a form.

use std::path::PathBuf;

use aimg_core::request::{format_number, GenerationForm, LoraRow, SourceImage, DEFAULT_LORA_STRENGTH};
use anyhow::Context;
use clap::Args;

#[derive(Debug, Clone, Default, Args)]
pub struct GenerationArgs {
    /// Prompt text
    pub prompt: Option<String>,

    /// Start from a saved configuration
    #[arg(long)]
    pub preset: Option<String>,

    #[arg(long)]
    pub negative_prompt: Option<String>,

    #[arg(long)]
    pub width: Option<u32>,

    #[arg(long)]
    pub height: Option<u32>,

    #[arg(long)]
    pub batch_size: Option<u32>,

    /// Fixed seed; omitted means the server picks one
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub sampler: Option<String>,

    #[arg(long)]
    pub scheduler: Option<String>,

    /// LoRA as NAME or NAME:STRENGTH, repeatable
    #[arg(long = "lora")]
    pub loras: Vec<String>,

    /// Image-to-image denoise strength (0-1)
    #[arg(long)]
    pub denoise: Option<f64>,

    /// Download the generated images into this directory
    #[arg(long)]
    pub out: Option<PathBuf>,
}

impl GenerationArgs {
    /// Overwrite the fields of `form` that were given on the command line.
    pub fn apply(&self, form: &mut GenerationForm) {
        if let Some(prompt) = &self.prompt {
            form.prompt = prompt.clone();
        }
        if let Some(negative) = &self.negative_prompt {
            form.negative_prompt = negative.clone();
        }
        if let Some(width) = self.width {
            form.width = width.to_string();
        }
        if let Some(height) = self.height {
            form.height = height.to_string();
        }
        if let Some(batch_size) = self.batch_size {
            form.batch_size = batch_size.to_string();
        }
        if let Some(seed) = self.seed {
            form.random_seed = false;
            form.seed = seed.to_string();
        }
        for (field, value) in [
            (&mut form.model, &self.model),
            (&mut form.sampler, &self.sampler),
            (&mut form.scheduler, &self.scheduler),
        ] {
            if let Some(value) = value {
                *field = value.clone();
            }
        }
        if !self.loras.is_empty() {
            form.loras = self.loras.iter().map(String::as_str).map(parse_lora).collect();
        }
        if let Some(denoise) = self.denoise {
            form.denoise = format_number(denoise);
        }
    }
}

/// `NAME` or `NAME:STRENGTH`. The strength is kept as typed; the request
/// builder drops rows it cannot parse.
pub fn parse_lora(spec: &str) -> LoraRow {
    match spec.rsplit_once(':') {
        Some((name, strength)) => LoraRow {
            name: name.trim().to_string(),
            strength: strength.trim().to_string(),
        },
        None => LoraRow::new(spec.trim(), DEFAULT_LORA_STRENGTH),
    }
}

/// Read an input image for image-to-image generation.
pub fn read_image(path: &std::path::Path) -> anyhow::Result<SourceImage> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Cannot read image {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image.png".to_string());
    Ok(SourceImage::new(file_name, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lora_specs() {
        assert_eq!(
            parse_lora("detail:0.6"),
            LoraRow {
                name: "detail".into(),
                strength: "0.6".into()
            }
        );
        assert_eq!(parse_lora("detail").strength, "1");
        assert_eq!(parse_lora("detail:").strength, "");
    }

    #[test]
    fn only_given_fields_are_applied() {
        let mut form = GenerationForm::with_dimensions(768, 768);
        form.sampler = "euler".into();
        let args = GenerationArgs {
            prompt: Some("a lighthouse".into()),
            seed: Some(7),
            loras: vec!["detail:0.5".into()],
            ..Default::default()
        };

        args.apply(&mut form);

        assert_eq!(form.prompt, "a lighthouse");
        assert_eq!(form.width, "768");
        assert_eq!(form.sampler, "euler");
        assert!(!form.random_seed);
        assert_eq!(form.seed, "7");
        assert_eq!(form.loras.len(), 1);
    }
}
