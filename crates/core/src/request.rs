//! Generation request model and the form ⇄ request projections.
//!
//! A [`GenerationForm`] is a snapshot of raw form field values (strings and
//! toggles, exactly as a user typed them). [`build`] normalizes it into a
//! [`GenerationRequest`]; [`GenerationForm::fill`] is the inverse used when
//! replaying a history entry or a saved configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
pub use crate::seed::Seed;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const DEFAULT_WIDTH: u32 = 512;
pub const DEFAULT_HEIGHT: u32 = 512;
pub const DEFAULT_BATCH_SIZE: u32 = 1;
pub const DEFAULT_DENOISE: f64 = 0.7;
pub const DEFAULT_LORA_STRENGTH: f64 = 1.0;

pub const LORA_STRENGTH_MIN: f64 = 0.0;
pub const LORA_STRENGTH_MAX: f64 = 2.0;

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Which generation form a request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenerationMode {
    #[serde(rename = "txt2img")]
    Text2Image,
    #[serde(rename = "img2img")]
    Image2Image,
}

impl GenerationMode {
    /// Wire name, also used as the history entry `type`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text2Image => "txt2img",
            Self::Image2Image => "img2img",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Text2Image => "Text to image",
            Self::Image2Image => "Image to image",
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Request model
// ---------------------------------------------------------------------------

/// A LoRA adapter applied during generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoraEntry {
    pub name: String,
    pub strength: f64,
}

/// Fields shared by both generation modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonParams {
    pub prompt: String,
    /// `None` lets the server pick its default model.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub sampler: Option<String>,
    #[serde(default)]
    pub scheduler: Option<String>,
    pub batch_size: u32,
    pub seed: Seed,
    #[serde(rename = "lora", default)]
    pub loras: Vec<LoraEntry>,
}

/// Body of `POST /api/aimg`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text2ImageParams {
    #[serde(flatten)]
    pub common: CommonParams,
    #[serde(default)]
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
}

/// Scalar fields of the `POST /api/img2img` multipart body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image2ImageParams {
    #[serde(flatten)]
    pub common: CommonParams,
    pub denoise: f64,
}

/// Serializable request parameters, as stored in history and saved
/// configurations. The source image is never part of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GenerationParams {
    Text2Image(Text2ImageParams),
    Image2Image(Image2ImageParams),
}

impl GenerationParams {
    pub fn mode(&self) -> GenerationMode {
        match self {
            Self::Text2Image(_) => GenerationMode::Text2Image,
            Self::Image2Image(_) => GenerationMode::Image2Image,
        }
    }

    pub fn common(&self) -> &CommonParams {
        match self {
            Self::Text2Image(p) => &p.common,
            Self::Image2Image(p) => &p.common,
        }
    }

    /// Deserialize parameters whose shape is given by `mode`.
    pub fn from_value(
        mode: GenerationMode,
        value: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(match mode {
            GenerationMode::Text2Image => Self::Text2Image(serde_json::from_value(value)?),
            GenerationMode::Image2Image => Self::Image2Image(serde_json::from_value(value)?),
        })
    }
}

/// Input image for image-to-image generation.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl SourceImage {
    /// Wrap raw image bytes, deriving the MIME type from the file extension.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_for(&file_name).to_string();
        Self {
            file_name,
            mime_type,
            bytes,
        }
    }
}

impl fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceImage")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// A validated request ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationRequest {
    Text2Image(Text2ImageParams),
    Image2Image {
        params: Image2ImageParams,
        image: SourceImage,
    },
}

impl GenerationRequest {
    pub fn mode(&self) -> GenerationMode {
        match self {
            Self::Text2Image(_) => GenerationMode::Text2Image,
            Self::Image2Image { .. } => GenerationMode::Image2Image,
        }
    }

    /// The replayable part of the request.
    pub fn params(&self) -> GenerationParams {
        match self {
            Self::Text2Image(p) => GenerationParams::Text2Image(p.clone()),
            Self::Image2Image { params, .. } => GenerationParams::Image2Image(params.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Form snapshot
// ---------------------------------------------------------------------------

/// One LoRA row of the form: a selected name and a typed strength.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoraRow {
    pub name: String,
    pub strength: String,
}

impl LoraRow {
    /// A row as the strength input would hold it: clamped to `[0, 2]`.
    pub fn new(name: impl Into<String>, strength: f64) -> Self {
        Self {
            name: name.into(),
            strength: format_number(clamp_lora_strength(strength)),
        }
    }
}

/// Clamp a LoRA strength to the range the strength input accepts.
pub fn clamp_lora_strength(strength: f64) -> f64 {
    if strength.is_nan() {
        return DEFAULT_LORA_STRENGTH;
    }
    strength.clamp(LORA_STRENGTH_MIN, LORA_STRENGTH_MAX)
}

/// Raw field values of a generation form.
///
/// Text-to-image uses `negative_prompt`, `width` and `height`;
/// image-to-image uses `denoise` and `image`. Everything else is shared.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationForm {
    pub prompt: String,
    pub negative_prompt: String,
    pub width: String,
    pub height: String,
    pub batch_size: String,
    pub seed: String,
    pub random_seed: bool,
    pub model: String,
    pub sampler: String,
    pub scheduler: String,
    pub denoise: String,
    pub loras: Vec<LoraRow>,
    pub image: Option<SourceImage>,
}

impl Default for GenerationForm {
    fn default() -> Self {
        Self::with_dimensions(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl GenerationForm {
    /// A freshly reset form: random seed on, one empty LoRA row.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            prompt: String::new(),
            negative_prompt: String::new(),
            width: width.to_string(),
            height: height.to_string(),
            batch_size: DEFAULT_BATCH_SIZE.to_string(),
            seed: String::new(),
            random_seed: true,
            model: String::new(),
            sampler: String::new(),
            scheduler: String::new(),
            denoise: format_number(DEFAULT_DENOISE),
            loras: vec![LoraRow::default()],
            image: None,
        }
    }

    /// Populate the form from stored parameters.
    ///
    /// LoRA rows are rebuilt in their original order and the random-seed
    /// toggle is restored from the seed sentinel. Fields that belong only to
    /// the other mode, and the selected image, are left untouched.
    pub fn fill(&mut self, params: &GenerationParams) {
        let common = params.common();
        self.prompt = common.prompt.clone();
        self.batch_size = common.batch_size.to_string();
        self.model = common.model.clone().unwrap_or_default();
        self.sampler = common.sampler.clone().unwrap_or_default();
        self.scheduler = common.scheduler.clone().unwrap_or_default();

        match common.seed {
            Seed::Random => {
                self.random_seed = true;
                self.seed = String::new();
            }
            Seed::Fixed(n) => {
                self.random_seed = false;
                self.seed = n.to_string();
            }
        }

        self.loras = common
            .loras
            .iter()
            .map(|l| LoraRow {
                name: l.name.clone(),
                strength: format_number(l.strength),
            })
            .collect();

        match params {
            GenerationParams::Text2Image(p) => {
                self.negative_prompt = p.negative_prompt.clone();
                self.width = p.width.to_string();
                self.height = p.height.to_string();
            }
            GenerationParams::Image2Image(p) => {
                self.denoise = format_number(p.denoise);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Normalize the form into request parameters without validating it.
pub fn build_params(mode: GenerationMode, form: &GenerationForm) -> GenerationParams {
    let common = CommonParams {
        prompt: form.prompt.clone(),
        model: non_empty(&form.model),
        sampler: non_empty(&form.sampler),
        scheduler: non_empty(&form.scheduler),
        batch_size: parse_positive(&form.batch_size).unwrap_or(DEFAULT_BATCH_SIZE),
        seed: resolve_seed(form.random_seed, &form.seed),
        loras: collect_loras(&form.loras),
    };

    match mode {
        GenerationMode::Text2Image => GenerationParams::Text2Image(Text2ImageParams {
            common,
            negative_prompt: form.negative_prompt.clone(),
            width: parse_positive(&form.width).unwrap_or(DEFAULT_WIDTH),
            height: parse_positive(&form.height).unwrap_or(DEFAULT_HEIGHT),
        }),
        GenerationMode::Image2Image => GenerationParams::Image2Image(Image2ImageParams {
            common,
            denoise: parse_denoise(&form.denoise),
        }),
    }
}

/// Build a validated request from the form.
///
/// Image-to-image checks for a selected image first, then the prompt; both
/// checks happen before anything is sent.
pub fn build(mode: GenerationMode, form: &GenerationForm) -> Result<GenerationRequest, CoreError> {
    let image = match mode {
        GenerationMode::Image2Image => Some(form.image.clone().ok_or(CoreError::EmptyImage)?),
        GenerationMode::Text2Image => None,
    };

    if form.prompt.trim().is_empty() {
        return Err(CoreError::EmptyPrompt);
    }

    Ok(match (build_params(mode, form), image) {
        (GenerationParams::Image2Image(params), Some(image)) => {
            GenerationRequest::Image2Image { params, image }
        }
        (GenerationParams::Text2Image(params), _) => GenerationRequest::Text2Image(params),
        (GenerationParams::Image2Image(_), None) => return Err(CoreError::EmptyImage),
    })
}

/// Resolve the seed field: the random toggle or anything that is not a
/// non-negative 64-bit integer yields [`Seed::Random`].
pub fn resolve_seed(random_seed: bool, seed: &str) -> Seed {
    if random_seed {
        return Seed::Random;
    }
    Seed::parse(seed)
}

/// Collect LoRA rows in order, skipping rows with an empty name or an
/// empty/unparsable strength.
pub fn collect_loras(rows: &[LoraRow]) -> Vec<LoraEntry> {
    rows.iter()
        .filter(|row| !row.name.is_empty())
        .filter_map(|row| {
            let strength = row.strength.trim().parse::<f64>().ok()?;
            strength.is_finite().then(|| LoraEntry {
                name: row.name.clone(),
                strength,
            })
        })
        .collect()
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_positive(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok().filter(|n| *n > 0)
}

fn parse_denoise(value: &str) -> f64 {
    match value.trim().parse::<f64>() {
        Ok(d) if d.is_finite() => d.clamp(0.0, 1.0),
        _ => DEFAULT_DENOISE,
    }
}

/// Render a number the way a numeric input shows it (`1` rather than `1.0`).
pub fn format_number(value: f64) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn text_form(prompt: &str) -> GenerationForm {
        GenerationForm {
            prompt: prompt.into(),
            ..GenerationForm::default()
        }
    }

    #[test]
    fn text_to_image_with_random_seed() {
        let mut form = text_form("a cat");
        form.loras.clear();

        let request = build(GenerationMode::Text2Image, &form).unwrap();
        let body = serde_json::to_value(request.params()).unwrap();

        assert_eq!(body["prompt"], "a cat");
        assert_eq!(body["width"], 512);
        assert_eq!(body["height"], 512);
        assert_eq!(body["batch_size"], 1);
        assert_eq!(body["seed"], -1);
        assert_eq!(body["lora"], serde_json::json!([]));
        assert!(body["model"].is_null());
    }

    #[test]
    fn empty_prompt_is_rejected() {
        assert_matches!(
            build(GenerationMode::Text2Image, &text_form("")),
            Err(CoreError::EmptyPrompt)
        );
        assert_matches!(
            build(GenerationMode::Text2Image, &text_form("   \n\t")),
            Err(CoreError::EmptyPrompt)
        );
    }

    #[test]
    fn image_to_image_requires_image_before_prompt() {
        assert_matches!(
            build(GenerationMode::Image2Image, &text_form("")),
            Err(CoreError::EmptyImage)
        );

        let mut form = text_form("");
        form.image = Some(SourceImage::new("in.png", vec![1, 2, 3]));
        assert_matches!(
            build(GenerationMode::Image2Image, &form),
            Err(CoreError::EmptyPrompt)
        );
    }

    #[test]
    fn image_to_image_carries_image_and_denoise() {
        let mut form = text_form("a dog");
        form.denoise = "0.45".into();
        form.image = Some(SourceImage::new("in.JPG", vec![9; 4]));

        let request = build(GenerationMode::Image2Image, &form).unwrap();
        assert_matches!(request, GenerationRequest::Image2Image { ref params, ref image } => {
            assert_eq!(params.denoise, 0.45);
            assert_eq!(image.mime_type, "image/jpeg");
            assert_eq!(image.bytes.len(), 4);
        });
    }

    #[test]
    fn blank_lora_rows_are_skipped_in_order() {
        let rows = vec![
            LoraRow::new("a", 1.0),
            LoraRow::new("", 0.5),
            LoraRow {
                name: "b".into(),
                strength: String::new(),
            },
            LoraRow {
                name: "c".into(),
                strength: "abc".into(),
            },
            LoraRow::new("d", 0.25),
        ];
        let loras = collect_loras(&rows);
        assert_eq!(
            loras,
            vec![
                LoraEntry {
                    name: "a".into(),
                    strength: 1.0
                },
                LoraEntry {
                    name: "d".into(),
                    strength: 0.25
                },
            ]
        );
    }

    #[test]
    fn lora_rows_clamp_strength() {
        assert_eq!(LoraRow::new("x", 3.5).strength, "2");
        assert_eq!(LoraRow::new("x", -1.0).strength, "0");
    }

    #[test]
    fn seed_resolution() {
        assert_eq!(resolve_seed(true, "42"), Seed::Random);
        assert_eq!(resolve_seed(false, "42"), Seed::Fixed(42));
        assert_eq!(resolve_seed(false, " 7 "), Seed::Fixed(7));
        assert_eq!(resolve_seed(false, ""), Seed::Random);
        assert_eq!(resolve_seed(false, "abc"), Seed::Random);
        assert_eq!(resolve_seed(false, "-5"), Seed::Random);
        assert_eq!(resolve_seed(false, "0"), Seed::Fixed(0));
    }

    #[test]
    fn seeds_above_signed_range_are_kept() {
        assert_eq!(
            resolve_seed(false, "10000000000000000000"),
            Seed::Fixed(10_000_000_000_000_000_000)
        );

        let mut form = text_form("x");
        form.random_seed = false;
        form.seed = "18446744073709551615".into();
        let params = build_params(GenerationMode::Text2Image, &form);
        assert_eq!(
            serde_json::to_value(&params).unwrap()["seed"],
            serde_json::json!(18446744073709551615u64)
        );

        let mut restored = GenerationForm::default();
        restored.fill(&params);
        assert!(!restored.random_seed);
        assert_eq!(restored.seed, "18446744073709551615");
    }

    #[test]
    fn unparsable_dimensions_fall_back_to_defaults() {
        let mut form = text_form("x");
        form.width = "wide".into();
        form.height = "0".into();
        form.batch_size = String::new();
        let GenerationParams::Text2Image(p) = build_params(GenerationMode::Text2Image, &form) else {
            panic!("expected text-to-image params");
        };
        assert_eq!(p.width, DEFAULT_WIDTH);
        assert_eq!(p.height, DEFAULT_HEIGHT);
        assert_eq!(p.common.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn build_is_deterministic() {
        let mut form = text_form("castle at dusk");
        form.random_seed = false;
        form.seed = "1234".into();
        form.loras = vec![LoraRow::new("detail", 0.8)];

        let a = build(GenerationMode::Text2Image, &form).unwrap();
        let b = build(GenerationMode::Text2Image, &form).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn fill_restores_captured_text_fields() {
        let form = GenerationForm {
            prompt: "a lighthouse".into(),
            negative_prompt: "blurry".into(),
            width: "768".into(),
            height: "640".into(),
            batch_size: "2".into(),
            seed: "99".into(),
            random_seed: false,
            model: "sdxl".into(),
            sampler: "euler".into(),
            scheduler: "karras".into(),
            denoise: "0.7".into(),
            loras: vec![LoraRow::new("a", 1.0), LoraRow::new("b", 0.5)],
            image: None,
        };

        let params = build_params(GenerationMode::Text2Image, &form);
        let mut restored = GenerationForm::default();
        restored.fill(&params);

        assert_eq!(restored, form);
    }

    #[test]
    fn fill_normalizes_empty_seed_to_random_toggle() {
        let mut form = text_form("x");
        form.random_seed = false;
        form.seed = String::new();

        let params = build_params(GenerationMode::Text2Image, &form);
        let mut restored = GenerationForm::default();
        restored.random_seed = false;
        restored.fill(&params);

        assert!(restored.random_seed);
        assert!(restored.seed.is_empty());
    }

    #[test]
    fn fill_image_params_keeps_text_only_fields() {
        let mut form = text_form("x");
        form.denoise = "0.3".into();
        form.image = Some(SourceImage::new("a.png", vec![0]));
        let params = build_params(GenerationMode::Image2Image, &form);

        let mut target = GenerationForm::with_dimensions(1024, 1024);
        target.negative_prompt = "keep me".into();
        target.fill(&params);

        assert_eq!(target.denoise, "0.3");
        assert_eq!(target.width, "1024");
        assert_eq!(target.negative_prompt, "keep me");
        assert!(target.image.is_none());
    }

    #[test]
    fn params_round_trip_through_mode() {
        let params = build_params(GenerationMode::Image2Image, &text_form("y"));
        let value = serde_json::to_value(&params).unwrap();
        let back = GenerationParams::from_value(GenerationMode::Image2Image, value).unwrap();
        assert_eq!(back, params);
        assert_eq!(back.mode(), GenerationMode::Image2Image);
    }
}
