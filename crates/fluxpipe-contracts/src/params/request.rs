use serde_json::{json, Map, Value};

pub const CUSTOM_ASPECT_RATIO: &str = "custom";

/// Accepted `--aspect_ratio` values, in tie-break order.
pub const ASPECT_RATIO_CHOICES: &[&str] = &[
    "1:1", "16:9", "3:2", "2:3", "4:5", "5:4", "9:16", "3:4", "4:3", "custom",
];

pub const OUTPUT_FORMAT_CHOICES: &[&str] = &["webp", "jpg", "png"];

pub const IMAGE_PROMPT_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "webp"];

/// Named aspect ratios. Custom pixel sizes live in [`ImageShape::Custom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatio {
    #[default]
    Square,
    Widescreen,
    Landscape3x2,
    Portrait2x3,
    Portrait4x5,
    Landscape5x4,
    Vertical9x16,
    Portrait3x4,
    Landscape4x3,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Widescreen => "16:9",
            AspectRatio::Landscape3x2 => "3:2",
            AspectRatio::Portrait2x3 => "2:3",
            AspectRatio::Portrait4x5 => "4:5",
            AspectRatio::Landscape5x4 => "5:4",
            AspectRatio::Vertical9x16 => "9:16",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Landscape4x3 => "4:3",
        }
    }

    pub fn from_canonical(value: &str) -> Option<Self> {
        let ratio = match value {
            "1:1" => AspectRatio::Square,
            "16:9" => AspectRatio::Widescreen,
            "3:2" => AspectRatio::Landscape3x2,
            "2:3" => AspectRatio::Portrait2x3,
            "4:5" => AspectRatio::Portrait4x5,
            "5:4" => AspectRatio::Landscape5x4,
            "9:16" => AspectRatio::Vertical9x16,
            "3:4" => AspectRatio::Portrait3x4,
            "4:3" => AspectRatio::Landscape4x3,
            _ => return None,
        };
        Some(ratio)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Webp,
    Jpg,
    Png,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Webp => "webp",
            OutputFormat::Jpg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    pub fn from_canonical(value: &str) -> Option<Self> {
        match value {
            "webp" => Some(OutputFormat::Webp),
            "jpg" => Some(OutputFormat::Jpg),
            "png" => Some(OutputFormat::Png),
            _ => None,
        }
    }
}

/// Either a named ratio or explicit pixel dimensions, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageShape {
    Named(AspectRatio),
    Custom { width: u32, height: u32 },
}

impl Default for ImageShape {
    fn default() -> Self {
        ImageShape::Named(AspectRatio::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub shape: ImageShape,
    pub seed: Option<u32>,
    pub image_prompt: Option<String>,
    pub output_format: OutputFormat,
    pub output_quality: u8,
    pub safety_tolerance: u8,
    pub prompt_upsampling: bool,
}

impl GenerationRequest {
    pub const DEFAULT_OUTPUT_QUALITY: u8 = 80;
    pub const DEFAULT_SAFETY_TOLERANCE: u8 = 3;

    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            shape: ImageShape::default(),
            seed: None,
            image_prompt: None,
            output_format: OutputFormat::default(),
            output_quality: Self::DEFAULT_OUTPUT_QUALITY,
            safety_tolerance: Self::DEFAULT_SAFETY_TOLERANCE,
            prompt_upsampling: false,
        }
    }

    pub fn aspect_ratio(&self) -> &'static str {
        match self.shape {
            ImageShape::Named(ratio) => ratio.as_str(),
            ImageShape::Custom { .. } => CUSTOM_ASPECT_RATIO,
        }
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self.shape {
            ImageShape::Named(_) => None,
            ImageShape::Custom { width, height } => Some((width, height)),
        }
    }

    /// Provider `input` object. Width and height are only present in
    /// custom mode; optional fields only when set.
    pub fn input_payload(&self) -> Map<String, Value> {
        let mut input = Map::new();
        input.insert("prompt".to_string(), json!(self.prompt));
        input.insert("aspect_ratio".to_string(), json!(self.aspect_ratio()));
        if let Some((width, height)) = self.dimensions() {
            input.insert("width".to_string(), json!(width));
            input.insert("height".to_string(), json!(height));
        }
        if let Some(seed) = self.seed {
            input.insert("seed".to_string(), json!(seed));
        }
        if let Some(image_prompt) = &self.image_prompt {
            input.insert("image_prompt".to_string(), json!(image_prompt));
        }
        input.insert(
            "output_format".to_string(),
            json!(self.output_format.as_str()),
        );
        input.insert("output_quality".to_string(), json!(self.output_quality));
        input.insert("safety_tolerance".to_string(), json!(self.safety_tolerance));
        input.insert(
            "prompt_upsampling".to_string(),
            json!(self.prompt_upsampling),
        );
        input
    }
}
