use std::num::IntErrorKind;

use url::Url;

use crate::errors::ParamError;

use super::fuzzy::{fuzzy_match, FuzzyMatch};
use super::request::{
    OutputFormat, ASPECT_RATIO_CHOICES, IMAGE_PROMPT_EXTENSIONS, OUTPUT_FORMAT_CHOICES,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlagKind {
    Text,
    Choice,
    Integer,
    Boolean,
    Url,
}

/// One recognized `--flag`, routed to a typed setter on the request draft.
#[derive(Clone, Copy)]
pub struct FlagSpec {
    pub name: &'static str,
    pub kind: FlagKind,
    pub(crate) apply: fn(&mut RequestDraft, &str) -> Result<(), ParamError>,
}

impl std::fmt::Debug for FlagSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlagSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

pub const FLAG_SPECS: &[FlagSpec] = &[
    FlagSpec {
        name: "prompt",
        kind: FlagKind::Text,
        apply: set_prompt,
    },
    FlagSpec {
        name: "aspect_ratio",
        kind: FlagKind::Choice,
        apply: set_aspect_ratio,
    },
    FlagSpec {
        name: "width",
        kind: FlagKind::Integer,
        apply: set_width,
    },
    FlagSpec {
        name: "height",
        kind: FlagKind::Integer,
        apply: set_height,
    },
    FlagSpec {
        name: "seed",
        kind: FlagKind::Integer,
        apply: set_seed,
    },
    FlagSpec {
        name: "image_prompt",
        kind: FlagKind::Url,
        apply: set_image_prompt,
    },
    FlagSpec {
        name: "output_format",
        kind: FlagKind::Choice,
        apply: set_output_format,
    },
    FlagSpec {
        name: "output_quality",
        kind: FlagKind::Integer,
        apply: set_output_quality,
    },
    FlagSpec {
        name: "safety_tolerance",
        kind: FlagKind::Integer,
        apply: set_safety_tolerance,
    },
    FlagSpec {
        name: "prompt_upsampling",
        kind: FlagKind::Boolean,
        apply: set_prompt_upsampling,
    },
];

pub(crate) fn find_flag(name: &str) -> Option<&'static FlagSpec> {
    FLAG_SPECS.iter().find(|spec| spec.name == name)
}

/// Typed values collected from flags before cross-field checks run.
#[derive(Debug, Default)]
pub(crate) struct RequestDraft {
    pub prompt: Option<String>,
    pub aspect_ratio: Option<&'static str>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub seed: Option<u32>,
    pub image_prompt: Option<String>,
    pub output_format: Option<OutputFormat>,
    pub output_quality: Option<u8>,
    pub safety_tolerance: Option<u8>,
    pub prompt_upsampling: bool,
    pub warnings: Vec<String>,
}

impl RequestDraft {
    fn note_correction(&mut self, field: &str, raw: &str, found: &FuzzyMatch) {
        if found.is_exact() {
            return;
        }
        self.warnings.push(format!(
            "{field} '{}' interpreted as '{}'",
            raw.trim(),
            found.value
        ));
    }
}

fn set_prompt(draft: &mut RequestDraft, raw: &str) -> Result<(), ParamError> {
    draft.prompt = Some(raw.trim().to_string());
    Ok(())
}

fn set_aspect_ratio(draft: &mut RequestDraft, raw: &str) -> Result<(), ParamError> {
    let found = fuzzy_match("aspect_ratio", raw, ASPECT_RATIO_CHOICES)?;
    draft.note_correction("aspect_ratio", raw, &found);
    draft.aspect_ratio = Some(found.value);
    Ok(())
}

fn set_width(draft: &mut RequestDraft, raw: &str) -> Result<(), ParamError> {
    draft.width = Some(raw.to_string());
    Ok(())
}

fn set_height(draft: &mut RequestDraft, raw: &str) -> Result<(), ParamError> {
    draft.height = Some(raw.to_string());
    Ok(())
}

fn set_seed(draft: &mut RequestDraft, raw: &str) -> Result<(), ParamError> {
    let seed = parse_ranged("seed", raw, 0, u32::MAX as i64)?;
    draft.seed = Some(seed as u32);
    Ok(())
}

fn set_image_prompt(draft: &mut RequestDraft, raw: &str) -> Result<(), ParamError> {
    draft.image_prompt = Some(validate_image_url(raw)?);
    Ok(())
}

fn set_output_format(draft: &mut RequestDraft, raw: &str) -> Result<(), ParamError> {
    let found = fuzzy_match("output_format", raw, OUTPUT_FORMAT_CHOICES)?;
    draft.note_correction("output_format", raw, &found);
    draft.output_format = OutputFormat::from_canonical(found.value);
    Ok(())
}

fn set_output_quality(draft: &mut RequestDraft, raw: &str) -> Result<(), ParamError> {
    draft.output_quality = Some(parse_ranged("output_quality", raw, 0, 100)? as u8);
    Ok(())
}

fn set_safety_tolerance(draft: &mut RequestDraft, raw: &str) -> Result<(), ParamError> {
    draft.safety_tolerance = Some(parse_ranged("safety_tolerance", raw, 1, 6)? as u8);
    Ok(())
}

fn set_prompt_upsampling(draft: &mut RequestDraft, raw: &str) -> Result<(), ParamError> {
    draft.prompt_upsampling = parse_bool("prompt_upsampling", raw)?;
    Ok(())
}

fn parse_ranged(field: &'static str, raw: &str, min: i64, max: i64) -> Result<i64, ParamError> {
    let trimmed = raw.trim();
    let out_of_range = || ParamError::Range {
        field,
        value: trimmed.to_string(),
        min,
        max,
    };
    let value = trimmed.parse::<i64>().map_err(|err| match err.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => out_of_range(),
        _ => ParamError::invalid_value(field, format!("'{trimmed}' is not an integer")),
    })?;
    if !(min..=max).contains(&value) {
        return Err(out_of_range());
    }
    Ok(value)
}

fn parse_bool(field: &'static str, raw: &str) -> Result<bool, ParamError> {
    let lowered = raw.trim().to_ascii_lowercase();
    if matches!(lowered.as_str(), "1" | "true" | "yes" | "on") {
        Ok(true)
    } else if matches!(lowered.as_str(), "0" | "false" | "no" | "off") {
        Ok(false)
    } else {
        Err(ParamError::invalid_value(
            field,
            format!("'{}' is not a boolean", raw.trim()),
        ))
    }
}

fn validate_image_url(raw: &str) -> Result<String, ParamError> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).map_err(|err| {
        ParamError::invalid_value("image_prompt", format!("'{trimmed}' is not a URL ({err})"))
    })?;
    let has_host = parsed
        .host_str()
        .map(|host| !host.is_empty())
        .unwrap_or(false);
    if !matches!(parsed.scheme(), "http" | "https") || !has_host {
        return Err(ParamError::invalid_value(
            "image_prompt",
            format!("'{trimmed}' must be an http or https URL"),
        ));
    }
    let path = parsed.path().to_ascii_lowercase();
    let recognized = IMAGE_PROMPT_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(&format!(".{ext}")));
    if !recognized {
        return Err(ParamError::invalid_value(
            "image_prompt",
            format!("'{trimmed}' must point to a jpeg, png, gif, or webp image"),
        ));
    }
    Ok(trimmed.to_string())
}
