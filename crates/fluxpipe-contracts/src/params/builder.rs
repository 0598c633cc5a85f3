use indexmap::IndexMap;

use crate::chat::{tokenize, TokenizedInput};
use crate::errors::ParamError;

use super::dimensions::resolve_shape;
use super::flags::{find_flag, FlagKind, RequestDraft};
use super::request::{AspectRatio, GenerationRequest};

/// A validated request plus notes about lenient corrections that were
/// applied on the way (fuzzy-matched values, repeated flags).
#[derive(Debug, Clone, PartialEq)]
pub struct RequestBuild {
    pub request: GenerationRequest,
    pub warnings: Vec<String>,
}

pub fn parse_line(raw: &str) -> Result<RequestBuild, ParamError> {
    build_request(&tokenize(raw)?)
}

/// Routes every flag to its typed setter and applies defaults.
///
/// A repeated flag keeps its last value. Unknown flag names are rejected
/// rather than skipped.
pub fn build_request(input: &TokenizedInput) -> Result<RequestBuild, ParamError> {
    let mut warnings = Vec::new();
    let mut latest: IndexMap<&str, Option<&str>> = IndexMap::new();
    for flag in &input.flags {
        let previous = latest.insert(flag.name.as_str(), flag.value.as_deref());
        if previous.is_some() {
            push_unique_warning(
                &mut warnings,
                format!("--{} given more than once; using the last value", flag.name),
            );
        }
    }

    let mut draft = RequestDraft::default();
    for (name, value) in latest {
        let spec = find_flag(name).ok_or_else(|| ParamError::UnknownParameter(name.to_string()))?;
        let value = match value {
            Some(value) => value,
            None if spec.kind == FlagKind::Boolean => "true",
            None => {
                return Err(ParamError::InvalidValue {
                    field: spec.name,
                    reason: format!("--{} expects a value", spec.name),
                })
            }
        };
        (spec.apply)(&mut draft, value)?;
    }

    let leading = input.prompt.trim();
    let prompt = match draft.prompt.take() {
        Some(flag_prompt) => {
            if !leading.is_empty() && !flag_prompt.is_empty() {
                push_unique_warning(
                    &mut warnings,
                    "--prompt replaces the leading prompt text".to_string(),
                );
            }
            flag_prompt
        }
        None => leading.to_string(),
    };
    if prompt.is_empty() {
        return Err(ParamError::MissingParameter("prompt"));
    }

    let aspect_ratio = draft
        .aspect_ratio
        .unwrap_or_else(|| AspectRatio::default().as_str());
    let shape = resolve_shape(
        aspect_ratio,
        draft.width.as_deref(),
        draft.height.as_deref(),
    )?;

    let mut request = GenerationRequest::new(prompt);
    request.shape = shape;
    request.seed = draft.seed;
    request.image_prompt = draft.image_prompt;
    request.prompt_upsampling = draft.prompt_upsampling;
    if let Some(format) = draft.output_format {
        request.output_format = format;
    }
    if let Some(quality) = draft.output_quality {
        request.output_quality = quality;
    }
    if let Some(tolerance) = draft.safety_tolerance {
        request.safety_tolerance = tolerance;
    }

    for warning in draft.warnings {
        push_unique_warning(&mut warnings, warning);
    }
    Ok(RequestBuild { request, warnings })
}

fn push_unique_warning(warnings: &mut Vec<String>, message: String) {
    if warnings.iter().any(|existing| existing == &message) {
        return;
    }
    warnings.push(message);
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::parse_line;
    use crate::errors::ParamError;
    use crate::params::{AspectRatio, GenerationRequest, ImageShape, OutputFormat};

    #[test]
    fn named_ratio_scenario_uses_defaults() -> anyhow::Result<()> {
        let built = parse_line("A beautiful sunset over mountains --aspect_ratio 16:9")?;
        assert_eq!(
            built.request,
            GenerationRequest {
                prompt: "A beautiful sunset over mountains".to_string(),
                shape: ImageShape::Named(AspectRatio::Widescreen),
                seed: None,
                image_prompt: None,
                output_format: OutputFormat::Webp,
                output_quality: 80,
                safety_tolerance: 3,
                prompt_upsampling: false,
            }
        );
        assert!(built.warnings.is_empty());
        let payload = built.request.input_payload();
        assert!(!payload.contains_key("width"));
        assert!(!payload.contains_key("height"));
        Ok(())
    }

    #[test]
    fn custom_dimensions_on_the_grid_are_unchanged() -> anyhow::Result<()> {
        let built =
            parse_line("A city skyline at night --aspect_ratio custom --width 1024 --height 576")?;
        assert_eq!(built.request.dimensions(), Some((1024, 576)));
        assert_eq!(built.request.aspect_ratio(), "custom");
        Ok(())
    }

    #[test]
    fn custom_dimensions_are_clamped() -> anyhow::Result<()> {
        let built = parse_line("A city at night --aspect_ratio custom --width 100 --height 2000")?;
        assert_eq!(built.request.dimensions(), Some((256, 1440)));
        Ok(())
    }

    #[test]
    fn every_flag_routes_to_its_field() -> anyhow::Result<()> {
        let built = parse_line(
            "koi pond --seed 42 --image_prompt https://cdn.test/koi.jpg --output_format PNG \
             --output_quality 95 --safety_tolerance 6 --prompt_upsampling",
        )?;
        let payload = Value::Object(built.request.input_payload());
        assert_eq!(
            payload,
            json!({
                "prompt": "koi pond",
                "aspect_ratio": "1:1",
                "seed": 42,
                "image_prompt": "https://cdn.test/koi.jpg",
                "output_format": "png",
                "output_quality": 95,
                "safety_tolerance": 6,
                "prompt_upsampling": true,
            })
        );
        Ok(())
    }

    #[test]
    fn misspelled_flag_name_is_rejected_not_corrected() {
        let err = parse_line("A sunset --aspectratio 16:9").unwrap_err();
        assert_eq!(err, ParamError::UnknownParameter("aspectratio".to_string()));
    }

    #[test]
    fn misspelled_values_are_corrected_with_warnings() -> anyhow::Result<()> {
        let built = parse_line("A sunset --aspect_ratio 16x9 --output_format jpeg")?;
        assert_eq!(built.request.aspect_ratio(), "16:9");
        assert_eq!(built.request.output_format, OutputFormat::Jpg);
        assert_eq!(
            built.warnings,
            vec![
                "aspect_ratio '16x9' interpreted as '16:9'".to_string(),
                "output_format 'jpeg' interpreted as 'jpg'".to_string(),
            ]
        );
        Ok(())
    }

    #[test]
    fn nonsense_enum_value_fails() {
        assert!(matches!(
            parse_line("A sunset --output_format banana"),
            Err(ParamError::InvalidEnum {
                field: "output_format",
                ..
            })
        ));
    }

    #[test]
    fn duplicate_flags_keep_the_last_value() -> anyhow::Result<()> {
        let built = parse_line("cat --seed 1 --seed 2")?;
        assert_eq!(built.request.seed, Some(2));
        assert_eq!(
            built.warnings,
            vec!["--seed given more than once; using the last value".to_string()]
        );
        Ok(())
    }

    #[test]
    fn empty_prompt_is_missing() {
        assert_eq!(
            parse_line("   --aspect_ratio 16:9").unwrap_err(),
            ParamError::MissingParameter("prompt")
        );
        assert_eq!(
            parse_line("").unwrap_err(),
            ParamError::MissingParameter("prompt")
        );
    }

    #[test]
    fn prompt_flag_supplies_or_replaces_prompt() -> anyhow::Result<()> {
        let built = parse_line(r#"--prompt "a lighthouse in fog""#)?;
        assert_eq!(built.request.prompt, "a lighthouse in fog");

        let built = parse_line(r#"draft text --prompt "final text""#)?;
        assert_eq!(built.request.prompt, "final text");
        assert_eq!(
            built.warnings,
            vec!["--prompt replaces the leading prompt text".to_string()]
        );

        let built = parse_line(r#"cat --prompt "--dramatic lighting""#)?;
        assert_eq!(built.request.prompt, "--dramatic lighting");
        Ok(())
    }

    #[test]
    fn dimensions_without_custom_ratio_conflict() {
        assert!(matches!(
            parse_line("cat --width 512 --height 512"),
            Err(ParamError::ConflictingParameter {
                field: "width",
                aspect_ratio: "1:1",
            })
        ));
    }

    #[test]
    fn value_required_for_non_boolean_flags() {
        assert!(matches!(
            parse_line("cat --seed"),
            Err(ParamError::InvalidValue { field: "seed", .. })
        ));
    }

    #[test]
    fn range_and_type_errors() {
        assert!(matches!(
            parse_line("cat --output_quality 101"),
            Err(ParamError::Range {
                field: "output_quality",
                ..
            })
        ));
        assert!(matches!(
            parse_line("cat --safety_tolerance 0"),
            Err(ParamError::Range {
                field: "safety_tolerance",
                ..
            })
        ));
        assert!(matches!(
            parse_line("cat --seed -1"),
            Err(ParamError::Range { field: "seed", .. })
        ));
        assert!(matches!(
            parse_line("cat --output_quality high"),
            Err(ParamError::InvalidValue {
                field: "output_quality",
                ..
            })
        ));
        assert!(matches!(
            parse_line("cat --image_prompt https://cdn.test/cat.tiff"),
            Err(ParamError::InvalidValue {
                field: "image_prompt",
                ..
            })
        ));
    }

    #[test]
    fn unterminated_quote_surfaces_as_parse_error() {
        assert!(matches!(
            parse_line(r#"A forest --prompt "unclosed"#),
            Err(ParamError::Parse(_))
        ));
    }
}
