use std::num::IntErrorKind;

use crate::errors::ParamError;

use super::request::{AspectRatio, ImageShape, CUSTOM_ASPECT_RATIO};

pub const MIN_DIMENSION: u32 = 256;
pub const MAX_DIMENSION: u32 = 1440;
pub const DIMENSION_STEP: u32 = 32;

/// Resolves the image shape from an already fuzzy-matched aspect ratio and
/// the raw `--width`/`--height` values.
pub fn resolve_shape(
    aspect_ratio: &'static str,
    width: Option<&str>,
    height: Option<&str>,
) -> Result<ImageShape, ParamError> {
    if aspect_ratio != CUSTOM_ASPECT_RATIO {
        if width.is_some() || height.is_some() {
            return Err(ParamError::ConflictingParameter {
                field: if width.is_some() { "width" } else { "height" },
                aspect_ratio,
            });
        }
        let ratio = AspectRatio::from_canonical(aspect_ratio).ok_or_else(|| {
            ParamError::invalid_value("aspect_ratio", format!("'{aspect_ratio}' is not a named ratio"))
        })?;
        return Ok(ImageShape::Named(ratio));
    }

    let width = width.ok_or(ParamError::MissingParameter("width"))?;
    let height = height.ok_or(ParamError::MissingParameter("height"))?;
    Ok(ImageShape::Custom {
        width: parse_dimension("width", width)?,
        height: parse_dimension("height", height)?,
    })
}

fn parse_dimension(field: &'static str, raw: &str) -> Result<u32, ParamError> {
    let trimmed = raw.trim();
    let value = match trimmed.parse::<i64>() {
        Ok(value) => value,
        Err(err) => match err.kind() {
            IntErrorKind::PosOverflow => i64::MAX,
            IntErrorKind::NegOverflow => i64::MIN,
            _ => {
                return Err(ParamError::invalid_value(
                    field,
                    format!("'{raw}' is not an integer"),
                ))
            }
        },
    };
    Ok(snap_dimension(value))
}

/// Clamps into `[MIN_DIMENSION, MAX_DIMENSION]`, then rounds to the nearest
/// multiple of `DIMENSION_STEP` with ties going up. Both bounds are
/// multiples of the step, so the result stays in range.
pub fn snap_dimension(value: i64) -> u32 {
    let clamped = value.clamp(MIN_DIMENSION as i64, MAX_DIMENSION as i64) as u32;
    snap_multiple(clamped, DIMENSION_STEP)
}

fn snap_multiple(value: u32, multiple: u32) -> u32 {
    ((value + multiple / 2) / multiple) * multiple
}
