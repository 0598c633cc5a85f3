use similar::TextDiff;

use crate::errors::ParamError;

/// Lowest similarity ratio accepted as a typo of a canonical value.
pub const MIN_SIMILARITY: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyMatch {
    pub value: &'static str,
    pub score: f32,
}

impl FuzzyMatch {
    pub fn is_exact(&self) -> bool {
        self.score >= 1.0
    }
}

/// Character-level similarity in `[0, 1]`: twice the matched characters
/// over the combined length of both strings.
pub fn similarity(left: &str, right: &str) -> f32 {
    TextDiff::from_chars(left, right).ratio()
}

pub fn fuzzy_match(
    field: &'static str,
    candidate: &str,
    allowed: &[&'static str],
) -> Result<FuzzyMatch, ParamError> {
    match_with_threshold(field, candidate, allowed, MIN_SIMILARITY)
}

/// Maps `candidate` onto the closest entry of `allowed`.
///
/// A case-insensitive exact hit wins outright. Otherwise the best scoring
/// entry is taken, with ties going to the earlier entry in `allowed`.
pub fn match_with_threshold(
    field: &'static str,
    candidate: &str,
    allowed: &[&'static str],
    threshold: f32,
) -> Result<FuzzyMatch, ParamError> {
    let lowered = candidate.trim().to_lowercase();
    if let Some(exact) = allowed
        .iter()
        .find(|value| value.to_lowercase() == lowered)
    {
        return Ok(FuzzyMatch {
            value: *exact,
            score: 1.0,
        });
    }

    let mut best: Option<FuzzyMatch> = None;
    for value in allowed {
        let score = similarity(&lowered, &value.to_lowercase());
        if best.map(|current| score > current.score).unwrap_or(true) {
            best = Some(FuzzyMatch {
                value: *value,
                score,
            });
        }
    }

    match best {
        Some(found) if found.score >= threshold => Ok(found),
        _ => Err(ParamError::InvalidEnum {
            field,
            value: candidate.to_string(),
            allowed: allowed.join(", "),
        }),
    }
}
