use thiserror::Error;

/// Terminal validation failure for one request line.
///
/// Every variant renders as a single line naming the offending field or
/// value, which is what ends up after `Error: ` in the pipeline output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("malformed input: {0}")]
    Parse(String),
    #[error("unknown parameter '--{0}'")]
    UnknownParameter(String),
    #[error("invalid {field} '{value}'; expected one of: {allowed}")]
    InvalidEnum {
        field: &'static str,
        value: String,
        allowed: String,
    },
    #[error("missing required parameter '{0}'")]
    MissingParameter(&'static str),
    #[error("{field} cannot be combined with aspect_ratio '{aspect_ratio}'; use --aspect_ratio custom")]
    ConflictingParameter {
        field: &'static str,
        aspect_ratio: &'static str,
    },
    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("{field} must be between {min} and {max}, got {value}")]
    Range {
        field: &'static str,
        value: String,
        min: i64,
        max: i64,
    },
}

impl ParamError {
    pub fn kind(&self) -> &'static str {
        match self {
            ParamError::Parse(_) => "parse_error",
            ParamError::UnknownParameter(_) => "unknown_parameter",
            ParamError::InvalidEnum { .. } => "invalid_enum",
            ParamError::MissingParameter(_) => "missing_parameter",
            ParamError::ConflictingParameter { .. } => "conflicting_parameter",
            ParamError::InvalidValue { .. } => "invalid_value",
            ParamError::Range { .. } => "range_error",
        }
    }

    pub(crate) fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        ParamError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}
