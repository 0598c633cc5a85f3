const IMAGE_MARKDOWN_PREFIX: &str = "![image](";
const ERROR_PREFIX: &str = "Error: ";

/// Terminal outcome of one generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResult {
    Success { image_url: String },
    Failure { message: String },
}

impl GenerationResult {
    pub fn success(image_url: impl Into<String>) -> Self {
        GenerationResult::Success {
            image_url: image_url.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        GenerationResult::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GenerationResult::Success { .. })
    }

    pub fn status(&self) -> &'static str {
        match self {
            GenerationResult::Success { .. } => "succeeded",
            GenerationResult::Failure { .. } => "failed",
        }
    }
}

pub fn format_result(result: &GenerationResult) -> String {
    match result {
        GenerationResult::Success { image_url } => format!("{IMAGE_MARKDOWN_PREFIX}{image_url})"),
        GenerationResult::Failure { message } => format!("{ERROR_PREFIX}{message}"),
    }
}

/// Inverse of [`format_result`] for the success case.
pub fn parse_image_markdown(text: &str) -> Option<&str> {
    text.strip_prefix(IMAGE_MARKDOWN_PREFIX)?.strip_suffix(')')
}

pub fn is_error_output(text: &str) -> bool {
    text.starts_with(ERROR_PREFIX)
}
