use anyhow::Result;
use fluxpipe_contracts::params::GenerationRequest;
use fluxpipe_contracts::results::GenerationResult;
use log::{debug, warn};

use crate::config::DispatcherConfig;
use crate::dryrun::DryrunProvider;
use crate::replicate::{truncate_text, ReplicateProvider};
use crate::{CancelFlag, Cancelled, ImageProvider};

pub const CANCELLED_MESSAGE: &str = "request cancelled";
pub const NO_IMAGE_MESSAGE: &str = "no image was generated";

const MAX_ERROR_CHARS: usize = 600;

/// Sends one validated request to the configured provider and always
/// answers with a [`GenerationResult`]; transport errors become failures.
pub struct Dispatcher {
    provider: Box<dyn ImageProvider>,
}

impl Dispatcher {
    pub fn new(config: &DispatcherConfig) -> Result<Self> {
        if config.dry_run {
            return Ok(Self::with_provider(DryrunProvider));
        }
        Ok(Self::with_provider(ReplicateProvider::new(config)?))
    }

    pub fn with_provider<P: ImageProvider + 'static>(provider: P) -> Self {
        Self {
            provider: Box::new(provider),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn dispatch(&self, request: &GenerationRequest, cancel: &CancelFlag) -> GenerationResult {
        if cancel.is_cancelled() {
            return GenerationResult::failure(CANCELLED_MESSAGE);
        }
        match self.provider.generate(request, cancel) {
            Ok(_) if cancel.is_cancelled() => GenerationResult::failure(CANCELLED_MESSAGE),
            Ok(response) => match response.image_url {
                Some(image_url) => {
                    debug!(
                        "{} prediction {:?} produced {image_url}",
                        self.provider.name(),
                        response.prediction_id
                    );
                    GenerationResult::success(image_url)
                }
                None => GenerationResult::failure(NO_IMAGE_MESSAGE),
            },
            Err(err) => {
                let message = failure_message(&err);
                warn!("{} generation failed: {message}", self.provider.name());
                GenerationResult::failure(message)
            }
        }
    }
}

fn failure_message(err: &anyhow::Error) -> String {
    if err.chain().any(|cause| cause.is::<Cancelled>()) {
        return CANCELLED_MESSAGE.to_string();
    }
    let text = error_chain_text(err, MAX_ERROR_CHARS);
    if is_timeout_error(err) {
        return format!("request timed out: {text}");
    }
    text
}

fn is_timeout_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<reqwest::Error>()
            .map(reqwest::Error::is_timeout)
            .unwrap_or(false)
    })
}

fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts.last().map(|existing| existing == trimmed).unwrap_or(false) {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}
