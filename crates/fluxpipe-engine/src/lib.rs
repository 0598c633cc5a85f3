use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use fluxpipe_contracts::params::GenerationRequest;
use serde_json::{Map, Value};

mod config;
mod dispatcher;
mod dryrun;
mod pipeline;
mod replicate;
#[cfg(test)]
mod test_support;

pub use config::{DispatcherConfig, DEFAULT_API_BASE, DEFAULT_MODEL};
pub use dispatcher::{Dispatcher, CANCELLED_MESSAGE, NO_IMAGE_MESSAGE};
pub use dryrun::DryrunProvider;
pub use pipeline::{Pipeline, PIPELINE_NAME};
pub use replicate::ReplicateProvider;

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub image_url: Option<String>,
    pub prediction_id: Option<String>,
    pub provider_request: Map<String, Value>,
}

/// One outbound generation call. Implementations send the request once
/// and never retry; waiting on an accepted prediction is allowed.
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, request: &GenerationRequest, cancel: &CancelFlag)
        -> Result<ProviderResponse>;
}

/// Shared flag a host raises to abandon an in-flight request.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Error marker returned by providers that stopped because of a
/// [`CancelFlag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request cancelled")
    }
}

impl std::error::Error for Cancelled {}
