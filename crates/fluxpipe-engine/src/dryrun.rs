use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use anyhow::Result;
use fluxpipe_contracts::params::GenerationRequest;
use serde_json::{Map, Value};

use crate::{CancelFlag, Cancelled, ImageProvider, ProviderResponse};

const DRYRUN_URL_BASE: &str = "https://dryrun.invalid/fluxpipe";

/// Offline provider: answers every request with a deterministic URL derived
/// from the input payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryrunProvider;

impl ImageProvider for DryrunProvider {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancelFlag,
    ) -> Result<ProviderResponse> {
        if cancel.is_cancelled() {
            return Err(Cancelled.into());
        }
        let payload = Value::Object(request.input_payload());
        let mut hasher = DefaultHasher::new();
        payload.to_string().hash(&mut hasher);
        let id = format!("{:016x}", hasher.finish());

        let mut provider_request = Map::new();
        provider_request.insert(
            "endpoint".to_string(),
            Value::String("dryrun-native".to_string()),
        );
        provider_request.insert("payload".to_string(), payload);
        Ok(ProviderResponse {
            image_url: Some(format!(
                "{DRYRUN_URL_BASE}/{id}.{}",
                request.output_format.as_str()
            )),
            prediction_id: Some(format!("dryrun-{id}")),
            provider_request,
        })
    }
}
