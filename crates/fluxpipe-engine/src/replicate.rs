use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use fluxpipe_contracts::params::GenerationRequest;
use log::{debug, warn};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::config::DispatcherConfig;
use crate::{CancelFlag, Cancelled, ImageProvider, ProviderResponse};

const MAX_BODY_CHARS: usize = 512;

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    error: Value,
    #[serde(default)]
    urls: PredictionUrls,
}

#[derive(Debug, Default, Deserialize)]
struct PredictionUrls {
    get: Option<String>,
    cancel: Option<String>,
}

impl Prediction {
    fn status(&self) -> String {
        self.status.trim().to_ascii_lowercase()
    }

    fn failure_text(&self) -> String {
        let status = self.status();
        match &self.error {
            Value::Null => format!("Replicate prediction {status}"),
            Value::String(text) if text.trim().is_empty() => {
                format!("Replicate prediction {status}")
            }
            Value::String(text) => format!("Replicate prediction {status}: {}", text.trim()),
            other => format!("Replicate prediction {status}: {other}"),
        }
    }
}

/// Runs a model on Replicate's predictions API.
///
/// The create call asks the API to hold the connection (`Prefer: wait`);
/// predictions still running after that are polled through `urls.get`.
pub struct ReplicateProvider {
    api_base: String,
    model: String,
    api_token: Option<String>,
    poll_interval: Duration,
    poll_timeout: Duration,
    http: HttpClient,
}

impl ReplicateProvider {
    pub fn new(config: &DispatcherConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .context("failed to build Replicate HTTP client")?;
        Ok(Self {
            api_base: config.api_base.clone(),
            model: config.model.clone(),
            api_token: config.api_token.clone(),
            poll_interval: config.poll_interval,
            poll_timeout: config.poll_timeout,
            http,
        })
    }

    pub fn predictions_endpoint(&self) -> String {
        format!("{}/models/{}/predictions", self.api_base, self.model)
    }

    fn poll_prediction(
        &self,
        mut prediction: Prediction,
        api_token: &str,
        cancel: &CancelFlag,
    ) -> Result<Prediction> {
        let started = Instant::now();
        loop {
            if cancel.is_cancelled() {
                self.cancel_prediction(&prediction, api_token);
                return Err(Cancelled.into());
            }
            if started.elapsed() >= self.poll_timeout {
                self.cancel_prediction(&prediction, api_token);
                bail!(
                    "Replicate polling timed out after {:.1}s",
                    self.poll_timeout.as_secs_f64()
                );
            }
            let poll_url = prediction
                .urls
                .get
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("Replicate prediction missing poll URL"))?;

            thread::sleep(self.poll_interval);
            let response = self
                .http
                .get(&poll_url)
                .bearer_auth(api_token)
                .send()
                .with_context(|| format!("Replicate poll request failed ({poll_url})"))?;
            prediction = parse_prediction(response_json_or_error("Replicate poll", response)?)?;
            let status = prediction.status();
            debug!("Replicate prediction {:?} is {status}", prediction.id);
            match status.as_str() {
                "succeeded" => return Ok(prediction),
                "starting" | "processing" => {}
                _ => bail!(prediction.failure_text()),
            }
        }
    }

    fn cancel_prediction(&self, prediction: &Prediction, api_token: &str) {
        let Some(cancel_url) = prediction.urls.cancel.as_deref() else {
            return;
        };
        let outcome = self
            .http
            .post(cancel_url)
            .bearer_auth(api_token)
            .send()
            .and_then(|response| response.error_for_status());
        if let Err(err) = outcome {
            warn!("failed to cancel Replicate prediction ({cancel_url}): {err}");
        }
    }

    fn extract_output_url(value: &Value) -> Option<String> {
        match value {
            Value::String(url) => {
                let trimmed = url.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Array(rows) => rows.iter().find_map(Self::extract_output_url),
            Value::Object(obj) => obj.get("url").and_then(Self::extract_output_url),
            _ => None,
        }
    }
}

impl ImageProvider for ReplicateProvider {
    fn name(&self) -> &str {
        "replicate"
    }

    fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancelFlag,
    ) -> Result<ProviderResponse> {
        let Some(api_token) = self.api_token.as_deref() else {
            bail!("REPLICATE_API_TOKEN not set");
        };
        if cancel.is_cancelled() {
            return Err(Cancelled.into());
        }

        let endpoint = self.predictions_endpoint();
        let payload = json!({ "input": request.input_payload() });
        debug!("POST {endpoint}");
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(api_token)
            .header("Prefer", "wait")
            .json(&payload)
            .send()
            .with_context(|| format!("Replicate request failed ({endpoint})"))?;
        let mut prediction = parse_prediction(response_json_or_error("Replicate", response)?)?;
        if cancel.is_cancelled() {
            if matches!(prediction.status().as_str(), "starting" | "processing") {
                self.cancel_prediction(&prediction, api_token);
            }
            return Err(Cancelled.into());
        }

        match prediction.status().as_str() {
            "succeeded" => {}
            "starting" | "processing" => {
                prediction = self.poll_prediction(prediction, api_token, cancel)?;
            }
            _ => bail!(prediction.failure_text()),
        }

        let mut provider_request = Map::new();
        provider_request.insert("endpoint".to_string(), Value::String(endpoint));
        provider_request.insert("payload".to_string(), payload);
        Ok(ProviderResponse {
            image_url: Self::extract_output_url(&prediction.output),
            prediction_id: prediction.id,
            provider_request,
        })
    }
}

fn parse_prediction(payload: Value) -> Result<Prediction> {
    serde_json::from_value(payload).context("Replicate returned an unexpected prediction payload")
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, MAX_BODY_CHARS)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
