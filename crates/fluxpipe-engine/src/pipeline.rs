use anyhow::Result;
use fluxpipe_contracts::events::{EventPayload, EventWriter};
use fluxpipe_contracts::params::parse_line;
use fluxpipe_contracts::results::{format_result, GenerationResult};
use log::{info, warn};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::DispatcherConfig;
use crate::dispatcher::Dispatcher;
use crate::CancelFlag;

pub const PIPELINE_NAME: &str = "Replicate Flux Pipeline";

/// String in, string out: tokenize, validate, dispatch, format.
///
/// Every failure along the way is reported as `Error: <message>`.
pub struct Pipeline {
    dispatcher: Dispatcher,
    events: Option<EventWriter>,
}

impl Pipeline {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            events: None,
        }
    }

    pub fn from_config(config: &DispatcherConfig) -> Result<Self> {
        Ok(Self::new(Dispatcher::new(config)?))
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn name(&self) -> &str {
        PIPELINE_NAME
    }

    pub fn run(&self, line: &str) -> String {
        self.run_with_cancel(line, &CancelFlag::new())
    }

    pub fn run_with_cancel(&self, line: &str, cancel: &CancelFlag) -> String {
        format_result(&self.execute(line, cancel))
    }

    pub fn execute(&self, line: &str, cancel: &CancelFlag) -> GenerationResult {
        let events = self
            .events
            .as_ref()
            .map(|writer| writer.for_run(Uuid::new_v4().to_string()));
        emit(events.as_ref(), "request_received", json!({ "line": line }));

        let built = match parse_line(line) {
            Ok(built) => built,
            Err(err) => {
                warn!("rejected request: {err}");
                emit(
                    events.as_ref(),
                    "request_rejected",
                    json!({ "kind": err.kind(), "message": err.to_string() }),
                );
                return GenerationResult::failure(err.to_string());
            }
        };
        for warning in &built.warnings {
            warn!("{warning}");
        }

        let input = Value::Object(built.request.input_payload());
        info!("final input params: {input}");
        emit(
            events.as_ref(),
            "request_validated",
            json!({ "input": input, "warnings": built.warnings }),
        );

        let result = self.dispatcher.dispatch(&built.request, cancel);
        let outcome = match &result {
            GenerationResult::Success { image_url } => json!({ "image_url": image_url }),
            GenerationResult::Failure { message } => json!({ "message": message }),
        };
        let mut payload = map_object(outcome);
        payload.insert("status".to_string(), json!(result.status()));
        payload.insert(
            "provider".to_string(),
            json!(self.dispatcher.provider_name()),
        );
        emit(
            events.as_ref(),
            "generation_finished",
            Value::Object(payload),
        );
        result
    }
}

fn emit(writer: Option<&EventWriter>, event_type: &str, payload: Value) {
    let Some(writer) = writer else {
        return;
    };
    if let Err(err) = writer.emit(event_type, map_object(payload)) {
        warn!("failed to write {event_type} event: {err:#}");
    }
}

fn map_object(value: Value) -> EventPayload {
    value.as_object().cloned().unwrap_or_default()
}
