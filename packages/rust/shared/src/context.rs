//! Per-record processing context.
//!
//! Concurrent workers interleave their output, so components never log a
//! record's progress directly. They append events to the [`RecordContext`]
//! they were handed, and the owner of the record's lifecycle flushes the
//! whole timeline as a single `tracing` event.

use std::time::Instant;

use serde::Serialize;
use uuid::Uuid;

/// Severity of a context event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
}

/// One structured event in a record's timeline.
#[derive(Debug, Clone, Serialize)]
pub struct ContextEvent {
    /// Milliseconds since the context was created.
    pub elapsed_ms: u128,
    pub level: EventLevel,
    /// Pipeline stage (`discovery`, `validation`, ...).
    pub stage: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub fields: serde_json::Value,
}

/// Event buffer for one record, threaded through every pipeline call.
#[derive(Debug)]
pub struct RecordContext {
    record_id: i64,
    business_name: String,
    trace_id: Uuid,
    started: Instant,
    events: Vec<ContextEvent>,
}

impl RecordContext {
    pub fn new(record_id: i64, business_name: impl Into<String>) -> Self {
        Self {
            record_id,
            business_name: business_name.into(),
            trace_id: Uuid::now_v7(),
            started: Instant::now(),
            events: Vec::new(),
        }
    }

    pub fn record_id(&self) -> i64 {
        self.record_id
    }

    pub fn trace_id(&self) -> Uuid {
        self.trace_id
    }

    pub fn events(&self) -> &[ContextEvent] {
        &self.events
    }

    pub fn debug(&mut self, stage: &'static str, message: impl Into<String>) {
        self.push(EventLevel::Debug, stage, message.into(), serde_json::Value::Null);
    }

    pub fn info(&mut self, stage: &'static str, message: impl Into<String>) {
        self.push(EventLevel::Info, stage, message.into(), serde_json::Value::Null);
    }

    pub fn warn(&mut self, stage: &'static str, message: impl Into<String>) {
        self.push(EventLevel::Warn, stage, message.into(), serde_json::Value::Null);
    }

    /// Info event carrying structured fields.
    pub fn info_with(
        &mut self,
        stage: &'static str,
        message: impl Into<String>,
        fields: serde_json::Value,
    ) {
        self.push(EventLevel::Info, stage, message.into(), fields);
    }

    fn push(
        &mut self,
        level: EventLevel,
        stage: &'static str,
        message: String,
        fields: serde_json::Value,
    ) {
        self.events.push(ContextEvent {
            elapsed_ms: self.started.elapsed().as_millis(),
            level,
            stage,
            message,
            fields,
        });
    }

    /// Render the timeline one event per line.
    pub fn render(&self) -> String {
        self.events
            .iter()
            .map(|e| {
                let level = match e.level {
                    EventLevel::Debug => "debug",
                    EventLevel::Info => "info",
                    EventLevel::Warn => "warn",
                };
                if e.fields.is_null() {
                    format!("[{:>6}ms] {level:<5} {}: {}", e.elapsed_ms, e.stage, e.message)
                } else {
                    format!(
                        "[{:>6}ms] {level:<5} {}: {} {}",
                        e.elapsed_ms, e.stage, e.message, e.fields
                    )
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Emit the buffered timeline as one log event and consume the context.
    pub fn flush(self, outcome: &str) {
        let warnings = self
            .events
            .iter()
            .filter(|e| e.level == EventLevel::Warn)
            .count();
        let timeline = self.render();
        let elapsed_ms = self.started.elapsed().as_millis();

        if warnings > 0 {
            tracing::warn!(
                record_id = self.record_id,
                business = %self.business_name,
                trace_id = %self.trace_id,
                elapsed_ms,
                warnings,
                outcome,
                "record processed\n{timeline}"
            );
        } else {
            tracing::info!(
                record_id = self.record_id,
                business = %self.business_name,
                trace_id = %self.trace_id,
                elapsed_ms,
                outcome,
                "record processed\n{timeline}"
            );
        }
    }
}
