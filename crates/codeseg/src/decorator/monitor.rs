use crate::error::Result;
use crate::strategy::{SplitContext, SplitRequest, SplitStrategy, StrategyName};
use crate::types::CodeChunk;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// One timed operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    pub operation: String,
    pub duration_ms: f64,
    pub chunk_count: usize,
    pub success: bool,
}

/// Receiver of telemetry events (the external performance monitor)
pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: TelemetryEvent);
}

/// Writes events to the `log` facade at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTelemetry;

impl TelemetrySink for LogTelemetry {
    fn record(&self, event: TelemetryEvent) {
        log::debug!(
            "{} took {:.2}ms ({} chunks{})",
            event.operation,
            event.duration_ms,
            event.chunk_count,
            if event.success { "" } else { ", failed" }
        );
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemoryTelemetry {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl TelemetrySink for MemoryTelemetry {
    fn record(&self, event: TelemetryEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Time `f` and report it to `sink` as `operation`
pub fn timed<T>(
    sink: &dyn TelemetrySink,
    operation: impl Into<String>,
    f: impl FnOnce() -> Result<Vec<T>>,
) -> Result<Vec<T>> {
    let started = Instant::now();
    let result = f();
    sink.record(TelemetryEvent {
        operation: operation.into(),
        duration_ms: started.elapsed().as_secs_f64() * 1000.0,
        chunk_count: result.as_ref().map_or(0, Vec::len),
        success: result.is_ok(),
    });
    result
}

/// Innermost decorator: times the wrapped strategy without touching its
/// output or its errors
pub struct MonitorDecorator {
    inner: Box<dyn SplitStrategy>,
    sink: Arc<dyn TelemetrySink>,
}

impl MonitorDecorator {
    pub(crate) fn new(inner: Box<dyn SplitStrategy>, sink: Arc<dyn TelemetrySink>) -> Self {
        Self { inner, sink }
    }
}

impl SplitStrategy for MonitorDecorator {
    fn name(&self) -> StrategyName {
        self.inner.name()
    }

    fn priority(&self) -> u32 {
        self.inner.priority()
    }

    fn supported_languages(&self) -> &[String] {
        self.inner.supported_languages()
    }

    fn options(&self) -> serde_json::Value {
        self.inner.options()
    }

    fn can_handle(&self, context: &SplitContext<'_>) -> bool {
        self.inner.can_handle(context)
    }

    fn split(&self, request: &SplitRequest<'_>) -> Result<Vec<CodeChunk>> {
        timed(
            self.sink.as_ref(),
            format!("strategy.{}", self.inner.name()),
            || self.inner.split(request),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessingConfig;
    use crate::strategy;

    #[test]
    fn test_records_success() {
        let sink = Arc::new(MemoryTelemetry::new());
        let monitor = MonitorDecorator::new(
            strategy::build(StrategyName::LineBased, &ProcessingConfig::default()),
            sink.clone(),
        );

        let chunks = monitor.split(&SplitRequest::new("a\nb", "text")).unwrap();
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].operation, "strategy.line-based");
        assert_eq!(events[0].chunk_count, chunks.len());
        assert!(events[0].success);
    }

    #[test]
    fn test_errors_pass_through() {
        let sink = Arc::new(MemoryTelemetry::new());
        let monitor = MonitorDecorator::new(
            strategy::build(StrategyName::AstStructural, &ProcessingConfig::default()),
            sink.clone(),
        );

        // No parse supplied
        let result = monitor.split(&SplitRequest::new("fn a() {}", "rust"));
        assert!(result.is_err());
        assert!(!sink.events()[0].success);
    }
}
