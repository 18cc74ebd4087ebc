//! Observation hooks around query and field execution.

use std::collections::HashMap;
use std::sync::Arc;

use slog::{debug, o, Logger};

use crate::data::error::QueryError;
use crate::data::value::Object;

/// Called when the traced unit finishes, with the errors it produced.
pub type TraceFinisher = Box<dyn FnOnce(&[QueryError]) + Send>;

/// Observation hooks. `trace_query` fires once per request, `trace_field`
/// once per non-trivial field resolution; each returns a finisher invoked
/// with the errors attributable to that unit. Trivial fields (pure member
/// reads with no arguments) are elided from field tracing.
pub trait Tracer: Send + Sync {
    fn trace_query(
        &self,
        document: &str,
        operation_name: Option<&str>,
        variables: &HashMap<String, crate::data::value::Value>,
        variable_types: &HashMap<String, String>,
    ) -> TraceFinisher;

    fn trace_field(
        &self,
        label: &str,
        parent_type: &str,
        field: &str,
        args: &Object,
    ) -> TraceFinisher;
}

/// The default tracer: observes nothing.
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn trace_query(
        &self,
        _document: &str,
        _operation_name: Option<&str>,
        _variables: &HashMap<String, crate::data::value::Value>,
        _variable_types: &HashMap<String, String>,
    ) -> TraceFinisher {
        Box::new(|_| ())
    }

    fn trace_field(
        &self,
        _label: &str,
        _parent_type: &str,
        _field: &str,
        _args: &Object,
    ) -> TraceFinisher {
        Box::new(|_| ())
    }
}

/// A tracer that logs query and field completion through `slog`.
pub struct LogTracer {
    logger: Logger,
}

impl LogTracer {
    pub fn new(logger: &Logger) -> Self {
        LogTracer {
            logger: logger.new(o!("component" => "LogTracer")),
        }
    }
}

impl Tracer for LogTracer {
    fn trace_query(
        &self,
        document: &str,
        operation_name: Option<&str>,
        _variables: &HashMap<String, crate::data::value::Value>,
        _variable_types: &HashMap<String, String>,
    ) -> TraceFinisher {
        let logger = self.logger.clone();
        let document = document.to_owned();
        let operation_name = operation_name.map(str::to_owned);
        Box::new(move |errors| {
            debug!(
                logger,
                "Query finished";
                "operation" => operation_name.as_deref().unwrap_or("<unnamed>"),
                "query" => document.replace('\n', " "),
                "errors" => errors.len(),
            );
        })
    }

    fn trace_field(
        &self,
        label: &str,
        _parent_type: &str,
        _field: &str,
        _args: &Object,
    ) -> TraceFinisher {
        let logger = self.logger.clone();
        let label = label.to_owned();
        Box::new(move |errors| {
            debug!(logger, "Field finished"; "field" => label, "errors" => errors.len());
        })
    }
}

/// A tracer collecting the labels it saw; used by tests.
#[derive(Clone, Default)]
pub struct RecordingTracer {
    pub events: Arc<std::sync::Mutex<Vec<String>>>,
}

impl RecordingTracer {
    pub fn new() -> Self {
        RecordingTracer::default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl Tracer for RecordingTracer {
    fn trace_query(
        &self,
        _document: &str,
        operation_name: Option<&str>,
        _variables: &HashMap<String, crate::data::value::Value>,
        _variable_types: &HashMap<String, String>,
    ) -> TraceFinisher {
        let events = self.events.clone();
        let label = format!("query:{}", operation_name.unwrap_or(""));
        events.lock().unwrap().push(label.clone());
        Box::new(move |errors| {
            events
                .lock()
                .unwrap()
                .push(format!("{}:done:{}", label, errors.len()));
        })
    }

    fn trace_field(
        &self,
        label: &str,
        _parent_type: &str,
        _field: &str,
        _args: &Object,
    ) -> TraceFinisher {
        let events = self.events.clone();
        let label = label.to_owned();
        events.lock().unwrap().push(label.clone());
        Box::new(move |errors| {
            events
                .lock()
                .unwrap()
                .push(format!("{}:done:{}", label, errors.len()));
        })
    }
}
