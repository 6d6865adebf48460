#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use tracing_subscriber::layer::SubscriberExt;

/// Captures tracing events on the current thread while alive.
///
/// Only works with the current-thread runtime (`#[tokio::test]` default).
pub struct TestLogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
    _guard: tracing::subscriber::DefaultGuard,
}

#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: tracing::Level,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl TestLogCapture {
    pub fn start() -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(CaptureLayer {
            events: events.clone(),
        });
        let guard = tracing::subscriber::set_default(subscriber);
        Self {
            events,
            _guard: guard,
        }
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Number of events at `level` whose message contains `needle`.
    pub fn count(&self, level: tracing::Level, needle: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.level == level && e.message.contains(needle))
            .count()
    }

    pub fn assert_logged_at_level(&self, level: tracing::Level, needle: &str) {
        assert!(
            self.count(level, needle) > 0,
            "expected {level} event containing {needle:?}, got {:#?}",
            self.events()
        );
    }

    pub fn assert_field_logged(&self, name: &str, value: &str) {
        let found = self
            .events
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.fields.iter().any(|(k, v)| k == name && v.contains(value)));
        assert!(found, "expected field {name}={value}, got {:#?}", self.events());
    }
}

struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for CaptureLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        tracing::field::Visit::record_str(self, field, &format!("{value:?}"));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }
}
