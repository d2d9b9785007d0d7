// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! `tracing` integration: ships every supported event through a [`Hook`].
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tracing_subscriber::prelude::*;
//! use logdna_hook::{Hook, LogdnaLayer, EnvSource};
//!
//! let hook = Arc::new(Hook::from_source(&EnvSource::default())?);
//! tracing_subscriber::registry()
//!     .with(LogdnaLayer::new(Arc::clone(&hook)))
//!     .init();
//!
//! tracing::info!(user = "alice", "logged in");
//! hook.close()?;
//! ```
//!
//! The event message becomes the record message and every other field is
//! kept as a JSON value. Events emitted by this crate and anything logged on
//! the flusher thread (the HTTP stack included) are skipped so the hook never
//! ships its own diagnostics or blocks on its own queue.

use crate::hook::{Hook, FLUSHER_THREAD_NAME};
use crate::level::Level;
use crate::record::Record;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::field::{Field, Visit};
use tracing::{debug, Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

const MESSAGE_FIELD: &str = "message";

pub struct LogdnaLayer {
    hook: Arc<Hook>,
}

impl LogdnaLayer {
    #[must_use]
    pub fn new(hook: Arc<Hook>) -> Self {
        LogdnaLayer { hook }
    }

    fn is_own_event(event: &Event<'_>) -> bool {
        event.metadata().target().starts_with(env!("CARGO_CRATE_NAME"))
            || std::thread::current().name() == Some(FLUSHER_THREAD_NAME)
    }
}

impl<S> Layer<S> for LogdnaLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if Self::is_own_event(event) {
            return;
        }
        let level = Level::from(event.metadata().level());
        if !self.hook.supported_levels().contains(&level) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let record = Record {
            time: SystemTime::now(),
            level: Some(level),
            message: visitor.message.unwrap_or_default(),
            fields: visitor.fields,
        };
        if let Err(e) = self.hook.fire(&record) {
            debug!("Failed to forward event: {e}");
        }
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Map<String, Value>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        if field.name() == MESSAGE_FIELD {
            let message = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            self.message = Some(message);
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::from(format!("{value:?}")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use mockito::{Matcher, Server};
    use std::sync::{mpsc, Mutex};
    use std::time::Duration;
    use tracing_subscriber::layer::SubscriberExt;

    type Captured = Arc<std::sync::Mutex<Vec<(Option<String>, Map<String, Value>)>>>;

    /// Collects visited fields from every event.
    struct Capture(Captured);

    impl<S: Subscriber> Layer<S> for Capture {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut visitor = FieldVisitor::default();
            event.record(&mut visitor);
            self.0.lock().unwrap().push((visitor.message, visitor.fields));
        }
    }

    #[test]
    fn test_visitor_splits_message_and_fields() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::registry().with(Capture(Arc::clone(&captured)));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(user = "alice", attempts = 3_u64, ok = true, ratio = 0.5, "logged in");
        });

        let events = captured.lock().unwrap();
        assert_eq!(events.len(), 1);
        let (message, fields) = &events[0];
        assert_eq!(message.as_deref(), Some("logged in"));
        assert_eq!(fields["user"], "alice");
        assert_eq!(fields["attempts"], 3);
        assert_eq!(fields["ok"], true);
        assert_eq!(fields["ratio"], 0.5);
        assert!(!fields.contains_key(MESSAGE_FIELD));
    }

    #[test]
    fn test_debug_fields_are_strings() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::registry().with(Capture(Arc::clone(&captured)));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(items = ?vec![1, 2], "debug formatted");
        });

        let events = captured.lock().unwrap();
        assert_eq!(events[0].1["items"], "[1, 2]");
    }

    #[test]
    fn test_layer_forwards_supported_events() {
        let mut server = Server::new();
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let _mock = server
            .mock("POST", "/logs/ingest")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body_from_request(move |request| {
                let body: Value = serde_json::from_slice(request.body().unwrap()).unwrap();
                let _ = tx.lock().unwrap().send(body);
                br#"{"status": "ok"}"#.to_vec()
            })
            .create();

        let hook = Arc::new(
            Hook::new(Config {
                ingest_url: format!("{}/logs/ingest", server.url()),
                api_key: "test-api-key".to_string(),
                hostname: "test-host".to_string(),
                ..Default::default()
            })
            .expect("hook should start"),
        );
        let subscriber = tracing_subscriber::registry().with(LogdnaLayer::new(Arc::clone(&hook)));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "app", user = "alice", "logged in");
            tracing::trace!(target: "app", "too chatty");
            tracing::warn!("emitted by this crate");
        });
        hook.close().expect("close should succeed");

        let body = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("close should ship the event");
        let lines = body["lines"].as_array().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["line"], "logged in");
        assert_eq!(lines[0]["level"], "INFO");
        assert_eq!(lines[0]["meta"]["user"], "alice");
    }
}
