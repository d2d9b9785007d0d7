// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Conversion of records into wire-ready entries.
//!
//! Two shapes are produced depending on [`Config::line_json`]:
//!
//! ```text
//! plain: {"timestamp": 1700000000000, "line": "msg", "level": "INFO", "meta": {"A": "1"}}
//! json:  {"timestamp": 1700000000000, "line": "{\"A\":\"1\",\"message\":\"msg\"}", "level": "INFO"}
//! ```
//!
//! `app` and `env` are not part of the entry; they are process-wide and added
//! by [`Lines`] when a batch is serialized.

use crate::config::Config;
use crate::error::EncodingError;
use crate::level::Level;
use crate::record::Record;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

/// Key the message is stored under in line-as-JSON mode.
const MESSAGE_KEY: &str = "message";
/// Key a colliding `message` field is moved to in line-as-JSON mode.
const RENAMED_MESSAGE_KEY: &str = "_message";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

/// Encodes a record according to the configured line mode.
pub fn encode(record: &Record, config: &Config) -> Result<LogEntry, EncodingError> {
    let message = match &config.message_formatter {
        Some(formatter) => formatter.format(record).map_err(EncodingError::Formatter)?,
        None => record.message.clone(),
    };

    let (line, meta) = if config.line_json {
        let mut fields = Map::with_capacity(record.fields.len() + 1);
        for (key, value) in &record.fields {
            // Don't use both "message" and "_message" in your fields
            let key = if key == MESSAGE_KEY {
                RENAMED_MESSAGE_KEY.to_string()
            } else {
                key.clone()
            };
            fields.insert(key, value.clone());
        }
        fields.insert(MESSAGE_KEY.to_string(), Value::String(message));
        (serde_json::to_string(&fields)?, None)
    } else {
        let meta = if record.fields.is_empty() {
            None
        } else {
            Some(record.fields.clone())
        };
        (message, meta)
    };

    Ok(LogEntry {
        timestamp: unix_millis(record.time),
        line,
        level: record.level,
        meta,
    })
}

/// Milliseconds since the Unix epoch, truncated. Times before the epoch come
/// out negative.
pub fn unix_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(since) => i64::try_from(since.as_millis()).unwrap_or(i64::MAX),
        Err(e) => i64::try_from(e.duration().as_millis()).map_or(i64::MIN, |ms| -ms),
    }
}

/// An entry together with the process-wide tags, as it appears on the wire.
#[derive(Serialize)]
struct TaggedEntry<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    app: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    env: Option<&'a str>,
    #[serde(flatten)]
    entry: &'a LogEntry,
}

/// Request body for the ingestion endpoint: `{"lines": [...]}`.
#[derive(Serialize)]
pub struct Lines<'a> {
    lines: Vec<TaggedEntry<'a>>,
}

impl<'a> Lines<'a> {
    pub fn new(batch: &'a [LogEntry], app: Option<&'a str>, env: Option<&'a str>) -> Self {
        Lines {
            lines: batch
                .iter()
                .map(|entry| TaggedEntry { app, env, entry })
                .collect(),
        }
    }
}
