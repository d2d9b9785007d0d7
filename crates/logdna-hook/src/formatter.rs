// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Message formatters turn a whole record into the single string shipped as
//! the entry's message.

use crate::record::Record;
use serde_json::Value;
use std::fmt::Write;

pub type FormatError = Box<dyn std::error::Error + Send + Sync>;

pub trait MessageFormatter: Send + Sync {
    fn format(&self, record: &Record) -> Result<String, FormatError>;
}

/// Renders the message followed by `key=value` pairs sorted by key. No
/// timestamps, no levels, no colors.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleTextFormatter {
    pub quote_empty_fields: bool,
}

impl SimpleTextFormatter {
    fn needs_quoting(&self, text: &str) -> bool {
        if self.quote_empty_fields && text.is_empty() {
            return true;
        }
        text.chars().any(|ch| {
            !(ch.is_ascii_alphanumeric()
                || matches!(ch, '-' | '.' | '_' | '/' | '@' | '^' | '+'))
        })
    }

    fn append_value(&self, out: &mut String, value: &Value) -> std::fmt::Result {
        let rendered = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if self.needs_quoting(&rendered) {
            write!(out, "{rendered:?}")
        } else {
            out.push_str(&rendered);
            Ok(())
        }
    }
}

impl MessageFormatter for SimpleTextFormatter {
    fn format(&self, record: &Record) -> Result<String, FormatError> {
        let mut out = String::with_capacity(record.message.len() + record.fields.len() * 16);
        out.push_str(&record.message);

        let mut keys: Vec<&String> = record.fields.keys().collect();
        keys.sort();

        for key in keys {
            write!(out, " {key}=")?;
            self.append_value(&mut out, &record.fields[key.as_str()])?;
        }
        Ok(out)
    }
}
