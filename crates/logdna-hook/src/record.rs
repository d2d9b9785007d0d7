// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::level::Level;
use serde_json::{Map, Value};
use std::time::SystemTime;

/// A structured log record as handed over by the host logging framework.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub time: SystemTime,
    pub level: Option<Level>,
    pub message: String,
    pub fields: Map<String, Value>,
}

impl Record {
    /// Creates a record stamped with the current time and no fields.
    pub fn new(level: impl Into<Option<Level>>, message: impl Into<String>) -> Self {
        Record {
            time: SystemTime::now(),
            level: level.into(),
            message: message.into(),
            fields: Map::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn at(mut self, time: SystemTime) -> Self {
        self.time = time;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_builder() {
        let time = SystemTime::UNIX_EPOCH + Duration::from_secs(42);
        let record = Record::new(Level::Info, "hello")
            .with_field("user", "alice")
            .with_field("attempt", 3)
            .at(time);

        assert_eq!(record.level, Some(Level::Info));
        assert_eq!(record.message, "hello");
        assert_eq!(record.time, time);
        assert_eq!(record.fields["user"], "alice");
        assert_eq!(record.fields["attempt"], 3);
    }

    #[test]
    fn test_without_level() {
        let record = Record::new(None, "plain");
        assert!(record.level.is_none());
        assert!(record.fields.is_empty());
    }
}
