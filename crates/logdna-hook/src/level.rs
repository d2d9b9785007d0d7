// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use derive_more::Display;
use serde::Serialize;

/// Severity of a log record, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    #[display("PANIC")]
    Panic,
    #[display("FATAL")]
    Fatal,
    #[display("ERROR")]
    Error,
    #[display("WARN")]
    Warn,
    #[display("INFO")]
    Info,
    #[display("DEBUG")]
    Debug,
    #[display("TRACE")]
    Trace,
}

/// Levels routed to the ingestion endpoint. Trace output is too chatty to ship.
pub const SUPPORTED_LEVELS: [Level; 6] = [
    Level::Panic,
    Level::Fatal,
    Level::Error,
    Level::Warn,
    Level::Info,
    Level::Debug,
];

impl From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Self {
        if *level == tracing::Level::ERROR {
            Level::Error
        } else if *level == tracing::Level::WARN {
            Level::Warn
        } else if *level == tracing::Level::INFO {
            Level::Info
        } else if *level == tracing::Level::DEBUG {
            Level::Debug
        } else {
            Level::Trace
        }
    }
}
