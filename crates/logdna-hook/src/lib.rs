// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batching log hook for the LogDNA ingestion API.
//!
//! Records handed to a [`Hook`] are encoded into ingestion lines, queued on a
//! bounded channel and shipped in batches by a dedicated flusher thread. A
//! batch leaves when it reaches the configured size, when the flush interval
//! elapses, on [`Hook::flush`] and on [`Hook::close`].

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod engine;
pub mod entry;
pub mod error;
pub mod formatter;
pub mod hook;
pub mod hostname;
pub mod http;
pub mod layer;
pub mod level;
pub mod record;
pub mod submitter;

pub use config::{Config, ConfigSource, EnvSource, ErrorReporter};
pub use entry::LogEntry;
pub use error::{ConfigError, EncodingError, HookError, ShutdownFlushError, SubmitError};
pub use formatter::{MessageFormatter, SimpleTextFormatter};
pub use hook::{Hook, HookConstructor, HOOK_NAME};
pub use layer::LogdnaLayer;
pub use level::{Level, SUPPORTED_LEVELS};
pub use record::Record;
pub use submitter::{BatchSubmitter, HttpSubmitter};
