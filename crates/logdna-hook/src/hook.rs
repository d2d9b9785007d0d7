// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Producer-facing API.
//!
//! A [`Hook`] owns a flusher thread running the [`Engine`] on a private
//! current-thread runtime, so it can be called from plain threads as well as
//! from inside any async runtime. Callers must invoke [`Hook::close`] before
//! the process exits; dropping the hook performs the same drain as a last
//! resort.

use crate::config::{Config, ConfigSource};
use crate::engine::{Engine, EngineHandle, EngineSettings, Stopped};
use crate::entry::encode;
use crate::error::{ConfigError, HookError, ShutdownFlushError};
use crate::hostname::resolve_hostname;
use crate::level::{Level, SUPPORTED_LEVELS};
use crate::record::Record;
use crate::submitter::HttpSubmitter;
use futures::executor::block_on;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// Key hosts conventionally register this hook under.
pub const HOOK_NAME: &str = "logdna";

/// Name of the thread running the engine.
pub const FLUSHER_THREAD_NAME: &str = "logdna-flusher";

/// Constructor signature handed to hosts that build hooks from configuration.
pub type HookConstructor = fn(&dyn ConfigSource) -> Result<Hook, ConfigError>;

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        EngineSettings {
            buffer_size: config.buffer_size,
            queue_size: config.queue_size,
            flush_every: config.flush_every,
            may_drop: config.may_drop,
            on_error: config.on_error.clone(),
        }
    }
}

impl From<Stopped> for HookError {
    fn from(_: Stopped) -> Self {
        HookError::Closed
    }
}

pub struct Hook {
    config: Arc<Config>,
    handle: EngineHandle,
    worker: Mutex<Option<JoinHandle<Result<(), ShutdownFlushError>>>>,
}

impl Hook {
    /// Validates the configuration, resolves the hostname if needed and
    /// starts the flusher thread.
    pub fn new(mut config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        if config.hostname.trim().is_empty() {
            config.hostname = resolve_hostname()?;
        }
        let config = Arc::new(config);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let submitter = {
            let _guard = runtime.enter();
            HttpSubmitter::new(Arc::clone(&config))
        };
        let (engine, handle) = Engine::new(submitter, EngineSettings::from(config.as_ref()));

        let worker = thread::Builder::new()
            .name(FLUSHER_THREAD_NAME.to_string())
            .spawn(move || runtime.block_on(engine.run()))?;

        debug!(
            "LogDNA hook started for {} (batch size {}, queue size {}, flush every {:?})",
            config.hostname, config.buffer_size, config.queue_size, config.flush_every
        );
        Ok(Hook {
            config,
            handle,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Creates a hook from a configuration lookup. Matches [`HookConstructor`].
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self, ConfigError> {
        Self::new(Config::from_source(source))
    }

    /// Encodes the record and queues it for submission.
    ///
    /// In drop mode a full queue silently discards the entry; otherwise the
    /// call blocks until there is room. Submission failures are never
    /// reported here.
    pub fn fire(&self, record: &Record) -> Result<(), HookError> {
        let entry = encode(record, &self.config)?;
        if self.config.may_drop {
            if !self.handle.try_enqueue(entry)? {
                debug!("Queue is full, dropping entry");
            }
            Ok(())
        } else {
            Ok(block_on(self.handle.enqueue(entry))?)
        }
    }

    /// Submits everything queued so far and waits for the outcome.
    pub fn flush(&self) -> Result<(), HookError> {
        Ok(block_on(self.handle.flush())??)
    }

    /// Drains the queue, performs the final submission and stops the flusher
    /// thread. Calling it again is a no-op.
    ///
    /// A failed final submission is returned as [`HookError::ShutdownFlush`]:
    /// the pending entries are lost.
    pub fn close(&self) -> Result<(), HookError> {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(worker) = worker.take() else {
            return Ok(());
        };

        let requested = block_on(self.handle.close());
        let finished = worker.join();
        match (requested, finished) {
            (Ok(result), _) | (Err(Stopped), Ok(result)) => Ok(result?),
            (Err(Stopped), Err(_)) => {
                error!("LogDNA flusher thread panicked");
                Err(HookError::Closed)
            }
        }
    }

    /// Levels the host should route to this hook.
    pub fn supported_levels(&self) -> &'static [Level] {
        &SUPPORTED_LEVELS
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for Hook {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("Failed to close LogDNA hook: {e}");
        }
    }
}
