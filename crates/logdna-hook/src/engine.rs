// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Single-consumer batching engine.
//!
//! Producers talk to the engine through a cloneable [`EngineHandle`]; the
//! [`Engine`] owns the pending batch and is the only caller of the submitter,
//! so submissions are strictly sequential and batches leave in enqueue order.
//!
//! ```text
//!    ┌──────────────┐
//!    │   Handles    │  Entry / Flush / Close
//!    └──────┬───────┘
//!           │ bounded mpsc (queue_size)
//!           v
//!    ┌──────────────┐      ┌──────────────┐
//!    │    Engine    │<─────│    Timer     │  flush_every
//!    └──────┬───────┘      └──────────────┘
//!           │ whole batch
//!           v
//!    ┌──────────────┐
//!    │  Submitter   │
//!    └──────────────┘
//! ```
//!
//! A batch is submitted when it reaches `buffer_size`, when the timer fires,
//! on an explicit flush and on close. It is only cleared once the remote has
//! accepted it, or unconditionally in drop mode.

use crate::config::ErrorReporter;
use crate::entry::LogEntry;
use crate::error::{ShutdownFlushError, SubmitError};
use crate::submitter::BatchSubmitter;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep, Instant, Sleep};
use tracing::{debug, error, warn};

pub type FlushReply = oneshot::Sender<Result<(), SubmitError>>;
pub type CloseReply = oneshot::Sender<Result<(), ShutdownFlushError>>;

/// Messages accepted by the engine, in the order producers sent them.
#[derive(Debug)]
pub enum Command {
    Entry(LogEntry),
    /// Submit whatever is pending and report the outcome.
    Flush(FlushReply),
    /// Submit whatever is pending, report the outcome and stop.
    Close(CloseReply),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    Draining,
    Stopped,
}

/// Engine settings taken from [`crate::config::Config`].
#[derive(Clone)]
pub struct EngineSettings {
    pub buffer_size: usize,
    pub queue_size: usize,
    pub flush_every: Duration,
    pub may_drop: bool,
    pub on_error: Option<ErrorReporter>,
}

/// Error returned when the engine no longer accepts commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Engine is stopped")]
pub struct Stopped;

/// Producer side of the engine queue.
#[derive(Clone, Debug)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
    state: watch::Receiver<State>,
}

impl EngineHandle {
    /// Waits for queue space, then enqueues the entry.
    pub async fn enqueue(&self, entry: LogEntry) -> Result<(), Stopped> {
        self.tx
            .send(Command::Entry(entry))
            .await
            .map_err(|_| Stopped)
    }

    /// Enqueues the entry if there is room. Returns `Ok(false)` when the queue
    /// was full and the entry was discarded.
    pub fn try_enqueue(&self, entry: LogEntry) -> Result<bool, Stopped> {
        match self.tx.try_send(Command::Entry(entry)) {
            Ok(()) => Ok(true),
            Err(mpsc::error::TrySendError::Full(_)) => Ok(false),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(Stopped),
        }
    }

    /// Requests an out-of-band submission of the pending batch and waits for
    /// its outcome.
    pub async fn flush(&self) -> Result<Result<(), SubmitError>, Stopped> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(reply_tx))
            .await
            .map_err(|_| Stopped)?;
        reply_rx.await.map_err(|_| Stopped)
    }

    /// Asks the engine to drain and stop, and waits until it has.
    pub async fn close(&self) -> Result<Result<(), ShutdownFlushError>, Stopped> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Close(reply_tx))
            .await
            .map_err(|_| Stopped)?;
        reply_rx.await.map_err(|_| Stopped)
    }

    /// Lifecycle state last published by the engine.
    pub fn state(&self) -> State {
        *self.state.borrow()
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == State::Stopped
    }
}

pub struct Engine<S> {
    submitter: S,
    rx: mpsc::Receiver<Command>,
    batch: Vec<LogEntry>,
    settings: EngineSettings,
    state: watch::Sender<State>,
}

impl<S: BatchSubmitter> Engine<S> {
    /// Creates the engine and the handle producers use to reach it. A queue
    /// size of 0 is raised to 1.
    pub fn new(submitter: S, settings: EngineSettings) -> (Self, EngineHandle) {
        let (tx, rx) = mpsc::channel(settings.queue_size.max(1));
        let (state, state_rx) = watch::channel(State::Running);
        let engine = Engine {
            submitter,
            rx,
            batch: Vec::new(),
            settings,
            state,
        };
        (engine, EngineHandle { tx, state: state_rx })
    }

    /// Runs until a close command arrives or every handle is dropped, then
    /// performs a final flush.
    pub async fn run(mut self) -> Result<(), ShutdownFlushError> {
        debug!("Engine started");
        let timer = sleep(self.settings.flush_every);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                command = self.rx.recv() => match command {
                    Some(Command::Entry(entry)) => self.on_entry(entry, timer.as_mut()).await,
                    Some(Command::Flush(reply)) => {
                        let result = self.on_flush(timer.as_mut()).await;
                        if reply.send(result).is_err() {
                            debug!("Flush requester went away before the reply");
                        }
                    }
                    Some(Command::Close(reply)) => return self.drain(vec![reply]).await,
                    None => return self.drain(Vec::new()).await,
                },
                () = &mut timer => {
                    self.on_tick().await;
                    self.reset_timer(timer.as_mut());
                }
            }
        }
    }

    async fn on_entry(&mut self, entry: LogEntry, timer: Pin<&mut Sleep>) {
        self.batch.push(entry);
        if self.batch.len() < self.settings.buffer_size {
            return;
        }

        match self.submit().await {
            Ok(()) => {
                self.batch.clear();
                self.reset_timer(timer);
            }
            Err(_) if self.settings.may_drop => {
                warn!("Dropping {} entries after failed submission", self.batch.len());
                self.batch.clear();
                self.reset_timer(timer);
            }
            // Retried by the next tick or the next entry
            Err(_) => {}
        }
    }

    async fn on_flush(&mut self, timer: Pin<&mut Sleep>) -> Result<(), SubmitError> {
        let result = self.submit().await;
        match &result {
            Ok(()) => {
                self.batch.clear();
                self.reset_timer(timer);
            }
            Err(_) if self.settings.may_drop => {
                warn!("Dropping {} entries after failed flush", self.batch.len());
                self.batch.clear();
            }
            Err(_) => {}
        }
        result
    }

    async fn on_tick(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        if self.submit().await.is_ok() {
            self.batch.clear();
        }
    }

    /// Stops admission, folds everything still queued into the pending batch
    /// and performs the final submission. Flush and close requests that were
    /// queued behind the first close are answered with the same outcome.
    async fn drain(&mut self, mut closers: Vec<CloseReply>) -> Result<(), ShutdownFlushError> {
        self.state.send_replace(State::Draining);
        self.rx.close();

        let mut flushers = Vec::new();
        while let Some(command) = self.rx.recv().await {
            match command {
                Command::Entry(entry) => self.batch.push(entry),
                Command::Flush(reply) => flushers.push(reply),
                Command::Close(reply) => closers.push(reply),
            }
        }
        debug!("Engine draining {} pending entries", self.batch.len());

        let result = match self.submit().await {
            Ok(()) => {
                self.batch.clear();
                Ok(())
            }
            Err(source) => {
                let error = ShutdownFlushError {
                    pending: self.batch.len(),
                    source,
                };
                error!("{error}");
                Err(error)
            }
        };

        self.state.send_replace(State::Stopped);
        debug!("Engine stopped");

        for reply in flushers {
            let outcome = result.clone().map_err(|e| e.source);
            if reply.send(outcome).is_err() {
                debug!("Flush requester went away before the reply");
            }
        }
        for reply in closers {
            if reply.send(result.clone()).is_err() {
                debug!("Close requester went away before the reply");
            }
        }
        result
    }

    /// Submits the whole pending batch. Failures are logged and reported, the
    /// caller decides what happens to the batch.
    async fn submit(&mut self) -> Result<(), SubmitError> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let result = self.submitter.submit(&self.batch).await;
        match &result {
            Ok(()) => debug!("Submitted {} entries", self.batch.len()),
            Err(e) => {
                error!("Failed to submit {} entries: {e}", self.batch.len());
                if let Some(on_error) = &self.settings.on_error {
                    on_error(e);
                }
            }
        }
        result
    }

    fn reset_timer(&self, timer: Pin<&mut Sleep>) {
        timer.reset(Instant::now() + self.settings.flush_every);
    }
}
