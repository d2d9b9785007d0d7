// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::env;
use std::io::{self, BufRead};
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use logdna_hook::{Config, EnvSource, Hook, Level, Record};

pub fn main() -> ExitCode {
    let log_level = env::var("LOGDNA_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,rustls=off,{log_level}");

    let filter = match EnvFilter::try_new(env_filter) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("could not parse log level in configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .with_writer(io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
        return ExitCode::FAILURE;
    }

    debug!("Logging subsystem enabled");

    let hook = match Hook::new(Config::from_source(&EnvSource::default())) {
        Ok(hook) => hook,
        Err(e) => {
            error!("Error creating LogDNA hook: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut forwarded = 0_usize;
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Error reading stdin: {e}");
                break;
            }
        };
        if line.is_empty() {
            continue;
        }
        match hook.fire(&Record::new(Level::Info, line)) {
            Ok(()) => forwarded += 1,
            Err(e) => error!("Error forwarding line: {e}"),
        }
    }

    match hook.close() {
        Ok(()) => {
            info!("Forwarded {forwarded} lines");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error shutting down LogDNA hook: {e}");
            ExitCode::FAILURE
        }
    }
}
