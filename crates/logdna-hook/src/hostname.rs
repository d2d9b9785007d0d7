// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Hostname detection used when the configuration leaves `hostname` empty.

use crate::error::ConfigError;
use std::env;

/// Get the system hostname
///
/// Tries the system hostname first and the `HOSTNAME` environment variable
/// second. Unlike the rest of the configuration there is no fallback value:
/// the ingestion endpoint rejects lines without a host.
pub fn resolve_hostname() -> Result<String, ConfigError> {
    let system_error = match system_hostname() {
        Ok(hostname) if !hostname.is_empty() => return Ok(hostname),
        Ok(_) => "system hostname is empty".to_string(),
        Err(e) => e,
    };

    if let Ok(hostname) = env::var("HOSTNAME") {
        if !hostname.is_empty() {
            return Ok(hostname);
        }
    }

    Err(ConfigError::Hostname(system_error))
}

#[cfg(unix)]
fn system_hostname() -> Result<String, String> {
    let hostname = nix::unistd::gethostname().map_err(|e| e.to_string())?;
    hostname
        .into_string()
        .map_err(|_| "system hostname is not valid UTF-8".to_string())
}

#[cfg(not(unix))]
fn system_hostname() -> Result<String, String> {
    env::var("COMPUTERNAME").map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_hostname_not_empty() {
        let hostname = resolve_hostname().expect("hostname should resolve");
        assert!(!hostname.is_empty());
    }
}
