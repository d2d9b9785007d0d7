// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP client construction for the submitter.
//!
//! The client is built once per engine and owned by the flusher thread:
//! - rustls TLS, or a FIPS-compliant rustls configuration with the `fips`
//!   feature
//! - per-request timeout from [`Config::timeout`]
//! - pooled connections with TCP keep-alive
//! - optional HTTPS proxy; an unusable proxy falls back to a direct client

use crate::config::Config;
use reqwest::ClientBuilder;
use std::error::Error;
use std::time::Duration;
use tracing::error;
#[cfg(feature = "fips")]
use tracing::debug;

#[must_use]
pub fn get_client(config: &Config) -> reqwest::Client {
    match build_client(config, true) {
        Ok(client) => client,
        Err(e) => {
            error!(
                "Unable to parse proxy configuration: {}, falling back to direct connection",
                e
            );
            match build_client(config, false) {
                Ok(client) => client,
                Err(inner) => {
                    error!(
                        "Failed to build HTTP client without proxy: {}, using reqwest defaults",
                        inner
                    );
                    reqwest::Client::new()
                }
            }
        }
    }
}

fn build_client(config: &Config, allow_proxy: bool) -> Result<reqwest::Client, Box<dyn Error>> {
    let mut client = tls_client_builder()?
        .timeout(config.timeout)
        .pool_idle_timeout(Some(Duration::from_secs(270)))
        .tcp_keepalive(Some(Duration::from_secs(120)));

    if allow_proxy {
        if let Some(https_uri) = &config.proxy {
            let proxy = reqwest::Proxy::https(https_uri.clone())?;
            client = client.proxy(proxy);
        }
    }

    Ok(client.build()?)
}

/// Client builder using the rustls setup bundled with reqwest.
#[cfg(not(feature = "fips"))]
fn tls_client_builder() -> Result<ClientBuilder, Box<dyn Error>> {
    Ok(reqwest::Client::builder().use_rustls_tls())
}

/// Client builder pinned to the process-wide crypto provider, which must be
/// FIPS-approved, trusting the platform's root certificates.
#[cfg(feature = "fips")]
fn tls_client_builder() -> Result<ClientBuilder, Box<dyn Error>> {
    use rustls::crypto::CryptoProvider;

    let provider = CryptoProvider::get_default()
        .filter(|provider| provider.fips())
        .cloned()
        .ok_or("no FIPS crypto provider installed for this process")?;

    let tls = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_root_certificates(native_roots()?)
        .with_no_client_auth();
    if !tls.fips() {
        return Err("TLS client configuration is not FIPS-compliant".into());
    }

    debug!("Using FIPS TLS configuration for LogDNA submissions");
    Ok(reqwest::Client::builder().use_preconfigured_tls(tls))
}

#[cfg(feature = "fips")]
fn native_roots() -> Result<rustls::RootCertStore, Box<dyn Error>> {
    let loaded = rustls_native_certs::load_native_certs();
    for e in &loaded.errors {
        debug!("Skipping native certificate source: {e}");
    }

    let mut roots = rustls::RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(loaded.certs);
    if ignored > 0 {
        debug!("Ignored {ignored} unparsable root certificates");
    }
    if added == 0 {
        return Err("no usable root certificates in the native store".into());
    }
    Ok(roots)
}
