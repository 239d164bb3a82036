//! The SSRF-safe outbound HTTP fetcher (spec §4.5), used to retrieve
//! client metadata, JWKS documents, request objects, and CIBA
//! notification endpoints.
//!
//! Transport hardening (layer 5) follows the teacher crate's general
//! posture toward outbound HTTP (see `http-client-proxy`): a freshly
//! built `reqwest::Client` per validated target, redirects disabled,
//! default credentials disabled, response size capped.

pub mod cache;
pub mod filter;

use std::net::{IpAddr, SocketAddr};

use serde::de::DeserializeOwned;
use url::Url;

use crate::config::SecureHttpFetchOptions;
use crate::error::{InfraError, OidcError};

/// A small client exposing `fetch::<T>(uri)` with the defense-in-depth
/// layering spec §4.5 describes.
pub struct SsrfSafeFetcher {
    options: SecureHttpFetchOptions,
}

impl SsrfSafeFetcher {
    pub fn new(options: SecureHttpFetchOptions) -> Self {
        Self { options }
    }

    /// Fetches and JSON-deserializes `uri`, applying every SSRF layer in
    /// spec §4.5. Never performs a socket write to a blocked address —
    /// the hostname is re-resolved and re-checked immediately before the
    /// request (layer 4), and the resolved address is then pinned into
    /// the HTTP client so the library cannot independently re-resolve
    /// and rebind to a different, unchecked address.
    pub async fn fetch<T: DeserializeOwned>(&self, uri: &str) -> Result<T, OidcError> {
        self.fetch_json(uri).await.map_err(InfraError::into_oidc_error)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, uri: &str) -> Result<T, InfraError> {
        let url = Url::parse(uri).map_err(|e| InfraError::Transport(e.into()))?;

        filter::check_scheme(&url, &self.options.allowed_schemes)?;
        filter::check_hostname(&url)?;

        let host = url.host_str().ok_or_else(|| InfraError::HostnameBlocked(String::new()))?.to_owned();
        let port = url.port_or_known_default().unwrap_or(443);

        let resolved = self.resolve_and_validate(&host).await?;
        let socket_addr = SocketAddr::new(resolved, port);

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(self.options.request_timeout)
            .connect_timeout(self.options.request_timeout)
            .no_gzip()
            .no_brotli()
            .no_deflate()
            .resolve(&host, socket_addr)
            .build()
            .map_err(|e| InfraError::Transport(e.into()))?;

        let response = client.get(url).send().await.map_err(|e| {
            if e.is_timeout() { InfraError::Timeout } else { InfraError::Transport(e.into()) }
        })?;

        if let Some(len) = response.content_length()
            && len > self.options.max_response_bytes
        {
            return Err(InfraError::ResponseTooLarge { max_bytes: self.options.max_response_bytes });
        }

        let content_type = response.headers().get(reqwest::header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or("").to_owned();
        if !content_type.starts_with("application/json") {
            return Err(InfraError::UnexpectedContentType(content_type));
        }

        let bytes = response.bytes().await.map_err(|e| InfraError::Transport(e.into()))?;
        if bytes.len() as u64 > self.options.max_response_bytes {
            return Err(InfraError::ResponseTooLarge { max_bytes: self.options.max_response_bytes });
        }

        serde_json::from_slice(&bytes).map_err(|e| InfraError::Transport(e.into()))
    }

    /// Layer 4: pre-request DNS re-validation. Resolves `host` fresh and
    /// re-applies the IP deny-list (layer 3), closing the TOCTOU window
    /// between an earlier check and the actual network write.
    async fn resolve_and_validate(&self, host: &str) -> Result<IpAddr, InfraError> {
        if let Ok(literal) = host.parse::<IpAddr>() {
            if self.options.block_private_networks {
                filter::check_ip(literal)?;
            }
            return Ok(literal);
        }

        let lookup = format!("{host}:0");
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host(&lookup)
            .await
            .map_err(|e| InfraError::DnsResolution { host: host.to_owned(), source: e.into() })?
            .collect();

        let mut candidates = addrs.into_iter().map(|s| s.ip());
        if self.options.block_private_networks {
            for addr in candidates.by_ref() {
                if filter::check_ip(addr).is_ok() {
                    return Ok(addr);
                }
            }
            Err(InfraError::DnsResolution { host: host.to_owned(), source: anyhow::anyhow!("no non-blocked address resolved") })
        } else {
            candidates.next().ok_or_else(|| InfraError::DnsResolution { host: host.to_owned(), source: anyhow::anyhow!("no address resolved") })
        }
    }
}

