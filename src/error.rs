//! Error taxonomy (spec §7): four independent families that all eventually
//! fold into [`OidcError`] at a protocol endpoint boundary.

use core::fmt;

use serde::Serialize;
use thiserror::Error;

/// An OIDC/OAuth2 protocol error, surfaced verbatim to the relying party.
///
/// This is taxonomy (1) from spec §7. The `error` field uses the exact
/// wire tokens from the relevant RFCs (`invalid_request`, `invalid_client`,
/// ...) so that `Serialize` output can be placed directly into a transport
/// response body by the host application.
#[derive(Debug, Clone, Serialize, Error)]
pub struct OidcError {
    pub error: OidcErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl fmt::Display for OidcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {desc}", self.error.as_str()),
            None => write!(f, "{}", self.error.as_str()),
        }
    }
}

impl OidcError {
    pub fn new(code: OidcErrorCode) -> Self {
        Self { error: code, error_description: None }
    }

    pub fn with_description(code: OidcErrorCode, description: impl Into<String>) -> Self {
        Self { error: code, error_description: Some(description.into()) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OidcErrorCode {
    InvalidRequest,
    InvalidClient,
    InvalidGrant,
    UnauthorizedClient,
    UnsupportedGrantType,
    InvalidScope,
    InvalidTarget,
    AccessDenied,
    AuthorizationPending,
    SlowDown,
    ExpiredToken,
    /// Not part of the core protocol error set, but required by spec §7-4
    /// to surface SSRF/metadata-fetch infrastructure failures.
    InvalidClientMetadata,
    /// Catch-all for an infrastructure failure that must not leak detail
    /// (spec §7-3/§7-4: DNS failure, timeout, oversize response, crypto
    /// failure). The description is intentionally generic.
    ServerError,
}

impl OidcErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::InvalidScope => "invalid_scope",
            Self::InvalidTarget => "invalid_target",
            Self::AccessDenied => "access_denied",
            Self::AuthorizationPending => "authorization_pending",
            Self::SlowDown => "slow_down",
            Self::ExpiredToken => "expired_token",
            Self::InvalidClientMetadata => "invalid_client_metadata",
            Self::ServerError => "server_error",
        }
    }
}

impl fmt::Display for OidcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JWT validation errors (spec §7 taxonomy 2).
///
/// These never escape to a caller on their own; every call site maps them
/// to [`OidcErrorCode::InvalidGrant`] (token endpoint) or to the
/// introspection "inactive" response, per spec §7.
#[derive(Debug, Clone, Error)]
pub enum JwtValidationError {
    #[error("malformed or undecodable token")]
    InvalidToken,
    #[error("token has expired")]
    TokenExpired,
    #[error("signature verification failed")]
    InvalidSignature,
    #[error("unexpected issuer")]
    InvalidIssuer,
    #[error("unexpected audience")]
    InvalidAudience,
    #[error("token has already been used")]
    Replayed,
    #[error("required claim `{0}` is missing")]
    MissingClaim(&'static str),
}

impl JwtValidationError {
    /// Maps this error onto the token-endpoint-facing protocol error
    /// (spec §7: "These map to `invalid_grant` at the token endpoint").
    pub fn into_token_endpoint_error(self) -> OidcError {
        OidcError::with_description(OidcErrorCode::InvalidGrant, self.to_string())
    }

    /// Maps this error onto the introspection "inactive" boolean, per
    /// spec §7 ("...and to the \"inactive\" response at the introspection
    /// endpoint"). There is no error code in that response, only `false`.
    pub const fn is_active(&self) -> bool {
        false
    }
}

/// Cryptographic failures (spec §7 taxonomy 3).
///
/// By construction this type carries no detail distinguishing *why* an
/// operation failed (e.g. bad tag vs. bad padding) — see spec §4.1.1 and
/// §7-3. Call sites collapse `Result<T, CryptoError>` into `None`/`false`
/// rather than ever matching on a variant.
#[derive(Debug, Clone, Copy, Error)]
#[error("cryptographic operation failed")]
pub struct CryptoError;

/// Infrastructure failures (spec §7 taxonomy 4): SSRF block, DNS failure,
/// timeout, oversize response. Logged by the caller, then surfaced as
/// [`OidcErrorCode::InvalidClientMetadata`] or [`OidcErrorCode::ServerError`].
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("URL scheme `{0}` is not allowed")]
    SchemeBlocked(String),
    #[error("hostname `{0}` is blocked by the SSRF hostname deny-list")]
    HostnameBlocked(String),
    #[error("resolved IP address `{0}` is blocked by the SSRF IP deny-list")]
    IpBlocked(std::net::IpAddr),
    #[error("DNS resolution failed for `{host}`")]
    DnsResolution { host: String, #[source] source: anyhow::Error },
    #[error("response exceeded the maximum allowed size of {max_bytes} bytes")]
    ResponseTooLarge { max_bytes: u64 },
    #[error("request timed out")]
    Timeout,
    #[error("unexpected content type `{0}`")]
    UnexpectedContentType(String),
    #[error("transport error")]
    Transport(#[source] anyhow::Error),
}

impl InfraError {
    pub fn into_oidc_error(self) -> OidcError {
        tracing::warn!(error = %self, "outbound fetch failed");
        OidcError::with_description(OidcErrorCode::InvalidClientMetadata, "failed to retrieve remote resource")
    }
}
