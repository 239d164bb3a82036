//! Core data model (spec §3): the value records that flow between the
//! token pipeline, the grant processor, and the CIBA engine.
//!
//! Per spec §9 ("Cyclic graphs"), these are plain records carrying
//! identifiers rather than embedded object graphs — `AuthorizedGrant`
//! holds an `AuthSession` by value, not a handle back into a session
//! store; lookups that need the live record go through the provider
//! interfaces in [`crate::interfaces`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::error::{OidcError, OidcErrorCode};
use crate::jose::JsonWebKeySet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
    None,
    ClientSecretBasic,
    ClientSecretPost,
    ClientSecretJwt,
    PrivateKeyJwt,
    TlsClientAuth,
    SelfSignedTlsClientAuth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    AuthorizationCode,
    RefreshToken,
    ClientCredentials,
    Ciba,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    Public,
    Pairwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CibaDeliveryMode {
    Poll,
    Ping,
    Push,
}

/// A client's JWKS, either embedded at registration time or resolved
/// on demand through the SSRF-safe fetcher (spec §4.5).
#[derive(Debug, Clone)]
pub enum ClientJwks {
    Inline(JsonWebKeySet),
    ByReference(String),
}

/// Registered client identity and policy (spec §3 "ClientInfo").
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub client_id: String,
    pub client_secret: Option<secrecy::SecretString>,
    pub allowed_grant_types: BTreeSet<GrantType>,
    pub allowed_auth_methods: BTreeSet<ClientAuthMethod>,
    pub redirect_uris: Vec<String>,
    pub sector_identifier_uri: Option<String>,
    pub jwks: Option<ClientJwks>,
    pub access_token_ttl: Option<time::Duration>,
    pub refresh_token_ttl: Option<time::Duration>,
    pub subject_type: SubjectType,
    pub require_pkce: bool,
    pub ciba_delivery_mode: Option<CibaDeliveryMode>,
    pub client_notification_endpoint: Option<String>,
}

impl ClientInfo {
    /// Checks the spec §3 invariant: "a client registered with push or
    /// ping mode has a non-empty client_notification_endpoint."
    pub fn check_invariants(&self) -> Result<(), OidcError> {
        let needs_endpoint = matches!(self.ciba_delivery_mode, Some(CibaDeliveryMode::Push) | Some(CibaDeliveryMode::Ping));
        if needs_endpoint && self.client_notification_endpoint.as_deref().is_none_or(str::is_empty) {
            return Err(OidcError::with_description(
                OidcErrorCode::InvalidClientMetadata,
                "push/ping delivery mode requires a client_notification_endpoint",
            ));
        }
        Ok(())
    }

    pub fn allows_grant(&self, grant: GrantType) -> bool {
        self.allowed_grant_types.contains(&grant)
    }
}

/// A signed-in end-user session (spec §3 "AuthSession").
///
/// Per spec §9's Open Question resolution, this is the richer variant
/// (amr, email, additional claims) — the only one carried forward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub subject: String,
    pub session_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub auth_time: OffsetDateTime,
    pub idp_id: String,
    pub acr: Option<String>,
    #[serde(default)]
    pub amr: Vec<String>,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub affected_client_ids: BTreeSet<String>,
    #[serde(default)]
    pub additional_claims: Map<String, Value>,
}

impl AuthSession {
    /// Appends to `affected_client_ids`; the only mutation this record
    /// permits outside of sign-out/expiry (spec §3 lifetime note).
    pub fn record_affected_client(&mut self, client_id: impl Into<String>) {
        self.affected_client_ids.insert(client_id.into());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PkceMethod {
    Plain,
    #[serde(rename = "S256")]
    S256,
}

/// The captured parameters of a completed authorization request (spec §3
/// "AuthorizationContext"), replayed at token-issuance time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationContext {
    pub client_id: String,
    pub scope: Vec<String>,
    pub requested_claims: Option<Value>,
    pub redirect_uri: String,
    pub nonce: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<PkceMethod>,
    #[serde(default)]
    pub resources: Vec<String>,
}

/// A `(jti, expires_at)` pair recorded against an [`AuthorizedGrant`] to
/// enable cascading revocation (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    pub jti: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

/// `(AuthSession x AuthorizationContext x IssuedTokens[])` (spec §3
/// "AuthorizedGrant").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizedGrant {
    pub session: AuthSession,
    pub context: AuthorizationContext,
    #[serde(default)]
    pub issued_tokens: Vec<IssuedToken>,
}

impl AuthorizedGrant {
    pub fn record_issued(&mut self, jti: impl Into<String>, expires_at: OffsetDateTime) {
        self.issued_tokens.push(IssuedToken { jti: jti.into(), expires_at });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackChannelStatus {
    Pending,
    Authenticated,
    Denied,
    Expired,
}

/// Error returned by [`BackChannelAuthenticationRequest::transition`]
/// when attempted from a non-`Pending` state (spec §3 invariant:
/// "transitions from Pending only").
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("cannot transition a back-channel request out of a non-pending state")]
pub struct NotPendingError;

/// A CIBA back-channel authentication request (spec §3
/// "BackChannelAuthenticationRequest", spec §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackChannelAuthenticationRequest {
    pub auth_req_id: String,
    pub status: BackChannelStatus,
    pub grant: AuthorizedGrant,
    pub client_notification_endpoint: Option<String>,
    pub client_notification_token: Option<String>,
    pub binding_message: Option<String>,
    pub user_code: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub last_polled_at: Option<OffsetDateTime>,
    pub interval: i64,
}

impl BackChannelAuthenticationRequest {
    /// Moves this request to `Authenticated` or `Denied`. Enforces the
    /// spec §3 invariant that transitions only ever originate from
    /// `Pending`.
    pub fn transition(&mut self, new_status: BackChannelStatus) -> Result<(), NotPendingError> {
        if self.status != BackChannelStatus::Pending {
            return Err(NotPendingError);
        }
        self.status = new_status;
        Ok(())
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}

/// Revocation status of a `jti` (spec §4.2.2 "Token registry entry").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    Active,
    Used,
    Revoked,
    Unknown,
}
