//! Consumed collaborator interfaces (spec §6.2).
//!
//! The core persists nothing directly (spec §6.3); every durable record
//! goes through one of these traits. Implementations are provided by the
//! host application. Modeled on the teacher crate's `#[async_trait]`
//! collaborator traits (see `Task` in the teacher's task crate).

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::jose::JsonWebKeySet;
use crate::model::{AuthSession, AuthorizedGrant, BackChannelAuthenticationRequest, ClientInfo, TokenStatus};

/// The uniform error type collaborator calls fail with. The core never
/// matches on its internals; failures are opaque I/O errors to it.
pub type ProviderError = anyhow::Error;
pub type ProviderResult<T> = Result<T, ProviderError>;

#[async_trait]
pub trait ClientInfoProvider: Send + Sync {
    async fn try_find_client(&self, client_id: &str) -> ProviderResult<Option<ClientInfo>>;
}

#[async_trait]
pub trait ClientKeysProvider: Send + Sync {
    async fn get_signing_keys(&self, client: &ClientInfo) -> ProviderResult<JsonWebKeySet>;
}

#[async_trait]
pub trait AuthServiceKeysProvider: Send + Sync {
    async fn get_signing_keys(&self, include_private: bool) -> ProviderResult<JsonWebKeySet>;
    async fn get_encryption_keys(&self, include_private: bool) -> ProviderResult<JsonWebKeySet>;
}

pub trait IssuerProvider: Send + Sync {
    fn get_issuer(&self) -> String;
}

#[async_trait]
pub trait TokenRegistry: Send + Sync {
    async fn set_status(&self, jti: &str, status: TokenStatus, expires_at: OffsetDateTime) -> ProviderResult<()>;
    async fn get_status(&self, jti: &str) -> ProviderResult<TokenStatus>;
}

#[async_trait]
pub trait ReplayCache: Send + Sync {
    async fn is_replayed(&self, jti: &str) -> ProviderResult<bool>;
    async fn mark_used(&self, jti: &str, ttl: time::Duration) -> ProviderResult<()>;
}

/// A stored authorization_code entry; the grant is filled in when the
/// code was minted, `issued_tokens` accumulates as tokens are issued
/// against it (spec §4.2.4).
#[derive(Debug, Clone)]
pub struct AuthorizationCodeEntry {
    pub grant: AuthorizedGrant,
    pub expires_at: OffsetDateTime,
}

#[async_trait]
pub trait AuthorizationCodeStore: Send + Sync {
    async fn store(&self, code: &str, entry: AuthorizationCodeEntry) -> ProviderResult<()>;
    async fn try_get(&self, code: &str) -> ProviderResult<Option<AuthorizationCodeEntry>>;
    async fn record_issued_tokens(&self, code: &str, jtis: &[String]) -> ProviderResult<()>;
    async fn remove(&self, code: &str) -> ProviderResult<()>;
}

#[async_trait]
pub trait BackChannelRequestStorage: Send + Sync {
    async fn store(&self, request: BackChannelAuthenticationRequest, ttl: time::Duration) -> ProviderResult<String>;
    async fn try_get(&self, id: &str) -> ProviderResult<Option<BackChannelAuthenticationRequest>>;
    async fn update(&self, id: &str, request: BackChannelAuthenticationRequest, ttl: time::Duration) -> ProviderResult<()>;
    async fn remove(&self, id: &str) -> ProviderResult<()>;
}

#[async_trait]
pub trait UserConsentsProvider: Send + Sync {
    async fn has_consented(&self, subject: &str, client_id: &str, scope: &[String]) -> ProviderResult<bool>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn try_get(&self, session_id: &str) -> ProviderResult<Option<AuthSession>>;
    async fn save(&self, session: &AuthSession) -> ProviderResult<()>;
    async fn remove(&self, session_id: &str) -> ProviderResult<()>;
}

/// The adapter for CIBA that delivers the authentication challenge to the
/// end-user's device and resolves asynchronously (spec §6.2).
#[async_trait]
pub trait UserDeviceAuthenticationHandler: Send + Sync {
    async fn challenge(&self, request: &BackChannelAuthenticationRequest) -> ProviderResult<()>;
}

/// The delivery mode a [`NotificationDeliveryService`] send corresponds
/// to — carried through so implementations can apply mode-specific retry
/// policy (spec §7: "the outbound notification service MAY retry
/// according to its own policy").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationMode {
    Ping,
    Push,
}

#[async_trait]
pub trait NotificationDeliveryService: Send + Sync {
    async fn send(
        &self,
        endpoint: &str,
        bearer: &str,
        payload: serde_json::Value,
        mode: NotificationMode,
    ) -> ProviderResult<()>;
}

/// Process-wide registry of scopes a client (or the server as a whole)
/// is allowed to request (spec §5 "shared resources": "the... scope
/// manager... are process-wide singletons, safe for concurrent read").
#[async_trait]
pub trait ScopeManager: Send + Sync {
    async fn allowed_scopes(&self, client: &crate::model::ClientInfo) -> ProviderResult<Vec<String>>;
}

/// Process-wide registry of RFC 8707 resource indicators a client may
/// request (spec §5 "shared resources").
#[async_trait]
pub trait ResourceManager: Send + Sync {
    async fn allowed_resources(&self, client: &crate::model::ClientInfo) -> ProviderResult<Vec<String>>;
}

/// Long-polling notifier (spec §4.4 "Long-polling notifier").
///
/// `wait_for_status_change` returns `true` iff a notification arrived
/// before `timeout`; it never returns the new status, callers re-read
/// storage (spec §4.4).
#[async_trait]
pub trait BackChannelNotifier: Send + Sync {
    async fn wait_for_status_change(&self, id: &str, timeout: std::time::Duration) -> bool;
    async fn notify_status_change(&self, id: &str);
}
