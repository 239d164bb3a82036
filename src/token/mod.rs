//! Token pipeline (spec §4.2): issuance and validation of access,
//! refresh, and identity tokens, decorated with registry-backed
//! revocation (§4.2.2), a replay cache (§4.2.3), and authorization-code
//! anti-replay (§4.2.4).

pub mod access;
pub mod auth_code;
pub mod identity;
pub mod refresh;
pub mod registry;
pub mod replay;

pub use access::AccessTokenService;
pub use identity::IdentityTokenService;
pub use refresh::RefreshTokenService;

use std::time::Duration as StdDuration;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::error::{CryptoError, OidcError, OidcErrorCode};
use crate::jose::jwk::JsonWebKey;
use crate::jose::jwt::{Header, Payload};
use crate::jose::{sign, JsonWebKeySet};
use crate::model::{AuthSession, AuthorizationContext};

/// Selects a key to sign new tokens with: the first key in `keys` that
/// isn't `alg = "none"`. Its declared `alg` is used verbatim, defaulting
/// to `RS256` for an algorithm-agnostic key.
pub(crate) fn pick_signing_key(keys: &JsonWebKeySet) -> Option<(&JsonWebKey, String)> {
    let key = keys.keys.iter().find(|k| !k.is_alg_none())?;
    let alg = key.alg.as_deref().unwrap_or("RS256").to_owned();
    Some((key, alg))
}

/// Produces the common claim set every token type starts from (spec
/// §4.2.1): `iss`, `sub`, `client_id`/`azp`, a fresh `jti`, `iat`/`exp`.
pub(crate) fn base_payload(issuer: &str, session: &AuthSession, context: &AuthorizationContext, ttl: StdDuration) -> Payload {
    let now = OffsetDateTime::now_utc();
    let mut payload = Payload::new();
    payload.set_iss(issuer.to_owned());
    payload.set_sub(session.subject.clone());
    payload.set_client_id(context.client_id.clone());
    payload.set_azp(context.client_id.clone());
    payload.set_jti(Uuid::new_v4().to_string());
    payload.set_iat(now.unix_timestamp());
    payload.set_exp((now + Duration::seconds(ttl.as_secs() as i64)).unix_timestamp());
    payload
}

pub(crate) fn encode(payload: Payload, signing_key: &JsonWebKey, alg: &str) -> Result<(Header, String), CryptoError> {
    let header = Header { alg: alg.into(), kid: signing_key.kid.clone(), ..Header::default() };
    let encoded = sign::sign(&header, &payload, signing_key)?;
    Ok((header, encoded))
}

pub(crate) fn no_signing_key_error() -> OidcError {
    OidcError::with_description(OidcErrorCode::ServerError, "no usable signing key available")
}
