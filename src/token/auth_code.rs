//! Authorization-code anti-replay decorator (spec §4.2.4).
//!
//! After successful token issuance for `grant_type=authorization_code`,
//! the issued `jti`s are recorded against the code entry. A second
//! presentation of a code whose `issued_tokens` is non-empty revokes
//! every recorded `jti` and fails the request.

use time::OffsetDateTime;

use crate::error::{OidcError, OidcErrorCode};
use crate::interfaces::{AuthorizationCodeEntry, AuthorizationCodeStore, TokenRegistry};
use crate::model::TokenStatus;

/// Records `jtis` against `code` once tokens have been issued for it.
pub async fn record_issuance<S: AuthorizationCodeStore + ?Sized>(store: &S, code: &str, jtis: &[String]) -> Result<(), OidcError> {
    store
        .record_issued_tokens(code, jtis)
        .await
        .map_err(|_| OidcError::new(OidcErrorCode::ServerError))
}

/// Looks up `code`, failing the request and revoking every previously
/// issued token if it has already been used once (spec §4.2.4 steps
/// 1-3). Returns the entry for normal (first-use) processing otherwise.
pub async fn guard_against_replay<S, R>(store: &S, registry: &R, code: &str) -> Result<AuthorizationCodeEntry, OidcError>
where
    S: AuthorizationCodeStore + ?Sized,
    R: TokenRegistry + ?Sized,
{
    let entry = store
        .try_get(code)
        .await
        .map_err(|_| OidcError::new(OidcErrorCode::ServerError))?
        .ok_or_else(|| OidcError::with_description(OidcErrorCode::InvalidGrant, "authorization code not found"))?;

    if !entry.grant.issued_tokens.is_empty() {
        let _ = store.remove(code).await;
        for issued in &entry.grant.issued_tokens {
            let _ = registry.set_status(&issued.jti, TokenStatus::Revoked, issued.expires_at).await;
        }
        return Err(OidcError::with_description(OidcErrorCode::InvalidGrant, "authorization code already used"));
    }

    if entry.expires_at <= OffsetDateTime::now_utc() {
        let _ = store.remove(code).await;
        return Err(OidcError::with_description(OidcErrorCode::InvalidGrant, "authorization code expired"));
    }

    Ok(entry)
}
