//! Authorization-grant validator (spec §4.3 step 3): dispatches to a
//! per-grant-type handler.

use std::collections::BTreeSet;

use serde_json::Map;
use time::OffsetDateTime;

use super::pkce;
use crate::error::{OidcError, OidcErrorCode};
use crate::interfaces::{AuthorizationCodeStore, TokenRegistry};
use crate::jose::jwt::JsonWebToken;
use crate::model::{AuthSession, AuthorizationContext, AuthorizedGrant};
use crate::token::auth_code;

/// For `authorization_code`: verifies code existence (via
/// [`auth_code::guard_against_replay`]), PKCE, and `redirect_uri`
/// equality with the original authorization request (byte-exact, spec
/// §4.3).
pub async fn authorize_code<S, R>(store: &S, registry: &R, code: &str, redirect_uri: &str, code_verifier: Option<&str>) -> Result<AuthorizedGrant, OidcError>
where
    S: AuthorizationCodeStore + ?Sized,
    R: TokenRegistry + ?Sized,
{
    let entry = auth_code::guard_against_replay(store, registry, code).await?;

    if entry.grant.context.redirect_uri != redirect_uri {
        return Err(OidcError::with_description(OidcErrorCode::InvalidGrant, "redirect_uri mismatch"));
    }

    if let Some(method) = entry.grant.context.code_challenge_method {
        let challenge = entry.grant.context.code_challenge.as_deref().unwrap_or_default();
        let verifier = code_verifier.ok_or_else(|| OidcError::with_description(OidcErrorCode::InvalidGrant, "missing code_verifier"))?;
        if !pkce::verify(method, verifier, challenge) {
            return Err(OidcError::with_description(OidcErrorCode::InvalidGrant, "PKCE verification failed"));
        }
    } else if code_verifier.is_some() {
        return Err(OidcError::with_description(OidcErrorCode::InvalidGrant, "code_verifier presented for a request with no PKCE challenge"));
    }

    Ok(entry.grant)
}

/// For `refresh_token`: the original session is not re-fetched from a
/// session store (refresh tokens outlive sessions by design); the
/// claims the refresh token itself carries are sufficient to rebuild the
/// subset of `AuthSession` that access/identity-token issuance needs.
pub fn grant_from_refresh_claims(jwt: &JsonWebToken, client_id: &str, scope: &[String]) -> AuthorizedGrant {
    let auth_time = jwt.payload.auth_time().and_then(|t| OffsetDateTime::from_unix_timestamp(t).ok()).unwrap_or_else(OffsetDateTime::now_utc);

    AuthorizedGrant {
        session: AuthSession {
            subject: jwt.payload.sub().unwrap_or_default().to_owned(),
            session_id: jwt.payload.sid().unwrap_or_default().to_owned(),
            auth_time,
            idp_id: String::new(),
            acr: jwt.payload.acr().map(str::to_owned),
            amr: jwt.payload.amr(),
            email: None,
            email_verified: None,
            affected_client_ids: BTreeSet::from([client_id.to_owned()]),
            additional_claims: Map::new(),
        },
        context: AuthorizationContext {
            client_id: client_id.to_owned(),
            scope: scope.to_vec(),
            requested_claims: None,
            redirect_uri: String::new(),
            nonce: None,
            code_challenge: None,
            code_challenge_method: None,
            resources: Vec::new(),
        },
        issued_tokens: Vec::new(),
    }
}

/// For `client_credentials`: there is no end-user session, so a
/// synthetic grant is built with the client itself as subject.
pub fn client_credentials_grant(client_id: &str, scope: &[String], resources: &[String]) -> AuthorizedGrant {
    AuthorizedGrant {
        session: AuthSession {
            subject: client_id.to_owned(),
            session_id: String::new(),
            auth_time: OffsetDateTime::now_utc(),
            idp_id: String::new(),
            acr: None,
            amr: Vec::new(),
            email: None,
            email_verified: None,
            affected_client_ids: BTreeSet::new(),
            additional_claims: Map::new(),
        },
        context: AuthorizationContext {
            client_id: client_id.to_owned(),
            scope: scope.to_vec(),
            requested_claims: None,
            redirect_uri: String::new(),
            nonce: None,
            code_challenge: None,
            code_challenge_method: None,
            resources: resources.to_vec(),
        },
        issued_tokens: Vec::new(),
    }
}
