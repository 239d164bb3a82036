//! Identity tokens (spec §4.2.1): include `nonce` exactly as provided at
//! authorization time, `auth_time` from the session, `at_hash`/`c_hash`
//! when issued alongside an access token/authorization code, and
//! `amr`/`acr`/`sid`.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{JwtValidationError, OidcError, OidcErrorCode};
use crate::interfaces::AuthServiceKeysProvider;
use crate::jose::jwt::JsonWebToken;
use crate::jose::{self, hashes, JsonWebKeySet, ValidationOptions, ValidationParams};
use crate::model::{AuthSession, AuthorizationContext};

pub struct IdentityTokenService {
    keys: Arc<dyn AuthServiceKeysProvider>,
    issuer: String,
    default_ttl: Duration,
}

/// Material the ID token binds to, when issued alongside it (spec
/// §4.2.1: "sets `at_hash` and `c_hash` when issued alongside an access
/// token/authorization code").
#[derive(Debug, Clone, Default)]
pub struct IdentityTokenCompanions<'a> {
    pub access_token: Option<&'a str>,
    pub authorization_code: Option<&'a str>,
}

impl IdentityTokenService {
    pub fn new(keys: Arc<dyn AuthServiceKeysProvider>, issuer: impl Into<String>, default_ttl: Duration) -> Self {
        Self { keys, issuer: issuer.into(), default_ttl }
    }

    pub async fn create(
        &self,
        session: &AuthSession,
        context: &AuthorizationContext,
        companions: IdentityTokenCompanions<'_>,
        ttl_override: Option<Duration>,
    ) -> Result<(JsonWebToken, String, Duration), OidcError> {
        let ttl = ttl_override.unwrap_or(self.default_ttl);
        let mut payload = super::base_payload(&self.issuer, session, context, ttl);

        payload.set_aud(&[context.client_id.clone()]);
        payload.set_auth_time(session.auth_time.unix_timestamp());
        if let Some(acr) = &session.acr {
            payload.set_acr(acr.clone());
        }
        if !session.amr.is_empty() {
            payload.set_amr(&session.amr);
        }
        if let Some(nonce) = &context.nonce {
            payload.set_nonce(nonce.clone());
        }

        let signing_keys = self
            .keys
            .get_signing_keys(true)
            .await
            .map_err(|_| OidcError::new(OidcErrorCode::ServerError))?;
        let (signing_key, alg) = super::pick_signing_key(&signing_keys).ok_or_else(super::no_signing_key_error)?;

        if let Some(at) = companions.access_token
            && let Some(hash) = hashes::left_half_hash(&alg, at)
        {
            payload.set("at_hash", serde_json::Value::String(hash));
        }
        if let Some(code) = companions.authorization_code
            && let Some(hash) = hashes::left_half_hash(&alg, code)
        {
            payload.set("c_hash", serde_json::Value::String(hash));
        }

        let (header, encoded) = super::encode(payload.clone(), signing_key, &alg).map_err(|_| OidcError::new(OidcErrorCode::ServerError))?;

        Ok((JsonWebToken { header, payload }, encoded, ttl))
    }

    pub fn parse(&self, encoded: &str) -> Option<JsonWebToken> {
        jose::peek(encoded)
    }

    pub async fn validate(&self, encoded: &str, expected_audience: &str) -> Result<JsonWebToken, JwtValidationError> {
        let signing_keys = self
            .keys
            .get_signing_keys(false)
            .await
            .map_err(|_| JwtValidationError::InvalidToken)?;
        let decryption_keys = JsonWebKeySet::default();

        let issuer = self.issuer.clone();
        let params = ValidationParams {
            options: ValidationOptions::empty(),
            clock_skew_secs: 30,
            validate_issuer: &|iss| iss == issuer,
            validate_audience: &|auds| auds.iter().any(|a| a == expected_audience),
            resolve_issuer_signing_keys: &|_| signing_keys.clone(),
            resolve_token_decryption_keys: &|_| decryption_keys.clone(),
            is_replayed: None,
        };

        jose::validate_jwt(encoded, &params)
    }
}
