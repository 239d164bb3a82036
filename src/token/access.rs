//! Access tokens (spec §4.2.1): carry `scope`, `client_id` (= `azp`),
//! `sub`, and — for resource-bound access — an `aud` equal to the
//! resource indicator.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{JwtValidationError, OidcError, OidcErrorCode};
use crate::interfaces::AuthServiceKeysProvider;
use crate::jose::jwt::JsonWebToken;
use crate::jose::{self, JsonWebKeySet, ValidationOptions, ValidationParams};
use crate::model::{AuthSession, AuthorizationContext};

pub struct AccessTokenService {
    keys: Arc<dyn AuthServiceKeysProvider>,
    issuer: String,
    default_ttl: Duration,
}

impl AccessTokenService {
    pub fn new(keys: Arc<dyn AuthServiceKeysProvider>, issuer: impl Into<String>, default_ttl: Duration) -> Self {
        Self { keys, issuer: issuer.into(), default_ttl }
    }

    /// `Create(session, context, scope[], resource[]) -> (jwt, encoded_string, ttl)`.
    pub async fn create(
        &self,
        session: &AuthSession,
        context: &AuthorizationContext,
        scope: &[String],
        resources: &[String],
        ttl_override: Option<Duration>,
    ) -> Result<(JsonWebToken, String, Duration), OidcError> {
        let ttl = ttl_override.unwrap_or(self.default_ttl);
        let mut payload = super::base_payload(&self.issuer, session, context, ttl);
        payload.set_scope(scope);
        if !resources.is_empty() {
            payload.set_aud(resources);
        }

        let signing_keys = self
            .keys
            .get_signing_keys(true)
            .await
            .map_err(|_| OidcError::new(OidcErrorCode::ServerError))?;
        let (signing_key, alg) = super::pick_signing_key(&signing_keys).ok_or_else(super::no_signing_key_error)?;
        let (header, encoded) = super::encode(payload.clone(), signing_key, &alg).map_err(|_| OidcError::new(OidcErrorCode::ServerError))?;

        Ok((JsonWebToken { header, payload }, encoded, ttl))
    }

    /// `Parse(encoded) -> JsonWebToken?` — unverified decode.
    pub fn parse(&self, encoded: &str) -> Option<JsonWebToken> {
        jose::peek(encoded)
    }

    /// `Validate(encoded) -> ValidJwt | JwtValidationError`.
    pub async fn validate(&self, encoded: &str, expected_audience: &str) -> Result<JsonWebToken, JwtValidationError> {
        let signing_keys = self
            .keys
            .get_signing_keys(false)
            .await
            .map_err(|_| JwtValidationError::InvalidToken)?;
        let decryption_keys = JsonWebKeySet::default();

        let issuer = self.issuer.clone();
        let params = ValidationParams {
            options: ValidationOptions::SKIP_AUDIENCE,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_returns_none_for_garbage() {
        assert!(jose::peek("not-a-jwt").is_none());
    }
}
