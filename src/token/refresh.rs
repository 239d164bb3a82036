//! Refresh tokens (spec §4.2.1): opaque-by-contract but implemented as a
//! signed (never encrypted-only) JWT with `jti` and a stored registry
//! entry. Rotation moves the predecessor's `jti` to `Used`.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use crate::error::{JwtValidationError, OidcError, OidcErrorCode};
use crate::interfaces::{AuthServiceKeysProvider, TokenRegistry};
use crate::jose::jwt::JsonWebToken;
use crate::jose::{self, JsonWebKeySet, ValidationOptions, ValidationParams};
use crate::model::{AuthSession, AuthorizationContext, TokenStatus};

pub struct RefreshTokenService {
    keys: Arc<dyn AuthServiceKeysProvider>,
    registry: Arc<dyn TokenRegistry>,
    issuer: String,
    default_ttl: Duration,
}

impl RefreshTokenService {
    pub fn new(keys: Arc<dyn AuthServiceKeysProvider>, registry: Arc<dyn TokenRegistry>, issuer: impl Into<String>, default_ttl: Duration) -> Self {
        Self { keys, registry, issuer: issuer.into(), default_ttl }
    }

    pub async fn create(
        &self,
        session: &AuthSession,
        context: &AuthorizationContext,
        scope: &[String],
        ttl_override: Option<Duration>,
    ) -> Result<(JsonWebToken, String, Duration), OidcError> {
        let ttl = ttl_override.unwrap_or(self.default_ttl);
        let mut payload = super::base_payload(&self.issuer, session, context, ttl);
        payload.set_scope(scope);

        let signing_keys = self
            .keys
            .get_signing_keys(true)
            .await
            .map_err(|_| OidcError::new(OidcErrorCode::ServerError))?;
        let (signing_key, alg) = super::pick_signing_key(&signing_keys).ok_or_else(super::no_signing_key_error)?;
        let (header, encoded) = super::encode(payload.clone(), signing_key, &alg).map_err(|_| OidcError::new(OidcErrorCode::ServerError))?;

        let jti = payload.jti().unwrap_or_default().to_owned();
        let exp = payload.exp().unwrap_or_default();
        self.registry
            .set_status(&jti, TokenStatus::Active, OffsetDateTime::from_unix_timestamp(exp).unwrap_or(OffsetDateTime::now_utc()))
            .await
            .map_err(|_| OidcError::new(OidcErrorCode::ServerError))?;

        Ok((JsonWebToken { header, payload }, encoded, ttl))
    }

    pub fn parse(&self, encoded: &str) -> Option<JsonWebToken> {
        jose::peek(encoded)
    }

    /// Validates the token's signature/claims and its registry status
    /// (spec §4.2.2: "The JWT validator is decorated to reject any token
    /// whose `jti` maps to `Used` or `Revoked`").
    pub async fn validate(&self, encoded: &str) -> Result<JsonWebToken, JwtValidationError> {
        let signing_keys = self.keys.get_signing_keys(false).await.map_err(|_| JwtValidationError::InvalidToken)?;
        let decryption_keys = JsonWebKeySet::default();
        let issuer = self.issuer.clone();

        let params = ValidationParams {
            options: ValidationOptions::SKIP_AUDIENCE | ValidationOptions::SKIP_REPLAY_CHECK,
            clock_skew_secs: 30,
            validate_issuer: &|iss| iss == issuer,
            validate_audience: &|_| true,
            resolve_issuer_signing_keys: &|_| signing_keys.clone(),
            resolve_token_decryption_keys: &|_| decryption_keys.clone(),
            is_replayed: None,
        };

        let jwt = jose::validate_jwt(encoded, &params)?;

        let jti = jwt.payload.jti().ok_or(JwtValidationError::MissingClaim("jti"))?;
        super::registry::check_not_revoked(self.registry.as_ref(), jti).await?;
        Ok(jwt)
    }

    /// Rotates `old_jti` to `Used` once a successor refresh token has
    /// been issued (spec §4.2.1).
    pub async fn rotate(&self, old_jti: &str, old_expires_at: OffsetDateTime) -> Result<(), OidcError> {
        self.registry
            .set_status(old_jti, TokenStatus::Used, old_expires_at)
            .await
            .map_err(|_| OidcError::new(OidcErrorCode::ServerError))
    }
}
