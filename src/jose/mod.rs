//! JOSE primitives (spec §4.1): content encryption, key management,
//! signing/verification, and the JWT validator contract.

pub mod encrypt;
pub mod hashes;
pub mod jwk;
pub mod jwt;
pub mod sign;

pub use jwk::{JsonWebKey, JsonWebKeySet, KeyMaterial, KeyUse};
pub use jwt::{Header, JsonWebToken, Payload, ScopeClaim};

use bitflags::bitflags;

use crate::error::JwtValidationError;

bitflags! {
    /// The "small bit-set" of validation toggles spec §4.1.4 mentions
    /// (e.g. `SkipExpiration`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ValidationOptions: u8 {
        const SKIP_EXPIRATION   = 0b0000_0001;
        const SKIP_NOT_BEFORE   = 0b0000_0010;
        const SKIP_ISSUER       = 0b0000_0100;
        const SKIP_AUDIENCE     = 0b0000_1000;
        const SKIP_REPLAY_CHECK = 0b0001_0000;
    }
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self::empty()
    }
}

/// Minimum replay-cache TTL floor (spec §4.2.3 default), used here only to
/// decide whether the replay check in the validation order (spec §4.1.4)
/// is even eligible: "if jti present and TTL >= minimum".
pub const MIN_REPLAY_CACHE_TTL_SECS: i64 = 10;

/// Parameters for [`validate_jwt`] (spec §4.1.4's "internal contract").
///
/// Every resolver is a plain closure rather than a trait object hierarchy,
/// per spec §9 ("Strategy composition... re-express as arrays/closures of
/// plain functions").
pub struct ValidationParams<'a> {
    pub options: ValidationOptions,
    pub clock_skew_secs: u16,
    pub validate_issuer: &'a dyn Fn(&str) -> bool,
    pub validate_audience: &'a dyn Fn(&[String]) -> bool,
    pub resolve_issuer_signing_keys: &'a dyn Fn(&str) -> JsonWebKeySet,
    pub resolve_token_decryption_keys: &'a dyn Fn(Option<&str>) -> JsonWebKeySet,
    /// Returns `true` if `jti` has already been marked used. Absent when
    /// the caller wants a pure (side-effect-free) validation pass.
    pub is_replayed: Option<&'a dyn Fn(&str) -> bool>,
}

/// Validates `token` end to end, following the order fixed by spec
/// §4.1.4: decode -> (optional decrypt -> re-parse) -> signature verify ->
/// nbf/iat/exp -> issuer/audience -> replay-cache check.
pub fn validate_jwt(token: &str, params: &ValidationParams<'_>) -> Result<JsonWebToken, JwtValidationError> {
    let is_encrypted = token.split('.').count() == 5;

    let signed_token_owned;
    let signed_token = if is_encrypted {
        let header_b64 = token.split('.').next().ok_or(JwtValidationError::InvalidToken)?;
        let header_json = decode_b64_json(header_b64).ok_or(JwtValidationError::InvalidToken)?;
        let kid = header_json.get("kid").and_then(|v| v.as_str());

        let decryption_keys = (params.resolve_token_decryption_keys)(kid);
        let key = kid
            .and_then(|k| decryption_keys.by_kid(k))
            .or_else(|| decryption_keys.keys.first())
            .ok_or(JwtValidationError::InvalidToken)?;

        let (payload, _header) = encrypt::decrypt(token, key).map_err(|_| JwtValidationError::InvalidToken)?;
        signed_token_owned =
            String::from_utf8(payload).map_err(|_| JwtValidationError::InvalidToken)?;
        &signed_token_owned
    } else {
        token
    };

    let header_b64 = signed_token.split('.').next().ok_or(JwtValidationError::InvalidToken)?;
    let header_json = decode_b64_json(header_b64).ok_or(JwtValidationError::InvalidToken)?;
    let issuer_hint = String::new();
    let _ = &issuer_hint;

    // Issuer is not known before the token is parsed, so signing keys are
    // resolved once we can read the `iss` claim out of the (unverified)
    // payload, then verification re-checks the signature against them.
    let payload_b64 = signed_token.split('.').nth(1).ok_or(JwtValidationError::InvalidToken)?;
    let unverified_payload = decode_b64_json(payload_b64).ok_or(JwtValidationError::InvalidToken)?;
    let claimed_issuer = unverified_payload.get("iss").and_then(|v| v.as_str()).unwrap_or_default();

    let signing_keys = (params.resolve_issuer_signing_keys)(claimed_issuer);
    let _ = header_json;

    let jwt = sign::verify(signed_token, &signing_keys).map_err(|_| JwtValidationError::InvalidSignature)?;

    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    let skew = i64::from(params.clock_skew_secs);

    if !params.options.contains(ValidationOptions::SKIP_EXPIRATION)
        && let Some(exp) = jwt.payload.exp()
        && now > exp + skew
    {
        return Err(JwtValidationError::TokenExpired);
    }

    if !params.options.contains(ValidationOptions::SKIP_NOT_BEFORE)
        && let Some(nbf) = jwt.payload.nbf()
        && now + skew < nbf
    {
        return Err(JwtValidationError::InvalidToken);
    }

    if !params.options.contains(ValidationOptions::SKIP_ISSUER) {
        let iss = jwt.payload.iss().ok_or(JwtValidationError::MissingClaim("iss"))?;
        if !(params.validate_issuer)(iss) {
            return Err(JwtValidationError::InvalidIssuer);
        }
    }

    if !params.options.contains(ValidationOptions::SKIP_AUDIENCE) {
        let aud = jwt.payload.aud();
        if aud.is_empty() || !(params.validate_audience)(&aud) {
            return Err(JwtValidationError::InvalidAudience);
        }
    }

    if !params.options.contains(ValidationOptions::SKIP_REPLAY_CHECK)
        && let Some(is_replayed) = params.is_replayed
        && let Some(jti) = jwt.payload.jti()
    {
        let ttl_eligible = jwt.payload.exp().map(|exp| exp - now >= MIN_REPLAY_CACHE_TTL_SECS).unwrap_or(false);
        if ttl_eligible && is_replayed(jti) {
            return Err(JwtValidationError::Replayed);
        }
    }

    Ok(jwt)
}

fn decode_b64_json(segment: &str) -> Option<serde_json::Value> {
    use base64::Engine as _;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(segment.as_bytes()).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// `Parse` as spec §4.2.1 describes it: decode the header/payload without
/// verifying the signature. Used where a caller needs to read claims off
/// an unverified token (e.g. picking a `kid` before key lookup); never a
/// substitute for [`validate_jwt`] at a trust boundary.
pub fn peek(token: &str) -> Option<JsonWebToken> {
    let mut parts = token.split('.');
    let header_b64 = parts.next()?;
    let payload_b64 = parts.next()?;

    let header_json = decode_b64_json(header_b64)?;
    let header: Header = serde_json::from_value(header_json).ok()?;

    let payload_json = decode_b64_json(payload_b64)?;
    let map = match payload_json {
        serde_json::Value::Object(map) => map.into_iter().collect(),
        _ => return None,
    };

    Some(JsonWebToken { header, payload: Payload(map) })
}
