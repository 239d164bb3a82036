//! Signing & verification (spec §4.1.3).
//!
//! Key selection on sign: (a) exact `alg` match, (b) algorithm-agnostic key
//! (`alg = null`), (c) error. Key selection on verify: header `kid` first,
//! falling back to algorithm match — both implemented by
//! [`super::jwk::JsonWebKeySet::select`].
//!
//! RS*/PS* are delegated to `picky`'s `JwtSig`, the same object
//! `token.rs`'s `TokenValidator` threads through sign/verify in the
//! teacher crate. HS* never goes through `picky`: `picky::key::PrivateKey`
//! parses ASN.1 DER (PKCS8) asymmetric keys, which raw HMAC secret bytes
//! are not, so HS* is computed directly with `hmac`+`sha2` over the
//! compact JWS signing input (RFC 7518 §3.2). ES*/EdDSA are not
//! supported: this module has no grounded construction for `picky`'s EC/OKP
//! key types (nothing in the source this crate was built against exercises
//! them), and guessing one would repeat the mistake this replaces.
use hmac::{Hmac, Mac};
use picky::jose::jws::{JwsAlg, RawJws};
use picky::jose::jwt::{JwtDate, JwtSig, JwtValidator};
use picky::key::{PrivateKey, PublicKey};
use serde_json::Value;
use sha2::{Sha256, Sha384, Sha512};

use super::jwk::{JsonWebKey, JsonWebKeySet, KeyMaterial};
use super::jwt::{Header, JsonWebToken, Payload};
use crate::error::CryptoError;

/// Converts the signed-key portion of a [`JsonWebKey`] into a `picky`
/// [`PrivateKey`]/[`PublicKey`] handle, the object type `picky`'s JOSE
/// functions operate on (see `token.rs`'s `TokenValidator` in the teacher
/// crate, which threads `&PublicKey`/`&PrivateKey` through every
/// sign/verify call rather than a bespoke JWK wrapper). RSA only: EC/OKP
/// conversion is unsupported (see module doc) and oct keys never go
/// through this path (see [`sign`]/[`verify`]).
pub fn to_public_key(jwk: &JsonWebKey) -> Result<PublicKey, CryptoError> {
    match &jwk.material {
        KeyMaterial::RSA { n, e, .. } => {
            let modulus = decode(n)?;
            let exponent = decode(e)?;
            PublicKey::from_rsa_components(&modulus, &exponent).map_err(|_| CryptoError)
        }
        KeyMaterial::EC { .. } | KeyMaterial::OKP { .. } | KeyMaterial::Oct { .. } => Err(CryptoError),
    }
}

pub fn to_private_key(jwk: &JsonWebKey) -> Result<PrivateKey, CryptoError> {
    match &jwk.material {
        KeyMaterial::RSA { n, e, d, p, q } => {
            let (n, e, d, p, q) =
                (decode(n)?, decode(e)?, decode(d.as_ref().ok_or(CryptoError)?)?, decode(p.as_ref().ok_or(CryptoError)?)?, decode(q.as_ref().ok_or(CryptoError)?)?);
            PrivateKey::from_rsa_components(&n, &e, &d, &p, &q).map_err(|_| CryptoError)
        }
        KeyMaterial::EC { .. } | KeyMaterial::OKP { .. } | KeyMaterial::Oct { .. } => Err(CryptoError),
    }
}

fn decode(field: &smol_str::SmolStr) -> Result<Vec<u8>, CryptoError> {
    use base64::Engine as _;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(field.as_bytes()).map_err(|_| CryptoError)
}

/// `picky`-backed algorithms only (RS*/PS*). HS* is handled entirely
/// outside `picky` by [`sign_hmac`]/[`verify_hmac`]; ES*/EdDSA are
/// rejected (see module doc).
fn jws_alg(alg: &str) -> Result<JwsAlg, CryptoError> {
    match alg {
        "RS256" => Ok(JwsAlg::RS256),
        "RS384" => Ok(JwsAlg::RS384),
        "RS512" => Ok(JwsAlg::RS512),
        "PS256" => Ok(JwsAlg::PS256),
        "PS384" => Ok(JwsAlg::PS384),
        "PS512" => Ok(JwsAlg::PS512),
        _ => Err(CryptoError),
    }
}

/// Selects a signing key for `alg` out of `keys`: exact `alg` match, then
/// an algorithm-agnostic key, per spec §4.1.3(a)/(b). Returns `None`
/// ("no key for algorithm", spec §4.1.3(c)) otherwise.
pub fn select_signing_key<'a>(keys: &'a JsonWebKeySet, alg: &str) -> Option<&'a JsonWebKey> {
    keys.select(alg, None)
}

/// Produces a JWS/JWT compact serialization over `payload` with `header`,
/// using `signing_key` (must be a private key for asymmetric algorithms,
/// or the shared secret for `HS*`).
pub fn sign(header: &Header, payload: &Payload, signing_key: &JsonWebKey) -> Result<String, CryptoError> {
    if matches!(header.alg.as_str(), "HS256" | "HS384" | "HS512") {
        return sign_hmac(header, payload, signing_key);
    }

    let alg = jws_alg(&header.alg)?;
    let claims = serde_json::to_value(&payload.0).map_err(|_| CryptoError)?;

    let mut jwt = JwtSig::new(alg, claims);
    if let Some(kid) = &header.kid {
        jwt = jwt.kid(kid.as_str());
    }
    if let Some(cty) = &header.cty {
        jwt = jwt.content_type(cty.as_str());
    }

    let key = to_private_key(signing_key)?;
    jwt.encode(&key).map_err(|_| CryptoError)
}

/// HS256/384/512 (RFC 7518 §3.2): MAC over
/// `base64url(header) || "." || base64url(payload)` with the shared
/// secret, appended as a third base64url segment. Never touches `picky`.
fn sign_hmac(header: &Header, payload: &Payload, signing_key: &JsonWebKey) -> Result<String, CryptoError> {
    use base64::Engine as _;

    let secret = signing_key.oct_bytes()?;
    let header_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(serde_json::to_vec(header).map_err(|_| CryptoError)?);
    let payload_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload.0).map_err(|_| CryptoError)?);
    let signing_input = format!("{header_b64}.{payload_b64}");

    let mac = hmac_digest(&header.alg, &secret, signing_input.as_bytes())?;
    let sig_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(mac);
    Ok(format!("{signing_input}.{sig_b64}"))
}

/// Verifies an HS256/384/512 compact JWS by recomputing the MAC and
/// comparing in constant time, then parses out header/claims. The token
/// is split directly rather than via `picky`, since `picky`'s `RawJws`
/// verification path expects an asymmetric key handle.
fn verify_hmac(token: &str, alg: &str, verifying_key: &JsonWebKey) -> Result<JsonWebToken, CryptoError> {
    use base64::Engine as _;

    let mut segments = token.split('.');
    let (Some(header_b64), Some(payload_b64), Some(sig_b64), None) = (segments.next(), segments.next(), segments.next(), segments.next()) else {
        return Err(CryptoError);
    };

    let secret = verifying_key.oct_bytes()?;
    let signing_input = format!("{header_b64}.{payload_b64}");
    let expected = hmac_digest(alg, &secret, signing_input.as_bytes())?;
    let actual = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(sig_b64).map_err(|_| CryptoError)?;
    if !crate::util::constant_time_eq(&expected, &actual) {
        return Err(CryptoError);
    }

    let header: Header =
        serde_json::from_slice(&base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(header_b64).map_err(|_| CryptoError)?).map_err(|_| CryptoError)?;
    let claims: Value =
        serde_json::from_slice(&base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(payload_b64).map_err(|_| CryptoError)?).map_err(|_| CryptoError)?;
    let map = match claims {
        Value::Object(map) => map.into_iter().collect(),
        _ => return Err(CryptoError),
    };

    Ok(JsonWebToken { header, payload: Payload(map) })
}

fn hmac_digest(alg: &str, secret: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    match alg {
        "HS256" => {
            let mut mac = Hmac::<Sha256>::new_from_slice(secret).map_err(|_| CryptoError)?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        "HS384" => {
            let mut mac = Hmac::<Sha384>::new_from_slice(secret).map_err(|_| CryptoError)?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        "HS512" => {
            let mut mac = Hmac::<Sha512>::new_from_slice(secret).map_err(|_| CryptoError)?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        _ => Err(CryptoError),
    }
}

/// Verifies a compact JWS/JWT against `keys`, selecting the verification
/// key by header `kid` first, then by algorithm (spec §4.1.3).
///
/// This performs signature verification *only*; temporal claims,
/// issuer/audience and replay checks belong to the higher-level
/// [`crate::jose::validate_jwt`] contract (spec §4.1.4).
pub fn verify(token: &str, keys: &JsonWebKeySet) -> Result<JsonWebToken, CryptoError> {
    let raw = RawJws::decode(token).map_err(|_| CryptoError)?;
    let alg_str = alg_name(raw.header.alg);
    let kid = raw.header.kid.as_deref();

    let verifying_key = keys.select(&alg_str, kid).ok_or(CryptoError)?;

    if matches!(raw.header.alg, JwsAlg::HS256 | JwsAlg::HS384 | JwsAlg::HS512) {
        return verify_hmac(token, &alg_str, verifying_key);
    }
    if matches!(raw.header.alg, JwsAlg::ES256 | JwsAlg::ES384 | JwsAlg::ES512 | JwsAlg::EdDSA) {
        return Err(CryptoError);
    }

    let key = to_public_key(verifying_key)?;
    let jwt_sig: JwtSig<Value> = raw.verify(&key).map(JwtSig::from).map_err(|_| CryptoError)?;

    let header = Header {
        alg: alg_str.into(),
        enc: None,
        kid: jwt_sig.header.kid.clone().map(Into::into),
        typ: jwt_sig.header.typ.clone().map(Into::into),
        cty: jwt_sig.header.cty.clone().map(Into::into),
        epk: None,
    };

    let claims = jwt_sig
        .validate(&JwtValidator::no_check())
        .map_err(|_| CryptoError)?
        .state
        .claims;

    let map = match claims {
        Value::Object(map) => map.into_iter().collect(),
        _ => return Err(CryptoError),
    };

    Ok(JsonWebToken { header, payload: Payload(map) })
}

fn alg_name(alg: JwsAlg) -> String {
    match alg {
        JwsAlg::RS256 => "RS256",
        JwsAlg::RS384 => "RS384",
        JwsAlg::RS512 => "RS512",
        JwsAlg::PS256 => "PS256",
        JwsAlg::PS384 => "PS384",
        JwsAlg::PS512 => "PS512",
        JwsAlg::ES256 => "ES256",
        JwsAlg::ES384 => "ES384",
        JwsAlg::ES512 => "ES512",
        JwsAlg::HS256 => "HS256",
        JwsAlg::HS384 => "HS384",
        JwsAlg::HS512 => "HS512",
        JwsAlg::EdDSA => "EdDSA",
    }
    .to_owned()
}

pub fn now_with_leeway(leeway_secs: u16) -> JwtDate {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    JwtDate::new_with_leeway(now, leeway_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jose::jwk::JsonWebKey;

    fn hs_header(alg: &str) -> Header {
        Header { alg: alg.into(), ..Header::default() }
    }

    fn sample_payload() -> Payload {
        let mut payload = Payload::new();
        payload.set_sub("user-1");
        payload.set_iss("https://issuer.example");
        payload
    }

    #[test]
    fn hs256_round_trips() {
        let key = JsonWebKey::oct(b"a shared secret at least this long");
        let header = hs_header("HS256");
        let token = sign(&header, &sample_payload(), &key).expect("sign");

        let keys = JsonWebKeySet::new(vec![key]);
        let verified = verify(&token, &keys).expect("verify");
        assert_eq!(verified.payload.sub(), Some("user-1"));
    }

    #[test]
    fn hs384_and_hs512_round_trip() {
        for alg in ["HS384", "HS512"] {
            let key = JsonWebKey::oct(b"another shared secret, long enough");
            let header = hs_header(alg);
            let token = sign(&header, &sample_payload(), &key).expect("sign");

            let keys = JsonWebKeySet::new(vec![key]);
            assert!(verify(&token, &keys).is_ok(), "{alg} round trip failed");
        }
    }

    #[test]
    fn hmac_verify_rejects_tampered_signature() {
        let key = JsonWebKey::oct(b"a shared secret at least this long");
        let token = sign(&hs_header("HS256"), &sample_payload(), &key).expect("sign");
        let mut tampered = token.clone();
        tampered.push('x');

        let keys = JsonWebKeySet::new(vec![key]);
        assert!(verify(&tampered, &keys).is_err());
    }

    #[test]
    fn hmac_verify_rejects_wrong_key() {
        let signing_key = JsonWebKey::oct(b"correct horse battery staple!!!");
        let token = sign(&hs_header("HS256"), &sample_payload(), &signing_key).expect("sign");

        let wrong_key = JsonWebKey::oct(b"a completely different secret!!");
        let keys = JsonWebKeySet::new(vec![wrong_key]);
        assert!(verify(&token, &keys).is_err());
    }

    #[test]
    fn es256_is_rejected_as_unsupported() {
        let key = JsonWebKey::oct(b"irrelevant for this alg");
        assert!(sign(&hs_header("ES256"), &sample_payload(), &key).is_err());
    }
}
