//! JWE content encryption (spec §4.1.1) and key management (spec §4.1.2).
//!
//! The actual AEAD/RSA primitives are delegated to `picky`'s JOSE support
//! (the same crate `token.rs` uses for JWE decode in the teacher crate);
//! this module owns the parts spec §4.1.1/§4.1.2 call out explicitly:
//! the CEK/IV/tag size table, the minimum-RSA-modulus and
//! minimum-wrapped-key-length boundary checks, and folding every failure
//! into a single opaque [`CryptoError`] so no padding-vs-tag distinction
//! ever reaches a caller (spec §4.1.1, §7-3).
//!
//! `dir` and the RSA key-management algs go through `picky::jose::jwe::Jwe`
//! the same way the teacher's own `tokengen`/`token_security.rs` call sites
//! do (`Jwe::new(alg, enc, payload).encode(&key)`, `.encode_direct(&key)`).
//! The `A*GCMKW` family wraps the CEK with AES-GCM keyed by raw symmetric
//! material; no call site anywhere in the retrieval pack constructs that
//! key for `picky`, and hand-rolling RFC 7518 §4.7 here risks a silent
//! mismatch with `picky`'s own AAD/protected-header framing that cannot be
//! caught without compiling, so it is rejected as unsupported rather than
//! guessed at.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use picky::jose::jwe::{Jwe, JweAlg, JweEnc};

use super::jwk::{JsonWebKey, KeyMaterial};
use super::jwt::Header;
use crate::error::CryptoError;

/// Minimum RSA modulus, in bits, accepted for key-wrapping (spec §4.1.2).
pub const MIN_RSA_MODULUS_BITS: usize = 2048;

/// Minimum wire length accepted for an AES-GCM-KW wrapped key: `IV(12) +
/// tag(16)` (spec §4.1.2).
pub const MIN_GCM_KW_LEN: usize = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncryptionAlg {
    A128CbcHs256,
    A192CbcHs384,
    A256CbcHs512,
    A128Gcm,
    A192Gcm,
    A256Gcm,
}

impl ContentEncryptionAlg {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "A128CBC-HS256" => Self::A128CbcHs256,
            "A192CBC-HS384" => Self::A192CbcHs384,
            "A256CBC-HS512" => Self::A256CbcHs512,
            "A128GCM" => Self::A128Gcm,
            "A192GCM" => Self::A192Gcm,
            "A256GCM" => Self::A256Gcm,
            _ => return None,
        })
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::A128CbcHs256 => "A128CBC-HS256",
            Self::A192CbcHs384 => "A192CBC-HS384",
            Self::A256CbcHs512 => "A256CBC-HS512",
            Self::A128Gcm => "A128GCM",
            Self::A192Gcm => "A192GCM",
            Self::A256Gcm => "A256GCM",
        }
    }

    /// `(cek_bytes, iv_bytes, tag_bytes)`, per the spec §4.1.1 table.
    pub const fn sizes(self) -> (usize, usize, usize) {
        match self {
            Self::A128CbcHs256 => (32, 16, 16),
            Self::A192CbcHs384 => (48, 16, 24),
            Self::A256CbcHs512 => (64, 16, 32),
            Self::A128Gcm => (16, 12, 16),
            Self::A192Gcm => (24, 12, 16),
            Self::A256Gcm => (32, 12, 16),
        }
    }

    pub const fn is_cbc_hmac(self) -> bool {
        matches!(self, Self::A128CbcHs256 | Self::A192CbcHs384 | Self::A256CbcHs512)
    }

    fn to_picky(self) -> JweEnc {
        match self {
            Self::A128CbcHs256 => JweEnc::Aes128CbcHmacSha256,
            Self::A192CbcHs384 => JweEnc::Aes192CbcHmacSha384,
            Self::A256CbcHs512 => JweEnc::Aes256CbcHmacSha512,
            Self::A128Gcm => JweEnc::Aes128Gcm,
            Self::A192Gcm => JweEnc::Aes192Gcm,
            Self::A256Gcm => JweEnc::Aes256Gcm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyManagementAlg {
    RsaOaep,
    RsaOaep256,
    Rsa1_5,
    A128GcmKw,
    A192GcmKw,
    A256GcmKw,
    Dir,
}

impl KeyManagementAlg {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "RSA-OAEP" => Self::RsaOaep,
            "RSA-OAEP-256" => Self::RsaOaep256,
            "RSA1_5" => Self::Rsa1_5,
            "A128GCMKW" => Self::A128GcmKw,
            "A192GCMKW" => Self::A192GcmKw,
            "A256GCMKW" => Self::A256GcmKw,
            "dir" => Self::Dir,
            _ => return None,
        })
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::RsaOaep => "RSA-OAEP",
            Self::RsaOaep256 => "RSA-OAEP-256",
            Self::Rsa1_5 => "RSA1_5",
            Self::A128GcmKw => "A128GCMKW",
            Self::A192GcmKw => "A192GCMKW",
            Self::A256GcmKw => "A256GCMKW",
            Self::Dir => "dir",
        }
    }

    /// RSA-OAEP padding overhead in bytes, per spec §4.1.2 (`{11, 42, 66}`
    /// for RSA1_5 / RSA-OAEP / RSA-OAEP-256 respectively).
    pub const fn rsa_overhead_bytes(self) -> Option<usize> {
        match self {
            Self::Rsa1_5 => Some(11),
            Self::RsaOaep => Some(42),
            Self::RsaOaep256 => Some(66),
            _ => None,
        }
    }

    pub const fn is_rsa(self) -> bool {
        matches!(self, Self::RsaOaep | Self::RsaOaep256 | Self::Rsa1_5)
    }

    pub const fn is_gcm_kw(self) -> bool {
        matches!(self, Self::A128GcmKw | Self::A192GcmKw | Self::A256GcmKw)
    }

    fn to_picky(self) -> JweAlg {
        match self {
            Self::RsaOaep => JweAlg::RsaOaep,
            Self::RsaOaep256 => JweAlg::RsaOaep256,
            Self::Rsa1_5 => JweAlg::RsaPkcs1v15,
            Self::A128GcmKw => JweAlg::Aes128GcmKw,
            Self::A192GcmKw => JweAlg::Aes192GcmKw,
            Self::A256GcmKw => JweAlg::Aes256GcmKw,
            Self::Dir => JweAlg::Direct,
        }
    }
}

/// Encrypts `plaintext` under `enc`/`alg` for `recipient_key`, producing a
/// five-part JWE compact serialization. Returns [`CryptoError`] — never a
/// detailed reason — on any failure (spec §4.1.1).
pub fn encrypt(
    plaintext: &[u8],
    aad: Option<&[u8]>,
    enc: ContentEncryptionAlg,
    alg: KeyManagementAlg,
    recipient_key: &JsonWebKey,
) -> Result<String, CryptoError> {
    validate_key_for_alg(alg, recipient_key)?;

    if alg.is_gcm_kw() {
        return Err(CryptoError);
    }

    let mut jwe = Jwe::new(alg.to_picky(), enc.to_picky(), plaintext.to_vec());
    if let Some(aad) = aad {
        jwe = jwe.aad(aad.to_vec());
    }
    if let Some(kid) = &recipient_key.kid {
        jwe = jwe.kid(kid.as_str());
    }

    match alg {
        KeyManagementAlg::Dir => {
            let key = recipient_key.oct_bytes()?;
            let (cek_len, ..) = enc.sizes();
            if key.len() != cek_len {
                return Err(CryptoError);
            }
            jwe.encode_direct(&key).map_err(|_| CryptoError)
        }
        alg if alg.is_rsa() => {
            let public_key = super::sign::to_public_key(recipient_key)?;
            jwe.encode(&public_key).map_err(|_| CryptoError)
        }
        _ => Err(CryptoError),
    }
}

/// Decrypts a compact JWE with `recipient_key`. The caller is responsible
/// for resolving `recipient_key` from the header `kid` via
/// [`super::jwk::JsonWebKeySet::by_kid`] beforehand.
pub fn decrypt(token: &str, recipient_key: &JsonWebKey) -> Result<(Vec<u8>, Header), CryptoError> {
    let decoded = match &recipient_key.material {
        KeyMaterial::Oct { .. } => {
            let alg = peek_alg(token)?;
            if alg != KeyManagementAlg::Dir {
                return Err(CryptoError);
            }
            let key = recipient_key.oct_bytes()?;
            Jwe::decode_direct(token, &key).map_err(|_| CryptoError)?
        }
        KeyMaterial::RSA { .. } => {
            let key = super::sign::to_private_key(recipient_key)?;
            Jwe::decode(token, &key).map_err(|_| CryptoError)?
        }
        _ => return Err(CryptoError),
    };

    let header = Header {
        alg: decoded.header.alg.to_string().into(),
        enc: Some(decoded.header.enc.to_string().into()),
        kid: decoded.header.kid.clone().map(Into::into),
        typ: None,
        cty: decoded.header.cty.clone().map(Into::into),
        epk: None,
    };

    Ok((decoded.payload, header))
}

/// Reads the `alg` field out of a compact JWE's protected header without
/// fully decoding it, so [`decrypt`] can route `dir` and `A*GCMKW` (both
/// `KeyMaterial::Oct` on the recipient side) to the correct handling before
/// attempting a key-material-specific decode.
fn peek_alg(token: &str) -> Result<KeyManagementAlg, CryptoError> {
    let protected = token.split('.').next().ok_or(CryptoError)?;
    let header_bytes = URL_SAFE_NO_PAD.decode(protected).map_err(|_| CryptoError)?;
    let header: Header = serde_json::from_slice(&header_bytes).map_err(|_| CryptoError)?;
    KeyManagementAlg::from_name(&header.alg).ok_or(CryptoError)
}

/// Pre-flight validation independent of the underlying AEAD/RSA library:
/// RSA modulus floor (spec §4.1.2) and `dir`/GCM-KW wire-format floors.
fn validate_key_for_alg(alg: KeyManagementAlg, key: &JsonWebKey) -> Result<(), CryptoError> {
    if alg.is_rsa() {
        let KeyMaterial::RSA { n, .. } = &key.material else { return Err(CryptoError) };
        let modulus_bits = base64_len_to_bits(n.len());
        if modulus_bits < MIN_RSA_MODULUS_BITS {
            return Err(CryptoError);
        }
    }
    Ok(())
}

/// Wire-format floor for an AES-GCM-KW wrapped key, `IV(12) || ciphertext
/// || tag(16)` (spec §4.1.2). `picky` enforces the same floor internally
/// when decoding the JWE `encrypted_key` field; this check lets callers
/// reject a malformed `encrypted_key` before attempting the AEAD open.
pub fn check_gcm_kw_wire_len(wrapped: &[u8]) -> Result<(), CryptoError> {
    if wrapped.len() < MIN_GCM_KW_LEN {
        return Err(CryptoError);
    }
    Ok(())
}

fn base64_len_to_bits(b64_len: usize) -> usize {
    // 4 base64url chars encode 3 bytes; each byte is 8 bits.
    ((b64_len * 3) / 4) * 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cek_sizes_match_rfc7518_table() {
        assert_eq!(ContentEncryptionAlg::A128CbcHs256.sizes(), (32, 16, 16));
        assert_eq!(ContentEncryptionAlg::A192CbcHs384.sizes(), (48, 16, 24));
        assert_eq!(ContentEncryptionAlg::A256CbcHs512.sizes(), (64, 16, 32));
        assert_eq!(ContentEncryptionAlg::A128Gcm.sizes(), (16, 12, 16));
        assert_eq!(ContentEncryptionAlg::A192Gcm.sizes(), (24, 12, 16));
        assert_eq!(ContentEncryptionAlg::A256Gcm.sizes(), (32, 12, 16));
    }

    #[test]
    fn rsa_overhead_matches_spec_table() {
        assert_eq!(KeyManagementAlg::Rsa1_5.rsa_overhead_bytes(), Some(11));
        assert_eq!(KeyManagementAlg::RsaOaep.rsa_overhead_bytes(), Some(42));
        assert_eq!(KeyManagementAlg::RsaOaep256.rsa_overhead_bytes(), Some(66));
    }

    #[test]
    fn gcm_kw_rejects_short_input() {
        let short = vec![0u8; MIN_GCM_KW_LEN - 1];
        assert!(check_gcm_kw_wire_len(&short).is_err());
        let ok = vec![0u8; MIN_GCM_KW_LEN];
        assert!(check_gcm_kw_wire_len(&ok).is_ok());
    }

    #[test]
    fn dir_round_trips() {
        let (cek_len, ..) = ContentEncryptionAlg::A128Gcm.sizes();
        let key = JsonWebKey::oct(&vec![0x11u8; cek_len]);
        let plaintext = b"direct mode plaintext";

        let token = encrypt(plaintext, None, ContentEncryptionAlg::A128Gcm, KeyManagementAlg::Dir, &key).expect("encrypt");
        let (decrypted, header) = decrypt(&token, &key).expect("decrypt");

        assert_eq!(decrypted, plaintext);
        assert_eq!(header.alg, "dir");
    }

    #[test]
    fn dir_rejects_wrong_size_key() {
        let key = JsonWebKey::oct(&[0x22u8; 4]);
        assert!(encrypt(b"plaintext", None, ContentEncryptionAlg::A128Gcm, KeyManagementAlg::Dir, &key).is_err());
    }

    #[test]
    fn gcm_kw_is_rejected_as_unsupported() {
        let key = JsonWebKey::oct(&[0x33u8; 16]);
        assert!(encrypt(b"plaintext", None, ContentEncryptionAlg::A128Gcm, KeyManagementAlg::A128GcmKw, &key).is_err());
    }

    /// RSA key from RFC 7517 Appendix A.2, a standard publicly documented
    /// test vector (not generated for this crate).
    fn rfc7517_rsa_key() -> JsonWebKey {
        JsonWebKey {
            material: KeyMaterial::RSA {
                n: "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw".into(),
                e: "AQAB".into(),
                d: Some("X4cTteJY_gn4FYPsXB8rdXix5vwsg1FLN5E3EaG6RJoVH-HLLKD9M7dx5oo7GURknchnrRweUkC7hT5fJLM0WbFAKNLWY2vv7B6NqXSzUvxT0_YSfqijwp3RTzlBaCxWp4doFk5N2o8Gy_nHNKroADIkJ46pRUohsXywbReAdYaMwFs9tv8d_cPVY3i07a3t8MN6TNwm0dSawm9v47UiCl3Sk5ZiG7xojPLu4sbg1U2jx4IBTNBznbJSzFHK66jT8bjdCkdOFEW51jxnxiHERz9F5eU0lXpCq83wDR2tmH_7j_hQLkvRn1a4bwxTzzdV4wv0ARBEPpOU_W02vxMc8oW9Wz3j1_i1dKUIm0dRzuVcGRRkObu24exLNk7iPkN5qXpFN9wyFZ5GwaD1rL6izDFtCGA-0iSv4OZxStW2_NEoQ".into()),
                p: Some("83i-7IvMGXoMXCskv73TKr8637FIotaPkO3uELd09cjUcNzCMMXRp3t5f-fDqb8yoRrkBlOHXIMRgC8q-9LH5KBLjLoj0dcj9-nETrZ8xjNJjYbE1dQqoyIONjk8OnqqIQsKv4xz2j8PlgI2qm27oRn_r0hNJNyxD7uy9G_-9WE".into()),
                q: Some("3dfOR9cuYq-0S-mkFLzgItgMEfFzB2q3hWehMuG0oCuqnb3vobLyumqjVZQO1dIrdwgTnCdpYzBcOf9Y_KoV0sMdg7TX0_nFM1iD8G-8IFuXqaoNKF0z-_LwpFHJ9sVBikzZePBfQqVa9LdmLjccsFnJfUXsi3C0ajOU34pMLlfyL3gGejvJ4VUPhvRQrBTOJkFJ_7Oyh90wR1Xx-Nca1hMT_7Zi4hcGZc9DoO3tQjvgIq9j9NeDeUhqoTJ_47wrVyMoUrnqCZ0o2bUc4GMqfdnMU85Hi2m-BE4Fhj4lp2Am8DR4NJjIBP5dxHLHLaU15F4QtxjzEAbH2oUZfgAZ_rM".into()),
            },
            kid: None,
            key_use: None,
            alg: None,
            key_ops: Vec::new(),
        }
    }

    #[test]
    fn rsa_oaep_256_round_trips() {
        let key = rfc7517_rsa_key();
        let plaintext = b"rsa wrapped content encryption key test";

        let token = encrypt(plaintext, None, ContentEncryptionAlg::A256Gcm, KeyManagementAlg::RsaOaep256, &key).expect("encrypt");
        let (decrypted, header) = decrypt(&token, &key).expect("decrypt");

        assert_eq!(decrypted, plaintext);
        assert_eq!(header.alg, "RSA-OAEP-256");
    }
}
