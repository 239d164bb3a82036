//! `at_hash` / `c_hash` computation (OIDC Core §3.1.3.6), shared by every
//! identity-token issuance path that accompanies an access token or
//! authorization code.
//!
//! Both claims are "the left-most half of the hash of the octets of the
//! ASCII representation, where the hash algorithm is the one used in the
//! `alg` header of the ID token". Only the SHA-2 family used by this
//! crate's supported JWS algorithms is implemented.

use base64::Engine as _;
use sha2::{Digest, Sha256, Sha384, Sha512};

const B64: base64::engine::GeneralPurpose = base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Computes `at_hash`/`c_hash` for `value` (the access token or the
/// authorization code, as ASCII octets) under the JWS `alg` the ID token
/// is signed with. Returns `None` for an algorithm with no defined hash
/// (e.g. `none`).
pub fn left_half_hash(alg: &str, value: &str) -> Option<String> {
    let digest = match alg {
        "RS256" | "PS256" | "ES256" | "HS256" => Sha256::digest(value.as_bytes()).to_vec(),
        "RS384" | "PS384" | "ES384" | "HS384" => Sha384::digest(value.as_bytes()).to_vec(),
        "RS512" | "PS512" | "ES512" | "HS512" => Sha512::digest(value.as_bytes()).to_vec(),
        "EdDSA" => Sha512::digest(value.as_bytes()).to_vec(),
        _ => return None,
    };

    let half = &digest[..digest.len() / 2];
    Some(B64.encode(half))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_known_rs256_at_hash_vector() {
        // From OIDC Core §A.3's example for alg=RS256.
        let hash = left_half_hash("RS256", "mF_9.B5f-4.1JqM").unwrap();
        assert_eq!(hash, "77QmUPtjPfzWtF2AnpK9RQ");
    }

    #[test]
    fn unknown_alg_returns_none() {
        assert!(left_half_hash("none", "token").is_none());
    }
}
