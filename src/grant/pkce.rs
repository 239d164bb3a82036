//! PKCE verification (spec §4.3): `code_challenge_method ∈ {plain,
//! S256}`; verify `S256(code_verifier)` equals the stored
//! `code_challenge`.

use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::model::PkceMethod;
use crate::util::constant_time_eq;

const B64: base64::engine::GeneralPurpose = base64::engine::general_purpose::URL_SAFE_NO_PAD;

pub fn verify(method: PkceMethod, code_verifier: &str, code_challenge: &str) -> bool {
    match method {
        PkceMethod::Plain => constant_time_eq(code_verifier.as_bytes(), code_challenge.as_bytes()),
        PkceMethod::S256 => {
            let digest = Sha256::digest(code_verifier.as_bytes());
            let computed = B64.encode(digest);
            constant_time_eq(computed.as_bytes(), code_challenge.as_bytes())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s256_matches_known_vector() {
        // RFC 7636 appendix B.
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        let challenge = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";
        assert!(verify(PkceMethod::S256, verifier, challenge));
    }

    #[test]
    fn mismatched_verifier_fails() {
        assert!(!verify(PkceMethod::S256, "wrong-verifier", "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"));
    }

    #[test]
    fn plain_requires_exact_match() {
        assert!(verify(PkceMethod::Plain, "abc", "abc"));
        assert!(!verify(PkceMethod::Plain, "abc", "abd"));
    }
}
