//! Back-channel request storage helpers (spec §4.4 "Storage").
//!
//! The store itself is a collaborator ([`BackChannelRequestStorage`]);
//! this module owns the one policy detail specified close to the
//! interface: `auth_req_id` must be a high-entropy random opaque
//! identifier.

use rand::RngCore;

/// 256 bits of randomness, base64url-encoded — large enough that guessing
/// a live `auth_req_id` is infeasible (spec §4.4).
pub fn generate_auth_req_id() -> String {
    use base64::Engine as _;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_distinct_high_entropy_ids() {
        let a = generate_auth_req_id();
        let b = generate_auth_req_id();
        assert_ne!(a, b);
        assert!(a.len() >= 32);
    }
}
