//! Token-registry decoration (spec §4.2.2): "The JWT validator is
//! decorated to reject any token whose `jti` maps to `Used` or
//! `Revoked`."
//!
//! The registry itself is a collaborator (spec §1 "Out of scope":
//! persistence backends); this module only owns the decoration policy
//! that every token-validating call site applies identically.

use crate::error::JwtValidationError;
use crate::interfaces::TokenRegistry;
use crate::model::TokenStatus;

/// Checks `jti` against `registry`, failing closed: any registry error
/// or an `Unknown` jti is treated as not-active, per spec §7-2's rule
/// that JWT validation errors must never leak infrastructure detail.
pub async fn check_not_revoked<R: TokenRegistry + ?Sized>(registry: &R, jti: &str) -> Result<(), JwtValidationError> {
    match registry.get_status(jti).await {
        Ok(TokenStatus::Active) => Ok(()),
        Ok(TokenStatus::Used | TokenStatus::Revoked | TokenStatus::Unknown) | Err(_) => Err(JwtValidationError::Replayed),
    }
}
