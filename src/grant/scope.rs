//! Scope validation (spec §4.3 step 4): checks each requested scope
//! against the configured scope manager; narrowing is allowed,
//! broadening is not.

use crate::error::{OidcError, OidcErrorCode};
use crate::interfaces::ScopeManager;
use crate::model::ClientInfo;

/// Validates a fresh authorization request's scope list against the
/// client's allowed set (scope manager lookup).
pub async fn validate_requested<S: ScopeManager + ?Sized>(manager: &S, client: &ClientInfo, requested: &[String]) -> Result<Vec<String>, OidcError> {
    let allowed = manager.allowed_scopes(client).await.map_err(|_| OidcError::new(OidcErrorCode::ServerError))?;
    narrow(&allowed, requested)
}

/// Validates a refresh_token request's scope list against the scope the
/// original grant carried — narrowing only (spec §4.3 step 4).
pub fn narrow(previously_granted: &[String], requested: &[String]) -> Result<Vec<String>, OidcError> {
    if requested.is_empty() {
        return Ok(previously_granted.to_vec());
    }
    let disallowed: Vec<&String> = requested.iter().filter(|s| !previously_granted.contains(s)).collect();
    if !disallowed.is_empty() {
        return Err(OidcError::with_description(
            OidcErrorCode::InvalidScope,
            format!("scope(s) not previously granted: {}", disallowed.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")),
        ));
    }
    Ok(requested.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowing_is_allowed() {
        let granted = vec!["openid".to_owned(), "profile".to_owned(), "email".to_owned()];
        let requested = vec!["openid".to_owned()];
        assert_eq!(narrow(&granted, &requested).unwrap(), requested);
    }

    #[test]
    fn broadening_is_rejected() {
        let granted = vec!["openid".to_owned()];
        let requested = vec!["openid".to_owned(), "admin".to_owned()];
        assert!(narrow(&granted, &requested).is_err());
    }

    #[test]
    fn empty_request_keeps_full_grant() {
        let granted = vec!["openid".to_owned(), "profile".to_owned()];
        assert_eq!(narrow(&granted, &[]).unwrap(), granted);
    }
}
