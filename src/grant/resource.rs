//! Resource-indicator validation (spec §4.3 step 5): checks RFC 8707
//! resource indicators against the resource manager.

use crate::error::{OidcError, OidcErrorCode};
use crate::interfaces::ResourceManager;
use crate::model::ClientInfo;

pub async fn validate_requested<R: ResourceManager + ?Sized>(manager: &R, client: &ClientInfo, requested: &[String]) -> Result<Vec<String>, OidcError> {
    if requested.is_empty() {
        return Ok(Vec::new());
    }

    let allowed = manager.allowed_resources(client).await.map_err(|_| OidcError::new(OidcErrorCode::ServerError))?;
    let disallowed: Vec<&String> = requested.iter().filter(|r| !allowed.contains(r)).collect();
    if !disallowed.is_empty() {
        return Err(OidcError::with_description(
            OidcErrorCode::InvalidTarget,
            format!("resource(s) not permitted for this client: {}", disallowed.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")),
        ));
    }
    Ok(requested.to_vec())
}
