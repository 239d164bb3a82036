//! Client authentication (spec §4.3 step 1): a composite of `{none,
//! client_secret_basic, client_secret_post, client_secret_jwt,
//! private_key_jwt, tls_client_auth, self_signed_tls}`. Emits
//! `invalid_client` on failure.
//!
//! Per spec §9 ("Keyed service lookup... re-express as a small map from
//! mode string to a function value"), each method is a plain async
//! function tried in the order the client registered it.

use secrecy::ExposeSecret;

use crate::error::{OidcError, OidcErrorCode};
use crate::interfaces::ClientKeysProvider;
use crate::jose::jwk::JsonWebKey;
use crate::jose::{self, JsonWebKeySet, ValidationOptions, ValidationParams};
use crate::model::{ClientAuthMethod, ClientInfo};
use crate::util::constant_time_eq;

const JWT_BEARER_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Credentials presented with a token request; the host application
/// populates only the fields relevant to the transport-level method it
/// observed (e.g. an `Authorization: Basic` header, or a verified TLS
/// client certificate).
#[derive(Debug, Clone, Default)]
pub struct ClientAuthRequest<'a> {
    pub client_secret: Option<&'a str>,
    pub client_assertion: Option<&'a str>,
    pub client_assertion_type: Option<&'a str>,
    pub tls_client_verified: bool,
}

/// Authenticates `client` against `request`. Tries every method the
/// client is registered to use, in registration order, succeeding on
/// the first match.
pub async fn authenticate<K: ClientKeysProvider + ?Sized>(
    client: &ClientInfo,
    request: &ClientAuthRequest<'_>,
    keys_provider: &K,
    token_endpoint: &str,
) -> Result<(), OidcError> {
    for method in &client.allowed_auth_methods {
        let matched = match method {
            ClientAuthMethod::None => request.client_secret.is_none() && request.client_assertion.is_none(),
            ClientAuthMethod::ClientSecretBasic | ClientAuthMethod::ClientSecretPost => verify_shared_secret(client, request.client_secret),
            ClientAuthMethod::ClientSecretJwt => verify_client_assertion_hmac(client, request, token_endpoint).await,
            ClientAuthMethod::PrivateKeyJwt => verify_client_assertion_asymmetric(client, request, keys_provider, token_endpoint).await,
            ClientAuthMethod::TlsClientAuth | ClientAuthMethod::SelfSignedTlsClientAuth => request.tls_client_verified,
        };
        if matched {
            return Ok(());
        }
    }
    Err(OidcError::new(OidcErrorCode::InvalidClient))
}

fn verify_shared_secret(client: &ClientInfo, presented: Option<&str>) -> bool {
    match (&client.client_secret, presented) {
        (Some(expected), Some(presented)) => constant_time_eq(expected.expose_secret().as_bytes(), presented.as_bytes()),
        _ => false,
    }
}

async fn verify_client_assertion_hmac(client: &ClientInfo, request: &ClientAuthRequest<'_>, token_endpoint: &str) -> bool {
    let Some(assertion) = request.client_assertion else { return false };
    if request.client_assertion_type != Some(JWT_BEARER_ASSERTION_TYPE) {
        return false;
    }
    let Some(secret) = &client.client_secret else { return false };

    let keys = JsonWebKeySet::new(vec![JsonWebKey::oct(secret.expose_secret().as_bytes())]);
    let client_id = client.client_id.clone();
    let endpoint = token_endpoint.to_owned();
    let decryption_keys = JsonWebKeySet::default();

    let params = ValidationParams {
        options: ValidationOptions::SKIP_REPLAY_CHECK,
        clock_skew_secs: 30,
        validate_issuer: &|iss| iss == client_id,
        validate_audience: &|auds| auds.iter().any(|a| a == &endpoint),
        resolve_issuer_signing_keys: &|_| keys.clone(),
        resolve_token_decryption_keys: &|_| decryption_keys.clone(),
        is_replayed: None,
    };

    jose::validate_jwt(assertion, &params).is_ok()
}

async fn verify_client_assertion_asymmetric<K: ClientKeysProvider + ?Sized>(
    client: &ClientInfo,
    request: &ClientAuthRequest<'_>,
    keys_provider: &K,
    token_endpoint: &str,
) -> bool {
    let Some(assertion) = request.client_assertion else { return false };
    if request.client_assertion_type != Some(JWT_BEARER_ASSERTION_TYPE) {
        return false;
    }
    let Ok(keys) = keys_provider.get_signing_keys(client).await else { return false };

    let client_id = client.client_id.clone();
    let endpoint = token_endpoint.to_owned();
    let decryption_keys = JsonWebKeySet::default();

    let params = ValidationParams {
        options: ValidationOptions::SKIP_REPLAY_CHECK,
        clock_skew_secs: 30,
        validate_issuer: &|iss| iss == client_id,
        validate_audience: &|auds| auds.iter().any(|a| a == &endpoint),
        resolve_issuer_signing_keys: &|_| keys.clone(),
        resolve_token_decryption_keys: &|_| decryption_keys.clone(),
        is_replayed: None,
    };

    jose::validate_jwt(assertion, &params).is_ok()
}
