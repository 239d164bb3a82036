//! Grant processor (spec §4.3): the apex coordinator. Every endpoint
//! composes this module's validators into a pipeline, short-circuited on
//! the first error, ending with either a typed success record or a
//! single typed error.

pub mod client_auth;
pub mod grant_type;
pub mod pkce;
pub mod resource;
pub mod scope;

use std::sync::Arc;
use std::time::Duration;

use client_auth::ClientAuthRequest;

use crate::error::{OidcError, OidcErrorCode};
use crate::interfaces::{
    AuthServiceKeysProvider, AuthorizationCodeStore, ClientInfoProvider, ClientKeysProvider, ResourceManager, ScopeManager, TokenRegistry,
};
use crate::model::{AuthorizedGrant, ClientInfo, GrantType};
use crate::token::{AccessTokenService, IdentityTokenService, RefreshTokenService};

/// The request shape accepted at the token endpoint, independent of
/// transport (spec §1: HTTP transport is a collaborator concern).
pub enum TokenRequest<'a> {
    AuthorizationCode { code: &'a str, redirect_uri: &'a str, code_verifier: Option<&'a str> },
    RefreshToken { refresh_token: &'a str, scope: Option<&'a [String]> },
    ClientCredentials { scope: &'a [String], resources: &'a [String] },
}

impl TokenRequest<'_> {
    fn grant_type(&self) -> GrantType {
        match self {
            Self::AuthorizationCode { .. } => GrantType::AuthorizationCode,
            Self::RefreshToken { .. } => GrantType::RefreshToken,
            Self::ClientCredentials { .. } => GrantType::ClientCredentials,
        }
    }
}

/// A successful token-endpoint response (spec §6.1's JSON shape, minus
/// transport concerns).
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub scope: Vec<String>,
}

/// Step 2 of spec §4.3: "Fails with `unauthorized_client` if the
/// client's configured `allowed_grant_types` excludes the requested
/// one."
pub fn authorize_grant_type(client: &ClientInfo, requested: GrantType) -> Result<(), OidcError> {
    if client.allows_grant(requested) {
        Ok(())
    } else {
        Err(OidcError::new(OidcErrorCode::UnauthorizedClient))
    }
}

/// Wires together the collaborators the token-endpoint pipeline needs
/// and exposes [`process`](Self::process) as the single composed
/// validator chain (spec §4.3).
pub struct GrantProcessor {
    pub clients: Arc<dyn ClientInfoProvider>,
    pub client_keys: Arc<dyn ClientKeysProvider>,
    pub auth_service_keys: Arc<dyn AuthServiceKeysProvider>,
    pub token_registry: Arc<dyn TokenRegistry>,
    pub auth_codes: Arc<dyn AuthorizationCodeStore>,
    pub scopes: Arc<dyn ScopeManager>,
    pub resources: Arc<dyn ResourceManager>,
    pub issuer: String,
    pub token_endpoint: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub identity_token_ttl: Duration,
}

impl GrantProcessor {
    /// Runs the ordered pipeline from spec §4.3 for `client_id` against
    /// `request`, returning a token response or the first validator
    /// error encountered.
    pub async fn process(&self, client_id: &str, auth: &ClientAuthRequest<'_>, request: TokenRequest<'_>) -> Result<TokenResponse, OidcError> {
        let client = self
            .clients
            .try_find_client(client_id)
            .await
            .map_err(|_| OidcError::new(OidcErrorCode::ServerError))?
            .ok_or_else(|| OidcError::new(OidcErrorCode::InvalidClient))?;

        client_auth::authenticate(&client, auth, self.client_keys.as_ref(), &self.token_endpoint).await?;
        authorize_grant_type(&client, request.grant_type())?;

        let (grant, granted_scope, resources, rotate_from) = match request {
            TokenRequest::AuthorizationCode { code, redirect_uri, code_verifier } => {
                let grant = grant_type::authorize_code(self.auth_codes.as_ref(), self.token_registry.as_ref(), code, redirect_uri, code_verifier).await?;
                let scope = scope::validate_requested(self.scopes.as_ref(), &client, &grant.context.scope).await?;
                let resources = resource::validate_requested(self.resources.as_ref(), &client, &grant.context.resources).await?;
                (grant, scope, resources, None)
            }
            TokenRequest::RefreshToken { refresh_token, scope: requested_scope } => {
                let refresh_service = RefreshTokenService::new(self.auth_service_keys.clone(), self.token_registry.clone(), self.issuer.clone(), self.refresh_token_ttl);
                let jwt = refresh_service.validate(refresh_token).await.map_err(|e| e.into_token_endpoint_error())?;

                let previously_granted = jwt.payload.scope();
                let granted = match requested_scope {
                    Some(requested) => scope::narrow(&previously_granted, requested)?,
                    None => previously_granted,
                };

                let client_id_claim = jwt.payload.client_id().unwrap_or_default().to_owned();
                if client_id_claim != client.client_id {
                    return Err(OidcError::new(OidcErrorCode::InvalidGrant));
                }

                let old_jti = jwt.payload.jti().unwrap_or_default().to_owned();
                let old_exp = jwt.payload.exp().unwrap_or_default();
                let grant = grant_type::grant_from_refresh_claims(&jwt, &client.client_id, &granted);
                (grant, granted, Vec::new(), Some((old_jti, old_exp)))
            }
            TokenRequest::ClientCredentials { scope: requested_scope, resources: requested_resources } => {
                let scope = scope::validate_requested(self.scopes.as_ref(), &client, requested_scope).await?;
                let resources = resource::validate_requested(self.resources.as_ref(), &client, requested_resources).await?;
                let grant = grant_type::client_credentials_grant(&client.client_id, &scope, &resources);
                (grant, scope, resources, None)
            }
        };

        self.issue_tokens(&client, grant, granted_scope, resources, rotate_from).await
    }

    async fn issue_tokens(
        &self,
        client: &ClientInfo,
        grant: AuthorizedGrant,
        scope: Vec<String>,
        resources: Vec<String>,
        rotate_from: Option<(String, i64)>,
    ) -> Result<TokenResponse, OidcError> {
        let access_service = AccessTokenService::new(self.auth_service_keys.clone(), self.issuer.clone(), self.access_token_ttl);
        let (_access_jwt, access_token, ttl) = access_service.create(&grant.session, &grant.context, &scope, &resources, None).await?;

        let issue_refresh = client.allows_grant(GrantType::RefreshToken);
        let refresh_token = if issue_refresh {
            let refresh_service = RefreshTokenService::new(self.auth_service_keys.clone(), self.token_registry.clone(), self.issuer.clone(), self.refresh_token_ttl);
            let (_, token, _) = refresh_service.create(&grant.session, &grant.context, &scope, None).await?;
            if let Some((old_jti, old_exp)) = rotate_from
                && let Ok(expires_at) = time::OffsetDateTime::from_unix_timestamp(old_exp)
            {
                refresh_service.rotate(&old_jti, expires_at).await?;
            }
            Some(token)
        } else {
            None
        };

        let id_token = if scope.iter().any(|s| s == "openid") {
            let identity_service = IdentityTokenService::new(self.auth_service_keys.clone(), self.issuer.clone(), self.identity_token_ttl);
            let companions = crate::token::identity::IdentityTokenCompanions { access_token: Some(&access_token), authorization_code: None };
            let (_, token, _) = identity_service.create(&grant.session, &grant.context, companions, None).await?;
            Some(token)
        } else {
            None
        };

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer",
            expires_in: ttl.as_secs(),
            refresh_token,
            id_token,
            scope,
        })
    }
}
