//! CIBA engine (spec §4.4): a small state machine and scheduling layer
//! that holds out-of-band authentication requests, notifies waiting
//! long-polls, and delivers tokens through the correct channel.

pub mod notifier;
pub mod router;
pub mod storage;

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

pub use router::{CompletionRouter, UserDecision};

use crate::error::{OidcError, OidcErrorCode};
use crate::grant::{GrantProcessor, TokenResponse};
use crate::interfaces::{BackChannelNotifier, BackChannelRequestStorage, ClientInfoProvider};
use crate::model::{AuthorizedGrant, BackChannelAuthenticationRequest, BackChannelStatus, CibaDeliveryMode};
use crate::token::{AccessTokenService, IdentityTokenService, RefreshTokenService};

/// The outcome of a CIBA poll at the token endpoint (spec §4.4 "Polling
/// interval enforcement").
pub enum PollOutcome {
    Tokens(TokenResponse),
    Pending,
    SlowDown,
    Denied,
    Expired,
}

impl PollOutcome {
    pub fn into_oidc_result(self) -> Result<TokenResponse, OidcError> {
        match self {
            Self::Tokens(response) => Ok(response),
            Self::Pending => Err(OidcError::new(OidcErrorCode::AuthorizationPending)),
            Self::SlowDown => Err(OidcError::new(OidcErrorCode::SlowDown)),
            Self::Denied => Err(OidcError::new(OidcErrorCode::AccessDenied)),
            Self::Expired => Err(OidcError::new(OidcErrorCode::ExpiredToken)),
        }
    }
}

fn to_time_duration(d: Duration) -> time::Duration {
    time::Duration::try_from(d).unwrap_or(time::Duration::ZERO)
}

pub struct CibaEngine {
    pub clients: Arc<dyn ClientInfoProvider>,
    pub storage: Arc<dyn BackChannelRequestStorage>,
    pub notifier: Option<Arc<dyn BackChannelNotifier>>,
    pub grant_processor: Arc<GrantProcessor>,
    pub default_interval: Duration,
    pub max_long_poll: Duration,
    pub use_long_polling: bool,
}

impl CibaEngine {
    /// Stores a freshly constructed back-channel request and returns its
    /// `auth_req_id` (the `/bc-authorize` response).
    pub async fn start(&self, grant: AuthorizedGrant, ttl: Duration, binding_message: Option<String>, user_code: Option<String>, notification_endpoint: Option<String>, notification_token: Option<String>) -> Result<(String, Duration), OidcError> {
        let auth_req_id = storage::generate_auth_req_id();
        let request = BackChannelAuthenticationRequest {
            auth_req_id: auth_req_id.clone(),
            status: BackChannelStatus::Pending,
            grant,
            client_notification_endpoint: notification_endpoint,
            client_notification_token: notification_token,
            binding_message,
            user_code,
            expires_at: OffsetDateTime::now_utc() + ttl,
            last_polled_at: None,
            interval: self.default_interval.as_secs() as i64,
        };

        self.storage.store(request, to_time_duration(ttl)).await.map_err(|_| OidcError::new(OidcErrorCode::ServerError))?;
        Ok((auth_req_id, self.default_interval))
    }

    /// Handles `grant_type=urn:openid:params:grant-type:ciba` at the
    /// token endpoint (spec §4.4 "Poll-mode handler" and "Token-endpoint
    /// access check").
    pub async fn poll(&self, client_id: &str, auth_req_id: &str) -> Result<PollOutcome, OidcError> {
        let client = self
            .clients
            .try_find_client(client_id)
            .await
            .map_err(|_| OidcError::new(OidcErrorCode::ServerError))?
            .ok_or_else(|| OidcError::new(OidcErrorCode::InvalidClient))?;

        if client.ciba_delivery_mode == Some(CibaDeliveryMode::Push) {
            return Err(OidcError::with_description(OidcErrorCode::InvalidGrant, "push mode clients receive tokens directly"));
        }

        let Some(mut request) = self.storage.try_get(auth_req_id).await.map_err(|_| OidcError::new(OidcErrorCode::ServerError))? else {
            return Err(OidcError::new(OidcErrorCode::InvalidGrant));
        };

        if request.grant.context.client_id != client_id {
            return Err(OidcError::new(OidcErrorCode::InvalidGrant));
        }

        let now = OffsetDateTime::now_utc();
        if request.is_expired(now) {
            let _ = self.storage.remove(auth_req_id).await;
            return Ok(PollOutcome::Expired);
        }

        if let Some(last) = request.last_polled_at
            && (now - last) < time::Duration::seconds(request.interval)
        {
            return Ok(PollOutcome::SlowDown);
        }

        if self.use_long_polling && request.status == BackChannelStatus::Pending
            && let Some(notifier) = &self.notifier
        {
            notifier.wait_for_status_change(auth_req_id, self.max_long_poll).await;
            if let Some(refreshed) = self.storage.try_get(auth_req_id).await.map_err(|_| OidcError::new(OidcErrorCode::ServerError))? {
                request = refreshed;
            }
        }

        request.last_polled_at = Some(now);

        match request.status {
            BackChannelStatus::Pending => {
                self.storage.update(auth_req_id, request, to_time_duration(self.remaining_ttl(now))).await.map_err(|_| OidcError::new(OidcErrorCode::ServerError))?;
                Ok(PollOutcome::Pending)
            }
            BackChannelStatus::Denied => {
                let _ = self.storage.remove(auth_req_id).await;
                Ok(PollOutcome::Denied)
            }
            BackChannelStatus::Expired => {
                let _ = self.storage.remove(auth_req_id).await;
                Ok(PollOutcome::Expired)
            }
            BackChannelStatus::Authenticated => {
                let response = self.issue_for(&client, &request).await?;
                let _ = self.storage.remove(auth_req_id).await;
                Ok(PollOutcome::Tokens(response))
            }
        }
    }

    fn remaining_ttl(&self, now: OffsetDateTime) -> Duration {
        let _ = now;
        self.max_long_poll.max(Duration::from_secs(1))
    }

    async fn issue_for(&self, client: &crate::model::ClientInfo, request: &BackChannelAuthenticationRequest) -> Result<TokenResponse, OidcError> {
        let gp = &self.grant_processor;
        let access_service = AccessTokenService::new(gp.auth_service_keys.clone(), gp.issuer.clone(), gp.access_token_ttl);
        let (_, access_token, ttl) = access_service
            .create(&request.grant.session, &request.grant.context, &request.grant.context.scope, &request.grant.context.resources, None)
            .await?;

        let id_token = if request.grant.context.scope.iter().any(|s| s == "openid") {
            let identity_service = IdentityTokenService::new(gp.auth_service_keys.clone(), gp.issuer.clone(), gp.identity_token_ttl);
            let companions = crate::token::identity::IdentityTokenCompanions { access_token: Some(&access_token), authorization_code: None };
            identity_service.create(&request.grant.session, &request.grant.context, companions, None).await.ok().map(|(_, token, _)| token)
        } else {
            None
        };

        let refresh_token = if client.allows_grant(crate::model::GrantType::RefreshToken) {
            let refresh_service = RefreshTokenService::new(gp.auth_service_keys.clone(), gp.token_registry.clone(), gp.issuer.clone(), gp.refresh_token_ttl);
            refresh_service.create(&request.grant.session, &request.grant.context, &request.grant.context.scope, None).await.ok().map(|(_, token, _)| token)
        } else {
            None
        };

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer",
            expires_in: ttl.as_secs(),
            refresh_token,
            id_token,
            scope: request.grant.context.scope.clone(),
        })
    }
}
