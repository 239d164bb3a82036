//! Completion router (spec §4.4 "Completion router"): on user decision,
//! sets the request's terminal status, dispatches to the delivery-mode
//! handler, and publishes the status change.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::error::{OidcError, OidcErrorCode};
use crate::grant::GrantProcessor;
use crate::interfaces::{BackChannelNotifier, BackChannelRequestStorage, ClientInfoProvider, NotificationDeliveryService, NotificationMode};
use crate::jose::hashes;
use crate::model::{BackChannelStatus, CibaDeliveryMode};
use crate::token::{AccessTokenService, IdentityTokenService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserDecision {
    Approve,
    Deny,
}

pub struct CompletionRouter {
    pub clients: Arc<dyn ClientInfoProvider>,
    pub storage: Arc<dyn BackChannelRequestStorage>,
    pub notifier: Option<Arc<dyn BackChannelNotifier>>,
    pub delivery: Arc<dyn NotificationDeliveryService>,
    pub grant_processor: Arc<GrantProcessor>,
    pub request_ttl: Duration,
}

impl CompletionRouter {
    /// Runs the 4-step completion sequence from spec §4.4. Idempotent
    /// on a non-`Pending` request (returns without effect) since
    /// transitions are one-shot (spec §5).
    pub async fn complete(&self, auth_req_id: &str, decision: UserDecision) -> Result<(), OidcError> {
        let Some(mut request) = self.storage.try_get(auth_req_id).await.map_err(|_| OidcError::new(OidcErrorCode::ServerError))? else {
            return Ok(());
        };
        if request.status != BackChannelStatus::Pending {
            return Ok(());
        }

        let client = self
            .clients
            .try_find_client(&request.grant.context.client_id)
            .await
            .map_err(|_| OidcError::new(OidcErrorCode::ServerError))?
            .ok_or_else(|| OidcError::new(OidcErrorCode::InvalidClient))?;

        let new_status = match decision {
            UserDecision::Approve => BackChannelStatus::Authenticated,
            UserDecision::Deny => BackChannelStatus::Denied,
        };
        request.transition(new_status).map_err(|_| OidcError::new(OidcErrorCode::ServerError))?;

        match (new_status, client.ciba_delivery_mode) {
            (BackChannelStatus::Authenticated, Some(CibaDeliveryMode::Poll)) | (BackChannelStatus::Denied, _) => {
                self.storage.update(auth_req_id, request, self.request_ttl).await.map_err(|_| OidcError::new(OidcErrorCode::ServerError))?;
            }
            (BackChannelStatus::Authenticated, Some(CibaDeliveryMode::Ping)) => {
                self.storage.update(auth_req_id, request.clone(), self.request_ttl).await.map_err(|_| OidcError::new(OidcErrorCode::ServerError))?;
                self.deliver_ping(auth_req_id, &request).await?;
            }
            (BackChannelStatus::Authenticated, Some(CibaDeliveryMode::Push)) => {
                self.deliver_push(auth_req_id, &client, &request).await;
                let _ = self.storage.remove(auth_req_id).await;
            }
            (BackChannelStatus::Authenticated, None) => {
                return Err(OidcError::new(OidcErrorCode::ServerError));
            }
        }

        if let Some(notifier) = &self.notifier {
            notifier.notify_status_change(auth_req_id).await;
        }

        Ok(())
    }

    /// Ping-mode delivery: POST `{auth_req_id}`. Configuration or
    /// delivery errors set the request to Denied (spec §4.4).
    async fn deliver_ping(&self, auth_req_id: &str, request: &crate::model::BackChannelAuthenticationRequest) -> Result<(), OidcError> {
        let (Some(endpoint), Some(token)) = (&request.client_notification_endpoint, &request.client_notification_token) else {
            self.deny(auth_req_id).await;
            return Err(OidcError::new(OidcErrorCode::InvalidClientMetadata));
        };

        let payload = json!({ "auth_req_id": auth_req_id });
        if self.delivery.send(endpoint, token, payload, NotificationMode::Ping).await.is_err() {
            self.deny(auth_req_id).await;
        }
        Ok(())
    }

    /// Push-mode delivery: generate tokens inline and POST the full
    /// response. The request is removed from storage by the caller on
    /// every outcome (spec §4.4 invariant).
    async fn deliver_push(&self, auth_req_id: &str, client: &crate::model::ClientInfo, request: &crate::model::BackChannelAuthenticationRequest) {
        let (Some(endpoint), Some(token)) = (&request.client_notification_endpoint, &request.client_notification_token) else {
            return;
        };

        let access_service = AccessTokenService::new(
            self.grant_processor.auth_service_keys.clone(),
            self.grant_processor.issuer.clone(),
            self.grant_processor.access_token_ttl,
        );
        let Ok((_, access_token, ttl)) = access_service
            .create(&request.grant.session, &request.grant.context, &request.grant.context.scope, &request.grant.context.resources, None)
            .await
        else {
            return;
        };

        let identity_service = IdentityTokenService::new(
            self.grant_processor.auth_service_keys.clone(),
            self.grant_processor.issuer.clone(),
            self.grant_processor.identity_token_ttl,
        );
        let companions = crate::token::identity::IdentityTokenCompanions { access_token: Some(&access_token), authorization_code: None };
        let id_token = identity_service
            .create(&request.grant.session, &request.grant.context, companions, None)
            .await
            .ok()
            .map(|(_, token, _)| token);

        let _ = hashes::left_half_hash; // at_hash is already embedded by IdentityTokenService.

        let mut payload = json!({
            "auth_req_id": auth_req_id,
            "access_token": access_token,
            "token_type": "Bearer",
            "expires_in": ttl.as_secs(),
        });
        if let Some(id_token) = id_token {
            payload["id_token"] = json!(id_token);
        }
        if client.allows_grant(crate::model::GrantType::RefreshToken) {
            // Push-mode refresh issuance mirrors the standard token path;
            // a registry write failure here must not block delivery.
            let refresh_service = crate::token::RefreshTokenService::new(
                self.grant_processor.auth_service_keys.clone(),
                self.grant_processor.token_registry.clone(),
                self.grant_processor.issuer.clone(),
                self.grant_processor.refresh_token_ttl,
            );
            if let Ok((_, refresh_token, _)) = refresh_service.create(&request.grant.session, &request.grant.context, &request.grant.context.scope, None).await {
                payload["refresh_token"] = json!(refresh_token);
            }
        }

        let _ = self.delivery.send(endpoint, token, payload, NotificationMode::Push).await;
    }

    async fn deny(&self, auth_req_id: &str) {
        if let Ok(Some(mut request)) = self.storage.try_get(auth_req_id).await {
            request.status = BackChannelStatus::Denied;
            let _ = self.storage.update(auth_req_id, request, self.request_ttl).await;
        }
    }
}
