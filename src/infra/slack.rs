//! Outbound client for Slack's `users.admin.invite` endpoint.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::{
    application::invitation::InvitationSender,
    config::SlackSettings,
    domain::invitation::{
        InvitationFailure, InvitationOutcome, InvitationRequest, InviteApiResponse,
    },
};

use super::error::InfraError;

#[derive(Clone)]
pub struct SlackInviteClient {
    client: Client,
    endpoint: Url,
    token: SecretString,
}

impl SlackInviteClient {
    pub fn new(settings: &SlackSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;

        Ok(Self {
            client,
            endpoint: settings.api_url.clone(),
            token: settings.token.clone(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("slack-invite/", env!("CARGO_PKG_VERSION"))
    }

    fn invite_url(&self, email: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.set_query(None);
        url.query_pairs_mut()
            .append_pair("email", email)
            .append_pair("token", self.token.expose_secret())
            .append_pair("set_active", "true");
        url
    }

    /// Issue one invitation call. Never retried.
    pub async fn send(&self, request: &InvitationRequest) -> InvitationOutcome {
        let url = self.invite_url(&request.email);
        debug!(endpoint = %self.endpoint, "sending slack invitation");

        let response = match self.client.post(url).send().await {
            Ok(response) => response,
            Err(err) => {
                return failure(InvitationFailure::Transport(
                    err.without_url().to_string(),
                ));
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            return failure(InvitationFailure::Status(status));
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => {
                return failure(InvitationFailure::Transport(
                    err.without_url().to_string(),
                ));
            }
        };

        match serde_json::from_slice::<InviteApiResponse>(&body) {
            Ok(parsed) => InvitationOutcome::from(parsed),
            Err(err) => failure(InvitationFailure::Decode(err.to_string())),
        }
    }
}

fn failure(reason: InvitationFailure) -> InvitationOutcome {
    InvitationOutcome::Failure(reason)
}

#[async_trait]
impl InvitationSender for SlackInviteClient {
    async fn send_invitation(&self, request: &InvitationRequest) -> InvitationOutcome {
        self.send(request).await
    }
}
