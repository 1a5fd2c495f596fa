use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use tracing::{info, warn};

use crate::{
    domain::invitation::{InvitationOutcome, InvitationRequest},
    infra::telemetry::INVITATIONS_TOTAL,
};

const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong, please try again later";

/// Anything able to deliver an invitation request to the invitation service.
#[async_trait]
pub trait InvitationSender: Send + Sync {
    async fn send_invitation(&self, request: &InvitationRequest) -> InvitationOutcome;
}

/// What the form page shows after a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionResult {
    Invited,
    Alert { message: String, email: String },
}

#[derive(Clone)]
pub struct InvitationService {
    sender: Arc<dyn InvitationSender>,
    expose_error_detail: bool,
}

impl InvitationService {
    pub fn new(sender: Arc<dyn InvitationSender>, expose_error_detail: bool) -> Self {
        Self {
            sender,
            expose_error_detail,
        }
    }

    pub async fn submit(&self, email: String) -> SubmissionResult {
        let request = InvitationRequest::new(email);
        let outcome = self.sender.send_invitation(&request).await;

        match outcome {
            InvitationOutcome::Success => {
                counter!(INVITATIONS_TOTAL, "outcome" => "success").increment(1);
                info!(target = "slack_invite::invitation", "invitation sent");
                SubmissionResult::Invited
            }
            InvitationOutcome::Failure(failure) => {
                counter!(INVITATIONS_TOTAL, "outcome" => failure.kind()).increment(1);
                let detail = failure.message();

                let message = if failure.is_internal() {
                    warn!(
                        target = "slack_invite::invitation",
                        kind = failure.kind(),
                        detail = %detail,
                        "invitation request failed"
                    );
                    if self.expose_error_detail {
                        detail
                    } else {
                        GENERIC_FAILURE_MESSAGE.to_string()
                    }
                } else {
                    info!(
                        target = "slack_invite::invitation",
                        kind = failure.kind(),
                        detail = %detail,
                        "invitation rejected"
                    );
                    detail
                };

                SubmissionResult::Alert {
                    message,
                    email: request.email,
                }
            }
        }
    }
}
