//! Domain types for Slack workspace invitations.

use std::fmt::{Display, Formatter};

use axum::http::StatusCode;
use serde::Deserialize;

/// A single request to invite an email address. Built per submission and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationRequest {
    pub email: String,
}

impl InvitationRequest {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }
}

/// Reply body of the `users.admin.invite` endpoint.
///
/// Both fields default when absent so a bare `{}` decodes as a rejection with an empty code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InviteApiResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Error vocabulary returned by Slack when `ok` is false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlackErrorCode {
    AlreadyInvited,
    AlreadyInTeam,
    ChannelNotFound,
    SentRecently,
    UserDisabled,
    MissingScope,
    InvalidEmail,
    NotAllowed,
    NotAllowedTokenType,
    Unknown(String),
}

impl SlackErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::AlreadyInvited => "already_invited",
            Self::AlreadyInTeam => "already_in_team",
            Self::ChannelNotFound => "channel_not_found",
            Self::SentRecently => "sent_recently",
            Self::UserDisabled => "user_disabled",
            Self::MissingScope => "missing_scope",
            Self::InvalidEmail => "invalid_email",
            Self::NotAllowed => "not_allowed",
            Self::NotAllowedTokenType => "not_allowed_token_type",
            Self::Unknown(code) => code.as_str(),
        }
    }

    /// Human-readable text shown to the visitor.
    pub fn message(&self) -> String {
        let text = match self {
            Self::AlreadyInvited => "User has already received an email invitation",
            Self::AlreadyInTeam => "User is already part of the team",
            Self::ChannelNotFound => "Provided channel ID does not match a real channel",
            Self::SentRecently => "Email has been sent recently already",
            Self::UserDisabled => "User account has been deactivated",
            Self::MissingScope => "Not authorized for 'client' scope",
            Self::InvalidEmail => "Invalid email address",
            Self::NotAllowed => "Not allowed, SSO is enabled",
            Self::NotAllowedTokenType => "Token type is invalid",
            Self::Unknown(code) => return format!("Unknown error: {code}"),
        };
        text.to_string()
    }
}

impl From<&str> for SlackErrorCode {
    fn from(value: &str) -> Self {
        match value {
            "already_invited" => Self::AlreadyInvited,
            "already_in_team" => Self::AlreadyInTeam,
            "channel_not_found" => Self::ChannelNotFound,
            "sent_recently" => Self::SentRecently,
            "user_disabled" => Self::UserDisabled,
            "missing_scope" => Self::MissingScope,
            "invalid_email" => Self::InvalidEmail,
            "not_allowed" => Self::NotAllowed,
            "not_allowed_token_type" => Self::NotAllowedTokenType,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl Display for SlackErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an invitation could not be issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvitationFailure {
    /// The request never produced a response (connect error, timeout).
    Transport(String),
    /// Slack answered with a status other than 200.
    Status(StatusCode),
    /// The response body was not the expected JSON shape.
    Decode(String),
    /// Slack processed the request and refused it.
    Rejected(SlackErrorCode),
}

impl InvitationFailure {
    pub fn message(&self) -> String {
        match self {
            Self::Transport(detail) | Self::Decode(detail) => detail.clone(),
            Self::Status(status) => match status.canonical_reason() {
                Some(reason) => format!("Something went wrong: {} {reason}", status.as_u16()),
                None => format!("Something went wrong: {}", status.as_u16()),
            },
            Self::Rejected(code) => code.message(),
        }
    }

    /// Failures caused by the server side of the exchange rather than by the visitor's input.
    pub fn is_internal(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }

    /// Label used for the outcome dimension of invitation metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Status(_) => "status",
            Self::Decode(_) => "decode",
            Self::Rejected(_) => "rejected",
        }
    }
}

impl Display for InvitationFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvitationOutcome {
    Success,
    Failure(InvitationFailure),
}

impl InvitationOutcome {
    pub fn failure_message(&self) -> Option<String> {
        match self {
            Self::Success => None,
            Self::Failure(failure) => Some(failure.message()),
        }
    }
}

impl From<InviteApiResponse> for InvitationOutcome {
    fn from(response: InviteApiResponse) -> Self {
        if response.ok {
            return Self::Success;
        }
        let code = SlackErrorCode::from(response.error.as_deref().unwrap_or_default());
        Self::Failure(InvitationFailure::Rejected(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &[(&str, &str)] = &[
        (
            "already_invited",
            "User has already received an email invitation",
        ),
        ("already_in_team", "User is already part of the team"),
        (
            "channel_not_found",
            "Provided channel ID does not match a real channel",
        ),
        ("sent_recently", "Email has been sent recently already"),
        ("user_disabled", "User account has been deactivated"),
        ("missing_scope", "Not authorized for 'client' scope"),
        ("invalid_email", "Invalid email address"),
        ("not_allowed", "Not allowed, SSO is enabled"),
        ("not_allowed_token_type", "Token type is invalid"),
    ];

    #[test]
    fn known_codes_map_to_their_messages() {
        for (code, message) in TABLE {
            let parsed = SlackErrorCode::from(*code);
            assert!(
                !matches!(parsed, SlackErrorCode::Unknown(_)),
                "{code} should be recognized"
            );
            assert_eq!(parsed.message(), *message);
            assert_eq!(parsed.as_str(), *code);
        }
    }

    #[test]
    fn unknown_codes_echo_the_code() {
        for code in ["ratelimited", "invalid_auth", "ALREADY_INVITED", ""] {
            let parsed = SlackErrorCode::from(code);
            assert_eq!(parsed, SlackErrorCode::Unknown(code.to_string()));
            assert_eq!(parsed.message(), format!("Unknown error: {code}"));
        }
    }

    #[test]
    fn ok_response_is_success_whatever_the_error_field() {
        let response = InviteApiResponse {
            ok: true,
            error: Some("already_invited".to_string()),
        };
        assert_eq!(InvitationOutcome::from(response), InvitationOutcome::Success);
    }

    #[test]
    fn rejected_response_carries_the_mapped_message() {
        let response: InviteApiResponse =
            serde_json::from_str(r#"{"ok":false,"error":"sent_recently"}"#).expect("decode");
        let outcome = InvitationOutcome::from(response);
        assert_eq!(
            outcome.failure_message().as_deref(),
            Some("Email has been sent recently already")
        );
    }

    #[test]
    fn empty_object_decodes_as_unknown_rejection() {
        let response: InviteApiResponse = serde_json::from_str("{}").expect("decode");
        let outcome = InvitationOutcome::from(response);
        assert_eq!(outcome.failure_message().as_deref(), Some("Unknown error: "));
    }

    #[test]
    fn status_failure_uses_canonical_status_text() {
        let failure = InvitationFailure::Status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            failure.message(),
            "Something went wrong: 500 Internal Server Error"
        );
        assert!(failure.is_internal());
        assert!(!InvitationFailure::Rejected(SlackErrorCode::InvalidEmail).is_internal());
    }

    #[test]
    fn unregistered_status_shows_bare_code() {
        let status = StatusCode::from_u16(599).expect("valid status code");
        assert_eq!(
            InvitationFailure::Status(status).message(),
            "Something went wrong: 599"
        );
    }
}
