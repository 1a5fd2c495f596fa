use std::time::Duration;

use axum::http::StatusCode;
use httpmock::MockServer;
use secrecy::SecretString;
use serde_json::json;
use url::Url;

use slack_invite::config::SlackSettings;
use slack_invite::domain::invitation::{
    InvitationFailure, InvitationOutcome, InvitationRequest, SlackErrorCode,
};
use slack_invite::infra::slack::SlackInviteClient;

const INVITE_PATH: &str = "/api/users.admin.invite";

fn settings(api_url: &str, timeout: Duration) -> SlackSettings {
    SlackSettings {
        api_url: Url::parse(api_url).expect("valid url"),
        token: SecretString::from("xoxp-secret".to_string()),
        timeout,
        expose_error_detail: true,
    }
}

fn client(server: &MockServer) -> SlackInviteClient {
    SlackInviteClient::new(&settings(&server.url(INVITE_PATH), Duration::from_secs(5)))
        .expect("client")
}

#[tokio::test]
async fn sends_email_token_and_activation_flag() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method("POST")
                .path(INVITE_PATH)
                .query_param("email", "new@example.com")
                .query_param("token", "xoxp-secret")
                .query_param("set_active", "true");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "ok": true }));
        })
        .await;

    let outcome = client(&server)
        .send(&InvitationRequest::new("new@example.com"))
        .await;

    mock.assert_async().await;
    assert_eq!(outcome, InvitationOutcome::Success);
}

#[tokio::test]
async fn ok_true_wins_over_error_field() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("POST").path(INVITE_PATH);
            then.status(200)
                .json_body(json!({ "ok": true, "error": "already_invited" }));
        })
        .await;

    let outcome = client(&server)
        .send(&InvitationRequest::new("a@example.com"))
        .await;
    assert_eq!(outcome, InvitationOutcome::Success);
}

#[tokio::test]
async fn rejection_codes_are_translated() {
    let cases = [
        ("already_invited", "User has already received an email invitation"),
        ("already_in_team", "User is already part of the team"),
        ("invalid_email", "Invalid email address"),
        ("not_allowed", "Not allowed, SSO is enabled"),
        ("team_is_full", "Unknown error: team_is_full"),
    ];

    for (code, expected) in cases {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("POST").path(INVITE_PATH);
                then.status(200).json_body(json!({ "ok": false, "error": code }));
            })
            .await;

        let outcome = client(&server)
            .send(&InvitationRequest::new("a@example.com"))
            .await;
        assert_eq!(
            outcome,
            InvitationOutcome::Failure(InvitationFailure::Rejected(SlackErrorCode::from(code)))
        );
        assert_eq!(outcome.failure_message().as_deref(), Some(expected));
    }
}

#[tokio::test]
async fn non_200_status_reports_status_text() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("POST").path(INVITE_PATH);
            then.status(500).body("boom");
        })
        .await;

    let outcome = client(&server)
        .send(&InvitationRequest::new("a@example.com"))
        .await;
    assert_eq!(
        outcome,
        InvitationOutcome::Failure(InvitationFailure::Status(
            StatusCode::INTERNAL_SERVER_ERROR
        ))
    );
    assert_eq!(
        outcome.failure_message().as_deref(),
        Some("Something went wrong: 500 Internal Server Error")
    );
}

#[tokio::test]
async fn unregistered_status_reports_bare_code() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("POST").path(INVITE_PATH);
            then.status(599);
        })
        .await;

    let outcome = client(&server)
        .send(&InvitationRequest::new("a@example.com"))
        .await;
    assert_eq!(
        outcome.failure_message().as_deref(),
        Some("Something went wrong: 599")
    );
}

#[tokio::test]
async fn malformed_body_reports_parse_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("POST").path(INVITE_PATH);
            then.status(200).body("<html>not json</html>");
        })
        .await;

    let outcome = client(&server)
        .send(&InvitationRequest::new("a@example.com"))
        .await;
    let expected = serde_json::from_str::<serde_json::Value>("<html>not json</html>")
        .expect_err("invalid json")
        .to_string();
    assert_eq!(
        outcome,
        InvitationOutcome::Failure(InvitationFailure::Decode(expected))
    );
}

#[tokio::test]
async fn unreachable_service_is_a_transport_failure() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };
    let client = SlackInviteClient::new(&settings(
        &format!("http://127.0.0.1:{port}{INVITE_PATH}"),
        Duration::from_secs(5),
    ))
    .expect("client");

    for _ in 0..3 {
        let outcome = client.send(&InvitationRequest::new("a@example.com")).await;
        match outcome {
            InvitationOutcome::Failure(InvitationFailure::Transport(detail)) => {
                assert!(!detail.is_empty());
                assert!(!detail.contains("xoxp-secret"), "token leaked: {detail}");
            }
            other => panic!("expected transport failure, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn slow_service_times_out_as_transport_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("POST").path(INVITE_PATH);
            then.status(200)
                .delay(Duration::from_secs(3))
                .json_body(json!({ "ok": true }));
        })
        .await;

    let client = SlackInviteClient::new(&settings(
        &server.url(INVITE_PATH),
        Duration::from_millis(200),
    ))
    .expect("client");

    let outcome = client.send(&InvitationRequest::new("a@example.com")).await;
    assert!(
        matches!(
            outcome,
            InvitationOutcome::Failure(InvitationFailure::Transport(_))
        ),
        "unexpected outcome: {outcome:?}"
    );
}
