use axum::{
    http::{StatusCode, header::CONTENT_TYPE},
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use tera::Context;

use crate::application::{
    error::{ErrorReport, HttpError},
    invitation::SubmissionResult,
};

use super::pages::{PageTemplate, RenderOutcome};

/// Data handed to `slack.html`. Keys keep the capitalised names the templates use.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SlackFormView {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl From<SubmissionResult> for SlackFormView {
    fn from(result: SubmissionResult) -> Self {
        match result {
            SubmissionResult::Invited => Self {
                success: true,
                ..Self::default()
            },
            SubmissionResult::Alert { message, email } => Self {
                success: false,
                alert: Some(message),
                email: Some(email),
            },
        }
    }
}

impl SlackFormView {
    pub fn context(&self) -> Result<Context, tera::Error> {
        Context::from_serialize(self)
    }
}

/// Render `page` into an HTTP response.
pub fn render_page_response(page: &PageTemplate, data: Option<&Context>) -> Response {
    let mut body = Vec::new();
    match page.render(data, &mut body) {
        Ok(RenderOutcome::Page) => (StatusCode::OK, Html(body)).into_response(),
        Ok(RenderOutcome::CompileError) => {
            let mut response = (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(CONTENT_TYPE, "text/plain; charset=utf-8")],
                body,
            )
                .into_response();
            ErrorReport::from_message(
                "presentation::views::render_page_response",
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("page `{}` failed to compile", page.name()),
            )
            .attach(&mut response);
            response
        }
        Ok(RenderOutcome::Skipped) => {
            let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
            ErrorReport::from_message(
                "presentation::views::render_page_response",
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("page `{}` is unavailable after a failed compilation", page.name()),
            )
            .attach(&mut response);
            response
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

/// Render the form page with the outcome of a submission.
pub fn render_slack_form(page: &PageTemplate, view: &SlackFormView) -> Response {
    match view.context() {
        Ok(context) => render_page_response(page, Some(&context)),
        Err(err) => HttpError::from_error(
            "presentation::views::render_slack_form",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Template rendering failed",
            &err,
        )
        .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_view_serializes_only_success() {
        let view = SlackFormView::from(SubmissionResult::Invited);
        let value = serde_json::to_value(&view).expect("serialize");
        assert_eq!(value, serde_json::json!({ "Success": true }));
    }

    #[test]
    fn alert_view_keeps_message_and_email() {
        let view = SlackFormView::from(SubmissionResult::Alert {
            message: "Invalid email address".to_string(),
            email: "test@example.com".to_string(),
        });
        let value = serde_json::to_value(&view).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({ "Alert": "Invalid email address", "Email": "test@example.com" })
        );
    }
}
