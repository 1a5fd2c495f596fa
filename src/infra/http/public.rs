use std::{path::PathBuf, sync::Arc};

use axum::{
    Form, Router,
    extract::{
        Query, State,
        rejection::{FormRejection, QueryRejection},
    },
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::debug;

use crate::{
    application::{error::ErrorReport, invitation::InvitationService},
    infra::assets::serve_static,
    presentation::{
        pages::Pages,
        views::{SlackFormView, render_page_response, render_slack_form},
    },
};

use super::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub invitations: Arc<InvitationService>,
    pub pages: Arc<Pages>,
    pub static_dir: Arc<PathBuf>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/slack", get(slack_form).post(slack_submit))
        .route("/static/{*path}", get(serve_static))
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

/// Submitted form fields. Body values take precedence over query-string values and a
/// missing field is read as the empty string.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InviteForm {
    #[serde(rename = "Email")]
    email: Option<String>,
}

impl InviteForm {
    fn lenient(extracted: Result<Self, impl std::fmt::Display>) -> Self {
        match extracted {
            Ok(form) => form,
            Err(rejection) => {
                debug!(reason = %rejection, "ignoring unreadable invitation form input");
                Self::default()
            }
        }
    }

    fn email(body: Self, query: Self) -> String {
        body.email.or(query.email).unwrap_or_default()
    }
}

async fn home(State(state): State<HttpState>) -> Response {
    render_page_response(&state.pages.home, None)
}

async fn slack_form(State(state): State<HttpState>) -> Response {
    render_page_response(&state.pages.slack, None)
}

async fn slack_submit(
    State(state): State<HttpState>,
    query: Result<Query<InviteForm>, QueryRejection>,
    body: Result<Form<InviteForm>, FormRejection>,
) -> Response {
    let query = InviteForm::lenient(query.map(|Query(form)| form));
    let body = InviteForm::lenient(body.map(|Form(form)| form));
    let result = state.invitations.submit(InviteForm::email(body, query)).await;
    render_slack_form(&state.pages.slack, &SlackFormView::from(result))
}

async fn not_found() -> Response {
    let mut response = (StatusCode::NOT_FOUND, "Not found").into_response();
    ErrorReport::from_message(
        "infra::http::public::not_found",
        StatusCode::NOT_FOUND,
        "No route matched",
    )
    .attach(&mut response);
    response
}
