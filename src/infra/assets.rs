//! Static asset serving from the configured directory.

use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use axum::{
    body::Body,
    extract::{Path as UrlPath, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use mime_guess::Mime;

use crate::application::error::ErrorReport;

use super::http::HttpState;

const SOURCE: &str = "infra::assets::serve_static";

/// Serve a file below the static directory; `/static/` has already been stripped by the route.
pub async fn serve_static(
    State(state): State<HttpState>,
    UrlPath(captured): UrlPath<String>,
) -> Response {
    let Some(relative) = sanitize(&captured) else {
        return not_found_response();
    };

    let full = state.static_dir.join(&relative);
    match tokio::fs::read(&full).await {
        Ok(contents) => {
            let mime = mime_guess::from_path(&relative).first_or_octet_stream();
            build_response(Bytes::from(contents), mime)
        }
        Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => {
            not_found_response()
        }
        Err(err) => {
            let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
            ErrorReport::from_error(SOURCE, StatusCode::INTERNAL_SERVER_ERROR, &err)
                .attach(&mut response);
            response
        }
    }
}

/// Turn the captured URL tail into a relative path, refusing traversal and directory listings.
fn sanitize(candidate: &str) -> Option<PathBuf> {
    let trimmed = candidate.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        return None;
    }

    let path = Path::new(trimmed);
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    (!clean.as_os_str().is_empty()).then_some(clean)
}

fn not_found_response() -> Response {
    let mut response = StatusCode::NOT_FOUND.into_response();
    ErrorReport::from_message(SOURCE, StatusCode::NOT_FOUND, "Static asset not found")
        .attach(&mut response);
    response
}

fn build_response(bytes: Bytes, mime: Mime) -> Response {
    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_accepts_nested_files() {
        assert_eq!(sanitize("css/site.css"), Some(PathBuf::from("css/site.css")));
        assert_eq!(sanitize("/logo.png"), Some(PathBuf::from("logo.png")));
        assert_eq!(sanitize("./a/./b.js"), Some(PathBuf::from("a/b.js")));
    }

    #[test]
    fn sanitize_rejects_traversal_and_directories() {
        assert_eq!(sanitize("../secret"), None);
        assert_eq!(sanitize("css/../../etc/passwd"), None);
        assert_eq!(sanitize("css/"), None);
        assert_eq!(sanitize(""), None);
        assert_eq!(sanitize("."), None);
    }
}
