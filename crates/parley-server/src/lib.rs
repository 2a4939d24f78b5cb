//! Parley supervisor library logic.
//!
//! Two independent pieces share this process: the [`supervisor`] loop that
//! keeps the worker process alive, and a static HTTP status surface that
//! answers regardless of what the worker is doing. They share no state.

pub mod config;
pub mod supervisor;

use axum::{body::Bytes, extract::State, response::Html, routing::get, Router};
use std::path::Path;
use tower_http::trace::TraceLayer;

/// Built-in landing page.
pub const DEFAULT_INDEX_HTML: &str = include_str!("../assets/index.html");

/// State for the status surface. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub index_html: Bytes,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            index_html: Bytes::from_static(DEFAULT_INDEX_HTML.as_bytes()),
        }
    }
}

impl AppState {
    /// Loads the landing page once. Without an override the built-in page is used.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if an override is configured but unreadable.
    pub fn load(index_path: Option<&Path>) -> std::io::Result<Self> {
        match index_path {
            Some(path) => Ok(Self {
                index_html: Bytes::from(std::fs::read(path)?),
            }),
            None => Ok(Self::default()),
        }
    }
}

/// Landing page handler.
async fn index(State(state): State<AppState>) -> Html<Bytes> {
    Html(state.index_html.clone())
}

/// Builds the status router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use std::io::Write;
    use tower::ServiceExt;

    #[tokio::test]
    async fn landing_page_is_served() {
        let response = app(AppState::default())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body, DEFAULT_INDEX_HTML.as_bytes());
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = app(AppState::default())
            .oneshot(
                Request::builder()
                    .uri("/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn index_override_is_loaded_once() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<h1>custom</h1>").unwrap();

        let state = AppState::load(Some(file.path())).unwrap();
        drop(file);

        let response = app(state)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body, "<h1>custom</h1>".as_bytes());
    }

    #[test]
    fn missing_index_override_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.html");
        assert!(AppState::load(Some(missing.as_path())).is_err());
    }
}
