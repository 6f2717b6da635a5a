use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// `axum`-compatible error handler.
///
/// The status code carries the error taxonomy out to API callers:
/// 400 validation, 401 unauthenticated, 403 forbidden, 404 not found,
/// 500 store/internal. Anything converted from a bare `anyhow::Error`
/// is a store failure.
#[derive(Error)]
#[error("{status}: {err:?}")]
pub struct Error {
    status: StatusCode,
    err: anyhow::Error,
}

impl Error {
    /// Invalid input. Reported synchronously, before anything is persisted.
    pub fn validation(problems: impl IntoIterator<Item = String>) -> Self {
        let problems: Vec<String> = problems.into_iter().collect();
        Self::with_status(
            StatusCode::BAD_REQUEST,
            anyhow::anyhow!("validation failed: {}", problems.join("; ")),
        )
    }

    /// The target entity no longer exists. Callers should refresh and retry.
    pub fn not_found(what: &str) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, anyhow::anyhow!("{what} not found"))
    }

    /// No resolved session. Listing without a role is an error, not an
    /// empty result.
    pub fn unauthenticated(err: impl Into<anyhow::Error>) -> Self {
        Self::with_status(StatusCode::UNAUTHORIZED, err)
    }

    /// The actor's role or store scope denies the requested action. Raised
    /// before any store mutation is attempted.
    pub fn forbidden(msg: &str) -> Self {
        Self::with_status(StatusCode::FORBIDDEN, anyhow::anyhow!("{msg}"))
    }

    pub fn with_status(status: StatusCode, err: impl Into<anyhow::Error>) -> Self {
        Self {
            status,
            err: err.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            err,
        }
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.err.fmt(f)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        error!("{:?}", self.err);

        // N.B: Forward out the error message to the requester if this is a debug build.
        // This is insecure for production builds, so we'll return an empty body if this
        // is a release build.
        if cfg!(debug_assertions) {
            Response::builder()
                .status(self.status)
                .body(Body::new(format!("{:?}", self.err)))
                .unwrap()
        } else {
            Response::builder()
                .status(self.status)
                .body(Body::empty())
                .unwrap()
        }
    }
}
