use std::convert::Infallible;

use thiserror::Error;
use xitca_web::{
    WebContext,
    error::Error,
    handler::Responder,
    http::{StatusCode, WebResponse},
    service::Service,
};

/// Fatal errors that abort a mirroring run before or during traversal.
///
/// Corresponds to error kinds 1 and 2 of the error handling design: configuration
/// errors and authentication failures. Every other failure kind (transient/permanent
/// fetch failure, local I/O failure, decode failure) is absorbed per-project or
/// per-screen and never surfaces here.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("authentication failed: {0}")]
    Authentication(String),
}

/// Errors returned by the read-only serving layer, mapped to HTTP status codes.
///
/// Grounded in the teacher's `GetError`: one variant per failure mode, a `Display`
/// impl supplying the body, and a `Service<WebContext>` impl choosing the status.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("project not found: '{0}'")]
    ProjectNotFound(String),
    #[error("screen not found: '{0}'")]
    ScreenNotFound(String),
    #[error("file not found: '{0}'")]
    FileNotFound(String),
    #[error("refusing to serve path outside the archive: '{0}'")]
    PathTraversal(String),
    #[error("archive is not readable: {0}")]
    ArchiveUnreadable(String),
    #[error("a mirroring run is already in progress")]
    RunInProgress,
    #[error("invalid request: {0}")]
    BadRequest(String),
}

impl From<ServeError> for Error {
    fn from(e: ServeError) -> Self {
        Error::from_service(e)
    }
}

impl<'r, C> Service<WebContext<'r, C>> for ServeError {
    type Response = WebResponse;
    type Error = Infallible;

    async fn call(&self, ctx: WebContext<'r, C>) -> Result<Self::Response, Self::Error> {
        let status = match self {
            ServeError::ProjectNotFound(_) => StatusCode::NOT_FOUND,
            ServeError::ScreenNotFound(_) => StatusCode::NOT_FOUND,
            ServeError::FileNotFound(_) => StatusCode::NOT_FOUND,
            ServeError::PathTraversal(_) => StatusCode::FORBIDDEN,
            ServeError::ArchiveUnreadable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServeError::RunInProgress => StatusCode::CONFLICT,
            ServeError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        (self.to_string(), status)
            .respond(ctx)
            .await
            .map_err(|_| unreachable!())
    }
}
