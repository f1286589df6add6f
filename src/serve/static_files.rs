use std::path::{Component, Path};

use xitca_web::handler::params::Params;
use xitca_web::handler::state::StateRef;
use xitca_web::http::{Response, StatusCode, header};

use crate::error::ServeError;

use super::state::ServeState;

/// Serves any file under `DOCS_ROOT` by its relative path, the Rust-native
/// analogue of the original's Flask `static_folder` mount: images,
/// thumbnails, and version files all live under the same root the JSON
/// layer reads from.
pub async fn serve_static(
    Params(path): Params<String>,
    StateRef(state): StateRef<'_, ServeState>,
) -> Result<Response<Vec<u8>>, ServeError> {
    let relative = Path::new(&path);
    if relative
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
    {
        return Err(ServeError::PathTraversal(path));
    }

    let full_path = state.layout.docs_root().join(relative);
    let bytes = std::fs::read(&full_path).map_err(|_| ServeError::FileNotFound(path.clone()))?;
    let mime = mime_guess::from_path(&full_path).first_or_octet_stream();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime.as_ref())
        .body(bytes)
        .map_err(|err| ServeError::ArchiveUnreadable(err.to_string()))
}
