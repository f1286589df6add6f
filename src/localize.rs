use std::path::PathBuf;

use serde_json::Value;
use url::Url;

use crate::http::HttpClient;
use crate::layout::Layout;
use crate::metrics;

/// Substring that marks a string value as a candidate asset reference, per
/// the upstream's own asset host naming.
const ASSET_HOST: &str = "invisionapp.com";

/// Depth-first, bottom-up rewrite of an upstream JSON payload: every string
/// field pointing at an asset on `ASSET_HOST` is downloaded (if not already
/// present) and replaced with the file's local path, rooted at `/`.
///
/// Rebuilds the tree from the leaves up rather than mutating in place, so
/// there is no aliasing hazard while a node's own children are still being
/// rewritten underneath it.
pub async fn localise(
    client: &HttpClient,
    layout: &Layout,
    value: Value,
    project_id: &str,
    screen_id: Option<&str>,
) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, child) in map {
                let rewritten = if let Value::String(ref s) = child {
                    match rewrite_asset(client, layout, s, project_id, screen_id).await {
                        Some(local_path) => Value::String(local_path),
                        None => child,
                    }
                } else {
                    Box::pin(localise(client, layout, child, project_id, screen_id)).await
                };
                out.insert(key, rewritten);
            }
            Value::Object(out)
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(Box::pin(localise(client, layout, item, project_id, screen_id)).await);
            }
            Value::Array(out)
        }
        other => other,
    }
}

/// Returns `Some(local_path)` if `candidate` is an asset reference and the
/// destination file is present on disk (downloaded just now, or already
/// mirrored from a previous run). Returns `None` for any non-asset string,
/// leaving the original value untouched.
async fn rewrite_asset(
    client: &HttpClient,
    layout: &Layout,
    candidate: &str,
    project_id: &str,
    screen_id: Option<&str>,
) -> Option<String> {
    if !candidate.contains(ASSET_HOST) {
        return None;
    }
    let mut url = Url::parse(candidate).ok()?;
    if url.host_str().is_none() || url.scheme().is_empty() {
        return None;
    }
    url.set_query(None);

    let path_after_host = url.path().trim_start_matches('/');
    let (dir_name, file_name) = match path_after_host.rsplit_once('/') {
        Some((dir, file)) => (dir, file),
        None => ("", path_after_host),
    };
    if file_name.is_empty() {
        return None;
    }

    let destination = classify(layout, dir_name, file_name, project_id, screen_id);

    if !destination.exists() {
        let bytes = client.get_bytes(candidate).await;
        let Some(bytes) = bytes else {
            metrics::record_asset(false);
            return None;
        };
        if let Err(err) = layout.write_bytes(&destination, &bytes) {
            tracing::error!(error = %err, path = %destination.display(), "failed to write asset");
            return None;
        }
        metrics::record_asset(true);
    } else {
        metrics::record_asset(false);
    }

    let relative = destination.strip_prefix(layout.docs_root()).ok()?;
    Some(format!("/{}", relative.display()))
}

fn classify(
    layout: &Layout,
    dir_name: &str,
    file_name: &str,
    project_id: &str,
    screen_id: Option<&str>,
) -> PathBuf {
    if dir_name.contains("avatars") {
        return layout.avatars_dir().join(file_name);
    }

    if dir_name.contains("versions/files") {
        let sid = screen_id.unwrap_or_default();
        return layout.versions_dir(project_id, sid).join(file_name);
    }

    if dir_name.contains("screens/thumbnails") || dir_name.contains("screens/files") {
        let (stem, ext) = match file_name.rsplit_once('.') {
            Some((stem, ext)) => (stem, ext),
            None => (file_name, ""),
        };
        let kind = if dir_name.contains("thumbnails") {
            "thumbnail"
        } else {
            "image"
        };
        let name = if ext.is_empty() {
            kind.to_string()
        } else {
            format!("{kind}.{ext}")
        };
        return layout.screen_dir(project_id, stem).join(name);
    }

    layout.project_assets_dir(project_id, dir_name).join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_avatar() {
        let layout = Layout::new("/docs");
        let path = classify(&layout, "d3rdcoxmfv6hy9.cloudfront.net/avatars", "a.png", "p1", None);
        assert_eq!(path, layout.avatars_dir().join("a.png"));
    }

    #[test]
    fn classify_thumbnail_normalises_name() {
        let layout = Layout::new("/docs");
        let path = classify(&layout, "screens/thumbnails", "abc123.png", "p1", None);
        assert_eq!(path, layout.screen_dir("p1", "abc123").join("thumbnail.png"));
    }

    #[test]
    fn classify_screen_file_normalises_name() {
        let layout = Layout::new("/docs");
        let path = classify(&layout, "screens/files", "abc123.jpg", "p1", None);
        assert_eq!(path, layout.screen_dir("p1", "abc123").join("image.jpg"));
    }

    #[test]
    fn classify_versions_uses_screen_id() {
        let layout = Layout::new("/docs");
        let path = classify(&layout, "versions/files", "v9.png", "p1", Some("s1"));
        assert_eq!(path, layout.versions_dir("p1", "s1").join("v9.png"));
    }

    #[test]
    fn classify_other_falls_back_to_project_assets() {
        let layout = Layout::new("/docs");
        let path = classify(&layout, "misc", "file.bin", "p1", None);
        assert_eq!(path, layout.project_assets_dir("p1", "misc").join("file.bin"));
    }
}
