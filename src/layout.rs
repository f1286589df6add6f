use std::path::{Path, PathBuf};

use serde_json::Value;

/// Deterministic path scheme rooted at `DOCS_ROOT`, and the only component
/// allowed to write to it during a run.
#[derive(Debug, Clone)]
pub struct Layout {
    docs_root: PathBuf,
}

impl Layout {
    pub fn new(docs_root: impl Into<PathBuf>) -> Self {
        Self {
            docs_root: docs_root.into(),
        }
    }

    pub fn docs_root(&self) -> &Path {
        &self.docs_root
    }

    pub fn common_dir(&self) -> PathBuf {
        self.docs_root.join("common")
    }

    pub fn avatars_dir(&self) -> PathBuf {
        self.common_dir().join("avatars")
    }

    pub fn tags_json(&self) -> PathBuf {
        self.common_dir().join("tags.json")
    }

    pub fn project_dir(&self, project_id: &str) -> PathBuf {
        self.docs_root.join("projects").join(project_id)
    }

    pub fn project_json(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join("project.json")
    }

    pub fn screens_json(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join("screens.json")
    }

    pub fn shares_json(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join("shares.json")
    }

    pub fn project_assets_dir(&self, project_id: &str, dir_name: &str) -> PathBuf {
        self.project_dir(project_id).join("assets").join(dir_name)
    }

    pub fn screen_dir(&self, project_id: &str, screen_id: &str) -> PathBuf {
        self.project_dir(project_id).join("screens").join(screen_id)
    }

    pub fn screen_json(&self, project_id: &str, screen_id: &str) -> PathBuf {
        self.screen_dir(project_id, screen_id).join("screen.json")
    }

    pub fn inspect_json(&self, project_id: &str, screen_id: &str) -> PathBuf {
        self.screen_dir(project_id, screen_id).join("inspect.json")
    }

    pub fn history_json(&self, project_id: &str, screen_id: &str) -> PathBuf {
        self.screen_dir(project_id, screen_id).join("history.json")
    }

    pub fn versions_dir(&self, project_id: &str, screen_id: &str) -> PathBuf {
        self.screen_dir(project_id, screen_id).join("versions")
    }

    /// Returns the screen directory entry stem for `image.*`/`thumbnail.*`,
    /// regardless of which extension was actually persisted.
    pub fn find_named_file(&self, dir: &Path, stem: &str) -> Option<PathBuf> {
        let entries = std::fs::read_dir(dir).ok()?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.file_stem().and_then(|s| s.to_str()) == Some(stem) {
                return Some(path);
            }
        }
        None
    }

    pub fn ensure_dir(&self, dir: &Path) -> std::io::Result<()> {
        match std::fs::create_dir_all(dir) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Pretty-prints `value` with 4-space indent and writes it crash-safely:
    /// the document is written to a sibling temp file, then renamed into
    /// place, so a process kill mid-write never leaves a truncated document.
    pub fn write_json(&self, path: &Path, value: &Value) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            self.ensure_dir(parent)?;
        }
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut buf = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        serde_json::Serialize::serialize(value, &mut serializer)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        self.write_bytes(path, &buf)
    }

    pub fn write_bytes(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            self.ensure_dir(parent)?;
        }
        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);
        std::fs::write(&tmp_path, bytes)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    pub fn read_json(&self, path: &Path) -> Option<Value> {
        let bytes = std::fs::read(path).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}
