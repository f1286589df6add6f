use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::config::{MirrorConfig, RunOption, ServeConfig};
use crate::http::HttpClient;
use crate::layout::Layout;
use crate::orchestrator::Orchestrator;

/// Cheap, hot-reloadable index over `projects/*/project.json`, rebuilt after
/// every successful `/scrape` run so `GET /projects` never walks the
/// filesystem on the request path. This is the one place in the service
/// ArcSwap is used: the Orchestrator's own source of truth stays the
/// filesystem, this is purely a read-side cache for the serving layer.
#[derive(Debug, Default)]
pub struct ProjectIndex {
    pub projects: Vec<Value>,
}

pub struct ServeState {
    pub layout: Layout,
    pub serve_config: ServeConfig,
    pub index: ArcSwap<ProjectIndex>,
    pub run_lock: Arc<Mutex<()>>,
    pub metrics_handle: PrometheusHandle,
    self_weak: Weak<ServeState>,
}

impl ServeState {
    /// Built via `Arc::new_cyclic` so a handler holding only `&ServeState`
    /// can still obtain an owned `Arc<ServeState>` to move into the
    /// background `/scrape` task that refreshes the project index on completion.
    pub fn new_shared(serve_config: ServeConfig, metrics_handle: PrometheusHandle) -> Arc<Self> {
        Arc::new_cyclic(|weak| {
            let layout = Layout::new(serve_config.docs_root.clone());
            let index = ArcSwap::from_pointee(build_index(&layout));
            Self {
                layout,
                serve_config,
                index,
                run_lock: Arc::new(Mutex::new(())),
                metrics_handle,
                self_weak: weak.clone(),
            }
        })
    }

    pub fn handle(&self) -> Arc<ServeState> {
        self.self_weak
            .upgrade()
            .expect("ServeState always outlives its own handlers")
    }

    pub fn refresh_index(&self) {
        self.index.store(Arc::new(build_index(&self.layout)));
    }

    /// Builds a one-shot `Orchestrator` + `MirrorConfig` pair for a triggered
    /// `/scrape` run, using the credentials the serving layer was started
    /// with. Returns `None` if no credentials were configured.
    pub fn mirror_config(&self, option: Option<RunOption>) -> Option<MirrorConfig> {
        Some(MirrorConfig {
            invision_email: self.serve_config.invision_email.clone()?,
            invision_password: self.serve_config.invision_password.clone()?,
            docs_root: self.serve_config.docs_root.clone(),
            test_mode: false,
            custom_ca_file: None,
            option,
            telemetry: self.serve_config.telemetry.clone(),
        })
    }

    pub fn new_orchestrator(&self) -> anyhow::Result<Orchestrator> {
        let client = HttpClient::new(None)?;
        Ok(Orchestrator::new(client, self.layout.clone()))
    }
}

fn build_index(layout: &Layout) -> ProjectIndex {
    let projects_dir = layout.docs_root().join("projects");
    let mut projects = Vec::new();

    let Ok(entries) = std::fs::read_dir(&projects_dir) else {
        return ProjectIndex::default();
    };
    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_dir() {
            continue;
        }
        let Some(project_id) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if let Some(project) = layout.read_json(&layout.project_json(&project_id)) {
            projects.push(project);
        }
    }

    ProjectIndex { projects }
}
