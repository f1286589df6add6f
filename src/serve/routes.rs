use std::time::Instant;

use serde_json::{Value, json};
use xitca_web::handler::json::Json;
use xitca_web::handler::params::Params;
use xitca_web::handler::state::StateRef;

use crate::config::RunOption;
use crate::error::ServeError;
use crate::metrics;

use super::state::ServeState;

pub async fn live() -> &'static str {
    "OK"
}

pub async fn list_projects(StateRef(state): StateRef<'_, ServeState>) -> Json<Value> {
    let start = Instant::now();
    let index = state.index.load();
    let tags = state.layout.read_json(&state.layout.tags_json());
    let body = json!({ "projects": index.projects, "tags": tags });
    metrics::record_request("GET", "/projects", 200, start.elapsed());
    Json(body)
}

pub async fn get_project(
    Params(project_id): Params<String>,
    StateRef(state): StateRef<'_, ServeState>,
) -> Result<Json<Value>, ServeError> {
    let start = Instant::now();
    let path = state.layout.project_json(&project_id);
    let value = state
        .layout
        .read_json(&path)
        .ok_or_else(|| ServeError::ProjectNotFound(project_id.clone()))?;
    metrics::record_request("GET", "/projects/:pid", 200, start.elapsed());
    Ok(Json(value))
}

pub async fn get_project_screens(
    Params(project_id): Params<String>,
    StateRef(state): StateRef<'_, ServeState>,
) -> Result<Json<Value>, ServeError> {
    let start = Instant::now();
    let path = state.layout.screens_json(&project_id);
    let value = state
        .layout
        .read_json(&path)
        .ok_or_else(|| ServeError::ProjectNotFound(project_id.clone()))?;
    metrics::record_request("GET", "/projects/:pid/screens", 200, start.elapsed());
    Ok(Json(value))
}

pub async fn get_screen(
    Params((project_id, screen_id)): Params<(String, String)>,
    StateRef(state): StateRef<'_, ServeState>,
) -> Result<Json<Value>, ServeError> {
    let start = Instant::now();
    let path = state.layout.screen_json(&project_id, &screen_id);
    let mut value = state
        .layout
        .read_json(&path)
        .ok_or_else(|| ServeError::ScreenNotFound(screen_id.clone()))?;

    if let Some(inspect) = state
        .layout
        .read_json(&state.layout.inspect_json(&project_id, &screen_id))
    {
        if let Some(obj) = value.as_object_mut() {
            obj.insert("inspect".to_string(), inspect);
        }
    }
    if let Some(history) = state
        .layout
        .read_json(&state.layout.history_json(&project_id, &screen_id))
    {
        if let Some(obj) = value.as_object_mut() {
            obj.insert("history".to_string(), history);
        }
    }

    metrics::record_request("GET", "/projects/:pid/screens/:sid", 200, start.elapsed());
    Ok(Json(value))
}

pub async fn metrics_handler(StateRef(state): StateRef<'_, ServeState>) -> String {
    state.metrics_handle.render()
}

/// Triggers an Orchestrator run in the background, guarded by a single-flight
/// async mutex so a `/scrape` call arriving mid-run returns immediately
/// instead of queueing behind it.
pub async fn scrape(StateRef(state): StateRef<'_, ServeState>) -> Result<Json<Value>, ServeError> {
    run_scrape(state, None).await
}

pub async fn scrape_with_option(
    Params(option): Params<String>,
    StateRef(state): StateRef<'_, ServeState>,
) -> Result<Json<Value>, ServeError> {
    let option = match option.as_str() {
        "overwrite" => RunOption::Overwrite,
        "update" => RunOption::Update,
        other => {
            return Err(ServeError::BadRequest(format!(
                "unknown scrape option '{other}'"
            )));
        }
    };
    run_scrape(state, Some(option)).await
}

async fn run_scrape(state: &ServeState, option: Option<RunOption>) -> Result<Json<Value>, ServeError> {
    let Some(mirror_config) = state.mirror_config(option) else {
        return Err(ServeError::BadRequest(
            "serving layer was started without INVISION_EMAIL/INVISION_PASSWORD".to_string(),
        ));
    };

    let lock = state.run_lock.clone();
    let Ok(guard) = lock.try_lock_owned() else {
        return Err(ServeError::RunInProgress);
    };

    let orchestrator = state
        .new_orchestrator()
        .map_err(|err| ServeError::ArchiveUnreadable(err.to_string()))?;
    let state_handle = state.handle();

    tokio::spawn(async move {
        let _guard = guard;
        match orchestrator.run(&mirror_config).await {
            Ok(summary) => {
                tracing::info!(
                    successful = summary.successful,
                    ignored = summary.ignored,
                    failed = summary.failed,
                    "triggered scrape run finished"
                );
                state_handle.refresh_index();
            }
            Err(err) => {
                tracing::error!(error = %err, "triggered scrape run failed");
            }
        }
    });

    Ok(Json(json!({ "message": "scrape started" })))
}
