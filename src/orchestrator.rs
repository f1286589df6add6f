use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde_json::{Value, json};

use crate::config::{MirrorConfig, RunOption};
use crate::error::MirrorError;
use crate::http::{ApiAdapter, HttpClient, auth};
use crate::layout::Layout;
use crate::localize;
use crate::metrics;
use crate::reconcile::{self, Outcome};

/// Run outcome of a single project: which of the three disjoint buckets it
/// landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectOutcome {
    Successful,
    Ignored,
    Failed,
}

/// Summary reported at the end of a run: three disjoint counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub successful: usize,
    pub ignored: usize,
    pub failed: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: ProjectOutcome) {
        match outcome {
            ProjectOutcome::Successful => self.successful += 1,
            ProjectOutcome::Ignored => self.ignored += 1,
            ProjectOutcome::Failed => self.failed += 1,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

pub struct Orchestrator {
    adapter: ApiAdapter,
    client: HttpClient,
    layout: Layout,
    localiser_concurrency: usize,
}

impl Orchestrator {
    pub fn new(client: HttpClient, layout: Layout) -> Self {
        let cpus = num_cpus::get();
        Self {
            adapter: ApiAdapter::new(client.clone()),
            client,
            layout,
            localiser_concurrency: cpus.min(5),
        }
    }

    /// Runs steps 1-8 of the pipeline to completion.
    pub async fn run(&self, config: &MirrorConfig) -> Result<RunSummary, MirrorError> {
        self.prepare_docs_root(config.option)?;

        auth::login(&self.client, &config.invision_email, &config.invision_password).await?;

        let mut projects = self.fetch_projects(config.test_mode).await?;
        self.apply_tags(&mut projects).await;

        let mut summary = RunSummary::default();
        for project in projects {
            let outcome = self.run_project(&project, config.option).await;
            summary.record(outcome);
            metrics::record_project_outcome(outcome_label(outcome));
        }

        tracing::info!(
            successful = summary.successful,
            ignored = summary.ignored,
            failed = summary.failed,
            "mirroring run complete"
        );
        Ok(summary)
    }

    /// Step 1: validates `option` against an existing, non-empty `docs_root`.
    fn prepare_docs_root(&self, option: Option<RunOption>) -> Result<(), MirrorError> {
        let root = self.layout.docs_root();
        let is_non_empty = root
            .read_dir()
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);

        if !is_non_empty {
            return Ok(());
        }

        match option {
            Some(RunOption::Overwrite) => {
                std::fs::remove_dir_all(root).map_err(|err| {
                    MirrorError::Configuration(format!("failed to remove docs_root: {err}"))
                })?;
                Ok(())
            }
            Some(RunOption::Update) => Ok(()),
            None => Err(MirrorError::Configuration(format!(
                "{} exists and is non-empty; pass --option overwrite|update",
                root.display()
            ))),
        }
    }

    /// Step 3: fetches live + archived projects, dedups in test mode, filters
    /// to `type == prototype`.
    async fn fetch_projects(&self, test_mode: bool) -> Result<Vec<Value>, MirrorError> {
        let live = self.adapter.get_projects(false).await.unwrap_or_default();
        let archived = self.adapter.get_projects(true).await.unwrap_or_default();

        let mut all: Vec<Value> = live.into_iter().chain(archived).collect();
        all.retain(|p| p.get("type").and_then(Value::as_str) == Some("prototype"));

        if test_mode {
            let mut seen_types = std::collections::HashSet::new();
            all.retain(|p| {
                let ty = p
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                seen_types.insert(ty)
            });
            tracing::info!(count = all.len(), "test mode: restricted project set");
        }

        Ok(all)
    }

    /// Step 4: persists `common/tags.json` and enriches each project's
    /// `data.tags` with every tag whose `prototypeIDs` contains its id.
    async fn apply_tags(&self, projects: &mut [Value]) {
        let tags = self.adapter.get_tags().await.unwrap_or_default();
        if let Err(err) = self
            .layout
            .write_json(&self.layout.tags_json(), &json!(tags))
        {
            tracing::error!(error = %err, "failed to write common/tags.json");
        }

        for project in projects.iter_mut() {
            let Some(project_id) = project.get("id").and_then(Value::as_str).map(str::to_string)
            else {
                continue;
            };
            let matching: Vec<Value> = tags
                .iter()
                .filter(|tag| {
                    tag.get("prototypeIDs")
                        .and_then(Value::as_array)
                        .map(|ids| {
                            ids.iter()
                                .any(|id| id.as_str() == Some(project_id.as_str()))
                        })
                        .unwrap_or(false)
                })
                .cloned()
                .collect();
            if let Some(data) = project.get_mut("data") {
                data.as_object_mut()
                    .map(|obj| obj.insert("tags".to_string(), json!(matching)));
            }
        }
    }

    async fn run_project(&self, project: &Value, option: Option<RunOption>) -> ProjectOutcome {
        let Some(project_id) = project.get("id").and_then(Value::as_str) else {
            return ProjectOutcome::Failed;
        };
        let is_archived = project
            .get("data")
            .and_then(|d| d.get("isArchived"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if option == Some(RunOption::Update) {
            match reconcile::project_freshness(&self.layout, project_id, project) {
                Outcome::Fresh => {
                    tracing::info!(project_id, "project up to date, skipping");
                    return ProjectOutcome::Ignored;
                }
                Outcome::Stale { remove_dir } => {
                    if remove_dir.exists() {
                        if let Err(err) = std::fs::remove_dir_all(&remove_dir) {
                            tracing::error!(project_id, error = %err, "failed to remove stale project dir");
                            return ProjectOutcome::Failed;
                        }
                    }
                }
                Outcome::Unreadable => {
                    tracing::warn!(project_id, "local project state unreadable, ignoring");
                    return ProjectOutcome::Ignored;
                }
            }
        }

        let localised_project =
            localize::localise(&self.client, &self.layout, project.clone(), project_id, None).await;
        if self
            .layout
            .write_json(&self.layout.project_json(project_id), &localised_project)
            .is_err()
        {
            return ProjectOutcome::Failed;
        }

        let shares = self.adapter.get_project_shares(project_id).await;
        if let Some(shares) = &shares {
            let local_shares = self.layout.read_json(&self.layout.shares_json(project_id));
            if local_shares.is_none() || reconcile::shares_changed(local_shares.as_ref(), shares) {
                let localised_shares =
                    localize::localise(&self.client, &self.layout, shares.clone(), project_id, None)
                        .await;
                let _ = self
                    .layout
                    .write_json(&self.layout.shares_json(project_id), &localised_shares);
            }
        }

        let old_screens_doc = self.layout.read_json(&self.layout.screens_json(project_id));

        let live_screens = self
            .adapter
            .get_project_screens(project_id)
            .await
            .unwrap_or(Value::Null);
        let archived_screens = self
            .adapter
            .get_project_archived_screens(project_id)
            .await
            .unwrap_or(Value::Null);

        let screens_doc = json!({ "live": live_screens, "archived": archived_screens });
        if self
            .layout
            .write_json(&self.layout.screens_json(project_id), &screens_doc)
            .is_err()
        {
            return ProjectOutcome::Failed;
        }

        if is_archived {
            return ProjectOutcome::Successful;
        }

        // Screen-level freshness (update mode only): a screen whose mutable
        // fields differ from the previous run's screens.json has its
        // directory removed so it gets refetched below.
        if option == Some(RunOption::Update) {
            if let Some(old_doc) = &old_screens_doc {
                let old_live = old_doc.get("live").cloned().unwrap_or(Value::Null);
                let old_archived = old_doc.get("archived").cloned().unwrap_or(Value::Null);
                for (list, archived, old_list) in [
                    (&live_screens, false, &old_live),
                    (&archived_screens, true, &old_archived),
                ] {
                    for screen in extract_screen_list(list) {
                        let Some(sid) = screen.get("id").and_then(Value::as_str) else {
                            continue;
                        };
                        if !reconcile::screen_freshness(old_list, &screen, archived) {
                            let dir = self.layout.screen_dir(project_id, sid);
                            if dir.exists() {
                                let _ = std::fs::remove_dir_all(&dir);
                            }
                        }
                    }
                }
            }
        }

        let live_list = extract_screen_list(&live_screens);
        let archived_list = extract_screen_list(&archived_screens);
        let expected = live_list.len() + archived_list.len();

        let mut tasks: Vec<(Value, bool)> = Vec::with_capacity(expected);
        tasks.extend(live_list.into_iter().map(|s| (s, false)));
        tasks.extend(archived_list.into_iter().map(|s| (s, true)));

        let succeeded = std::sync::atomic::AtomicUsize::new(0);
        let concurrency = self.localiser_concurrency.max(1);

        stream::iter(tasks.into_iter())
            .for_each_concurrent(concurrency, |(screen, archived)| {
                let succeeded = &succeeded;
                async move {
                    if self.run_screen(project_id, &screen, archived).await {
                        succeeded.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    }
                }
            })
            .await;

        if succeeded.load(std::sync::atomic::Ordering::Relaxed) == expected {
            ProjectOutcome::Successful
        } else {
            ProjectOutcome::Failed
        }
    }

    async fn run_screen(&self, project_id: &str, screen: &Value, is_archived: bool) -> bool {
        let Some(screen_id) = screen.get("id").and_then(Value::as_str).map(str::to_string) else {
            return false;
        };

        if reconcile::screen_is_complete(&self.layout, project_id, &screen_id, is_archived) {
            metrics::record_screen_outcome("successful");
            return true;
        }

        let screen_dir = self.layout.screen_dir(project_id, &screen_id);
        if screen_dir.exists() {
            if let Err(err) = std::fs::remove_dir_all(&screen_dir) {
                tracing::error!(project_id, screen_id = %screen_id, error = %err, "failed to remove stale screen dir");
                metrics::record_screen_outcome("failed");
                return false;
            }
        }

        let Some(details) = self.adapter.get_screen_details(&screen_id, is_archived).await else {
            metrics::record_screen_outcome("failed");
            return false;
        };
        let localised_details =
            localize::localise(&self.client, &self.layout, details, project_id, Some(&screen_id)).await;
        if self
            .layout
            .write_json(
                &self.layout.screen_json(project_id, &screen_id),
                &localised_details,
            )
            .is_err()
        {
            metrics::record_screen_outcome("failed");
            return false;
        }

        if is_archived {
            metrics::record_screen_outcome("successful");
            return true;
        }

        let Some(inspect) = self.adapter.get_screen_inspect(&screen_id).await else {
            metrics::record_screen_outcome("failed");
            return false;
        };
        let localised_inspect =
            localize::localise(&self.client, &self.layout, inspect, project_id, Some(&screen_id)).await;
        if self
            .layout
            .write_json(
                &self.layout.inspect_json(project_id, &screen_id),
                &localised_inspect,
            )
            .is_err()
        {
            metrics::record_screen_outcome("failed");
            return false;
        }

        let Some(history) = self.adapter.get_screen_history(&screen_id).await else {
            metrics::record_screen_outcome("failed");
            return false;
        };
        let localised_history =
            localize::localise(&self.client, &self.layout, history, project_id, Some(&screen_id)).await;
        if self
            .layout
            .write_json(
                &self.layout.history_json(project_id, &screen_id),
                &localised_history,
            )
            .is_err()
        {
            metrics::record_screen_outcome("failed");
            return false;
        }

        metrics::record_screen_outcome("successful");
        true
    }
}

fn extract_screen_list(doc: &Value) -> Vec<Value> {
    if let Some(array) = doc.as_array() {
        return array.clone();
    }
    doc.get("screens")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn outcome_label(outcome: ProjectOutcome) -> &'static str {
    match outcome {
        ProjectOutcome::Successful => "successful",
        ProjectOutcome::Ignored => "ignored",
        ProjectOutcome::Failed => "failed",
    }
}

/// Threads the config through an `Arc` for the serving layer's `/scrape`
/// endpoint, which owns a long-lived `Orchestrator` alongside its run lock.
pub type SharedOrchestrator = Arc<Orchestrator>;
