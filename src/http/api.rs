use serde::Serialize;
use serde_json::Value;

use crate::http::{HttpClient, Method};

#[derive(Serialize)]
struct ExportBody<'a> {
    #[serde(rename = "boardID")]
    board_id: &'a str,
    projectid: &'a str,
    #[serde(rename = "preventHotspotHinting")]
    prevent_hotspot_hinting: &'a str,
    #[serde(rename = "preventBrowse")]
    prevent_browse: &'a str,
    #[serde(rename = "preventBranding")]
    prevent_branding: &'a str,
}

const BASE: &str = "https://projects.invisionapp.com";

/// Thin, stateless wrappers around every upstream endpoint the mirroring
/// engine needs. Each method returns the decoded JSON body, or `None` if the
/// underlying request ultimately failed (transient or permanent).
#[derive(Clone)]
pub struct ApiAdapter {
    client: HttpClient,
}

impl ApiAdapter {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Option<Value> {
        let response = self
            .client
            .request::<()>(Method::Get, url, Some(query), None)
            .await?;
        response.json::<Value>().await.ok()
    }

    pub async fn get_projects(&self, is_archived: bool) -> Option<Vec<Value>> {
        let url = format!("{BASE}/api:unifiedprojects.getProjects");
        let is_archived = if is_archived { "true" } else { "" };
        let body = self
            .get_json(&url, &[("isArchived", is_archived), ("isCollaborator", "")])
            .await?;
        body.get("results")?.as_array().cloned()
    }

    pub async fn get_tags(&self) -> Option<Vec<Value>> {
        let url = format!("{BASE}/api:unifiedprojects.getTags");
        let body = self.get_json(&url, &[]).await?;
        body.get("tags")?.as_array().cloned()
    }

    pub async fn get_project_screens(&self, project_id: &str) -> Option<Value> {
        let url = format!("{BASE}/api:desktop_partials.projectScreens2Grouped");
        self.get_json(&url, &[("id", project_id)]).await
    }

    pub async fn get_project_archived_screens(&self, project_id: &str) -> Option<Value> {
        let url = format!("{BASE}/api:desktop_partials.projectScreens2Archived");
        self.get_json(&url, &[("id", project_id)]).await
    }

    pub async fn get_project_shares(&self, project_id: &str) -> Option<Value> {
        let url = format!("{BASE}/api:project_shares_tab_partials.getView");
        self.get_json(&url, &[("prototypeID", project_id)]).await
    }

    pub async fn get_project_assets(&self, project_id: &str) -> Option<Value> {
        let url = format!("{BASE}/api:inspect.getProjectAssets");
        self.get_json(&url, &[("projectID", project_id)]).await
    }

    /// Picks the live vs. archived screen-details endpoint based on the
    /// screen's archived state, as archived screens have no inspect/history.
    pub async fn get_screen_details(&self, screen_id: &str, is_archived: bool) -> Option<Value> {
        let url = if is_archived {
            format!("{BASE}/api:desktop_partials/screenQuickView")
        } else {
            format!("{BASE}/api:desktop_partials.consoleScreen")
        };
        let query: &[(&str, &str)] = if is_archived {
            &[("screenID", screen_id)]
        } else {
            &[("screenID", screen_id), ("trigger", "initial-load")]
        };
        self.get_json(&url, query).await
    }

    pub async fn get_screen_inspect(&self, screen_id: &str) -> Option<Value> {
        let url = format!("{BASE}/api:inspect.getExtractionJSON");
        self.get_json(&url, &[("id", screen_id)]).await
    }

    pub async fn get_screen_history(&self, screen_id: &str) -> Option<Value> {
        let url = format!("{BASE}/api:desktop_partials/screenHistory");
        self.get_json(&url, &[("screenID", screen_id)]).await
    }

    /// Requests a one-time ZIP export link for a prototype or board project.
    /// The upstream returns an HTML fragment containing a download anchor;
    /// its `href` is the export link. Never persisted to the archive.
    pub async fn export_project(&self, project: &Value, user_id: &str) -> Option<String> {
        let project_id = project.get("id")?.as_str()?;
        let project_type = project.get("type")?.as_str()?;

        let url = match project_type {
            "prototype" => format!(
                "{BASE}/d/zipexport/generate/debugProjectID/{project_id}/debugUserID/{user_id}"
            ),
            "board" => format!("{BASE}/d/board_offline_zip_export/generate"),
            other => {
                tracing::warn!(project_type = other, "unknown project type for export");
                return None;
            }
        };

        let body = ExportBody {
            board_id: project_id,
            projectid: project_id,
            prevent_hotspot_hinting: "false",
            prevent_browse: "false",
            prevent_branding: "true",
        };
        let response = self
            .client
            .request_form(Method::Post, &url, None, Some(&body))
            .await?;
        let html = response.text().await.ok()?;

        let document = scraper::Html::parse_document(&html);
        let selector = if project_type == "prototype" {
            scraper::Selector::parse("a.button.export").ok()?
        } else {
            scraper::Selector::parse("a.download-box__button").ok()?
        };

        document
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr("href"))
            .map(str::to_string)
    }
}
