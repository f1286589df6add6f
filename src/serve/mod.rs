mod routes;
mod state;
mod static_files;

pub use state::ServeState;

use tower_http::trace::TraceLayer;
use xitca_web::App;
use xitca_web::handler::handler_service;
use xitca_web::middleware::tower_http_compat::TowerHttpCompat;
use xitca_web::route::get;

use crate::config::ServeConfig;
use crate::metrics;
use crate::utils::error_handler;

/// Wires the read-only HTTP API over an already-populated archive, following
/// the same `App::new().with_state(...).at(...)` shape used for the
/// render-serving binaries.
pub async fn run(config: ServeConfig) -> anyhow::Result<()> {
    let metrics_handle = metrics::init_metrics();
    let state = ServeState::new_shared(config.clone(), metrics_handle);

    App::new()
        .with_state(state)
        .at("/live", get(handler_service(routes::live)))
        .at("/projects", get(handler_service(routes::list_projects)))
        .at("/projects/:project_id", get(handler_service(routes::get_project)))
        .at(
            "/projects/:project_id/screens",
            get(handler_service(routes::get_project_screens)),
        )
        .at(
            "/projects/:project_id/screens/:screen_id",
            get(handler_service(routes::get_screen)),
        )
        .at("/static/{*path}", get(handler_service(static_files::serve_static)))
        .at("/scrape", get(handler_service(routes::scrape)))
        .at("/scrape/:option", get(handler_service(routes::scrape_with_option)))
        .at("/metrics", get(handler_service(routes::metrics_handler)))
        .enclosed_fn(error_handler)
        .enclosed(TowerHttpCompat::new(TraceLayer::new_for_http()))
        .serve()
        .bind(&config.bind)?
        .run()
        .await
}
