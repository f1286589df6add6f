use xitca_web::{
    WebContext,
    error::{Error, MatchError},
    handler::{Responder, html::Html},
    http::{StatusCode, WebResponse},
    service::Service,
};

/// Middleware function that intercepts handler errors and actively generates
/// the HTTP response, rather than letting xitca-web's default formatting run.
pub async fn error_handler<S, C>(s: &S, mut ctx: WebContext<'_, C>) -> Result<WebResponse, Error>
where
    S: for<'r> Service<WebContext<'r, C>, Response = WebResponse, Error = Error>,
{
    match s.call(ctx.reborrow()).await {
        Ok(res) => Ok(res),
        Err(e) => {
            tracing::debug!("{e:?}");

            if e.upcast().downcast_ref::<MatchError>().is_some() {
                return (Html("<h1>404 Not Found</h1>"), StatusCode::NOT_FOUND)
                    .respond(ctx)
                    .await;
            }

            tracing::error!("{e}");
            Err(e)
        }
    }
}
