//! API server setup and lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use super::v0;
use crate::service::AlarmService;
use crate::tracing::prelude::*;

/// State handed to every handler.
#[derive(Clone)]
pub struct SharedState {
    pub service: Arc<AlarmService>,
}

impl SharedState {
    pub fn new(service: Arc<AlarmService>) -> Self {
        Self { service }
    }
}

#[derive(OpenApi)]
#[openapi(info(
    title = "gedder-alarm",
    description = "Alarm clock that wakes you up in time for the traffic"
))]
struct ApiDoc;

/// Build the full application router: `/api/v0` plus the Swagger UI.
pub fn router(state: SharedState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api/v0", v0::routes())
        .split_for_parts();

    router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API on `bind` until `running` is cancelled.
pub async fn serve(
    bind: SocketAddr,
    state: SharedState,
    running: CancellationToken,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind API server to {bind}"))?;
    info!(addr = %bind, "API server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { running.cancelled().await })
        .await?;

    trace!("API server stopped.");
    Ok(())
}
