use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, patch};
use axum::Router;
use taskdeck_core::TaskGateway;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::routes::tasks;

/// Create the Axum router with the task API mounted under `/api`.
pub fn create_app(gateway: Arc<dyn TaskGateway>) -> Router {
    let task_routes = Router::new()
        .route("/", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/{id}",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/{id}/toggle", patch(tasks::toggle_task))
        .with_state(gateway);

    Router::new()
        .nest("/api/tasks", task_routes)
        .layer(TraceLayer::new_for_http())
}

/// Serve the stub on an already bound listener until the process ends.
pub async fn serve(listener: TcpListener, gateway: Arc<dyn TaskGateway>) -> std::io::Result<()> {
    let app = create_app(gateway);
    axum::serve(listener, app).await
}

/// A stub running on a background task.
pub struct RunningStub {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl RunningStub {
    /// Base URL for an HTTP gateway, e.g. `http://127.0.0.1:40321/api`.
    pub fn api_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }
}

impl Drop for RunningStub {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Bind an ephemeral local port and serve the stub on it in the background.
pub async fn spawn(gateway: Arc<dyn TaskGateway>) -> std::io::Result<RunningStub> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        if let Err(e) = serve(listener, gateway).await {
            tracing::error!(error = %e, "stub server stopped");
        }
    });
    tracing::debug!(%addr, "stub server listening");
    Ok(RunningStub { addr, handle })
}
