//! Read-only HTTP view of the container registry.
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::ToSocketAddrs;
use tokio_util::sync::CancellationToken;

use crate::container::ContainerID;
use crate::registry::Registry;

mod models;

pub use models::EndpointView;

async fn list_containers(State(registry): State<Arc<Registry>>) -> Response {
    Json(registry.containers()).into_response()
}

async fn get_container(
    State(registry): State<Arc<Registry>>,
    Path(raw_id): Path<String>,
) -> Response {
    let container_id = match ContainerID::new(&raw_id) {
        Ok(id) => id,
        Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    };

    match registry.container(&container_id) {
        Some(container) => Json(container).into_response(),
        None => (StatusCode::NOT_FOUND, "unknown container").into_response(),
    }
}

async fn list_endpoints(State(registry): State<Arc<Registry>>) -> Response {
    let endpoints: Vec<EndpointView> = registry
        .endpoints()
        .into_iter()
        .map(EndpointView::from)
        .collect();
    Json(endpoints).into_response()
}

pub struct APIServer {
    router: axum::Router,
}

impl APIServer {
    pub fn new(registry: Arc<Registry>) -> Self {
        let router = axum::Router::new()
            .route("/containers", get(list_containers))
            .route("/containers/{id}", get(get_container))
            .route("/endpoints", get(list_endpoints))
            .with_state(registry);
        Self { router }
    }

    /// Serves the API on `addr` until `token` is cancelled.
    pub async fn listen(
        self,
        addr: impl ToSocketAddrs,
        token: CancellationToken,
    ) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        log::info!("API listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await
    }
}
