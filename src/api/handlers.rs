use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;
use tracing::info;

use crate::core::{Registry, ServerInfo, Status};

use super::error::ApiError;

type Shared = State<Arc<Registry>>;

/// Success body of mutating routes.
#[derive(Debug, Serialize)]
pub(super) struct Message {
    message: String,
}

impl Message {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

pub(super) async fn status(State(registry): Shared) -> Json<Status> {
    Json(registry.status().await)
}

pub(super) async fn info(
    State(registry): Shared,
    Path(name): Path<String>,
) -> Result<Json<ServerInfo>, ApiError> {
    let info = registry.info(&name).await;
    info.map(Json).ok_or(ApiError::NotFound(name))
}

pub(super) async fn start(
    State(registry): Shared,
    Path(name): Path<String>,
) -> Result<Json<Message>, ApiError> {
    info!(server = %name, "api: start");
    registry.start(&name).await?;
    Ok(Message::new(format!("server {name} started")))
}

pub(super) async fn stop(
    State(registry): Shared,
    Path(name): Path<String>,
) -> Result<Json<Message>, ApiError> {
    info!(server = %name, "api: stop");
    registry.stop(&name).await?;
    Ok(Message::new(format!("server {name} stopped")))
}

pub(super) async fn start_all(State(registry): Shared) -> Result<Json<Message>, ApiError> {
    info!("api: start-all");
    registry.start_all().await.into_result()?;
    Ok(Message::new("all servers started"))
}

pub(super) async fn stop_all(State(registry): Shared) -> Result<Json<Message>, ApiError> {
    info!("api: stop-all");
    registry.stop_all().await.into_result()?;
    Ok(Message::new("all servers stopped"))
}
