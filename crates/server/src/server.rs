use axum::{
    Router,
    routing::{delete, get, post},
};

use std::{path::PathBuf, sync::Arc};

use crate::transactions;
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    /// Directory where uploaded import files are staged.
    pub upload_dir: PathBuf,
}

impl ServerState {
    pub fn new(engine: Engine, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine: Arc::new(engine),
            upload_dir: upload_dir.into(),
        }
    }
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route(
            "/transactions",
            get(transactions::list).post(transactions::create),
        )
        .route("/transactions/import", post(transactions::import))
        .route("/transactions/{id}", delete(transactions::remove))
        .with_state(state)
}

pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state)).await
}
