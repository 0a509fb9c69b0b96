use std::{net::SocketAddr, sync::Arc};

use server_api::{ApiContext, ReviewPolicy, SystemClock};
use storage::Storage;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod config;

use api::build_router;
use app_state::AppState;
use config::load_settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = load_settings()?;
    let database_url = settings.database_url.clone();
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    if settings.reconcile_on_startup {
        let repaired = storage.reconcile_review_counts().await?;
        if repaired > 0 {
            warn!(repaired, "corrected drifted review counts");
        } else {
            info!("review counts consistent");
        }
    }

    let api = ApiContext {
        store: Arc::new(storage.clone()),
        clock: Arc::new(SystemClock),
        policy: ReviewPolicy {
            guest_reviewer_on_update: settings.guest_reviewer_on_update,
        },
    };
    let state = AppState { api, storage };
    let app = build_router(Arc::new(state), settings.max_body_bytes);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
