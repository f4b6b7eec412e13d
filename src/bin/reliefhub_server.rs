//! reliefhub-server: JSON API for relief coordination
//!
//! ## Configuration
//! - `--config <path>` or RELIEFHUB_CONFIG: YAML config file
//! - RELIEFHUB__SERVER__PORT, RELIEFHUB__STORAGE__TYPE, ...: overrides
//! - RELIEFHUB_LOG: tracing filter (default: info)

use std::sync::Arc;

use tracing::info;

use reliefhub::actor::ProfileActorResolver;
use reliefhub::config::Config;
use reliefhub::handlers::rest::{self, ApiState};
use reliefhub::services::ReliefServices;
use reliefhub::storage::init_storage;
use reliefhub::utils::bootstrap::{init_tracing, parse_config_path};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();

    let config_path = parse_config_path(std::env::args().skip(1));
    let config = Config::load(config_path.as_deref())?;
    info!(
        storage = ?config.storage.storage_type,
        port = config.server.port,
        "starting reliefhub-server"
    );

    let stores = init_storage(&config.storage).await?;
    let state = ApiState {
        services: ReliefServices::new(&stores, &config.fulfillment),
        resolver: Arc::new(ProfileActorResolver::new(stores.profiles.clone())),
    };

    rest::serve(state, &config.server).await
}
