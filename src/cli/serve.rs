//! HTTP API server command

use super::helpers::{build_llm, build_store};
use std::net::SocketAddr;
use studentdesk_core::{
    api::{ApiServer, ApiServerConfig, AppState},
    error::{PortalError, Result},
    PortalConfig,
};
use tracing::debug;

/// Handle API server startup command
pub async fn handle(
    mut config: PortalConfig,
    addr: Option<String>,
    capacity: Option<usize>,
) -> Result<()> {
    debug!("Starting HTTP API server...");

    if let Some(capacity) = capacity {
        config.server.event_capacity = capacity;
    }
    let addr = addr.unwrap_or_else(|| config.server.addr.clone());
    let socket_addr: SocketAddr = addr
        .parse()
        .map_err(|e| PortalError::Config(format!("Invalid address '{}': {}", addr, e)))?;
    let server_config = ApiServerConfig {
        addr: socket_addr,
        event_capacity: config.server.event_capacity,
    };

    let store = build_store(&config)?;
    let llm = build_llm(&config);
    let assistant_ready = llm.is_some();
    let state = AppState::new(store, llm, &config);

    println!();
    println!("🎓 Studentdesk API Server");
    println!("   Address: http://{}", socket_addr);
    println!(
        "   Store: {}",
        if config.store.is_configured() {
            config.store.url.as_str()
        } else {
            "in-memory (not persisted)"
        }
    );
    println!(
        "   Assistant: {}",
        if assistant_ready { config.llm.model.as_str() } else { "offline" }
    );
    println!("   Event capacity: {}", server_config.event_capacity);
    println!();

    let server = ApiServer::new(server_config, state);
    server.serve().await?;

    Ok(())
}
