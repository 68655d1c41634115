//! Shared helper functions for CLI commands
//!
//! Resolves the configured store and LLM client so every subcommand wires the
//! backends the same way.

use std::sync::Arc;
use studentdesk_core::{
    error::Result, LlmService, MemoryStore, PortalConfig, PortalStore, RestStore, TextGenerator,
};
use tracing::{debug, warn};

/// Hosted store when configured, otherwise an empty in-memory store
pub fn build_store(config: &PortalConfig) -> Result<Arc<dyn PortalStore>> {
    if config.store.is_configured() {
        debug!("Using hosted store at {}", config.store.url);
        return Ok(Arc::new(RestStore::new(&config.store)?));
    }

    warn!("Store URL or API key missing; records are kept in memory for this run");
    Ok(Arc::new(MemoryStore::new()))
}

/// LLM client when an API key is configured
pub fn build_llm(config: &PortalConfig) -> Option<Arc<dyn TextGenerator>> {
    if config.llm.api_key.trim().is_empty() {
        warn!("LLM API key not set; the assistant will answer with its offline message");
        return None;
    }

    match LlmService::new(config.llm.clone()) {
        Ok(service) => Some(Arc::new(service)),
        Err(e) => {
            warn!("Failed to initialize LLM service: {}", e);
            None
        }
    }
}
