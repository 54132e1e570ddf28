pub mod catalog;
pub mod clients;
pub mod config;
pub mod error;
pub mod http;
pub mod render;
pub mod report;
pub mod session;
pub mod wizard;

use std::sync::Arc;

use crate::clients::{AiGateway, GeminiGateway, UnconfiguredGateway};
use crate::config::Config;
use crate::error::Result;

/// Gateway for the loaded config, plus whether a real key backs it
pub fn gateway_from_config(config: &Config) -> Result<(Arc<dyn AiGateway>, bool)> {
    match config.runtime.api_key.as_deref() {
        Some(key) => {
            let gateway = GeminiGateway::new(&config.gemini, key.to_string())?;
            Ok((Arc::new(gateway), true))
        }
        None => Ok((Arc::new(UnconfiguredGateway), false)),
    }
}

/// Build the HTTP state from configuration
pub fn app_state(config: &Config) -> Result<http::AppState> {
    let (gateway, configured) = gateway_from_config(config)?;
    Ok(http::AppState::new(gateway, configured))
}
