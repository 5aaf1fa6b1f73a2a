//! Shared application state

use crate::WebConfig;
use delve_core::DelveConfig;
use delve_llm::{ModelFactory, ProviderModelFactory};
use delve_research::{DualModelChat, ResearchEngine, SingleModelChat};
use std::sync::Arc;
use tracing::{info, warn};

/// State handed to every handler; cloning is cheap
#[derive(Clone)]
pub struct AppState {
    pub config: WebConfig,
    pub delve: Arc<DelveConfig>,
    pub research: Arc<ResearchEngine>,
    pub dual_chat: Arc<DualModelChat>,
    pub single_chat: Arc<SingleModelChat>,
}

impl AppState {
    /// State backed by the real provider clients
    pub fn new(config: WebConfig, delve: DelveConfig) -> Self {
        Self::with_factory(config, delve, Arc::new(ProviderModelFactory::new()))
    }

    /// State with a caller-supplied model factory
    pub fn with_factory(
        config: WebConfig,
        delve: DelveConfig,
        factory: Arc<dyn ModelFactory>,
    ) -> Self {
        let missing = delve.missing_keys();
        if missing.is_empty() {
            info!("All configured providers have API keys");
        } else {
            warn!(
                missing = ?missing,
                "Some providers have no API key; requests that need them will report an error"
            );
        }

        Self {
            research: Arc::new(ResearchEngine::with_factory(delve.clone(), Arc::clone(&factory))),
            dual_chat: Arc::new(DualModelChat::with_factory(delve.clone(), Arc::clone(&factory))),
            single_chat: Arc::new(SingleModelChat::with_factory(delve.clone(), factory)),
            delve: Arc::new(delve),
            config,
        }
    }
}
