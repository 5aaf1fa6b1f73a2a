//! Delve Web Server
//!
//! Main web server implementation using Axum.

use crate::{create_app, AppState, WebConfig, WebError, WebResult};
use axum::serve;
use delve_core::DelveConfig;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Main Delve web server
pub struct DelveServer {
    config: WebConfig,
    state: AppState,
}

impl DelveServer {
    pub fn new(config: WebConfig, delve: DelveConfig) -> Self {
        let state = AppState::new(config.clone(), delve);
        Self { config, state }
    }

    /// Server around an already-built state
    pub fn with_state(state: AppState) -> Self {
        Self {
            config: state.config.clone(),
            state,
        }
    }

    /// Bind and serve until the process stops
    pub async fn start(self) -> WebResult<()> {
        let listener = TcpListener::bind(self.config.address())
            .await
            .map_err(WebError::Server)?;
        self.serve(listener).await
    }

    /// Serve on an existing listener
    pub async fn serve(self, listener: TcpListener) -> WebResult<()> {
        let address = listener.local_addr().map_err(WebError::Server)?;
        let app = create_app(self.state);

        info!("Server listening on http://{}", address);
        if let Some(dir) = &self.config.static_dir {
            info!("Frontend served from {} at /app", dir);
        }

        if let Err(e) = serve(listener, app).await {
            error!("Server error: {}", e);
            return Err(WebError::Server(e));
        }

        Ok(())
    }

    pub fn config(&self) -> &WebConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Builder for DelveServer
pub struct DelveServerBuilder {
    config: WebConfig,
    delve: Option<DelveConfig>,
}

impl DelveServerBuilder {
    pub fn new() -> Self {
        Self {
            config: WebConfig::default(),
            delve: None,
        }
    }

    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the frontend build directory
    pub fn static_dir<S: Into<String>>(mut self, static_dir: S) -> Self {
        self.config.static_dir = Some(static_dir.into());
        self
    }

    pub fn delve_config(mut self, delve: DelveConfig) -> Self {
        self.delve = Some(delve);
        self
    }

    /// Build the server; without an explicit model config it is read from the environment
    pub fn build(self) -> WebResult<DelveServer> {
        let delve = match self.delve {
            Some(delve) => delve,
            None => DelveConfig::from_env()?,
        };
        delve.validate()?;

        Ok(DelveServer::new(self.config, delve))
    }
}

impl Default for DelveServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_builder() {
        let builder = DelveServerBuilder::new()
            .host("localhost")
            .port(3000)
            .static_dir("frontend/dist");

        assert_eq!(builder.config.host, "localhost");
        assert_eq!(builder.config.port, 3000);
        assert_eq!(builder.config.static_dir.as_deref(), Some("frontend/dist"));
    }

    #[tokio::test]
    async fn test_build_with_explicit_config() {
        let server = DelveServerBuilder::new()
            .port(0)
            .delve_config(DelveConfig::default())
            .build()
            .unwrap();

        assert_eq!(server.config().port, 0);
        assert_eq!(server.state().delve.research.max_research_loops, 3);
    }
}
