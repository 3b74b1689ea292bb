//! TreeClient - wires a transport, an adapter and the client config together

use crate::adapter::TreeAdapter;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::in_process::InProcessTransport;
use crate::transport::TreeTransport;
use arbor_model::{Clock, SystemClock};
use arbor_store::StoreHandle;
use std::sync::Arc;
use tracing::info;

/// A configured client with its adapter.
pub struct TreeClient {
    config: ClientConfig,
    transport: Arc<dyn TreeTransport>,
    adapter: TreeAdapter,
}

impl TreeClient {
    /// Create a new TreeClientBuilder.
    pub fn builder() -> TreeClientBuilder {
        TreeClientBuilder::new()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the adapter for tree operations.
    pub fn adapter(&self) -> &TreeAdapter {
        &self.adapter
    }

    pub async fn go_online(&self) -> Result<(), ClientError> {
        self.transport.go_online().await?;
        Ok(())
    }

    pub async fn go_offline(&self) -> Result<(), ClientError> {
        self.transport.go_offline().await?;
        Ok(())
    }

    /// Disconnect gracefully (the store still runs on-disconnect hooks)
    /// and end all subscriptions.
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        self.transport.close().await?;
        info!(app = %self.config.app_name, "Client shut down");
        Ok(())
    }
}

/// Builder for TreeClient.
pub struct TreeClientBuilder {
    config: ClientConfig,
    clock: Option<Arc<dyn Clock>>,
}

impl TreeClientBuilder {
    pub fn new() -> Self {
        Self { config: ClientConfig::default(), clock: None }
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set explicit app name.
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.config.app_name = name.into();
        self
    }

    /// Client clock used for local push keys and the server offset
    /// estimate (for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build a client talking to an in-process store.
    pub async fn build(self, store: StoreHandle) -> Result<TreeClient, ClientError> {
        let clock = self.clock.clone().unwrap_or_else(|| Arc::new(SystemClock));
        let transport = Arc::new(InProcessTransport::new(store, clock));
        self.build_with_transport(transport).await
    }

    /// Build a client over any transport.
    pub async fn build_with_transport(
        self,
        transport: Arc<dyn TreeTransport>,
    ) -> Result<TreeClient, ClientError> {
        self.config.validate()?;

        let adapter =
            TreeAdapter::new(transport.clone()).with_presence_root(&self.config.presence_root);

        if self.config.auto_connect {
            transport.go_online().await?;
        }
        info!(
            app = %self.config.app_name,
            database = %self.config.database_url,
            online = self.config.auto_connect,
            "Client ready"
        );

        Ok(TreeClient { config: self.config, transport, adapter })
    }
}

impl Default for TreeClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
