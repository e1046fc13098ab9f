//! Connection management for MongoDB
//!
//! This module owns the driver client used by the MongoDB store adapter:
//! - Connection establishment and termination
//! - Pool and timeout settings from configuration
//! - Liveness check via `ping` when connecting

use mongodb::bson::doc;
use mongodb::{Client, options::ClientOptions};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::error::{ConnectionError, Result};
use crate::executor::MongoStore;

/// Application name reported to the server
const APP_NAME: &str = "docshell";

/// MongoDB connection manager
pub struct ConnectionManager {
    /// MongoDB client instance
    client: Option<Client>,

    /// Connection configuration
    config: ConnectionConfig,

    /// Current connection state
    state: Arc<RwLock<ConnectionState>>,
}

/// Connection state information
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,

    /// Currently connecting
    Connecting,

    /// Connected and ready
    Connected,

    /// Connection failed
    Failed(String),
}

impl ConnectionManager {
    /// Create a new connection manager
    ///
    /// # Arguments
    /// * `config` - Connection configuration, including the URI
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            client: None,
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
        }
    }

    /// Establish connection to MongoDB and verify it with a ping
    pub async fn connect(&mut self) -> Result<()> {
        self.set_state(ConnectionState::Connecting).await;

        let options = match Self::parse_uri(&self.config.uri).await {
            Ok(options) => self.configure_pool(options),
            Err(e) => {
                self.set_state(ConnectionState::Failed(e.to_string())).await;
                return Err(e);
            }
        };

        let client = Client::with_options(options)
            .map_err(|e| ConnectionError::ConnectionFailed(e.to_string()))?;

        if let Err(e) = Self::ping(&client).await {
            self.set_state(ConnectionState::Failed(e.to_string())).await;
            return Err(e);
        }

        info!("Connected to MongoDB, database '{}'", self.config.database);
        self.client = Some(client);
        self.set_state(ConnectionState::Connected).await;
        Ok(())
    }

    /// Disconnect from MongoDB
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            client.shutdown().await;
            debug!("MongoDB client shut down");
        }
        self.set_state(ConnectionState::Disconnected).await;
        Ok(())
    }

    /// Store adapter over the configured database
    pub fn store(&self) -> Result<MongoStore> {
        let client = self.get_client()?;
        Ok(MongoStore::new(client.clone(), &self.config.database))
    }

    /// Get the MongoDB client
    pub fn get_client(&self) -> Result<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| ConnectionError::NotConnected.into())
    }

    /// Get current connection state
    pub async fn get_state(&self) -> ConnectionState {
        self.state.read().await.clone()
    }

    /// Check if currently connected
    pub async fn is_connected(&self) -> bool {
        matches!(*self.state.read().await, ConnectionState::Connected)
    }

    /// Parse connection URI and create client options
    async fn parse_uri(uri: &str) -> Result<ClientOptions> {
        ClientOptions::parse(uri)
            .await
            .map_err(|e| ConnectionError::InvalidUri(format!("{uri}: {e}")).into())
    }

    /// Apply timeout and pool settings
    fn configure_pool(&self, mut options: ClientOptions) -> ClientOptions {
        let timeout = Duration::from_secs(self.config.timeout);
        options.app_name = Some(APP_NAME.to_string());
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);
        options.max_pool_size = Some(self.config.max_pool_size);
        options
    }

    async fn set_state(&self, new_state: ConnectionState) {
        *self.state.write().await = new_state;
    }

    /// Verify connection is alive by sending a ping
    async fn ping(client: &Client) -> Result<()> {
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(|e| ConnectionError::PingFailed(e.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocshellError;

    #[tokio::test]
    async fn test_initial_state() {
        let manager = ConnectionManager::new(ConnectionConfig::default());
        assert_eq!(manager.get_state().await, ConnectionState::Disconnected);
        assert!(!manager.is_connected().await);
    }

    #[test]
    fn test_not_connected() {
        let manager = ConnectionManager::new(ConnectionConfig::default());
        assert!(matches!(
            manager.store(),
            Err(DocshellError::Connection(ConnectionError::NotConnected))
        ));
    }

    #[tokio::test]
    async fn test_invalid_uri() {
        let config = ConnectionConfig {
            uri: "postgres://localhost".to_string(),
            ..ConnectionConfig::default()
        };
        let mut manager = ConnectionManager::new(config);

        let err = manager.connect().await.unwrap_err();
        assert!(matches!(
            err,
            DocshellError::Connection(ConnectionError::InvalidUri(_))
        ));
        assert!(matches!(manager.get_state().await, ConnectionState::Failed(_)));
    }

    #[tokio::test]
    async fn test_configure_pool() {
        let config = ConnectionConfig {
            timeout: 3,
            max_pool_size: 4,
            ..ConnectionConfig::default()
        };
        let manager = ConnectionManager::new(config);
        let options = ConnectionManager::parse_uri("mongodb://localhost:27017")
            .await
            .unwrap();
        let options = manager.configure_pool(options);
        assert_eq!(options.connect_timeout, Some(Duration::from_secs(3)));
        assert_eq!(options.max_pool_size, Some(4));
        assert_eq!(options.app_name.as_deref(), Some("docshell"));
    }
}
