//! Redis cache client implementation
//!
//! Wraps a multiplexed connection shared by all concurrent requests.
//! Connecting is retried with exponential backoff at start-up; individual
//! operations are bounded by a timeout and never retried, so connectivity
//! failures reach the caller as-is.

use redis::{aio::MultiplexedConnection, Client, RedisResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use og_shared::{mask::mask_url, RedisConfig};

use crate::InfrastructureError;

/// Base delay between connection attempts
const CONNECT_RETRY_DELAY_MS: u64 = 100;

/// Upper bound of the connection backoff
const MAX_CONNECT_DELAY_MS: u64 = 5000;

/// Redis client with start-up retry and per-operation timeouts
#[derive(Clone)]
pub struct RedisClient {
    /// Redis multiplexed connection for async operations
    connection: MultiplexedConnection,
    /// Upper bound for a single operation
    op_timeout: Duration,
}

impl RedisClient {
    /// Connect to Redis
    ///
    /// # Arguments
    /// * `config` - Redis settings; `connect_retries` bounds the start-up attempts
    ///
    /// # Returns
    /// * `Result<Self, InfrastructureError>` - Connected client or error
    pub async fn new(config: &RedisConfig) -> Result<Self, InfrastructureError> {
        info!(url = %mask_url(&config.url), "Creating Redis client");

        let client = Client::open(config.url.as_str()).map_err(|e| {
            error!("Failed to parse Redis URL: {}", e);
            InfrastructureError::Config(format!("Invalid Redis URL: {}", e))
        })?;

        let connection = Self::create_connection_with_retry(
            client,
            config.connect_retries.max(1),
            CONNECT_RETRY_DELAY_MS,
        )
        .await?;

        info!("Redis client created successfully");

        Ok(Self {
            connection,
            op_timeout: config.timeout(),
        })
    }

    /// Create multiplexed connection with retry logic
    async fn create_connection_with_retry(
        client: Client,
        max_retries: u32,
        retry_delay_ms: u64,
    ) -> Result<MultiplexedConnection, InfrastructureError> {
        let mut attempts = 0;
        let mut delay = retry_delay_ms;

        loop {
            attempts += 1;
            debug!("Attempting to connect to Redis (attempt {})", attempts);

            match client.get_multiplexed_async_connection().await {
                Ok(connection) => {
                    info!("Successfully connected to Redis");
                    return Ok(connection);
                }
                Err(e) if attempts < max_retries => {
                    warn!(
                        "Failed to connect to Redis (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, max_retries, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(MAX_CONNECT_DELAY_MS);
                }
                Err(e) => {
                    error!(
                        "Failed to connect to Redis after {} attempts: {}",
                        attempts, e
                    );
                    return Err(InfrastructureError::Cache(e));
                }
            }
        }
    }

    /// A handle on the shared connection
    pub fn connection(&self) -> MultiplexedConnection {
        self.connection.clone()
    }

    /// Run a Redis future under the operation timeout
    ///
    /// # Returns
    /// * `Err(InfrastructureError::Timeout)` - The timeout elapsed first
    /// * `Err(InfrastructureError::Cache)` - Redis reported an error
    pub async fn run<T, F>(&self, operation: F) -> Result<T, InfrastructureError>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match timeout(self.op_timeout, operation).await {
            Ok(result) => result.map_err(InfrastructureError::Cache),
            Err(_) => {
                warn!(timeout_ms = self.op_timeout.as_millis() as u64, "Redis operation timed out");
                Err(InfrastructureError::Timeout)
            }
        }
    }

    /// Publish a message to a pub/sub channel
    ///
    /// # Returns
    /// * `Result<u64, InfrastructureError>` - Number of subscribers that received it
    pub async fn publish(&self, channel: &str, payload: &str) -> Result<u64, InfrastructureError> {
        let mut conn = self.connection();
        let receivers = self
            .run(
                redis::cmd("PUBLISH")
                    .arg(channel)
                    .arg(payload)
                    .query_async::<_, u64>(&mut conn),
            )
            .await?;
        debug!(channel = channel, receivers = receivers, "Published event");
        Ok(receivers)
    }

    /// Check if Redis is healthy and responsive
    ///
    /// # Returns
    /// * `Ok(true)` - PING answered PONG
    /// * `Ok(false)` - Unexpected reply
    /// * `Err(_)` - Redis unreachable or timed out
    pub async fn health_check(&self) -> Result<bool, InfrastructureError> {
        debug!("Performing Redis health check");

        let mut conn = self.connection();
        let result = self
            .run(redis::cmd("PING").query_async::<_, String>(&mut conn))
            .await;

        match result {
            Ok(response) if response == "PONG" => {
                debug!("Redis health check passed");
                Ok(true)
            }
            Ok(response) => {
                warn!("Redis health check returned unexpected response: {}", response);
                Ok(false)
            }
            Err(e) => {
                error!("Redis health check failed: {}", e);
                Err(e)
            }
        }
    }
}
