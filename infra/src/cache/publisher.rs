//! Event publishing seam used by the Redis store

use async_trait::async_trait;

use crate::cache::RedisClient;
use crate::InfrastructureError;

/// Fire-and-forget channel for OTP lifecycle events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish `payload` on `channel`, returning the number of receivers
    async fn publish(&self, channel: &str, payload: &str) -> Result<u64, InfrastructureError>;
}

#[async_trait]
impl EventPublisher for RedisClient {
    async fn publish(&self, channel: &str, payload: &str) -> Result<u64, InfrastructureError> {
        RedisClient::publish(self, channel, payload).await
    }
}
