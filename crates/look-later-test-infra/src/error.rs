use thiserror::Error;

/// Ways the Redis fixture can fail to come up.
#[derive(Debug, Error)]
pub enum TestInfraError {
    #[error("redis container did not start: {0}")]
    Container(#[from] testcontainers::TestcontainersError),

    #[error("redis fixture unreachable: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("redis fixture answered PING with {0:?}")]
    Unhealthy(String),
}

pub type Result<T> = std::result::Result<T, TestInfraError>;
