use async_trait::async_trait;

/// What the container runtime reports about a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    Running,
    Exited(i32),
    NotFound,
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Docker API error: {0}")]
    DockerApi(#[from] bollard::errors::Error),
    #[error("Container {0} not found")]
    NotFound(String),
}

/// The two container operations the bot depends on.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn inspect(&self, name: &str) -> Result<ContainerStatus, RuntimeError>;
    async fn restart(&self, name: &str) -> Result<(), RuntimeError>;
}
