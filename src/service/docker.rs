//! Docker implementation of [`ContainerRuntime`] using bollard.
//!
//! The client connects with the default connection method
//! (Unix socket on Linux/macOS, named pipe on Windows).

use async_trait::async_trait;
use bollard::Docker;
use bollard::query_parameters::{
    InspectContainerOptions, InspectContainerOptionsBuilder, RestartContainerOptions,
    RestartContainerOptionsBuilder,
};

use crate::service::runtime::{ContainerRuntime, ContainerStatus, RuntimeError};

/// Seconds Docker waits for the container to stop before killing it.
const RESTART_TIMEOUT_SECS: i32 = 10;

pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    pub fn connect() -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn inspect(&self, name: &str) -> Result<ContainerStatus, RuntimeError> {
        let options: InspectContainerOptions = InspectContainerOptionsBuilder::new().build();

        match self.docker.inspect_container(name, Some(options)).await {
            Ok(info) => {
                if let Some(state) = info.state {
                    if state.running.unwrap_or(false) {
                        return Ok(ContainerStatus::Running);
                    }
                    let exit_code = state.exit_code.unwrap_or(-1) as i32;
                    return Ok(ContainerStatus::Exited(exit_code));
                }
                Ok(ContainerStatus::NotFound)
            }
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(ContainerStatus::NotFound),
            Err(e) => Err(RuntimeError::DockerApi(e)),
        }
    }

    async fn restart(&self, name: &str) -> Result<(), RuntimeError> {
        log::info!("Restarting container: {name}");

        let options: RestartContainerOptions = RestartContainerOptionsBuilder::new()
            .t(RESTART_TIMEOUT_SECS)
            .build();

        match self.docker.restart_container(name, Some(options)).await {
            Ok(_) => {
                log::info!("Container {name} restarted successfully");
                Ok(())
            }
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                log::warn!("Container {name} not found, unable to restart");
                Err(RuntimeError::NotFound(name.to_string()))
            }
            Err(e) => {
                log::error!("Failed to restart container {name}: {e}");
                Err(RuntimeError::DockerApi(e))
            }
        }
    }
}
