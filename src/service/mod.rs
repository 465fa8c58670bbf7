pub mod docker;
pub mod remediation;
pub mod runtime;

pub use docker::DockerRuntime;
pub use remediation::ScriptRemediation;
