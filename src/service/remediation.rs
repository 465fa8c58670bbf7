use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

/// What a finished remediation run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationOutcome {
    pub output: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RemediationError {
    #[error("Remediation command is empty")]
    EmptyCommand,
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("Remediation exited with code {code:?}: {output}")]
    Failed { code: Option<i32>, output: String },
}

/// The external repair procedure triggered by `!autofix`.
#[async_trait]
pub trait Remediation: Send + Sync {
    async fn run(&self) -> Result<RemediationOutcome, RemediationError>;
}

/// Runs a program (with whitespace separated arguments) and captures its output.
pub struct ScriptRemediation {
    program: String,
    args: Vec<String>,
}

impl ScriptRemediation {
    pub fn from_command_line(command: &str) -> Result<Self, RemediationError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(RemediationError::EmptyCommand)?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl Remediation for ScriptRemediation {
    async fn run(&self) -> Result<RemediationOutcome, RemediationError> {
        log::info!("Running remediation: {} {:?}", self.program, self.args);

        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| RemediationError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let mut text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if !stderr.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(stderr);
        }

        if output.status.success() {
            log::info!("Remediation {} finished successfully", self.program);
            Ok(RemediationOutcome { output: text })
        } else {
            log::warn!(
                "Remediation {} exited with code {:?}",
                self.program,
                output.status.code()
            );
            Err(RemediationError::Failed {
                code: output.status.code(),
                output: text,
            })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_splitting() {
        let remediation = ScriptRemediation::from_command_line("  ./fix.sh --ci  main ")
            .expect("Failed to parse command");
        assert_eq!(remediation.program(), "./fix.sh");
        assert_eq!(remediation.args, vec!["--ci", "main"]);
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(matches!(
            ScriptRemediation::from_command_line("   "),
            Err(RemediationError::EmptyCommand)
        ));
    }

    #[tokio::test]
    async fn test_successful_run_captures_stdout() {
        let remediation = ScriptRemediation::from_command_line("echo pipeline fixed").unwrap();
        let outcome = remediation.run().await.expect("echo should succeed");
        assert_eq!(outcome.output, "pipeline fixed");
    }

    #[tokio::test]
    async fn test_failing_run_reports_exit_code() {
        let remediation = ScriptRemediation::from_command_line("false").unwrap();
        match remediation.run().await {
            Err(RemediationError::Failed { code, .. }) => assert_eq!(code, Some(1)),
            other => panic!("Expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_a_spawn_error() {
        let remediation =
            ScriptRemediation::from_command_line("/definitely/not/a/real/fix-ci.sh").unwrap();
        assert!(matches!(
            remediation.run().await,
            Err(RemediationError::Spawn { .. })
        ));
    }
}
