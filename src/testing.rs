//! In-memory stand-ins for the chat platform, Docker and the remediation script.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::chat::notifier::{Notifier, NotifyError, Severity};
use crate::service::remediation::{Remediation, RemediationError, RemediationOutcome};
use crate::service::runtime::{ContainerRuntime, ContainerStatus, RuntimeError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub channel: String,
    pub text: String,
    pub severity: Severity,
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMessage>>,
    fail: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.text).collect()
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, channel: &str, text: &str, severity: Severity) -> Result<(), NotifyError> {
        if *self.fail.lock().unwrap() {
            return Err(NotifyError::Rejected("channel_not_found".to_string()));
        }
        self.sent.lock().unwrap().push(SentMessage {
            channel: channel.to_string(),
            text: text.to_string(),
            severity,
        });
        Ok(())
    }
}

/// Replays scripted inspect results. Once the script runs out the last
/// status is repeated.
#[derive(Default)]
pub struct FakeRuntime {
    statuses: Mutex<VecDeque<Option<ContainerStatus>>>,
    last: Mutex<Option<ContainerStatus>>,
    restart_fails: Mutex<bool>,
    restarts: Mutex<Vec<String>>,
    inspects: Mutex<usize>,
}

impl FakeRuntime {
    /// `None` entries make `inspect` fail.
    pub fn with_statuses(statuses: impl IntoIterator<Item = Option<ContainerStatus>>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into_iter().collect()),
            last: Mutex::new(Some(ContainerStatus::Running)),
            ..Self::default()
        }
    }

    pub fn set_restart_fails(&self, fail: bool) {
        *self.restart_fails.lock().unwrap() = fail;
    }

    pub fn restarts(&self) -> Vec<String> {
        self.restarts.lock().unwrap().clone()
    }

    pub fn inspects(&self) -> usize {
        *self.inspects.lock().unwrap()
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn inspect(&self, name: &str) -> Result<ContainerStatus, RuntimeError> {
        *self.inspects.lock().unwrap() += 1;
        let next = self.statuses.lock().unwrap().pop_front();
        let status = match next {
            Some(status) => {
                *self.last.lock().unwrap() = status;
                status
            }
            None => *self.last.lock().unwrap(),
        };
        status.ok_or_else(|| RuntimeError::NotFound(name.to_string()))
    }

    async fn restart(&self, name: &str) -> Result<(), RuntimeError> {
        self.restarts.lock().unwrap().push(name.to_string());
        if *self.restart_fails.lock().unwrap() {
            return Err(RuntimeError::NotFound(name.to_string()));
        }
        Ok(())
    }
}

pub struct FakeRemediation {
    result: Mutex<Result<String, String>>,
    runs: Mutex<usize>,
}

impl FakeRemediation {
    pub fn succeeding(output: &str) -> Self {
        Self {
            result: Mutex::new(Ok(output.to_string())),
            runs: Mutex::new(0),
        }
    }

    pub fn failing(output: &str) -> Self {
        Self {
            result: Mutex::new(Err(output.to_string())),
            runs: Mutex::new(0),
        }
    }

    pub fn runs(&self) -> usize {
        *self.runs.lock().unwrap()
    }
}

#[async_trait]
impl Remediation for FakeRemediation {
    async fn run(&self) -> Result<RemediationOutcome, RemediationError> {
        *self.runs.lock().unwrap() += 1;
        match &*self.result.lock().unwrap() {
            Ok(output) => Ok(RemediationOutcome {
                output: output.clone(),
            }),
            Err(output) => Err(RemediationError::Failed {
                code: Some(1),
                output: output.clone(),
            }),
        }
    }
}
