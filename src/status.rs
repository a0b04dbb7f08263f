//! Agent status probe.
//!
//! Runs an external CLI that lists agent sessions as JSON and turns the age of the
//! most recent session into a coarse activity indicator. Not part of the board data
//! model; it never touches the store.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sessions younger than this count as actively working.
pub const ACTIVE_THRESHOLD_MS: u64 = 60_000;
/// Sessions younger than this (but past the active threshold) count as thinking.
pub const THINKING_THRESHOLD_MS: u64 = 300_000;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("No status command configured")]
    NoCommand,

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("Invalid session list: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Session age {0}ms is out of range")]
    AgeOutOfRange(u64),
}

/// One entry of the CLI's session list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub age_ms: Option<u64>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionList {
    #[serde(default)]
    pub sessions: Vec<Session>,
}

/// Where session data comes from.
#[async_trait]
pub trait SessionSource: Send + Sync {
    async fn sessions(&self) -> Result<SessionList, ProbeError>;
}

/// Runs a command and parses its stdout as a [`SessionList`].
#[derive(Debug, Clone)]
pub struct CommandSessionSource {
    command: Vec<String>,
}

impl CommandSessionSource {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl SessionSource for CommandSessionSource {
    async fn sessions(&self) -> Result<SessionList, ProbeError> {
        let (program, args) = self.command.split_first().ok_or(ProbeError::NoCommand)?;

        let output = tokio::process::Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|source| ProbeError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProbeError::Exit {
                program: program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Working,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    Active,
    Thinking,
    Sleeping,
}

/// Classify a session age into status/state.
pub fn classify(age_ms: u64) -> (AgentStatus, AgentState) {
    if age_ms < ACTIVE_THRESHOLD_MS {
        (AgentStatus::Working, AgentState::Active)
    } else if age_ms < THINKING_THRESHOLD_MS {
        (AgentStatus::Idle, AgentState::Thinking)
    } else {
        (AgentStatus::Idle, AgentState::Sleeping)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub status: AgentStatus,
    pub state: AgentState,
    pub session_age_ms: u64,
    pub session_age_minutes: f64,
    pub last_activity: String,
    pub model: String,
    pub tokens_used: u64,
}

impl StatusReport {
    /// Build a report from the first listed session. No session reads as age zero.
    pub fn from_sessions(list: &SessionList) -> Result<Self, ProbeError> {
        let session = list.sessions.first().cloned().unwrap_or_default();
        let age_ms = session.age_ms.unwrap_or(0);
        let (status, state) = classify(age_ms);

        let minutes = age_ms as f64 / 60_000.0;
        let last_activity = i64::try_from(age_ms)
            .ok()
            .and_then(Duration::try_milliseconds)
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .ok_or(ProbeError::AgeOutOfRange(age_ms))?;

        Ok(Self {
            status,
            state,
            session_age_ms: age_ms,
            session_age_minutes: (minutes * 100.0).round() / 100.0,
            last_activity: last_activity.to_rfc3339(),
            model: session.model.unwrap_or_else(|| "unknown".to_string()),
            tokens_used: session.total_tokens.unwrap_or(0),
        })
    }
}

/// Query a source and build a report.
pub async fn probe(source: &dyn SessionSource) -> Result<StatusReport, ProbeError> {
    let list = source.sessions().await?;
    StatusReport::from_sessions(&list)
}
