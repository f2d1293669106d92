//! Typed inbound supervisor events and the JSON boundary parser.
//!
//! The external process supervisor emits loosely-structured JSON payloads.
//! `SupervisorEvent::from_json` is the single place where that input is
//! validated: a missing or mistyped field yields `Error::MalformedEvent`
//! with a description of what was wrong, and the caller logs it once and
//! discards the event. Nothing past this boundary deals with raw JSON.

use serde_json::Value;

use crate::classify::LogLevel;
use crate::error::{Error, Result};

// =============================================================================
// Event types
// =============================================================================

/// Payload of a `process-event` from the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessPayload {
    /// The OS process actually started.
    Started { pid: u32 },
    /// One stdout line of game output.
    Output { line: String },
    /// One stderr line of game output.
    ErrorLine { line: String },
    /// The process exited with the given code.
    Exit { code: i32 },
}

/// A launcher-level (non-game) log message, global or instance-scoped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherLogMessage {
    pub level: LogLevel,
    pub message: String,
    pub instance_id: Option<String>,
}

/// A typed event consumed from the external process supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// A launch intent was registered; the process does not exist yet.
    ProcessLaunched {
        instance_id: String,
        profile_name: String,
        installation_path: String,
    },
    /// A lifecycle/output event for a known instance.
    ProcessEvent {
        instance_id: String,
        payload: ProcessPayload,
    },
    /// A single launcher-level log message.
    LauncherLog(LauncherLogMessage),
    /// A batch of launcher-level log messages, in order.
    LauncherLogBatch(Vec<LauncherLogMessage>),
    /// UI hint: the presentation layer should show this instance's logs.
    NavigateToLogs {
        instance_id: String,
        reason: String,
    },
}

// =============================================================================
// Boundary parsing
// =============================================================================

fn str_field<'a>(value: &'a Value, field: &str) -> Result<&'a str> {
    value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::MalformedEvent(format!("missing or non-string field `{field}`")))
}

fn i64_field(value: &Value, field: &str) -> Result<i64> {
    value
        .get(field)
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::MalformedEvent(format!("missing or non-integer field `{field}`")))
}

fn opt_str_field(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

fn parse_level(value: &Value) -> Result<LogLevel> {
    match str_field(value, "level")? {
        "error" => Ok(LogLevel::Error),
        "warn" | "warning" => Ok(LogLevel::Warn),
        "debug" => Ok(LogLevel::Debug),
        "info" => Ok(LogLevel::Info),
        other => Err(Error::MalformedEvent(format!("unknown level `{other}`"))),
    }
}

fn parse_launcher_log(value: &Value) -> Result<LauncherLogMessage> {
    Ok(LauncherLogMessage {
        level: parse_level(value)?,
        message: str_field(value, "message")?.to_string(),
        instance_id: opt_str_field(value, "instanceId"),
    })
}

fn parse_process_payload(value: &Value) -> Result<ProcessPayload> {
    let kind = str_field(value, "kind")?;
    let data = value
        .get("data")
        .ok_or_else(|| Error::MalformedEvent("missing field `data`".to_string()))?;
    match kind {
        "started" => {
            let pid = i64_field(data, "pid")?;
            let pid = u32::try_from(pid)
                .map_err(|_| Error::MalformedEvent(format!("pid {pid} out of range")))?;
            Ok(ProcessPayload::Started { pid })
        }
        "output" => Ok(ProcessPayload::Output {
            line: str_field(data, "line")?.to_string(),
        }),
        "error" => Ok(ProcessPayload::ErrorLine {
            line: str_field(data, "line")?.to_string(),
        }),
        "exit" => {
            let code = i64_field(data, "code")?;
            let code = i32::try_from(code)
                .map_err(|_| Error::MalformedEvent(format!("exit code {code} out of range")))?;
            Ok(ProcessPayload::Exit { code })
        }
        other => Err(Error::MalformedEvent(format!(
            "unknown process-event kind `{other}`"
        ))),
    }
}

impl SupervisorEvent {
    /// Parse a raw supervisor payload into a typed event.
    ///
    /// This is the malformed-event boundary: any missing or mistyped field
    /// is an error here and nowhere else.
    pub fn from_json(value: &Value) -> Result<Self> {
        match str_field(value, "type")? {
            "process-launched" => Ok(Self::ProcessLaunched {
                instance_id: str_field(value, "instanceId")?.to_string(),
                profile_name: str_field(value, "profileName")?.to_string(),
                installation_path: str_field(value, "installationPath")?.to_string(),
            }),
            "process-event" => Ok(Self::ProcessEvent {
                instance_id: str_field(value, "instanceId")?.to_string(),
                payload: parse_process_payload(value)?,
            }),
            "launcher-log" => Ok(Self::LauncherLog(parse_launcher_log(value)?)),
            "launcher-log-batch" => {
                let logs = value
                    .get("logs")
                    .and_then(Value::as_array)
                    .ok_or_else(|| {
                        Error::MalformedEvent("missing or non-array field `logs`".to_string())
                    })?;
                let parsed = logs
                    .iter()
                    .map(parse_launcher_log)
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self::LauncherLogBatch(parsed))
            }
            "navigate-to-logs" => Ok(Self::NavigateToLogs {
                instance_id: str_field(value, "instanceId")?.to_string(),
                reason: str_field(value, "reason")?.to_string(),
            }),
            other => Err(Error::MalformedEvent(format!(
                "unknown event type `{other}`"
            ))),
        }
    }
}
