//! # Error Taxonomy
//!
//! Typed failures raised by resolution, execution, schema synthesis and the
//! account store. Startup and gateway glue keep using `anyhow::Result`.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use thiserror::Error;

/// No module or command alias matches the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no module or command matches `{input}`")]
pub struct NotFoundError {
    pub input: String,
}

/// Why a single invocation did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command.")]
    UnknownCommand,

    #[error("The input text has too few or too many parameters.")]
    BadArgCount,

    #[error("User has insufficient permission to execute command.")]
    PermissionDenied,

    #[error("Failed to parse `{parameter}` as {expected}.")]
    ParseFailed {
        parameter: String,
        expected: &'static str,
    },

    /// Failure reported by the command handler itself.
    #[error("{0}")]
    Failed(String),
}

impl CommandError {
    pub fn failed(reason: impl Into<String>) -> Self {
        CommandError::Failed(reason.into())
    }

    /// Failures that are counted but never shown to the user.
    pub fn is_silent(&self) -> bool {
        matches!(self, CommandError::PermissionDenied)
    }
}

/// Two slash fragments contribute irreconcilable nodes under one top-level name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("slash command `{path}` has conflicting definitions for `{option}`: {reason}")]
pub struct SchemaConflictError {
    /// Space separated path of the level where the collision happened.
    pub path: String,
    pub option: String,
    pub reason: String,
}

/// The account store could not write a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to persist account {account_id}: {reason}")]
pub struct PersistenceError {
    pub account_id: u64,
    pub reason: String,
}
