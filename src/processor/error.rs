// Processor Errors and Outcomes

use std::io;

use thiserror::Error;

use crate::common::types::RecordId;
use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::session::{Relationship, SessionError};

/// Any failure during one trigger of the processor
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Engine error: {0}")]
    Engine(EngineError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Session error: {0}")]
    Session(SessionError),
}

// Content write failures are stream copy failures, not session faults
impl From<SessionError> for ProcessError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Write(e) => ProcessError::Io(e),
            other => ProcessError::Session(other),
        }
    }
}

// Stream read failures are I/O whether they surface on the first byte or later
impl From<EngineError> for ProcessError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Io(e) => ProcessError::Io(e),
            other => ProcessError::Engine(other),
        }
    }
}

/// Coarse classification of a `ProcessError`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Engine,
    Io,
    Session,
}

impl ProcessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessError::Configuration(_) => ErrorKind::Configuration,
            ProcessError::Engine(_) => ErrorKind::Engine,
            ProcessError::Io(_) => ErrorKind::Io,
            ProcessError::Session(_) => ErrorKind::Session,
        }
    }
}

/// What one trigger routed
#[derive(Debug)]
pub enum RoutingOutcome {
    /// An inbound record existed: results to success, the record as received to original
    SuccessAndOriginal { record: RecordId, original: RecordId },
    /// No inbound record: the created carrier went to original
    OriginalOnly { record: RecordId },
    /// The carrier went to failure
    Failure { record: RecordId, error: ProcessError },
    /// Nothing could be routed and the session was rolled back
    Aborted(ProcessError),
}

impl RoutingOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RoutingOutcome::Failure { .. } | RoutingOutcome::Aborted(_))
    }

    pub fn error(&self) -> Option<&ProcessError> {
        match self {
            RoutingOutcome::Failure { error, .. } | RoutingOutcome::Aborted(error) => Some(error),
            _ => None,
        }
    }

    /// Relationships that received a record
    pub fn relationships(&self) -> Vec<Relationship> {
        match self {
            RoutingOutcome::SuccessAndOriginal { .. } => vec![Relationship::Success, Relationship::Original],
            RoutingOutcome::OriginalOnly { .. } => vec![Relationship::Original],
            RoutingOutcome::Failure { .. } => vec![Relationship::Failure],
            RoutingOutcome::Aborted(_) => Vec::new(),
        }
    }
}
