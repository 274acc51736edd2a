// Process Session Contract

use std::io::{self, Read, Write};

use thiserror::Error;

use super::relationship::Relationship;
use crate::common::types::RecordId;
use crate::record::Attributes;

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Committed,
    RolledBack,
}

/// Errors raised by a record session
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Record {0} is not part of this session")]
    UnknownRecord(RecordId),

    #[error("Record {0} has already been transferred")]
    AlreadyTransferred(RecordId),

    #[error("Record {0} was neither transferred nor removed before commit")]
    Unaccounted(RecordId),

    #[error("Relationship '{0}' is not connected")]
    Unconnected(Relationship),

    #[error("Session is {0:?}")]
    InvalidState(SessionState),

    #[error("Failed to write record content: {0}")]
    Write(#[from] io::Error),
}

/// Result type for session operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Callback that produces new record content
pub type ContentWriter<'a> = dyn FnMut(&mut dyn Write) -> io::Result<()> + 'a;

/// A unit of work over records.
///
/// Mutations apply to the session's working copies; nothing is visible to
/// the host until `commit`. `rollback` returns received records untouched.
pub trait ProcessSession {
    /// Check out the next inbound record, if any
    fn get(&mut self) -> SessionResult<Option<RecordId>>;

    /// Create an empty record
    fn create(&mut self) -> SessionResult<RecordId>;

    /// Copy a record's current attributes and content under a new identity
    fn clone_record(&mut self, id: RecordId) -> SessionResult<RecordId>;

    /// Drop a record from the session; a received record is consumed
    fn remove(&mut self, id: RecordId) -> SessionResult<()>;

    fn attributes(&self, id: RecordId) -> SessionResult<&Attributes>;

    fn put_attribute(&mut self, id: RecordId, key: &str, value: &str) -> SessionResult<()>;

    fn content(&self, id: RecordId) -> SessionResult<&[u8]>;

    /// Replace a record's content with what `writer` produces.
    /// If the writer fails the previous content is kept.
    fn write(&mut self, id: RecordId, writer: &mut ContentWriter<'_>) -> SessionResult<()>;

    /// Queue a record for routing on commit
    fn transfer(&mut self, id: RecordId, relationship: Relationship) -> SessionResult<()>;

    /// Forget every queued transfer; record mutations are kept
    fn revert_transfers(&mut self);

    fn commit(&mut self) -> SessionResult<()>;

    fn rollback(&mut self);

    fn state(&self) -> SessionState;
}

/// Content writer that drains `reader` into the new content
pub fn copy_from<R: Read + ?Sized>(reader: &mut R) -> impl FnMut(&mut dyn Write) -> io::Result<()> + '_ {
    move |out| io::copy(reader, out).map(|_| ())
}

/// Hands out one session per invocation
pub trait SessionFactory {
    type Session: ProcessSession;

    fn create_session(&self) -> Self::Session;
}
