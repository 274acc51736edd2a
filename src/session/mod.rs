// Record Session Module
//
// The host-side unit of work: records are checked out or created, mutated,
// transferred to relationships, and committed or rolled back together.

pub mod relationship;
pub mod process_session;
pub mod memory;

pub use relationship::Relationship;
pub use process_session::{copy_from, ContentWriter, ProcessSession, SessionFactory, SessionError, SessionResult, SessionState};
pub use memory::{InMemoryFlow, MemorySession};
