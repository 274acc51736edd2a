// Row-Query Processor Module
//
// Executes a serialized plan per trigger and routes the carrier record.

pub mod error;
pub mod query_rows;

pub use error::{ErrorKind, ProcessError, RoutingOutcome};
pub use query_rows::QueryRowsProcessor;
