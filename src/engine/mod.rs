// Row-Query Engine Client Module
//
// Seams to the external row-query engine: the client service that hands out
// connections, the row manager that executes raw plans, and the result stream.

pub mod client;
pub mod command;

pub use client::{
    DatabaseClient, DatabaseClientService, EngineError, EngineResult, RawPlan, ResultStream, RowManager,
};
pub use command::{CommandClient, CommandClientService};
