// opticflow: runs serialized Optic plans against a row-query engine and
// routes the encoded rows through a record session

pub mod common;
pub mod record;
pub mod expression;
pub mod config;
pub mod engine;
pub mod session;
pub mod processor;

// Re-export key items for convenient access
pub use common::types::{RecordId, OPTIC_PLAN_ATTRIBUTE};
pub use record::{Attributes, FlowRecord};
pub use config::{ProcessContext, ConfigError};
pub use engine::{DatabaseClient, DatabaseClientService, RowManager, RawPlan, ResultStream, EngineError};
pub use session::{InMemoryFlow, ProcessSession, Relationship, SessionFactory};
pub use processor::{QueryRowsProcessor, RoutingOutcome, ProcessError};
