// Engine Client Traits

use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

use thiserror::Error;

/// Errors reported by the row-query engine or its connection layer
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Plan rejected by engine: {0}")]
    PlanRejected(String),

    #[error("Query execution failed: {0}")]
    Execution(String),

    #[error("Engine I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// A serialized plan ready for submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPlan {
    text: String,
}

impl RawPlan {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }
}

/// Lazily readable encoded rows. Dropping the stream releases the engine resource.
pub struct ResultStream {
    mime_type: String,
    reader: Box<dyn Read + Send>,
}

impl ResultStream {
    pub fn new(mime_type: impl Into<String>, reader: Box<dyn Read + Send>) -> Self {
        Self {
            mime_type: mime_type.into(),
            reader,
        }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

impl Read for ResultStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for ResultStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultStream").field("mime_type", &self.mime_type).finish()
    }
}

/// Executes plans and returns encoded rows
pub trait RowManager {
    /// Wrap plan text for submission; the text is not interpreted here
    fn new_raw_plan_definition(&self, plan: &str) -> RawPlan {
        RawPlan::new(plan)
    }

    /// Execute the plan; `None` means the engine produced no document
    fn result_doc(&self, plan: &RawPlan, mime_type: &str) -> EngineResult<Option<ResultStream>>;
}

/// A connection to the row-query engine
pub trait DatabaseClient: Send + Sync {
    fn new_row_manager(&self) -> Box<dyn RowManager + '_>;
}

/// Connection-pool handle configured on the processor
pub trait DatabaseClientService: Send + Sync {
    /// Name the processor's service property refers to
    fn identifier(&self) -> &str;

    fn client(&self) -> EngineResult<Arc<dyn DatabaseClient>>;
}
