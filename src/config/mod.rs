// Processor Configuration Module
//
// Property descriptors, the per-processor property context, and configuration errors.

pub mod property;
pub mod context;

use thiserror::Error;

use crate::expression::ExpressionError;

pub use property::{PropertyDescriptor, ExpressionScope, DATABASE_CLIENT_SERVICE, PLAN, MIME_TYPE};
pub use context::{ProcessContext, ProcessContextBuilder, PropertyValue, ValidationResult};

/// Errors raised while resolving processor configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Required property '{0}' is not set")]
    MissingProperty(String),

    #[error("Property '{property}' evaluated to an empty value")]
    EmptyValue { property: String },

    #[error("Unknown property '{0}'")]
    UnknownProperty(String),

    #[error("Invalid expression in property '{property}': {source}")]
    Expression {
        property: String,
        #[source]
        source: ExpressionError,
    },

    #[error("No database client service is configured")]
    MissingClientService,

    #[error("Invalid properties document: {0}")]
    InvalidDocument(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
