// Attribute Expression Language Module
//
// Templates mixing literal text with `${attribute:function(args)}` expressions,
// evaluated against the attributes of a record.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod evaluator;

use thiserror::Error;

use crate::record::Attributes;

pub use ast::{Template, Segment, Expression, Subject, Call, Argument, Function};
pub use evaluator::Value;
pub use parser::Parser;

/// Errors raised while compiling or evaluating an expression template
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Unterminated expression starting at position {0}")]
    UnterminatedExpression(usize),

    #[error("Unterminated string literal starting at position {0}")]
    UnterminatedString(usize),

    #[error("Unexpected character '{ch}' at position {position}")]
    UnexpectedCharacter { ch: char, position: usize },

    #[error("Unexpected token {found} at position {position}")]
    UnexpectedToken { found: String, position: usize },

    #[error("Empty expression at position {0}")]
    EmptyExpression(usize),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Function {function} expects {expected} argument(s), found {found}")]
    ArgumentCount { function: String, expected: String, found: usize },

    #[error("Invalid argument for {function}: {reason}")]
    InvalidArgument { function: String, reason: String },
}

/// Result type for expression operations
pub type Result<T> = std::result::Result<T, ExpressionError>;

/// Parse a template without evaluating it
pub fn compile(template: &str) -> Result<Template> {
    Parser::new(template).parse_template()
}

/// Parse and evaluate a template against the given attributes
pub fn evaluate(template: &str, attributes: &Attributes) -> Result<String> {
    compile(template)?.evaluate(attributes)
}
