// Property Descriptors

use std::fmt;

use crate::common::types::DEFAULT_MIME_TYPE;

/// Where a property's expressions may draw values from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionScope {
    /// The value is used verbatim
    None,
    /// `${...}` expressions are evaluated against record attributes
    RecordAttributes,
}

/// Static description of a configurable property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub required: bool,
    pub default_value: Option<&'static str>,
    pub expression_scope: ExpressionScope,
}

impl PropertyDescriptor {
    pub fn supports_expressions(&self) -> bool {
        self.expression_scope != ExpressionScope::None
    }
}

impl fmt::Display for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name)
    }
}

pub static DATABASE_CLIENT_SERVICE: PropertyDescriptor = PropertyDescriptor {
    name: "DatabaseClient Service",
    display_name: "DatabaseClient Service",
    description: "The database client service that provides connections to the row-query engine",
    required: true,
    default_value: None,
    expression_scope: ExpressionScope::None,
};

pub static PLAN: PropertyDescriptor = PropertyDescriptor {
    name: "Plan",
    display_name: "Plan",
    description: "A serialized Optic query plan",
    required: true,
    default_value: None,
    expression_scope: ExpressionScope::RecordAttributes,
};

pub static MIME_TYPE: PropertyDescriptor = PropertyDescriptor {
    name: "MIME Type",
    display_name: "MIME Type",
    description: "The MIME type to use when returning the rows",
    required: true,
    default_value: Some(DEFAULT_MIME_TYPE),
    expression_scope: ExpressionScope::RecordAttributes,
};
