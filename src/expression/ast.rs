// Expression Template AST

use std::fmt;
use std::ops::RangeInclusive;

/// A parsed template: literal text interleaved with expressions
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub segments: Vec<Segment>,
}

impl Template {
    /// True when the template contains no `${...}` expression
    pub fn is_literal(&self) -> bool {
        self.segments.iter().all(|s| matches!(s, Segment::Literal(_)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Expression(Expression),
}

/// `${subject:call(...):call(...)}`
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub subject: Subject,
    pub calls: Vec<Call>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Subject {
    /// Attribute lookup by name
    Attribute(String),
    /// `literal('text')`
    Literal(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub function: Function,
    pub args: Vec<Argument>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Text(String),
    Integer(i64),
    Expression(Expression),
}

/// Functions that can be chained onto a subject
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    ToUpper,
    ToLower,
    Trim,
    Append,
    Prepend,
    Replace,
    Substring,
    SubstringBefore,
    SubstringAfter,
    Length,
    IsEmpty,
    IsNull,
    NotNull,
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    Not,
    ReplaceNull,
    ReplaceEmpty,
    EscapeJson,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        let function = match name {
            "toUpper" => Function::ToUpper,
            "toLower" => Function::ToLower,
            "trim" => Function::Trim,
            "append" => Function::Append,
            "prepend" => Function::Prepend,
            "replace" => Function::Replace,
            "substring" => Function::Substring,
            "substringBefore" => Function::SubstringBefore,
            "substringAfter" => Function::SubstringAfter,
            "length" => Function::Length,
            "isEmpty" => Function::IsEmpty,
            "isNull" => Function::IsNull,
            "notNull" => Function::NotNull,
            "equals" => Function::Equals,
            "contains" => Function::Contains,
            "startsWith" => Function::StartsWith,
            "endsWith" => Function::EndsWith,
            "not" => Function::Not,
            "replaceNull" => Function::ReplaceNull,
            "replaceEmpty" => Function::ReplaceEmpty,
            "escapeJson" => Function::EscapeJson,
            _ => return None,
        };
        Some(function)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::ToUpper => "toUpper",
            Function::ToLower => "toLower",
            Function::Trim => "trim",
            Function::Append => "append",
            Function::Prepend => "prepend",
            Function::Replace => "replace",
            Function::Substring => "substring",
            Function::SubstringBefore => "substringBefore",
            Function::SubstringAfter => "substringAfter",
            Function::Length => "length",
            Function::IsEmpty => "isEmpty",
            Function::IsNull => "isNull",
            Function::NotNull => "notNull",
            Function::Equals => "equals",
            Function::Contains => "contains",
            Function::StartsWith => "startsWith",
            Function::EndsWith => "endsWith",
            Function::Not => "not",
            Function::ReplaceNull => "replaceNull",
            Function::ReplaceEmpty => "replaceEmpty",
            Function::EscapeJson => "escapeJson",
        }
    }

    /// Accepted argument counts
    pub fn arity(&self) -> RangeInclusive<usize> {
        match self {
            Function::ToUpper
            | Function::ToLower
            | Function::Trim
            | Function::Length
            | Function::IsEmpty
            | Function::IsNull
            | Function::NotNull
            | Function::Not
            | Function::EscapeJson => 0..=0,
            Function::Append
            | Function::Prepend
            | Function::SubstringBefore
            | Function::SubstringAfter
            | Function::Equals
            | Function::Contains
            | Function::StartsWith
            | Function::EndsWith
            | Function::ReplaceNull
            | Function::ReplaceEmpty => 1..=1,
            Function::Replace => 2..=2,
            Function::Substring => 1..=2,
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
