// Expression Evaluation
//
// Evaluates a parsed template against record attributes. A missing attribute
// is null; null renders as empty text.

use std::fmt;

use super::ast::{Argument, Call, Expression, Function, Segment, Subject, Template};
use super::{ExpressionError, Result};
use crate::record::Attributes;

/// Intermediate value produced while applying a call chain
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Boolean(bool),
    Integer(i64),
}

impl Value {
    /// Text form, `None` for null
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Text(s) => Some(s.clone()),
            Value::Boolean(b) => Some(b.to_string()),
            Value::Integer(i) => Some(i.to_string()),
        }
    }

    fn text_or_empty(&self) -> String {
        self.as_text().unwrap_or_default()
    }

    fn is_blank(&self) -> bool {
        self.as_text().is_none_or(|s| s.trim().is_empty())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text_or_empty())
    }
}

impl Template {
    /// Render the template against the given attributes
    pub fn evaluate(&self, attributes: &Attributes) -> Result<String> {
        let mut output = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => output.push_str(text),
                Segment::Expression(expr) => {
                    output.push_str(&expr.evaluate(attributes)?.text_or_empty());
                }
            }
        }
        Ok(output)
    }
}

impl Expression {
    pub fn evaluate(&self, attributes: &Attributes) -> Result<Value> {
        let mut value = match &self.subject {
            Subject::Attribute(name) => attributes
                .get(name)
                .map(|v| Value::Text(v.clone()))
                .unwrap_or(Value::Null),
            Subject::Literal(text) => Value::Text(text.clone()),
        };

        for call in &self.calls {
            value = apply(call, value, attributes)?;
        }

        Ok(value)
    }
}

fn text_arg(call: &Call, index: usize, attributes: &Attributes) -> Result<String> {
    match &call.args[index] {
        Argument::Text(s) => Ok(s.clone()),
        Argument::Integer(i) => Ok(i.to_string()),
        Argument::Expression(expr) => Ok(expr.evaluate(attributes)?.text_or_empty()),
    }
}

fn integer_arg(call: &Call, index: usize, attributes: &Attributes) -> Result<i64> {
    let invalid = |reason: String| ExpressionError::InvalidArgument {
        function: call.function.name().to_string(),
        reason,
    };

    let value = match &call.args[index] {
        Argument::Integer(i) => *i,
        Argument::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(format!("'{}' is not an integer", s)))?,
        Argument::Expression(expr) => {
            let text = expr.evaluate(attributes)?.text_or_empty();
            text.trim()
                .parse::<i64>()
                .map_err(|_| invalid(format!("'{}' is not an integer", text)))?
        }
    };

    if value < 0 {
        return Err(invalid(format!("index {} is negative", value)));
    }
    Ok(value)
}

/// Map the subject's text, passing null through untouched
fn map_text(value: Value, f: impl FnOnce(String) -> String) -> Value {
    match value.as_text() {
        Some(text) => Value::Text(f(text)),
        None => Value::Null,
    }
}

fn test_text(value: &Value, f: impl FnOnce(&str) -> bool) -> Value {
    Value::Boolean(value.as_text().is_some_and(|text| f(&text)))
}

fn apply(call: &Call, value: Value, attributes: &Attributes) -> Result<Value> {
    let result = match call.function {
        Function::ToUpper => map_text(value, |s| s.to_uppercase()),
        Function::ToLower => map_text(value, |s| s.to_lowercase()),
        Function::Trim => map_text(value, |s| s.trim().to_string()),
        Function::Append => {
            let suffix = text_arg(call, 0, attributes)?;
            Value::Text(value.text_or_empty() + &suffix)
        }
        Function::Prepend => {
            let prefix = text_arg(call, 0, attributes)?;
            Value::Text(prefix + &value.text_or_empty())
        }
        Function::Replace => {
            let search = text_arg(call, 0, attributes)?;
            let replacement = text_arg(call, 1, attributes)?;
            map_text(value, |s| {
                if search.is_empty() {
                    s
                } else {
                    s.replace(&search, &replacement)
                }
            })
        }
        Function::Substring => {
            let start = integer_arg(call, 0, attributes)? as usize;
            let end = if call.args.len() > 1 {
                Some(integer_arg(call, 1, attributes)? as usize)
            } else {
                None
            };
            map_text(value, |s| {
                let chars: Vec<char> = s.chars().collect();
                let start = start.min(chars.len());
                let end = end.unwrap_or(chars.len()).clamp(start, chars.len());
                chars[start..end].iter().collect()
            })
        }
        Function::SubstringBefore => {
            let marker = text_arg(call, 0, attributes)?;
            map_text(value, |s| match s.find(&marker) {
                Some(idx) => s[..idx].to_string(),
                None => s,
            })
        }
        Function::SubstringAfter => {
            let marker = text_arg(call, 0, attributes)?;
            map_text(value, |s| match s.find(&marker) {
                Some(idx) => s[idx + marker.len()..].to_string(),
                None => s,
            })
        }
        Function::Length => Value::Integer(value.text_or_empty().chars().count() as i64),
        Function::IsEmpty => Value::Boolean(value.is_blank()),
        Function::IsNull => Value::Boolean(value == Value::Null),
        Function::NotNull => Value::Boolean(value != Value::Null),
        Function::Equals => {
            let other = text_arg(call, 0, attributes)?;
            test_text(&value, |s| s == other)
        }
        Function::Contains => {
            let needle = text_arg(call, 0, attributes)?;
            test_text(&value, |s| s.contains(&needle))
        }
        Function::StartsWith => {
            let prefix = text_arg(call, 0, attributes)?;
            test_text(&value, |s| s.starts_with(&prefix))
        }
        Function::EndsWith => {
            let suffix = text_arg(call, 0, attributes)?;
            test_text(&value, |s| s.ends_with(&suffix))
        }
        Function::Not => match value {
            Value::Boolean(b) => Value::Boolean(!b),
            Value::Text(ref s) if s.eq_ignore_ascii_case("true") => Value::Boolean(false),
            Value::Text(ref s) if s.eq_ignore_ascii_case("false") => Value::Boolean(true),
            other => {
                return Err(ExpressionError::InvalidArgument {
                    function: call.function.name().to_string(),
                    reason: format!("subject '{}' is not a boolean", other),
                });
            }
        },
        Function::ReplaceNull => match value {
            Value::Null => Value::Text(text_arg(call, 0, attributes)?),
            other => other,
        },
        Function::ReplaceEmpty => {
            if value.is_blank() {
                Value::Text(text_arg(call, 0, attributes)?)
            } else {
                value
            }
        }
        Function::EscapeJson => map_text(value, |s| {
            let quoted = serde_json::Value::String(s).to_string();
            quoted[1..quoted.len() - 1].to_string()
        }),
    };

    Ok(result)
}
