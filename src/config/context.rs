// Process Context
//
// Raw property values for one configured processor plus the database client
// service handle. Values are evaluated per record; nothing is cached.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::debug;

use super::property::{ExpressionScope, PropertyDescriptor, DATABASE_CLIENT_SERVICE};
use super::{ConfigError, Result};
use crate::engine::DatabaseClientService;
use crate::expression;
use crate::record::Attributes;

/// A configuration problem found by `ProcessContext::validate`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub subject: String,
    pub explanation: String,
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is invalid: {}", self.subject, self.explanation)
    }
}

/// Configured property values of a processor
pub struct ProcessContext {
    properties: HashMap<String, String>,
    client_service: Option<Arc<dyn DatabaseClientService>>,
}

impl fmt::Debug for ProcessContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessContext")
            .field("properties", &self.properties)
            .field("client_service", &self.client_service.as_ref().map(|s| s.identifier().to_string()))
            .finish()
    }
}

impl ProcessContext {
    pub fn builder() -> ProcessContextBuilder {
        ProcessContextBuilder::default()
    }

    /// Value of a property, falling back to its default
    pub fn property<'a>(&'a self, descriptor: &'a PropertyDescriptor) -> PropertyValue<'a> {
        let raw = self
            .properties
            .get(descriptor.name)
            .map(String::as_str)
            .or(descriptor.default_value);
        PropertyValue { descriptor, raw }
    }

    /// The configured database client service
    pub fn database_client_service(&self) -> Result<&Arc<dyn DatabaseClientService>> {
        self.client_service.as_ref().ok_or(ConfigError::MissingClientService)
    }

    /// Check every descriptor against the configured values
    pub fn validate(&self, descriptors: &[&PropertyDescriptor]) -> Vec<ValidationResult> {
        let mut problems = Vec::new();

        for descriptor in descriptors {
            let value = self.property(descriptor);
            let raw = match value.raw() {
                Some(raw) => raw,
                None => {
                    if descriptor.required {
                        problems.push(ValidationResult {
                            subject: descriptor.display_name.to_string(),
                            explanation: format!("{} is required", descriptor.display_name),
                        });
                    }
                    continue;
                }
            };

            if descriptor.supports_expressions() {
                if let Err(e) = expression::compile(raw) {
                    problems.push(ValidationResult {
                        subject: descriptor.display_name.to_string(),
                        explanation: e.to_string(),
                    });
                }
            }

            if descriptor.name == DATABASE_CLIENT_SERVICE.name {
                match &self.client_service {
                    None => problems.push(ValidationResult {
                        subject: descriptor.display_name.to_string(),
                        explanation: format!("no service registered for '{}'", raw),
                    }),
                    Some(service) if service.identifier() != raw => problems.push(ValidationResult {
                        subject: descriptor.display_name.to_string(),
                        explanation: format!(
                            "configured service '{}' does not match registered service '{}'",
                            raw,
                            service.identifier()
                        ),
                    }),
                    Some(_) => {}
                }
            }
        }

        problems
    }
}

/// A property's raw value bound to its descriptor
#[derive(Debug, Clone, Copy)]
pub struct PropertyValue<'a> {
    descriptor: &'a PropertyDescriptor,
    raw: Option<&'a str>,
}

impl<'a> PropertyValue<'a> {
    pub fn raw(&self) -> Option<&'a str> {
        self.raw
    }

    pub fn is_set(&self) -> bool {
        self.raw.is_some()
    }

    /// Evaluate the value's expressions against record attributes
    pub fn evaluate_attribute_expressions(&self, attributes: &Attributes) -> Result<String> {
        let raw = match self.raw {
            Some(raw) => raw,
            None if self.descriptor.required => {
                return Err(ConfigError::MissingProperty(self.descriptor.name.to_string()));
            }
            None => return Ok(String::new()),
        };

        let value = match self.descriptor.expression_scope {
            ExpressionScope::None => raw.to_string(),
            ExpressionScope::RecordAttributes => {
                expression::evaluate(raw, attributes).map_err(|source| ConfigError::Expression {
                    property: self.descriptor.name.to_string(),
                    source,
                })?
            }
        };

        debug!("Evaluated property '{}' to {} bytes", self.descriptor.name, value.len());
        Ok(value)
    }
}

/// Builder for `ProcessContext`
#[derive(Default)]
pub struct ProcessContextBuilder {
    properties: HashMap<String, String>,
    client_service: Option<Arc<dyn DatabaseClientService>>,
}

impl ProcessContextBuilder {
    pub fn property(mut self, descriptor: &PropertyDescriptor, value: impl Into<String>) -> Self {
        self.properties.insert(descriptor.name.to_string(), value.into());
        self
    }

    /// Register the client service and point the service property at it
    pub fn client_service(mut self, service: Arc<dyn DatabaseClientService>) -> Self {
        self.properties
            .insert(DATABASE_CLIENT_SERVICE.name.to_string(), service.identifier().to_string());
        self.client_service = Some(service);
        self
    }

    /// Merge a JSON object of `{"property name": "value"}` pairs
    pub fn json_properties(mut self, document: &str, supported: &[&PropertyDescriptor]) -> Result<Self> {
        let values: HashMap<String, String> = serde_json::from_str(document)
            .map_err(|e| ConfigError::InvalidDocument(e.to_string()))?;

        for (name, value) in values {
            if !supported.iter().any(|d| d.name == name) {
                return Err(ConfigError::UnknownProperty(name));
            }
            self.properties.insert(name, value);
        }
        Ok(self)
    }

    pub fn build(self) -> ProcessContext {
        ProcessContext {
            properties: self.properties,
            client_service: self.client_service,
        }
    }
}
