// Flow Record Implementation

use linked_hash_map::LinkedHashMap;

use crate::common::types::RecordId;

/// Record attributes, kept in insertion order
pub type Attributes = LinkedHashMap<String, String>;

/// A single record: identity, attributes and content bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRecord {
    id: RecordId,
    attributes: Attributes,
    content: Vec<u8>,
}

impl FlowRecord {
    /// Create an empty record with the given ID
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            attributes: Attributes::new(),
            content: Vec::new(),
        }
    }

    /// Create a record carrying the given attributes and content
    pub fn with_parts(id: RecordId, attributes: Attributes, content: Vec<u8>) -> Self {
        Self { id, attributes, content }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Set an attribute, replacing any previous value but keeping its position
    pub fn put_attribute(&mut self, key: &str, value: &str) {
        if let Some(existing) = self.attributes.get_mut(key) {
            *existing = value.to_string();
        } else {
            self.attributes.insert(key.to_string(), value.to_string());
        }
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Replace the content body
    pub fn set_content(&mut self, content: Vec<u8>) {
        self.content = content;
    }

    /// Copy of this record under a new identity
    pub fn duplicate(&self, id: RecordId) -> Self {
        Self {
            id,
            attributes: self.attributes.clone(),
            content: self.content.clone(),
        }
    }
}
