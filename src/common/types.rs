/// Record ID type
pub type RecordId = u64;

/// Attribute holding the resolved plan text on every record the executor touches
pub const OPTIC_PLAN_ATTRIBUTE: &str = "marklogic-optic-plan";

/// MIME type requested when the property is left unset
pub const DEFAULT_MIME_TYPE: &str = "text/csv";

/// Environment variable through which command-backed engines learn the requested MIME type
pub const MIME_TYPE_ENV: &str = "OPTIC_MIME_TYPE";
