// Shared identifiers and constants

pub mod types;

pub use types::{RecordId, OPTIC_PLAN_ATTRIBUTE};
