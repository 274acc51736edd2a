// Flow Record Module
//
// Units of data moved through a record session: ordered attributes plus a content body.

pub mod flow_record;

pub use flow_record::{Attributes, FlowRecord};
