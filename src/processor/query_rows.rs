// Query Rows Processor
//
// Resolves the plan and MIME type against the carrier record, runs the plan
// through the configured row manager, and writes the returned document into
// the carrier. Every error ends in exactly one transfer to failure.

use log::{debug, error, info};
use once_cell::sync::Lazy;

use super::error::{ProcessError, RoutingOutcome};
use crate::common::types::{RecordId, OPTIC_PLAN_ATTRIBUTE};
use crate::config::{
    ConfigError, ProcessContext, PropertyDescriptor, ValidationResult, DATABASE_CLIENT_SERVICE, MIME_TYPE, PLAN,
};
use crate::record::Attributes;
use crate::session::{copy_from, ProcessSession, Relationship, SessionFactory, SessionResult};

static PROPERTIES: Lazy<Vec<&'static PropertyDescriptor>> =
    Lazy::new(|| vec![&DATABASE_CLIENT_SERVICE, &PLAN, &MIME_TYPE]);

/// Records the trigger has created or checked out so far
#[derive(Debug, Default)]
struct Handles {
    carrier: Option<RecordId>,
    original: Option<RecordId>,
}

/// Executes a serialized Optic query plan and writes the returned rows to a record
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryRowsProcessor;

impl QueryRowsProcessor {
    pub fn new() -> Self {
        QueryRowsProcessor
    }

    /// Supported properties, in display order
    pub fn properties() -> &'static [&'static PropertyDescriptor] {
        &PROPERTIES
    }

    pub fn relationships() -> &'static [Relationship] {
        &Relationship::ALL
    }

    /// Configuration problems that would prevent scheduling
    pub fn validate(&self, context: &ProcessContext) -> Vec<ValidationResult> {
        context.validate(Self::properties())
    }

    pub fn determine_plan(&self, context: &ProcessContext, attributes: &Attributes) -> Result<String, ProcessError> {
        let plan = context.property(&PLAN).evaluate_attribute_expressions(attributes)?;
        if plan.trim().is_empty() {
            return Err(ConfigError::EmptyValue { property: PLAN.name.to_string() }.into());
        }
        Ok(plan)
    }

    pub fn determine_mime_type(&self, context: &ProcessContext, attributes: &Attributes) -> Result<String, ProcessError> {
        Ok(context.property(&MIME_TYPE).evaluate_attribute_expressions(attributes)?)
    }

    /// Run one invocation against a fresh session from `factory`
    pub fn on_trigger<F: SessionFactory>(&self, context: &ProcessContext, factory: &F) -> RoutingOutcome {
        let mut session = factory.create_session();
        let mut handles = Handles::default();

        match self.execute(context, &mut session, &mut handles) {
            Ok(outcome) => outcome,
            Err(error) => self.route_failure(&mut session, handles, error),
        }
    }

    fn execute<S: ProcessSession>(
        &self,
        context: &ProcessContext,
        session: &mut S,
        handles: &mut Handles,
    ) -> Result<RoutingOutcome, ProcessError> {
        let incoming = session.get()?;
        let carrier = match incoming {
            Some(id) => id,
            None => session.create()?,
        };
        handles.carrier = Some(carrier);

        // Snapshot the record as received for the original relationship
        if let Some(id) = incoming {
            handles.original = Some(session.clone_record(id)?);
        }

        // Both templates see the attributes as received
        let plan = self.determine_plan(context, session.attributes(carrier)?)?;
        let mime_type = self.determine_mime_type(context, session.attributes(carrier)?);
        session.put_attribute(carrier, OPTIC_PLAN_ATTRIBUTE, &plan)?;
        let mime_type = mime_type?;
        debug!("Resolved {} byte plan for record {} as {}", plan.len(), carrier, mime_type);

        let client = context.database_client_service()?.client()?;
        let row_manager = client.new_row_manager();
        let raw_plan = row_manager.new_raw_plan_definition(&plan);

        match row_manager.result_doc(&raw_plan, &mime_type)? {
            Some(mut stream) => {
                debug!("Copying {} result document into record {}", stream.mime_type(), carrier);
                session.write(carrier, &mut copy_from(&mut stream))?;
            }
            None => debug!("Engine returned no document for record {}", carrier),
        }

        let outcome = match handles.original {
            Some(original) => {
                session.transfer(carrier, Relationship::Success)?;
                session.transfer(original, Relationship::Original)?;
                RoutingOutcome::SuccessAndOriginal { record: carrier, original }
            }
            None => {
                session.transfer(carrier, Relationship::Original)?;
                RoutingOutcome::OriginalOnly { record: carrier }
            }
        };
        session.commit()?;

        info!("Executed plan for record {}; routed to {:?}", carrier, outcome.relationships());
        Ok(outcome)
    }

    fn route_failure<S: ProcessSession>(&self, session: &mut S, handles: Handles, error: ProcessError) -> RoutingOutcome {
        let record = match handles.carrier {
            Some(record) => record,
            None => {
                error!("Unable to obtain a record; rolling back: {}", error);
                session.rollback();
                return RoutingOutcome::Aborted(error);
            }
        };

        error!("Failed to execute plan for record {}; routing to {}: {}", record, Relationship::Failure, error);

        match transfer_to_failure(session, record, handles.original) {
            Ok(()) => RoutingOutcome::Failure { record, error },
            Err(e) => {
                error!("Unable to route record {} to {}: {}; rolling back", record, Relationship::Failure, e);
                session.rollback();
                RoutingOutcome::Aborted(error)
            }
        }
    }
}

fn transfer_to_failure<S: ProcessSession>(session: &mut S, record: RecordId, original: Option<RecordId>) -> SessionResult<()> {
    session.revert_transfers();
    if let Some(original) = original {
        session.remove(original)?;
    }
    session.transfer(record, Relationship::Failure)?;
    session.commit()
}
