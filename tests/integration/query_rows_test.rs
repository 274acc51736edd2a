use anyhow::Result;

use opticflow::config::{ConfigError, ProcessContext, PLAN};
use opticflow::processor::ErrorKind;
use opticflow::{
    EngineError, FlowRecord, InMemoryFlow, ProcessError, QueryRowsProcessor, Relationship, RoutingOutcome,
    OPTIC_PLAN_ATTRIBUTE,
};

#[path = "../common/mod.rs"]
mod common;
use common::{attrs, stub_context, Response, StubService, Submission};

const PLAN_TEXT: &str = "{\"$optic\":{\"ns\":\"op\",\"fn\":\"operators\",\"args\":[]}}";

fn only(records: Vec<FlowRecord>) -> FlowRecord {
    assert_eq!(records.len(), 1, "Expected exactly one record, got {:?}", records);
    records.into_iter().next().unwrap()
}

#[test]
fn test_no_inbound_record_routes_created_record_to_original() -> Result<()> {
    let service = StubService::new(Response::Document(b"a,b\n1,2".to_vec()));
    let context = stub_context(&service, PLAN_TEXT, Some("text/csv"));
    let flow = InMemoryFlow::new();
    flow.connect(Relationship::Original);

    let outcome = QueryRowsProcessor::new().on_trigger(&context, &flow);

    assert!(matches!(outcome, RoutingOutcome::OriginalOnly { .. }));
    let record = only(flow.output(Relationship::Original));
    assert_eq!(record.content(), b"a,b\n1,2");
    assert_eq!(record.attribute(OPTIC_PLAN_ATTRIBUTE), Some(PLAN_TEXT));
    assert!(flow.output(Relationship::Success).is_empty());
    assert!(flow.output(Relationship::Failure).is_empty());

    assert_eq!(
        service.submissions(),
        vec![Submission { plan: PLAN_TEXT.to_string(), mime_type: "text/csv".to_string() }]
    );
    assert!(service.stream_closed());
    Ok(())
}

#[test]
fn test_no_inbound_record_with_original_unconnected_is_auto_terminated() {
    let service = StubService::new(Response::Document(b"a,b\n1,2".to_vec()));
    let context = stub_context(&service, PLAN_TEXT, None);
    let flow = InMemoryFlow::new();

    let outcome = QueryRowsProcessor::new().on_trigger(&context, &flow);

    assert_eq!(outcome.relationships(), vec![Relationship::Original]);
    assert_eq!(flow.auto_terminated(), 1);
    assert_eq!(flow.commits(), 1);
}

#[test]
fn test_inbound_record_routes_to_success_and_original() -> Result<()> {
    let service = StubService::new(Response::Document(b"id,name\n1,alpha\n".to_vec()));
    let context = stub_context(&service, "${plan}", Some("${format}"));
    let flow = InMemoryFlow::new();
    flow.connect(Relationship::Original);
    let inbound = flow.enqueue(attrs(&[("plan", PLAN_TEXT), ("format", "text/csv")]), b"inbound".to_vec());

    let outcome = QueryRowsProcessor::new().on_trigger(&context, &flow);

    match outcome {
        RoutingOutcome::SuccessAndOriginal { record, original } => {
            assert_eq!(record, inbound);
            assert_ne!(original, inbound);
        }
        other => panic!("Unexpected outcome: {:?}", other),
    }

    let success = only(flow.output(Relationship::Success));
    assert_eq!(success.id(), inbound);
    assert_eq!(success.content(), b"id,name\n1,alpha\n");
    assert_eq!(success.attribute(OPTIC_PLAN_ATTRIBUTE), Some(PLAN_TEXT));
    assert_eq!(success.attribute("format"), Some("text/csv"));

    // The original is the record as it arrived
    let original = only(flow.output(Relationship::Original));
    assert_eq!(original.content(), b"inbound");
    assert_eq!(original.attribute(OPTIC_PLAN_ATTRIBUTE), None);
    assert_eq!(original.attribute("plan"), Some(PLAN_TEXT));

    assert_eq!(service.submissions()[0].mime_type, "text/csv");
    assert_eq!(flow.queued(), 0);
    Ok(())
}

#[test]
fn test_no_document_keeps_inbound_content() {
    let service = StubService::new(Response::NoDocument);
    let context = stub_context(&service, PLAN_TEXT, None);
    let flow = InMemoryFlow::new();
    flow.connect(Relationship::Original);
    flow.enqueue(attrs(&[("filename", "rows.csv")]), b"untouched".to_vec());

    let outcome = QueryRowsProcessor::new().on_trigger(&context, &flow);

    assert_eq!(outcome.relationships(), vec![Relationship::Success, Relationship::Original]);
    let success = only(flow.output(Relationship::Success));
    assert_eq!(success.content(), b"untouched");
    assert_eq!(success.attribute(OPTIC_PLAN_ATTRIBUTE), Some(PLAN_TEXT));
    assert_eq!(flow.output(Relationship::Original).len(), 1);
    assert_eq!(service.streams_opened(), 0);
}

#[test]
fn test_mime_type_failure_keeps_resolved_plan_attribute() {
    let service = StubService::new(Response::Document(b"never".to_vec()));
    let context = stub_context(&service, "${plan}", Some("${format:not()}"));
    let flow = InMemoryFlow::new();
    flow.connect(Relationship::Original);
    flow.enqueue(attrs(&[("plan", PLAN_TEXT), ("format", "csv")]), b"inbound".to_vec());

    let outcome = QueryRowsProcessor::new().on_trigger(&context, &flow);

    assert!(matches!(
        outcome,
        RoutingOutcome::Failure { error: ProcessError::Configuration(ConfigError::Expression { .. }), .. }
    ));
    assert!(service.submissions().is_empty(), "No plan should be submitted");

    let failed = only(flow.output(Relationship::Failure));
    assert_eq!(failed.attribute(OPTIC_PLAN_ATTRIBUTE), Some(PLAN_TEXT));
    assert_eq!(failed.content(), b"inbound");
    assert!(flow.output(Relationship::Success).is_empty());
    assert!(flow.output(Relationship::Original).is_empty());
}

#[test]
fn test_mime_type_resolves_against_attributes_as_received() {
    let service = StubService::new(Response::Document(b"rows".to_vec()));
    let context = stub_context(&service, "NEW", Some("${marklogic-optic-plan:replaceNull('none')}"));
    let flow = InMemoryFlow::new();
    flow.enqueue(attrs(&[(OPTIC_PLAN_ATTRIBUTE, "OLD")]), Vec::new());

    let outcome = QueryRowsProcessor::new().on_trigger(&context, &flow);

    assert!(!outcome.is_failure());
    assert_eq!(
        service.submissions(),
        vec![Submission { plan: "NEW".to_string(), mime_type: "OLD".to_string() }]
    );
    let success = only(flow.output(Relationship::Success));
    assert_eq!(success.attribute(OPTIC_PLAN_ATTRIBUTE), Some("NEW"));
}

#[test]
fn test_stream_failure_mid_copy_routes_to_failure_and_closes_stream() {
    let service = StubService::new(Response::Broken(b"a,b\n1,".to_vec()));
    let context = stub_context(&service, PLAN_TEXT, None);
    let flow = InMemoryFlow::new();
    flow.connect(Relationship::Original);
    flow.enqueue(attrs(&[]), b"before".to_vec());

    let outcome = QueryRowsProcessor::new().on_trigger(&context, &flow);

    let error = outcome.error().expect("failure carries its error");
    assert_eq!(error.kind(), ErrorKind::Io);

    let failed = only(flow.output(Relationship::Failure));
    assert_eq!(failed.attribute(OPTIC_PLAN_ATTRIBUTE), Some(PLAN_TEXT));
    // Writes are staged, so the partial copy never lands
    assert_eq!(failed.content(), b"before");
    assert!(service.stream_closed());
    assert!(flow.output(Relationship::Original).is_empty());
}

#[test]
fn test_engine_rejection_routes_to_failure() {
    let service = StubService::new(Response::Rejected("unknown operator".to_string()));
    let context = stub_context(&service, PLAN_TEXT, None);
    let flow = InMemoryFlow::new();
    flow.enqueue(attrs(&[]), Vec::new());

    let outcome = QueryRowsProcessor::new().on_trigger(&context, &flow);

    assert!(matches!(
        outcome,
        RoutingOutcome::Failure { error: ProcessError::Engine(EngineError::PlanRejected(_)), .. }
    ));
    assert_eq!(flow.output(Relationship::Failure).len(), 1);
    assert!(flow.output(Relationship::Success).is_empty());
    assert_eq!(flow.auto_terminated(), 0);
}

#[test]
fn test_unreachable_engine_routes_created_record_to_failure() {
    let service = StubService::new(Response::Unreachable);
    let context = stub_context(&service, PLAN_TEXT, None);
    let flow = InMemoryFlow::new();

    let outcome = QueryRowsProcessor::new().on_trigger(&context, &flow);

    assert_eq!(outcome.error().map(ProcessError::kind), Some(ErrorKind::Engine));
    let failed = only(flow.output(Relationship::Failure));
    assert_eq!(failed.attribute(OPTIC_PLAN_ATTRIBUTE), Some(PLAN_TEXT));
    assert!(failed.content().is_empty());
}

#[test]
fn test_blank_plan_routes_to_failure_without_attribute() {
    let service = StubService::new(Response::Document(b"rows".to_vec()));
    let context = stub_context(&service, "${missing}", None);
    let flow = InMemoryFlow::new();
    flow.enqueue(attrs(&[]), b"in".to_vec());

    let outcome = QueryRowsProcessor::new().on_trigger(&context, &flow);

    assert!(matches!(
        outcome,
        RoutingOutcome::Failure { error: ProcessError::Configuration(ConfigError::EmptyValue { .. }), .. }
    ));
    let failed = only(flow.output(Relationship::Failure));
    assert_eq!(failed.attribute(OPTIC_PLAN_ATTRIBUTE), None);
    assert!(service.submissions().is_empty());
}

#[test]
fn test_failure_is_exclusive_of_other_relationships() {
    let service = StubService::new(Response::Broken(Vec::new()));
    let context = stub_context(&service, PLAN_TEXT, None);
    let flow = InMemoryFlow::new();
    flow.connect(Relationship::Original);
    flow.enqueue(attrs(&[("n", "1")]), Vec::new());

    let outcome = QueryRowsProcessor::new().on_trigger(&context, &flow);

    assert_eq!(outcome.relationships(), vec![Relationship::Failure]);
    assert_eq!(flow.output(Relationship::Failure).len(), 1);
    assert!(flow.output(Relationship::Success).is_empty());
    assert!(flow.output(Relationship::Original).is_empty());
    assert_eq!(flow.auto_terminated(), 0);
    assert_eq!(flow.commits(), 1);
}

#[test]
fn test_unroutable_failure_rolls_back() {
    let service = StubService::new(Response::Rejected("bad plan".to_string()));
    let context = stub_context(&service, PLAN_TEXT, None);
    let flow = InMemoryFlow::new();
    flow.disconnect(Relationship::Failure);
    flow.enqueue(attrs(&[("n", "1")]), b"kept".to_vec());

    let outcome = QueryRowsProcessor::new().on_trigger(&context, &flow);

    assert!(matches!(outcome, RoutingOutcome::Aborted(ProcessError::Engine(_))));
    assert_eq!(flow.queued(), 1);
    assert_eq!(flow.rollbacks(), 1);
    assert_eq!(flow.commits(), 0);
}

#[test]
fn test_repeated_invocations_produce_identical_content() {
    let service = StubService::new(Response::Document(b"x,y\n3,4\n".to_vec()));
    let context = stub_context(&service, PLAN_TEXT, None);
    let flow = InMemoryFlow::new();
    let processor = QueryRowsProcessor::new();

    for _ in 0..3 {
        flow.enqueue(attrs(&[("filename", "same")]), b"same".to_vec());
        let outcome = processor.on_trigger(&context, &flow);
        assert!(!outcome.is_failure());
    }

    let outputs = flow.output(Relationship::Success);
    assert_eq!(outputs.len(), 3);
    for record in &outputs {
        assert_eq!(record.content(), outputs[0].content());
        assert_eq!(record.attributes(), outputs[0].attributes());
    }
    assert_eq!(service.submissions().len(), 3);
}

#[test]
fn test_validation_reports_missing_plan_and_service() {
    let context = ProcessContext::builder().build();
    let problems = QueryRowsProcessor::new().validate(&context);
    let subjects: Vec<&str> = problems.iter().map(|p| p.subject.as_str()).collect();
    assert!(subjects.contains(&"DatabaseClient Service"));
    assert!(subjects.contains(&PLAN.display_name));

    let service = StubService::new(Response::NoDocument);
    let context = stub_context(&service, PLAN_TEXT, Some("application/json"));
    assert!(QueryRowsProcessor::new().validate(&context).is_empty());

    let context = stub_context(&service, "${plan", None);
    let problems = QueryRowsProcessor::new().validate(&context);
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].subject, "Plan");
}
