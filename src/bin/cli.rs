use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;

use opticflow::Attributes;
use opticflow::config::{ProcessContext, MIME_TYPE, PLAN};
use opticflow::engine::CommandClientService;
use opticflow::processor::{QueryRowsProcessor, RoutingOutcome};
use opticflow::record::FlowRecord;
use opticflow::session::{InMemoryFlow, Relationship};

const ENGINE_SERVICE_ID: &str = "command-engine";

#[derive(Parser)]
#[command(author, version, about = "opticflow - run a serialized Optic plan and route the returned rows")]
struct Cli {
    /// Plan text; may contain ${attribute} expressions
    #[arg(long, conflicts_with = "plan_file")]
    plan: Option<String>,

    /// Read the plan text from a file
    #[arg(long)]
    plan_file: Option<PathBuf>,

    /// MIME type of the returned rows; may contain ${attribute} expressions
    #[arg(long)]
    mime_type: Option<String>,

    /// Shell command acting as the row-query engine (plan on stdin, rows on stdout)
    #[arg(long)]
    engine_cmd: String,

    /// Attribute of the inbound record, as key=value (repeatable)
    #[arg(long = "attr", value_parser = parse_attribute)]
    attrs: Vec<(String, String)>,

    /// Content of the inbound record
    #[arg(long)]
    input: Option<PathBuf>,

    /// JSON object of processor properties keyed by property name
    #[arg(long)]
    properties: Option<PathBuf>,

    /// Directory receiving one sub-directory per relationship
    #[arg(long, default_value = "out")]
    out_dir: PathBuf,

    /// Keep records routed to original instead of auto-terminating them
    #[arg(long)]
    connect_original: bool,
}

fn parse_attribute(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", s)),
    }
}

fn build_context(cli: &Cli) -> Result<ProcessContext> {
    let service = CommandClientService::new(ENGINE_SERVICE_ID, cli.engine_cmd.clone());
    let mut builder = ProcessContext::builder().client_service(Arc::new(service));

    if let Some(path) = &cli.properties {
        let document = fs::read_to_string(path)
            .with_context(|| format!("Failed to read properties from {}", path.display()))?;
        builder = builder.json_properties(&document, QueryRowsProcessor::properties())?;
    }

    if let Some(plan) = &cli.plan {
        builder = builder.property(&PLAN, plan.clone());
    }
    if let Some(path) = &cli.plan_file {
        let plan = fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan from {}", path.display()))?;
        builder = builder.property(&PLAN, plan);
    }
    if let Some(mime_type) = &cli.mime_type {
        builder = builder.property(&MIME_TYPE, mime_type.clone());
    }

    Ok(builder.build())
}

fn write_record(out_dir: &Path, relationship: Relationship, record: &FlowRecord) -> Result<()> {
    let dir = out_dir.join(relationship.name());
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let content_path = dir.join(format!("{}.content", record.id()));
    fs::write(&content_path, record.content())
        .with_context(|| format!("Failed to write {}", content_path.display()))?;

    let attributes_path = dir.join(format!("{}.attributes.json", record.id()));
    let attributes = serde_json::to_string_pretty(record.attributes())?;
    fs::write(&attributes_path, attributes)
        .with_context(|| format!("Failed to write {}", attributes_path.display()))?;

    println!(
        "Routed record {} to {} ({} bytes) -> {}",
        record.id(),
        relationship,
        record.content().len(),
        content_path.display()
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let context = build_context(&cli)?;
    let processor = QueryRowsProcessor::new();

    let problems = processor.validate(&context);
    if !problems.is_empty() {
        let details: Vec<String> = problems.iter().map(|p| p.to_string()).collect();
        bail!("Invalid configuration:\n  {}", details.join("\n  "));
    }

    let flow = InMemoryFlow::new();
    if cli.connect_original {
        flow.connect(Relationship::Original);
    }

    if cli.input.is_some() || !cli.attrs.is_empty() {
        let content = match &cli.input {
            Some(path) => fs::read(path).with_context(|| format!("Failed to read input {}", path.display()))?,
            None => Vec::new(),
        };
        let mut attributes = Attributes::new();
        for (key, value) in &cli.attrs {
            attributes.insert(key.clone(), value.clone());
        }
        flow.enqueue(attributes, content);
    }

    let outcome = processor.on_trigger(&context, &flow);

    for relationship in Relationship::ALL {
        for record in flow.take_output(relationship) {
            write_record(&cli.out_dir, relationship, &record)?;
        }
    }
    if flow.auto_terminated() > 0 {
        println!("Auto-terminated {} record(s) on unconnected relationships", flow.auto_terminated());
    }

    match outcome {
        RoutingOutcome::Failure { record, error } => {
            Err(anyhow!(error).context(format!("Record {} routed to failure", record)))
        }
        RoutingOutcome::Aborted(error) => Err(anyhow!(error).context("Session rolled back")),
        _ => Ok(()),
    }
}
