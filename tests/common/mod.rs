#![allow(dead_code)]

use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use opticflow::config::{ProcessContext, MIME_TYPE, PLAN};
use opticflow::engine::{EngineError, EngineResult};
use opticflow::{Attributes, DatabaseClient, DatabaseClientService, RawPlan, ResultStream, RowManager};

pub const STUB_SERVICE_ID: &str = "stub-engine";

// What the stub engine answers to every plan
#[derive(Debug, Clone)]
pub enum Response {
    Document(Vec<u8>),
    NoDocument,
    Rejected(String),
    Unreachable,
    // Yields the bytes, then fails the read
    Broken(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub plan: String,
    pub mime_type: String,
}

// In-process engine that records what it was asked to run
pub struct StubEngine {
    response: Response,
    submissions: Mutex<Vec<Submission>>,
    streams_opened: Mutex<usize>,
    stream_closed: Arc<AtomicBool>,
}

impl DatabaseClient for StubEngine {
    fn new_row_manager(&self) -> Box<dyn RowManager + '_> {
        Box::new(StubRowManager { engine: self })
    }
}

struct StubRowManager<'a> {
    engine: &'a StubEngine,
}

impl RowManager for StubRowManager<'_> {
    fn result_doc(&self, plan: &RawPlan, mime_type: &str) -> EngineResult<Option<ResultStream>> {
        self.engine.submissions.lock().push(Submission {
            plan: plan.text().to_string(),
            mime_type: mime_type.to_string(),
        });

        let (bytes, fail_at_end) = match &self.engine.response {
            Response::Document(bytes) => (bytes.clone(), false),
            Response::Broken(bytes) => (bytes.clone(), true),
            Response::NoDocument => return Ok(None),
            Response::Rejected(reason) => return Err(EngineError::PlanRejected(reason.clone())),
            Response::Unreachable => return Err(EngineError::Connection("unreachable".to_string())),
        };

        *self.engine.streams_opened.lock() += 1;
        self.engine.stream_closed.store(false, Ordering::SeqCst);
        let reader = TrackedReader {
            inner: Cursor::new(bytes),
            fail_at_end,
            closed: self.engine.stream_closed.clone(),
        };
        Ok(Some(ResultStream::new(mime_type, Box::new(reader))))
    }
}

// Reader that flags when it is dropped
struct TrackedReader {
    inner: Cursor<Vec<u8>>,
    fail_at_end: bool,
    closed: Arc<AtomicBool>,
}

impl Read for TrackedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 && self.fail_at_end {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "engine connection reset"));
        }
        Ok(n)
    }
}

impl Drop for TrackedReader {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub struct StubService {
    engine: Arc<StubEngine>,
}

impl StubService {
    pub fn new(response: Response) -> Arc<Self> {
        Arc::new(Self {
            engine: Arc::new(StubEngine {
                response,
                submissions: Mutex::new(Vec::new()),
                streams_opened: Mutex::new(0),
                stream_closed: Arc::new(AtomicBool::new(false)),
            }),
        })
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.engine.submissions.lock().clone()
    }

    pub fn streams_opened(&self) -> usize {
        *self.engine.streams_opened.lock()
    }

    pub fn stream_closed(&self) -> bool {
        self.engine.stream_closed.load(Ordering::SeqCst)
    }
}

impl DatabaseClientService for StubService {
    fn identifier(&self) -> &str {
        STUB_SERVICE_ID
    }

    fn client(&self) -> EngineResult<Arc<dyn DatabaseClient>> {
        match self.engine.response {
            Response::Unreachable => Err(EngineError::Connection("no route to engine".to_string())),
            _ => Ok(self.engine.clone()),
        }
    }
}

// Build an attribute map from pairs
pub fn attrs(pairs: &[(&str, &str)]) -> Attributes {
    let mut attributes = Attributes::new();
    for (key, value) in pairs {
        attributes.insert(key.to_string(), value.to_string());
    }
    attributes
}

// Context with the stub service registered and the given plan and MIME type
pub fn stub_context(service: &Arc<StubService>, plan: &str, mime_type: Option<&str>) -> ProcessContext {
    let mut builder = ProcessContext::builder()
        .client_service(service.clone())
        .property(&PLAN, plan);
    if let Some(mime_type) = mime_type {
        builder = builder.property(&MIME_TYPE, mime_type);
    }
    builder.build()
}
