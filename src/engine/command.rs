// Command-Backed Engine Client
//
// Runs a configured shell command per query. The plan is written to the
// command's stdin, the requested MIME type is exported as OPTIC_MIME_TYPE,
// and the command's stdout is the result document. Exit status 2 means the
// engine rejected the plan; any other non-zero status is an execution failure.

use std::io::{self, Chain, Cursor, Read, Write};
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, warn};

use super::client::{
    DatabaseClient, DatabaseClientService, EngineError, EngineResult, RawPlan, ResultStream, RowManager,
};
use crate::common::types::MIME_TYPE_ENV;

const PLAN_REJECTED_STATUS: i32 = 2;

/// Client service that hands out command-backed clients
#[derive(Debug, Clone)]
pub struct CommandClientService {
    identifier: String,
    client: Arc<CommandClient>,
}

impl CommandClientService {
    pub fn new(identifier: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            client: Arc::new(CommandClient::new(command)),
        }
    }
}

impl DatabaseClientService for CommandClientService {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn client(&self) -> EngineResult<Arc<dyn DatabaseClient>> {
        Ok(self.client.clone())
    }
}

/// Client that executes each plan with `sh -c <command>`
#[derive(Debug, Clone)]
pub struct CommandClient {
    command: String,
}

impl CommandClient {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into() }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl DatabaseClient for CommandClient {
    fn new_row_manager(&self) -> Box<dyn RowManager + '_> {
        Box::new(CommandRowManager { client: self })
    }
}

struct CommandRowManager<'a> {
    client: &'a CommandClient,
}

impl RowManager for CommandRowManager<'_> {
    fn result_doc(&self, plan: &RawPlan, mime_type: &str) -> EngineResult<Option<ResultStream>> {
        debug!("Submitting {} byte plan to '{}'", plan.as_bytes().len(), self.client.command);

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.client.command)
            .env(MIME_TYPE_ENV, mime_type)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| EngineError::Connection(format!("cannot start '{}': {}", self.client.command, e)))?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(EngineError::Connection("engine command pipes unavailable".to_string()));
            }
        };

        // Feed stdin from a separate thread so a chatty engine cannot deadlock us
        let plan_bytes = plan.as_bytes().to_vec();
        let feeder = thread::spawn(move || {
            let mut stdin = stdin;
            if let Err(e) = stdin.write_all(&plan_bytes) {
                if e.kind() != io::ErrorKind::BrokenPipe {
                    warn!("Failed to write plan to engine command: {}", e);
                }
            }
        });

        let mut stdout = stdout;
        let mut first = [0u8; 1];
        let read = loop {
            match stdout.read(&mut first) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = feeder.join();
                    return Err(EngineError::Io(e));
                }
            }
        };

        if read == 0 {
            let status = child.wait()?;
            let _ = feeder.join();
            check_status(status)?;
            debug!("Engine command returned no document");
            return Ok(None);
        }

        let reader = ChildStream {
            child,
            stdout: Cursor::new(first.to_vec()).chain(stdout),
            feeder: Some(feeder),
            finished: false,
        };
        Ok(Some(ResultStream::new(mime_type, Box::new(reader))))
    }
}

fn check_status(status: ExitStatus) -> EngineResult<()> {
    match status.code() {
        Some(0) => Ok(()),
        Some(PLAN_REJECTED_STATUS) => Err(EngineError::PlanRejected(format!("engine command exited with {}", status))),
        _ => Err(EngineError::Execution(format!("engine command exited with {}", status))),
    }
}

/// Child stdout that reaps the process at end of stream
struct ChildStream {
    child: Child,
    stdout: Chain<Cursor<Vec<u8>>, ChildStdout>,
    feeder: Option<JoinHandle<()>>,
    finished: bool,
}

impl ChildStream {
    fn finish(&mut self) -> io::Result<()> {
        self.finished = true;
        let status = self.child.wait()?;
        if let Some(feeder) = self.feeder.take() {
            let _ = feeder.join();
        }
        check_status(status).map_err(io::Error::other)
    }
}

impl Read for ChildStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.stdout.read(buf)?;
        if n == 0 && !buf.is_empty() && !self.finished {
            self.finish()?;
        }
        Ok(n)
    }
}

impl Drop for ChildStream {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
