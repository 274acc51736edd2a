// In-Memory Record Flow
//
// A shared inbound queue with per-relationship output queues. Each
// `MemorySession` works on private copies and publishes them on commit.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::Mutex;

use super::process_session::{ContentWriter, ProcessSession, SessionError, SessionFactory, SessionResult, SessionState};
use super::relationship::Relationship;
use crate::common::types::RecordId;
use crate::record::{Attributes, FlowRecord};

#[derive(Debug)]
struct FlowState {
    next_id: RecordId,
    inbound: VecDeque<FlowRecord>,
    connected: HashSet<Relationship>,
    outputs: HashMap<Relationship, Vec<FlowRecord>>,
    auto_terminated: usize,
    commits: usize,
    rollbacks: usize,
}

impl FlowState {
    fn allocate_id(&mut self) -> RecordId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Shared queues behind every session created from it
#[derive(Debug, Clone)]
pub struct InMemoryFlow {
    state: Arc<Mutex<FlowState>>,
}

impl Default for InMemoryFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryFlow {
    /// Create a flow with `success` and `failure` connected
    pub fn new() -> Self {
        let connected = [Relationship::Success, Relationship::Failure].into_iter().collect();
        Self {
            state: Arc::new(Mutex::new(FlowState {
                next_id: 1,
                inbound: VecDeque::new(),
                connected,
                outputs: HashMap::new(),
                auto_terminated: 0,
                commits: 0,
                rollbacks: 0,
            })),
        }
    }

    pub fn connect(&self, relationship: Relationship) {
        self.state.lock().connected.insert(relationship);
    }

    pub fn disconnect(&self, relationship: Relationship) {
        self.state.lock().connected.remove(&relationship);
    }

    pub fn is_connected(&self, relationship: Relationship) -> bool {
        self.state.lock().connected.contains(&relationship)
    }

    /// Queue an inbound record
    pub fn enqueue(&self, attributes: Attributes, content: Vec<u8>) -> RecordId {
        let mut state = self.state.lock();
        let id = state.allocate_id();
        state.inbound.push_back(FlowRecord::with_parts(id, attributes, content));
        id
    }

    /// Number of inbound records waiting
    pub fn queued(&self) -> usize {
        self.state.lock().inbound.len()
    }

    /// Records committed to a relationship so far
    pub fn output(&self, relationship: Relationship) -> Vec<FlowRecord> {
        self.state.lock().outputs.get(&relationship).cloned().unwrap_or_default()
    }

    /// Drain the records committed to a relationship
    pub fn take_output(&self, relationship: Relationship) -> Vec<FlowRecord> {
        self.state.lock().outputs.remove(&relationship).unwrap_or_default()
    }

    /// Records dropped because their relationship was unconnected and auto-terminating
    pub fn auto_terminated(&self) -> usize {
        self.state.lock().auto_terminated
    }

    pub fn commits(&self) -> usize {
        self.state.lock().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.state.lock().rollbacks
    }
}

impl SessionFactory for InMemoryFlow {
    type Session = MemorySession;

    fn create_session(&self) -> MemorySession {
        MemorySession::new(self.clone())
    }
}

/// Session over an `InMemoryFlow`; rolls back on drop unless committed
#[derive(Debug)]
pub struct MemorySession {
    flow: InMemoryFlow,
    state: SessionState,
    records: HashMap<RecordId, FlowRecord>,
    /// Working-set order, used to publish deterministically
    order: Vec<RecordId>,
    /// Inbound records as they were checked out
    received: Vec<FlowRecord>,
    transfers: Vec<(RecordId, Relationship)>,
}

impl MemorySession {
    fn new(flow: InMemoryFlow) -> Self {
        Self {
            flow,
            state: SessionState::Active,
            records: HashMap::new(),
            order: Vec::new(),
            received: Vec::new(),
            transfers: Vec::new(),
        }
    }

    fn ensure_active(&self) -> SessionResult<()> {
        if self.state != SessionState::Active {
            return Err(SessionError::InvalidState(self.state));
        }
        Ok(())
    }

    fn record(&self, id: RecordId) -> SessionResult<&FlowRecord> {
        self.records.get(&id).ok_or(SessionError::UnknownRecord(id))
    }

    fn record_mut(&mut self, id: RecordId) -> SessionResult<&mut FlowRecord> {
        self.ensure_active()?;
        self.records.get_mut(&id).ok_or(SessionError::UnknownRecord(id))
    }

    fn admit(&mut self, record: FlowRecord) -> RecordId {
        let id = record.id();
        self.order.push(id);
        self.records.insert(id, record);
        id
    }

    /// Relationship the record is queued for, if any
    pub fn transferred_to(&self, id: RecordId) -> Option<Relationship> {
        self.transfers.iter().find(|(rid, _)| *rid == id).map(|(_, r)| *r)
    }

    fn reset(&mut self) {
        self.records.clear();
        self.order.clear();
        self.received.clear();
        self.transfers.clear();
    }
}

impl ProcessSession for MemorySession {
    fn get(&mut self) -> SessionResult<Option<RecordId>> {
        self.ensure_active()?;
        let next = self.flow.state.lock().inbound.pop_front();
        Ok(next.map(|record| {
            debug!("Session checked out record {}", record.id());
            self.received.push(record.clone());
            self.admit(record)
        }))
    }

    fn create(&mut self) -> SessionResult<RecordId> {
        self.ensure_active()?;
        let id = self.flow.state.lock().allocate_id();
        Ok(self.admit(FlowRecord::new(id)))
    }

    fn clone_record(&mut self, id: RecordId) -> SessionResult<RecordId> {
        self.ensure_active()?;
        let source = self.record(id)?;
        let new_id = self.flow.state.lock().allocate_id();
        let copy = source.duplicate(new_id);
        Ok(self.admit(copy))
    }

    fn remove(&mut self, id: RecordId) -> SessionResult<()> {
        self.ensure_active()?;
        self.records.remove(&id).ok_or(SessionError::UnknownRecord(id))?;
        self.order.retain(|rid| *rid != id);
        self.transfers.retain(|(rid, _)| *rid != id);
        Ok(())
    }

    fn attributes(&self, id: RecordId) -> SessionResult<&Attributes> {
        Ok(self.record(id)?.attributes())
    }

    fn put_attribute(&mut self, id: RecordId, key: &str, value: &str) -> SessionResult<()> {
        self.record_mut(id)?.put_attribute(key, value);
        Ok(())
    }

    fn content(&self, id: RecordId) -> SessionResult<&[u8]> {
        Ok(self.record(id)?.content())
    }

    fn write(&mut self, id: RecordId, writer: &mut ContentWriter<'_>) -> SessionResult<()> {
        let record = self.record_mut(id)?;
        let mut staged: Vec<u8> = Vec::new();
        writer(&mut staged)?;
        debug!("Record {} content replaced with {} bytes", id, staged.len());
        record.set_content(staged);
        Ok(())
    }

    fn transfer(&mut self, id: RecordId, relationship: Relationship) -> SessionResult<()> {
        self.ensure_active()?;
        self.record(id)?;
        if self.transferred_to(id).is_some() {
            return Err(SessionError::AlreadyTransferred(id));
        }
        if !relationship.auto_terminate_default() && !self.flow.is_connected(relationship) {
            return Err(SessionError::Unconnected(relationship));
        }
        self.transfers.push((id, relationship));
        Ok(())
    }

    fn revert_transfers(&mut self) {
        if !self.transfers.is_empty() {
            debug!("Reverting {} queued transfer(s)", self.transfers.len());
        }
        self.transfers.clear();
    }

    fn commit(&mut self) -> SessionResult<()> {
        self.ensure_active()?;

        let mut routed = Vec::with_capacity(self.order.len());
        for id in &self.order {
            let relationship = self.transferred_to(*id).ok_or(SessionError::Unaccounted(*id))?;
            routed.push((*id, relationship));
        }

        let mut state = self.flow.state.lock();
        for (id, relationship) in routed {
            let record = match self.records.remove(&id) {
                Some(record) => record,
                None => continue,
            };
            if state.connected.contains(&relationship) {
                info!("Routing record {} to {}", id, relationship);
                state.outputs.entry(relationship).or_default().push(record);
            } else {
                debug!("Auto-terminating record {} on unconnected {}", id, relationship);
                state.auto_terminated += 1;
            }
        }
        state.commits += 1;
        drop(state);

        self.reset();
        self.state = SessionState::Committed;
        Ok(())
    }

    fn rollback(&mut self) {
        if self.state != SessionState::Active {
            return;
        }

        let received = std::mem::take(&mut self.received);
        {
            let mut state = self.flow.state.lock();
            for record in received.into_iter().rev() {
                state.inbound.push_front(record);
            }
            state.rollbacks += 1;
        }
        warn!("Session rolled back; {} record(s) discarded", self.order.len());

        self.reset();
        self.state = SessionState::RolledBack;
    }

    fn state(&self) -> SessionState {
        self.state
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.rollback();
    }
}
