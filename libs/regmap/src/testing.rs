//! In-memory register bank for tests
//!
//! Enabled with the `testing` feature; the crate's own tests turn it on
//! through a dev-dependency on itself.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::poll::{RegisterTransport, TransportError};

#[derive(Debug)]
enum Fault {
    Error(TransportError),
    ShortReply,
    Stall,
}

#[derive(Debug)]
struct MemoryState {
    registers: Vec<u16>,
    faults: VecDeque<Fault>,
    reads: Vec<(u16, u16)>,
    writes: Vec<(u16, Vec<u16>)>,
}

/// Simulated register bank with fault injection
///
/// Clones share the same bank, so a test can keep one handle while the
/// poller owns another.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    /// All 65536 registers zeroed
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                registers: vec![0; usize::from(u16::MAX) + 1],
                faults: VecDeque::new(),
                reads: Vec::new(),
                writes: Vec::new(),
            })),
        }
    }

    /// Store `words` starting at `offset`; words past 65535 are dropped
    pub fn load(&self, offset: u16, words: &[u16]) {
        let mut state = self.state.lock();
        let start = usize::from(offset);
        let end = (start + words.len()).min(state.registers.len());
        let count = end - start;
        state.registers[start..end].copy_from_slice(&words[..count]);
    }

    /// Current contents of `count` registers at `offset`
    pub fn registers(&self, offset: u16, count: u16) -> Vec<u16> {
        let state = self.state.lock();
        let start = usize::from(offset);
        let end = (start + usize::from(count)).min(state.registers.len());
        state.registers[start..end].to_vec()
    }

    /// Fail the next request with `err`
    pub fn fail_next(&self, err: TransportError) {
        self.state.lock().faults.push_back(Fault::Error(err));
    }

    /// Answer the next read with one register too few
    pub fn short_reply_next(&self) {
        self.state.lock().faults.push_back(Fault::ShortReply);
    }

    /// Never answer the next request
    pub fn stall_next(&self) {
        self.state.lock().faults.push_back(Fault::Stall);
    }

    /// `(offset, count)` of every read served so far
    pub fn read_history(&self) -> Vec<(u16, u16)> {
        self.state.lock().reads.clone()
    }

    /// `(offset, words)` of every write accepted so far
    pub fn write_history(&self) -> Vec<(u16, Vec<u16>)> {
        self.state.lock().writes.clone()
    }

    fn next_fault(&self) -> Option<Fault> {
        self.state.lock().faults.pop_front()
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegisterTransport for MemoryTransport {
    async fn read_registers(
        &mut self,
        offset: u16,
        count: u16,
    ) -> std::result::Result<Vec<u16>, TransportError> {
        if usize::from(offset) + usize::from(count) > usize::from(u16::MAX) + 1 {
            return Err(TransportError::DeviceException(2));
        }
        let words = match self.next_fault() {
            Some(Fault::Error(err)) => return Err(err),
            Some(Fault::Stall) => std::future::pending().await,
            Some(Fault::ShortReply) => {
                let mut words = self.registers(offset, count);
                words.pop();
                words
            },
            None => self.registers(offset, count),
        };
        self.state.lock().reads.push((offset, count));
        Ok(words)
    }

    async fn write_registers(
        &mut self,
        offset: u16,
        words: &[u16],
    ) -> std::result::Result<(), TransportError> {
        match self.next_fault() {
            Some(Fault::Error(err)) => return Err(err),
            Some(Fault::Stall) => std::future::pending().await,
            Some(Fault::ShortReply) | None => {},
        }
        if usize::from(offset) + words.len() > usize::from(u16::MAX) + 1 {
            return Err(TransportError::DeviceException(2));
        }
        self.load(offset, words);
        self.state.lock().writes.push((offset, words.to_vec()));
        Ok(())
    }
}
