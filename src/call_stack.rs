//! Call stack of currently active frames
//!
//! The tracer keeps one [`CallStack`] per thread and per session in a
//! thread-local registry, so concurrently instrumented threads never share a
//! stack and nothing has to be threaded through instrumented signatures.

use crate::error::{Result, TraceError};
use crate::frame::{CallPath, Frame};
use std::cell::RefCell;
use std::collections::HashMap;

/// Handle to one frame pushed onto a [`CallStack`]
///
/// Distinguishes repeated entries of the same frame (recursion), so a
/// disposal can always be matched to its own entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(u64);

/// Ordered sequence of active frames, root first
///
/// Frames are only ever added at the tail. They leave from the tail, except
/// when a guard is disposed out of order and [`CallStack::remove_entry`]
/// takes its entry out of the middle.
#[derive(Debug, Clone, Default)]
pub struct CallStack {
    frames: Vec<Frame>,
    entries: Vec<EntryId>,
    next_entry: u64,
}

impl CallStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame to the tail
    pub fn push(&mut self, frame: Frame) -> EntryId {
        let entry = EntryId(self.next_entry);
        self.next_entry += 1;
        self.frames.push(frame);
        self.entries.push(entry);
        entry
    }

    /// Remove and return the tail frame
    pub fn pop(&mut self) -> Result<Frame> {
        self.entries.pop();
        self.frames.pop().ok_or(TraceError::Underflow {
            expected: None,
            found: None,
        })
    }

    /// Remove the tail frame only if it is the one pushed as `entry`
    ///
    /// A mismatch means a guard was disposed out of nesting order; the stack
    /// is left untouched. `expected` names the frame in the error.
    pub fn pop_expected(&mut self, entry: EntryId, expected: &Frame) -> Result<Frame> {
        if self.entries.last() == Some(&entry) {
            return self.pop();
        }
        Err(TraceError::Underflow {
            expected: Some(expected.to_string()),
            found: self.frames.last().map(ToString::to_string),
        })
    }

    /// Remove the frame pushed as `entry`, wherever it sits
    ///
    /// Used after a nesting violation. Frames above it keep their order.
    pub fn remove_entry(&mut self, entry: EntryId) -> Option<Frame> {
        let index = self.entries.iter().rposition(|e| *e == entry)?;
        self.entries.remove(index);
        Some(self.frames.remove(index))
    }

    /// Tail frame, i.e. the caller of whatever is entered next
    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Immutable copy of the current contents
    pub fn snapshot(&self) -> CallPath {
        CallPath::new(self.frames.clone())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

thread_local! {
    static STACKS: RefCell<HashMap<u64, CallStack>> = RefCell::new(HashMap::new());
}

/// Run `f` against this thread's stack for `session_id`
///
/// Empty stacks are dropped from the registry afterwards. Returns `None` when
/// thread-local storage is already being torn down.
pub(crate) fn with_thread_stack<R>(session_id: u64, f: impl FnOnce(&mut CallStack) -> R) -> Option<R> {
    STACKS
        .try_with(|stacks| {
            let mut stacks = stacks.borrow_mut();
            let stack = stacks.entry(session_id).or_default();
            let result = f(stack);
            if stack.is_empty() {
                stacks.remove(&session_id);
            }
            result
        })
        .ok()
}
