//! Scope-bound call tracer
//!
//! A [`Tracer`] is armed by [`Session::enter`](crate::Session::enter) and
//! records the call when it is dropped, so every exit path of the enclosing
//! scope (early return, `?`, panic unwinding) is observed exactly once.
//!
//! On entry the tracer reads the clock, writes `Entering <name>`, adds the
//! edge `caller -> name` for the frame currently on top of the thread's stack
//! and pushes its own frame. On disposal it reads the clock again, writes
//! `Exiting <name> (Execution Time: <d> µs)`, takes the stack contents as the
//! call path and pops its frame, then adds the duration to that path in the
//! profile.
//!
//! # Example
//!
//! ```
//! use calltrace::{trace_scope, Session};
//!
//! fn helper(session: &Session) {
//!     trace_scope!(session);
//! }
//!
//! let session = Session::new();
//! {
//!     trace_scope!(session, "main");
//!     helper(&session);
//! }
//!
//! let graph = session.call_graph();
//! assert_eq!(graph.callees("main")[0].as_str(), "helper");
//! ```

use crate::call_stack::{with_thread_stack, EntryId};
use crate::error::{Result, TraceError};
use crate::frame::{CallPath, Frame};
use crate::session::{Counters, SessionInner};
use std::marker::PhantomData;
use std::sync::Arc;

/// A completed, recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    /// Stack contents at disposal, ending with the traced frame
    pub path: CallPath,
    /// Measured duration (zero if the clock went backwards)
    pub duration_us: u64,
}

/// Guard that records one call of one frame
///
/// Guards must be dropped in reverse order of creation on the thread that
/// created them; they are neither `Send` nor `Sync`.
#[must_use = "the call is recorded when the tracer is dropped; binding it to `_` drops it immediately"]
pub struct Tracer {
    armed: Option<Armed>,
    _not_send: PhantomData<*const ()>,
}

struct Armed {
    session: Arc<SessionInner>,
    frame: Frame,
    start_us: u64,
    depth: usize,
    entry: EntryId,
}

impl Tracer {
    pub(crate) fn arm(session: &Arc<SessionInner>, name: &str) -> Self {
        let frame = match Frame::new(name) {
            Ok(frame) => frame,
            Err(e) => {
                Counters::bump(&session.counters.rejected_frames);
                tracing::warn!(error = %e, "call not traced");
                return Self::inert();
            }
        };

        let start_us = session.clock.now_us();

        let pushed = with_thread_stack(session.id, |stack| {
            if let Some(caller) = stack.top() {
                session.graph().add_edge(caller.clone(), frame.clone());
            }
            let depth = stack.len();
            (depth, stack.push(frame.clone()))
        });
        let Some((depth, entry)) = pushed else {
            Counters::bump(&session.counters.lost_calls);
            tracing::warn!(frame = %frame, "thread is exiting, call not traced");
            return Self::inert();
        };

        session.log.record_entry(&frame);
        tracing::trace!(session = session.id, frame = %frame, depth, "enter");

        Self {
            armed: Some(Armed {
                session: Arc::clone(session),
                frame,
                start_us,
                depth,
                entry,
            }),
            _not_send: PhantomData,
        }
    }

    /// Guard that records nothing
    pub fn inert() -> Self {
        Self {
            armed: None,
            _not_send: PhantomData,
        }
    }

    /// Whether this guard will record a call
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Frame being traced
    pub fn frame(&self) -> Option<&Frame> {
        self.armed.as_ref().map(|armed| &armed.frame)
    }

    /// Depth of the frame on its stack (0 for a root call)
    pub fn depth(&self) -> Option<usize> {
        self.armed.as_ref().map(|armed| armed.depth)
    }

    /// Dispose now and return what was recorded
    ///
    /// Returns `None` for an inert guard or when the call could not be
    /// recorded (nesting violation, thread already exiting).
    pub fn finish(mut self) -> Option<CallRecord> {
        self.armed.take().and_then(Armed::disarm)
    }
}

impl Drop for Tracer {
    fn drop(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.disarm();
        }
    }
}

impl std::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracer")
            .field("frame", &self.frame())
            .field("depth", &self.depth())
            .finish()
    }
}

impl Armed {
    fn disarm(self) -> Option<CallRecord> {
        let session = &self.session;
        let end_us = session.clock.now_us();
        let duration_us = elapsed(self.start_us, end_us).unwrap_or_else(|e| {
            Counters::bump(&session.counters.clock_regressions);
            tracing::warn!(frame = %self.frame, error = %e, "duration clamped to zero");
            0
        });

        session.log.record_exit(&self.frame, duration_us);

        let popped = with_thread_stack(session.id, |stack| {
            let path = stack.snapshot();
            stack.pop_expected(self.entry, &self.frame).map(|_| path).map_err(|e| {
                stack.remove_entry(self.entry);
                e
            })
        });
        let Some(popped) = popped else {
            Counters::bump(&session.counters.lost_calls);
            tracing::warn!(frame = %self.frame, duration_us, "thread is exiting, call not recorded");
            return None;
        };

        match popped {
            Ok(path) => {
                session.profile().record_path(path.clone(), duration_us);
                tracing::trace!(
                    session = session.id,
                    frame = %self.frame,
                    duration_us,
                    "exit"
                );
                Some(CallRecord { path, duration_us })
            }
            Err(e) => {
                Counters::bump(&session.counters.nesting_violations);
                tracing::error!(
                    frame = %self.frame,
                    depth = self.depth,
                    error = %e,
                    "tracer disposed out of nesting order"
                );
                if session.strict_nesting && !std::thread::panicking() {
                    panic!("tracer for {} disposed out of nesting order: {e}", self.frame);
                }
                None
            }
        }
    }
}

/// Duration between two clock readings
///
/// Fails with `ClockRegression` if `end_us` precedes `start_us`.
pub fn elapsed(start_us: u64, end_us: u64) -> Result<u64> {
    end_us
        .checked_sub(start_us)
        .ok_or(TraceError::ClockRegression { start_us, end_us })
}

/// Last path segment of a `type_name`, used by [`function_name!`]
#[doc(hidden)]
pub fn short_function_name(type_name: &str) -> &str {
    let mut name = type_name.strip_suffix("::__calltrace_here").unwrap_or(type_name);
    while let Some(outer) = name.strip_suffix("::{{closure}}") {
        name = outer;
    }
    name.rsplit("::").next().unwrap_or(name)
}

/// Name of the enclosing function
///
/// ```
/// fn checkout() -> &'static str {
///     calltrace::function_name!()
/// }
/// assert_eq!(checkout(), "checkout");
/// ```
#[macro_export]
macro_rules! function_name {
    () => {{
        fn __calltrace_here() {}
        fn __calltrace_type_name_of<T>(_: T) -> &'static str {
            ::core::any::type_name::<T>()
        }
        $crate::tracer::short_function_name(__calltrace_type_name_of(__calltrace_here))
    }};
}

/// Trace the rest of the enclosing scope
///
/// - `trace_scope!()` traces the enclosing function in the global session
/// - `trace_scope!(session)` traces the enclosing function in `session`
/// - `trace_scope!(session, name)` traces `name` in `session`
#[macro_export]
macro_rules! trace_scope {
    () => {
        let _calltrace_guard = $crate::global().enter($crate::function_name!());
    };
    ($session:expr) => {
        let _calltrace_guard = ($session).enter($crate::function_name!());
    };
    ($session:expr, $name:expr) => {
        let _calltrace_guard = ($session).enter($name);
    };
}
