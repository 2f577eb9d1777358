//! Tracing session: the shared aggregates behind every tracer
//!
//! A [`Session`] owns the call graph, the path profile, the event log and the
//! clock. It is cheap to clone (shared `Arc`) and safe to use from many
//! threads: each aggregate sits behind its own mutex, and each thread keeps
//! its own call stack (see [`crate::call_stack`]).
//!
//! # Example
//!
//! ```
//! use calltrace::Session;
//!
//! let session = Session::new();
//!
//! fn parse(session: &Session) {
//!     let _guard = session.enter("parse");
//! }
//!
//! {
//!     let _guard = session.enter("main");
//!     parse(&session);
//!     parse(&session);
//! }
//!
//! assert_eq!(session.call_graph().edge_count(), 2);
//! assert_eq!(session.path_profile().total_calls(), 3);
//! ```

use crate::call_graph::CallGraph;
use crate::call_stack::with_thread_stack;
use crate::clock::{ClockSource, MonotonicClock};
use crate::config::TraceConfig;
use crate::dot::{DotMode, DotTheme};
use crate::error::Result;
use crate::event_log::EventLog;
use crate::frame::CallPath;
use crate::path_profile::PathProfile;
use crate::tracer::Tracer;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

static GLOBAL: OnceLock<Session> = OnceLock::new();

/// Process-wide default session, created on first use without an event log
pub fn global() -> &'static Session {
    GLOBAL.get_or_init(Session::new)
}

/// Install `session` as the process-wide default
///
/// Fails (handing the session back) if the default was already installed or
/// already used.
pub fn install_global(session: Session) -> std::result::Result<(), Session> {
    GLOBAL.set(session)
}

/// Counters for conditions the tracer absorbed instead of failing
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) rejected_frames: AtomicU64,
    pub(crate) clock_regressions: AtomicU64,
    pub(crate) nesting_violations: AtomicU64,
    pub(crate) lost_calls: AtomicU64,
    pub(crate) sink_open_failures: AtomicU64,
}

impl Counters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Snapshot of absorbed instrumentation problems
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// Tracers that were not armed because of an invalid frame name
    pub rejected_frames: u64,
    /// Disposals whose end time preceded the start time (clamped to zero)
    pub clock_regressions: u64,
    /// Tracers disposed while not on top of their call stack
    pub nesting_violations: u64,
    /// Calls entered or completed after the thread's stack was torn down
    pub lost_calls: u64,
    /// Failed event log opens and writes
    pub sink_failures: u64,
}

impl Diagnostics {
    /// Whether nothing went wrong
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

pub(crate) struct SessionInner {
    pub(crate) id: u64,
    pub(crate) graph: Mutex<CallGraph>,
    pub(crate) profile: Mutex<PathProfile>,
    pub(crate) log: EventLog,
    pub(crate) clock: Arc<dyn ClockSource>,
    pub(crate) strict_nesting: bool,
    pub(crate) counters: Counters,
}

impl SessionInner {
    pub(crate) fn graph(&self) -> MutexGuard<'_, CallGraph> {
        self.graph.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn profile(&self) -> MutexGuard<'_, PathProfile> {
        self.profile.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a tracing session
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("event_log", &self.inner.log)
            .field("strict_nesting", &self.inner.strict_nesting)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Session with a monotonic clock and no event log
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// Session configured from a [`TraceConfig`]
    ///
    /// If the event log cannot be opened the session still starts, without a
    /// log; the failure is logged and counted in [`Diagnostics::sink_failures`].
    pub fn from_config(config: &TraceConfig) -> Self {
        let mut open_failures = 0;
        let log = if config.event_log.enabled {
            EventLog::open(config.event_log_path(), config.event_log.append).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "event log unavailable, continuing without it");
                open_failures += 1;
                EventLog::disabled()
            })
        } else {
            EventLog::disabled()
        };

        let session = Self::builder()
            .event_log(log)
            .strict_nesting(config.strict_nesting)
            .build();
        session
            .inner
            .counters
            .sink_open_failures
            .fetch_add(open_failures, Ordering::Relaxed);
        session
    }

    /// Unique id of this session within the process
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Arm a tracer for `name`; the call is recorded when the guard drops
    ///
    /// An invalid name (empty, control characters) yields an inert guard and
    /// bumps [`Diagnostics::rejected_frames`].
    pub fn enter(&self, name: &str) -> Tracer {
        Tracer::arm(&self.inner, name)
    }

    /// Run `f` inside a tracer for `name`
    ///
    /// # Example
    ///
    /// ```
    /// use calltrace::Session;
    ///
    /// let session = Session::new();
    /// let sum = session.instrument("sum", || (1..=10).sum::<u32>());
    /// assert_eq!(sum, 55);
    /// assert_eq!(session.path_profile().total_calls(), 1);
    /// ```
    pub fn instrument<R>(&self, name: &str, f: impl FnOnce() -> R) -> R {
        let _guard = self.enter(name);
        f()
    }

    /// Copy of the call graph
    pub fn call_graph(&self) -> CallGraph {
        self.inner.graph().clone()
    }

    /// Copy of the path profile
    pub fn path_profile(&self) -> PathProfile {
        self.inner.profile().clone()
    }

    /// Frames active on the calling thread, root first
    pub fn current_path(&self) -> CallPath {
        with_thread_stack(self.inner.id, |stack| stack.snapshot()).unwrap_or_default()
    }

    /// Depth of the calling thread's stack
    pub fn depth(&self) -> usize {
        with_thread_stack(self.inner.id, |stack| stack.len()).unwrap_or(0)
    }

    pub fn export_hierarchy(&self) -> String {
        self.inner.graph().export_hierarchy()
    }

    pub fn export_adjacency(&self) -> String {
        self.inner.graph().export_adjacency()
    }

    pub fn export_graph_description(&self, mode: DotMode, theme: DotTheme) -> String {
        self.inner.graph().export_graph_description(mode, theme)
    }

    pub fn export_profile(&self) -> String {
        self.inner.profile().export()
    }

    pub fn export_profile_json(&self) -> serde_json::Result<String> {
        self.inner.profile().to_json()
    }

    pub fn event_log(&self) -> &EventLog {
        &self.inner.log
    }

    /// Flush the event log
    pub fn flush(&self) -> Result<()> {
        self.inner.log.flush()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let counters = &self.inner.counters;
        Diagnostics {
            rejected_frames: counters.rejected_frames.load(Ordering::Relaxed),
            clock_regressions: counters.clock_regressions.load(Ordering::Relaxed),
            nesting_violations: counters.nesting_violations.load(Ordering::Relaxed),
            lost_calls: counters.lost_calls.load(Ordering::Relaxed),
            sink_failures: counters.sink_open_failures.load(Ordering::Relaxed)
                + self.inner.log.failures(),
        }
    }
}

/// Builder for [`Session`]
#[derive(Default)]
pub struct SessionBuilder {
    clock: Option<Arc<dyn ClockSource>>,
    log: Option<EventLog>,
    strict_nesting: bool,
}

impl SessionBuilder {
    /// Timestamp source (default: [`MonotonicClock`])
    pub fn clock(mut self, clock: Arc<dyn ClockSource>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Event log (default: disabled)
    pub fn event_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Panic when a tracer is disposed out of nesting order
    pub fn strict_nesting(mut self, strict: bool) -> Self {
        self.strict_nesting = strict;
        self
    }

    pub fn build(self) -> Session {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(session = id, "tracing session created");
        Session {
            inner: Arc::new(SessionInner {
                id,
                graph: Mutex::new(CallGraph::new()),
                profile: Mutex::new(PathProfile::new()),
                log: self.log.unwrap_or_else(EventLog::disabled),
                clock: self
                    .clock
                    .unwrap_or_else(|| Arc::new(MonotonicClock::new())),
                strict_nesting: self.strict_nesting,
                counters: Counters::default(),
            }),
        }
    }
}
