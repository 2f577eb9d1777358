//! Instrumented demo programs driven by the `calltrace` binary
//!
//! Each scenario is a small set of functions that trace themselves with
//! [`trace_scope!`](crate::trace_scope) and call each other in a fixed
//! pattern, so the resulting graphs and profiles are known in advance.

use crate::session::Session;
use crate::trace_scope;
use clap::ValueEnum;

/// Demo call pattern
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// `function_d` calls A and B, then B is called again from the root
    #[default]
    Basic,
    /// `function_d` calls A, B, A, B; B calls A, C, C
    Extended,
    /// Mutual recursion and self recursion
    Recursive,
}

impl Scenario {
    /// Run the scenario's root calls under `session`
    ///
    /// The caller usually wraps this in its own root frame (`main`).
    pub fn run(self, session: &Session) {
        tracing::debug!(scenario = ?self, "running scenario");
        match self {
            Scenario::Basic => {
                basic::function_d(session);
                basic::function_b(session);
            }
            Scenario::Extended => extended::function_d(session),
            Scenario::Recursive => {
                recursive::ping(session, 3);
                recursive::countdown(session, 3);
            }
        }
    }
}

mod basic {
    use super::*;

    pub(super) fn function_a(session: &Session) {
        trace_scope!(session);
        function_c(session);
    }

    pub(super) fn function_b(session: &Session) {
        trace_scope!(session);
        function_a(session);
    }

    pub(super) fn function_c(session: &Session) {
        trace_scope!(session);
    }

    pub(super) fn function_d(session: &Session) {
        trace_scope!(session);
        function_a(session);
        function_b(session);
    }
}

mod extended {
    use super::*;

    pub(super) fn function_a(session: &Session) {
        trace_scope!(session);
        function_c(session);
    }

    pub(super) fn function_b(session: &Session) {
        trace_scope!(session);
        function_a(session);
        function_c(session);
        function_c(session);
    }

    pub(super) fn function_c(session: &Session) {
        trace_scope!(session);
    }

    pub(super) fn function_d(session: &Session) {
        trace_scope!(session);
        function_a(session);
        function_b(session);
        function_a(session);
        function_b(session);
    }
}

mod recursive {
    use super::*;

    pub(super) fn ping(session: &Session, remaining: u32) {
        trace_scope!(session);
        if remaining > 0 {
            pong(session, remaining - 1);
        }
    }

    pub(super) fn pong(session: &Session, remaining: u32) {
        trace_scope!(session);
        if remaining > 0 {
            ping(session, remaining - 1);
        }
    }

    pub(super) fn countdown(session: &Session, remaining: u32) {
        trace_scope!(session);
        if remaining > 0 {
            countdown(session, remaining - 1);
        }
    }
}
