use crate::record::LogEvent;
use chrono::{DateTime, Utc};

/// Lifecycle of one logical request as seen by the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Started,
    Completed,
    Errored,
    Released,
}

impl Phase {
    /// Phase reached by applying `event`, or `None` if the transition is invalid.
    ///
    /// An error may follow a completion when the failure surfaces after a
    /// partial response was already written.
    pub fn next(self, event: LogEvent) -> Option<Phase> {
        match (self, event) {
            (Phase::Idle, LogEvent::Start) => Some(Phase::Started),
            (Phase::Started, LogEvent::Complete) => Some(Phase::Completed),
            (Phase::Started, LogEvent::Error) => Some(Phase::Errored),
            (Phase::Completed, LogEvent::Error) => Some(Phase::Errored),
            _ => None,
        }
    }
}

/// Request-scoped value threaded through every logging call of one request.
///
/// Holds the trace id and the sampling decision so that the start, complete
/// and error phases agree on whether the request is logged at all. Workers
/// never read it: each dispatched record carries its own copy of the trace id.
#[derive(Debug, Clone)]
pub struct RequestContext {
    trace_id: String,
    sampled: bool,
    phase: Phase,
    request_time: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(trace_id: impl Into<String>, sampled: bool) -> Self {
        Self {
            trace_id: trace_id.into(),
            sampled,
            phase: Phase::Idle,
            request_time: Utc::now(),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn is_sampled(&self) -> bool {
        self.sampled
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn request_time(&self) -> DateTime<Utc> {
        self.request_time
    }

    /// Move to the phase implied by `event`. Returns `false` and leaves the
    /// context untouched when the transition is not allowed.
    pub(crate) fn advance(&mut self, event: LogEvent) -> bool {
        match self.phase.next(event) {
            Some(next) => {
                self.phase = next;
                true
            }
            None => false,
        }
    }

    pub(crate) fn release(&mut self) {
        self.phase = Phase::Released;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_paths() {
        assert_eq!(Phase::Idle.next(LogEvent::Start), Some(Phase::Started));
        assert_eq!(Phase::Started.next(LogEvent::Complete), Some(Phase::Completed));
        assert_eq!(Phase::Started.next(LogEvent::Error), Some(Phase::Errored));
        assert_eq!(Phase::Completed.next(LogEvent::Error), Some(Phase::Errored));
    }

    #[test]
    fn nothing_happens_before_start_or_after_release() {
        assert_eq!(Phase::Idle.next(LogEvent::Complete), None);
        assert_eq!(Phase::Idle.next(LogEvent::Error), None);
        assert_eq!(Phase::Started.next(LogEvent::Start), None);
        assert_eq!(Phase::Errored.next(LogEvent::Complete), None);
        assert_eq!(Phase::Errored.next(LogEvent::Error), None);
        for event in [LogEvent::Start, LogEvent::Complete, LogEvent::Error] {
            assert_eq!(Phase::Released.next(event), None);
        }
    }

    #[test]
    fn advance_rejects_invalid_transitions() {
        let mut ctx = RequestContext::new("abc", true);
        assert!(!ctx.advance(LogEvent::Complete));
        assert_eq!(ctx.phase(), Phase::Idle);
        assert!(ctx.advance(LogEvent::Start));
        assert!(ctx.advance(LogEvent::Complete));
        assert!(ctx.advance(LogEvent::Error));
        ctx.release();
        assert_eq!(ctx.phase(), Phase::Released);
        assert_eq!(ctx.trace_id(), "abc");
    }
}
