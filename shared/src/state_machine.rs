//! Interview State Machine
//!
//! Tracks interview progress for one (command class, endpoint) pair.
//! Progress is monotonic: a finished partial interview never undoes a
//! complete one, and a failure leaves the state where it was.

/// How far an endpoint's class has been interviewed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum InterviewState {
    #[default]
    NotStarted,
    Partial,
    Complete,
}

/// Flavor of interview run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterviewKind {
    /// Reuses cached support flags, only refreshes values
    Partial,
    /// Queries supported features live, then refreshes values
    Complete,
}

impl InterviewKind {
    /// State reached when a run of this kind succeeds
    pub fn target_state(self) -> InterviewState {
        match self {
            InterviewKind::Partial => InterviewState::Partial,
            InterviewKind::Complete => InterviewState::Complete,
        }
    }
}

/// Events that drive the interview state
#[derive(Debug, Clone, PartialEq)]
pub enum InterviewEvent {
    Started(InterviewKind),
    Succeeded(InterviewKind),
    Failed { kind: InterviewKind, reason: String },
}

/// Result of feeding an event into [`InterviewProgress`]
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionResult {
    /// The state moved forward
    Advanced(InterviewState),
    /// Event accepted, state kept
    Unchanged(InterviewState),
    /// The event does not fit the current run
    Invalid {
        from: InterviewState,
        event: InterviewEvent,
    },
}

#[derive(Debug, Default, Clone)]
pub struct InterviewProgress {
    state: InterviewState,
    running: Option<InterviewKind>,
    last_failure: Option<String>,
    attempts: u32,
}

impl InterviewProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> InterviewState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    /// Number of runs started so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn process_event(&mut self, event: InterviewEvent) -> TransitionResult {
        match (&event, self.running) {
            (InterviewEvent::Started(kind), None) => {
                self.running = Some(*kind);
                self.attempts += 1;
                TransitionResult::Unchanged(self.state)
            }

            (InterviewEvent::Succeeded(kind), Some(running)) if *kind == running => {
                self.running = None;
                self.last_failure = None;
                let next = self.state.max(kind.target_state());
                if next > self.state {
                    self.state = next;
                    TransitionResult::Advanced(next)
                } else {
                    TransitionResult::Unchanged(self.state)
                }
            }

            (InterviewEvent::Failed { kind, reason }, Some(running)) if *kind == running => {
                self.running = None;
                self.last_failure = Some(reason.clone());
                TransitionResult::Unchanged(self.state)
            }

            _ => TransitionResult::Invalid {
                from: self.state,
                event,
            },
        }
    }
}
