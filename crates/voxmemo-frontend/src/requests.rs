//! Tracking of in-flight requests, so superseded answers are dropped.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};

use tokio_util::sync::CancellationToken;

/// A UI action that talks to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Transcribe,
    Translate,
    Summarize,
}

/// Hash of the input an operation was started with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub fn of<T: Hash + ?Sized>(input: &T) -> Self {
        let mut hasher = DefaultHasher::new();
        input.hash(&mut hasher);
        Self(hasher.finish())
    }
}

/// Handle for one started request.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub operation: Operation,
    pub fingerprint: Fingerprint,
    token: CancellationToken,
}

impl Ticket {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Runs `future` until it completes or the ticket is cancelled, whichever
    /// comes first. `None` means the answer is no longer wanted.
    pub async fn run<F: Future>(&self, future: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            output = future => Some(output),
        }
    }
}

/// At most one live request per [`Operation`]; starting another cancels the
/// previous one.
#[derive(Debug, Default)]
pub struct RequestTracker {
    in_flight: HashMap<Operation, Ticket>,
    last_processed: HashMap<Operation, Fingerprint>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a request, cancelling whatever was in flight for the
    /// same operation.
    pub fn begin(&mut self, operation: Operation, fingerprint: Fingerprint) -> Ticket {
        let ticket = Ticket {
            operation,
            fingerprint,
            token: CancellationToken::new(),
        };
        if let Some(previous) = self.in_flight.insert(operation, ticket.clone()) {
            log::debug!("Superseding in-flight {operation:?} request");
            previous.token.cancel();
        }
        ticket
    }

    /// Marks a request as answered. Returns `false` when the ticket was
    /// cancelled in the meantime and its answer must be discarded.
    pub fn finish(&mut self, ticket: &Ticket) -> bool {
        if ticket.is_cancelled() {
            log::debug!("Discarding stale {:?} response", ticket.operation);
            return false;
        }
        self.in_flight.remove(&ticket.operation);
        self.last_processed
            .insert(ticket.operation, ticket.fingerprint);
        true
    }

    /// Whether this exact input was the last one processed for the operation.
    pub fn was_processed(&self, operation: Operation, fingerprint: Fingerprint) -> bool {
        self.last_processed.get(&operation) == Some(&fingerprint)
    }

    /// Forgets the last processed input of an operation.
    pub fn forget(&mut self, operation: Operation) {
        self.last_processed.remove(&operation);
    }

    /// Cancels everything in flight and forgets what was processed.
    pub fn reset(&mut self) {
        for (_, ticket) in self.in_flight.drain() {
            ticket.token.cancel();
        }
        self.last_processed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn newer_request_cancels_the_previous_one() {
        let mut tracker = RequestTracker::new();
        let first = tracker.begin(Operation::Translate, Fingerprint::of(&("hello", "es")));
        let second = tracker.begin(Operation::Translate, Fingerprint::of(&("hello", "es")));

        assert!(first.is_cancelled());
        assert!(!tracker.finish(&first));
        assert!(tracker.finish(&second));
        assert!(tracker.was_processed(Operation::Translate, second.fingerprint));
    }

    #[test]
    fn operations_do_not_cancel_each_other() {
        let mut tracker = RequestTracker::new();
        let translate = tracker.begin(Operation::Translate, Fingerprint::of("hello"));
        let summarize = tracker.begin(Operation::Summarize, Fingerprint::of("hello"));
        assert!(!translate.is_cancelled());
        assert!(tracker.finish(&summarize));
        assert!(tracker.finish(&translate));
    }

    #[test]
    fn reset_cancels_and_forgets() {
        let mut tracker = RequestTracker::new();
        let done = tracker.begin(Operation::Summarize, Fingerprint::of("a"));
        assert!(tracker.finish(&done));
        let pending = tracker.begin(Operation::Transcribe, Fingerprint::of("b"));

        tracker.reset();
        assert!(pending.is_cancelled());
        assert!(!tracker.was_processed(Operation::Summarize, done.fingerprint));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_ticket_stops_waiting() {
        let mut tracker = RequestTracker::new();
        let ticket = tracker.begin(Operation::Transcribe, Fingerprint::of("audio"));
        let waiter = {
            let ticket = ticket.clone();
            tokio::spawn(async move {
                ticket
                    .run(tokio::time::sleep(Duration::from_secs(60)))
                    .await
            })
        };
        tracker.begin(Operation::Transcribe, Fingerprint::of("audio"));
        assert_eq!(waiter.await.unwrap(), None);
    }
}
