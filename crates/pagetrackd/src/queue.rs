use std::collections::VecDeque;

use chrono::{DateTime, TimeDelta, Utc};

/// One outstanding `!pageadmin` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub at: DateTime<Utc>,
    pub requester: String,
    pub text: String,
}

impl PageRequest {
    pub fn new(requester: &str, text: &str, at: DateTime<Utc>) -> Self {
        Self {
            at,
            requester: requester.to_string(),
            text: text.to_string(),
        }
    }
}

/// How a pending request left the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Resolved {
        request: PageRequest,
        elapsed: TimeDelta,
        admin: String,
        reply: String,
    },
    /// The request was already older than the fail threshold when the flush
    /// ran, so the reply doesn't count as an answer.
    Failed { request: PageRequest },
}

/// FIFO queue of outstanding page requests.
///
/// The first qualifying admin line flushes the whole queue: every entry is
/// reported resolved or failed and the queue empties. Age is only checked at
/// flush time; nothing expires while no admin speaks, and nothing bounds the
/// queue if no admin ever does.
#[derive(Debug, Default)]
pub struct PageQueue {
    pending: VecDeque<PageRequest>,
}

impl PageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Requests are never rejected and never deduplicated.
    pub fn enqueue(&mut self, request: PageRequest) {
        self.pending.push_back(request);
    }

    /// Drain every pending request in arrival order.
    ///
    /// Entries at least `fail_after` old are reported failed; the rest are
    /// resolved by this reply. Flushing an empty queue reports nothing.
    pub fn flush(
        &mut self,
        admin: &str,
        reply: &str,
        now: DateTime<Utc>,
        fail_after: TimeDelta,
    ) -> Vec<Outcome> {
        self.pending
            .drain(..)
            .map(|request| {
                let elapsed = now - request.at;
                if elapsed >= fail_after {
                    Outcome::Failed { request }
                } else {
                    Outcome::Resolved {
                        request,
                        elapsed,
                        admin: admin.to_string(),
                        reply: reply.to_string(),
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Outcome, PageQueue, PageRequest};
    use chrono::{TimeDelta, TimeZone, Utc};

    fn t(minutes: i64) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 5, 12, 0, 0).unwrap() + TimeDelta::minutes(minutes)
    }

    #[test]
    fn one_reply_flushes_every_pending_request() {
        let mut q = PageQueue::new();
        q.enqueue(PageRequest::new("Bob", "cheater on alpha", t(0)));
        q.enqueue(PageRequest::new("Eve", "base rape", t(1)));

        let outcomes = q.flush("Mike", "on it", t(5), TimeDelta::minutes(30));
        assert!(q.is_empty());
        assert_eq!(outcomes.len(), 2);

        let Outcome::Resolved { request, elapsed, admin, reply } = &outcomes[0] else {
            panic!("expected resolved");
        };
        assert_eq!(request.requester, "Bob");
        assert_eq!(*elapsed, TimeDelta::minutes(5));
        assert_eq!(admin, "Mike");
        assert_eq!(reply, "on it");

        let Outcome::Resolved { request, elapsed, .. } = &outcomes[1] else {
            panic!("expected resolved");
        };
        assert_eq!(request.requester, "Eve");
        assert_eq!(*elapsed, TimeDelta::minutes(4));
    }

    #[test]
    fn stale_requests_fail_instead_of_resolving() {
        let mut q = PageQueue::new();
        q.enqueue(PageRequest::new("Bob", "help", t(0)));

        let outcomes = q.flush("Mike", "sorry, late", t(15), TimeDelta::minutes(10));
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(&outcomes[0], Outcome::Failed { request } if request.requester == "Bob"));
        assert!(q.is_empty());
    }

    #[test]
    fn age_exactly_at_threshold_fails() {
        let mut q = PageQueue::new();
        q.enqueue(PageRequest::new("Bob", "help", t(0)));

        let outcomes = q.flush("Mike", "here", t(10), TimeDelta::minutes(10));
        assert!(matches!(outcomes[0], Outcome::Failed { .. }));
    }

    #[test]
    fn duplicate_requests_are_independent_entries() {
        let mut q = PageQueue::new();
        q.enqueue(PageRequest::new("Bob", "help", t(0)));
        q.enqueue(PageRequest::new("Bob", "help", t(0)));
        assert_eq!(q.len(), 2);

        let outcomes = q.flush("Mike", "here", t(1), TimeDelta::minutes(30));
        assert_eq!(outcomes.len(), 2);
    }

    #[test]
    fn flushing_an_empty_queue_reports_nothing() {
        let mut q = PageQueue::new();
        let outcomes = q.flush("Mike", "anyone?", t(0), TimeDelta::minutes(30));
        assert!(outcomes.is_empty());
    }

    #[test]
    fn mixed_flush_keeps_arrival_order() {
        let mut q = PageQueue::new();
        q.enqueue(PageRequest::new("Old", "stale", t(0)));
        q.enqueue(PageRequest::new("New", "fresh", t(25)));

        let outcomes = q.flush("Mike", "here now", t(30), TimeDelta::minutes(20));
        assert!(matches!(&outcomes[0], Outcome::Failed { request } if request.requester == "Old"));
        assert!(
            matches!(&outcomes[1], Outcome::Resolved { request, .. } if request.requester == "New")
        );
    }
}
