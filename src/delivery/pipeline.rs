//! Delivery pipeline: immediate sends backed by a durable backoff drain.
//!
//! Every event gets one immediate attempt. Hard failures enter the retry
//! queue, which drains strictly from the head so queued events keep their
//! order; a fresh event may still overtake them if its immediate send
//! lands first. Backoff grows with queue depth, so an unreachable endpoint
//! naturally slows the drain down.

use std::time::{Duration, Instant};

use crate::config::DeliveryConfig;
use crate::delivery::queue::RetryQueue;
use crate::delivery::transport::{LogTransport, SendOutcome};
use crate::event::ViolationEvent;

/// Retry scheduling parameters.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Bound for the immediate attempt
    pub send_timeout: Duration,
    /// Bound for each drain attempt
    pub retry_timeout: Duration,
    /// Delay before the first drain after the queue becomes non-empty
    pub initial_drain_delay: Duration,
    /// Base drain backoff
    pub backoff_base: Duration,
    /// Additional backoff per queued entry
    pub backoff_step: Duration,
    /// Backoff ceiling
    pub backoff_max: Duration,
}

impl RetryPolicy {
    pub fn from_config(cfg: &DeliveryConfig) -> Self {
        Self {
            send_timeout: Duration::from_secs(cfg.send_timeout_secs),
            retry_timeout: Duration::from_secs(cfg.retry_timeout_secs),
            initial_drain_delay: Duration::from_secs(cfg.initial_drain_delay_secs),
            backoff_base: Duration::from_secs(cfg.backoff_base_secs),
            backoff_step: Duration::from_secs(cfg.backoff_step_secs),
            backoff_max: Duration::from_secs(cfg.backoff_max_secs),
        }
    }

    /// Backoff for the next drain attempt: grows with queue depth, capped.
    pub fn backoff_delay(&self, queue_len: usize) -> Duration {
        let delay = self.backoff_base + self.backoff_step * queue_len as u32;
        delay.min(self.backoff_max)
    }
}

/// Accepts violation events and guarantees each is eventually delivered
/// or consciously dropped (endpoint soft-rejection).
pub struct DeliveryPipeline<T: LogTransport> {
    transport: T,
    queue: RetryQueue,
    policy: RetryPolicy,
    next_drain_at: Option<Instant>,
}

impl<T: LogTransport> DeliveryPipeline<T> {
    pub fn new(transport: T, queue: RetryQueue, policy: RetryPolicy) -> Self {
        let mut pipeline = Self {
            transport,
            queue,
            policy,
            next_drain_at: None,
        };
        // Resume draining anything left over from a previous run.
        if !pipeline.queue.is_empty() {
            pipeline.next_drain_at = Some(Instant::now() + pipeline.policy.initial_drain_delay);
        }
        pipeline
    }

    /// Number of not-yet-acknowledged events.
    pub fn backlog(&self) -> usize {
        self.queue.len()
    }

    pub fn queue(&self) -> &RetryQueue {
        &self.queue
    }

    /// Attempt immediate delivery; hard failures enter the retry queue.
    pub fn submit(&mut self, event: ViolationEvent, now: Instant) {
        match self.transport.deliver(&event, self.policy.send_timeout) {
            Ok(SendOutcome::Acknowledged) => {
                tracing::debug!(category = %event.log_type, "event delivered");
            }
            Ok(SendOutcome::SoftRejected(reason)) => {
                // The endpoint took the request but refused the event;
                // retrying would produce the same answer.
                tracing::warn!(category = %event.log_type, %reason, "event rejected by endpoint");
            }
            Err(e) => {
                tracing::warn!(
                    category = %event.log_type,
                    error = %e,
                    "delivery failed; queueing for retry"
                );
                self.enqueue(event, now);
            }
        }
    }

    fn enqueue(&mut self, event: ViolationEvent, now: Instant) {
        let was_empty = self.queue.is_empty();
        self.queue.push(event);
        if was_empty {
            self.next_drain_at = Some(now + self.policy.initial_drain_delay);
        }
    }

    /// Run one drain attempt if the schedule says it is due.
    pub fn poll(&mut self, now: Instant) {
        let due = self.next_drain_at.map_or(false, |at| now >= at);
        if due {
            self.drain_once(now);
        }
    }

    fn drain_once(&mut self, now: Instant) {
        let Some(head) = self.queue.head() else {
            self.next_drain_at = None;
            return;
        };

        match self.transport.deliver(head, self.policy.retry_timeout) {
            Ok(outcome) => {
                if let SendOutcome::SoftRejected(reason) = &outcome {
                    tracing::warn!(%reason, "queued event rejected by endpoint; dropping");
                }
                self.queue.acknowledge_head();
                self.next_drain_at = if self.queue.is_empty() {
                    None
                } else {
                    // More to do; go again on the next service pass.
                    Some(now)
                };
            }
            Err(e) => {
                let backlog = self.queue.len();
                tracing::debug!(error = %e, backlog, "drain attempt failed");
                self.next_drain_at = Some(now + self.policy.backoff_delay(backlog));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::transport::DeliveryError;
    use crate::event::{ClientInfo, ViolationCategory};
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Transport that replays scripted outcomes and records what it saw.
    struct ScriptTransport {
        outcomes: RefCell<VecDeque<Result<SendOutcome, ()>>>,
        delivered: RefCell<Vec<String>>,
    }

    impl ScriptTransport {
        fn new(outcomes: Vec<Result<SendOutcome, ()>>) -> Self {
            Self {
                outcomes: RefCell::new(outcomes.into()),
                delivered: RefCell::new(Vec::new()),
            }
        }
    }

    impl LogTransport for ScriptTransport {
        fn deliver(
            &self,
            event: &ViolationEvent,
            _timeout: Duration,
        ) -> Result<SendOutcome, DeliveryError> {
            let outcome = self
                .outcomes
                .borrow_mut()
                .pop_front()
                .unwrap_or(Ok(SendOutcome::Acknowledged));
            match outcome {
                Ok(ack) => {
                    self.delivered.borrow_mut().push(event.details.clone());
                    Ok(ack)
                }
                Err(()) => Err(DeliveryError::Network("connection refused".to_string())),
            }
        }
    }

    fn event(details: &str) -> ViolationEvent {
        ViolationEvent::new(
            "SESS-PIPE",
            ViolationCategory::TabSwitch,
            details.to_string(),
            None,
            ClientInfo::gather(640, 480),
        )
    }

    fn pipeline(outcomes: Vec<Result<SendOutcome, ()>>) -> DeliveryPipeline<ScriptTransport> {
        DeliveryPipeline::new(
            ScriptTransport::new(outcomes),
            RetryQueue::in_memory(1024),
            RetryPolicy::from_config(&DeliveryConfig::default()),
        )
    }

    #[test]
    fn test_immediate_success_leaves_queue_empty() {
        let mut p = pipeline(vec![Ok(SendOutcome::Acknowledged)]);
        p.submit(event("ok"), Instant::now());
        assert_eq!(p.backlog(), 0);
    }

    #[test]
    fn test_soft_rejection_is_not_retried() {
        let mut p = pipeline(vec![Ok(SendOutcome::SoftRejected("error".to_string()))]);
        p.submit(event("rejected"), Instant::now());
        assert_eq!(p.backlog(), 0);
    }

    #[test]
    fn test_hard_failure_enqueues_and_drains_after_delay() {
        let t0 = Instant::now();
        let mut p = pipeline(vec![Err(())]);

        p.submit(event("queued"), t0);
        assert_eq!(p.backlog(), 1);

        // Before the initial delay: nothing happens.
        p.poll(t0 + Duration::from_secs(4));
        assert_eq!(p.backlog(), 1);

        // After the initial delay the drain succeeds.
        p.poll(t0 + Duration::from_secs(5));
        assert_eq!(p.backlog(), 0);
    }

    #[test]
    fn test_fifo_order_across_failures_and_drains() {
        let t0 = Instant::now();
        // Three immediate failures, then everything succeeds.
        let mut p = pipeline(vec![Err(()), Err(()), Err(())]);

        for i in 0..3 {
            p.submit(event(&format!("event-{i}")), t0);
        }
        assert_eq!(p.backlog(), 3);

        // Drain runs one head attempt per due poll and reschedules
        // immediately after each success.
        let mut now = t0 + Duration::from_secs(5);
        for _ in 0..3 {
            p.poll(now);
            now += Duration::from_millis(100);
        }
        assert_eq!(p.backlog(), 0);
        assert_eq!(
            *p.transport.delivered.borrow(),
            vec!["event-0", "event-1", "event-2"]
        );
    }

    #[test]
    fn test_failed_drain_backs_off_with_queue_depth() {
        let t0 = Instant::now();
        // Immediate failure, then a failed drain, then success.
        let mut p = pipeline(vec![Err(()), Err(())]);

        p.submit(event("stubborn"), t0);
        p.poll(t0 + Duration::from_secs(5));
        assert_eq!(p.backlog(), 1);

        // Backoff for one queued entry is 10 + 2*1 = 12s from the failed
        // attempt; a poll before that is a no-op.
        p.poll(t0 + Duration::from_secs(5) + Duration::from_secs(11));
        assert_eq!(p.backlog(), 1);

        p.poll(t0 + Duration::from_secs(5) + Duration::from_secs(12));
        assert_eq!(p.backlog(), 0);
    }

    #[test]
    fn test_backoff_monotone_and_capped() {
        let policy = RetryPolicy::from_config(&DeliveryConfig::default());

        let mut previous = Duration::ZERO;
        for len in 0..50 {
            let delay = policy.backoff_delay(len);
            assert!(delay >= previous);
            assert!(delay <= policy.backoff_max);
            previous = delay;
        }
        // min(10 + 2*3, 30) = 16s
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(16));
        // Deep queues hit the cap.
        assert_eq!(policy.backoff_delay(40), Duration::from_secs(30));
    }
}
