//! Fan-out of queued answer names into concurrent delivery tasks.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use super::queue::AnswerReceiver;
use super::sink::DeliverySink;

/// Outcome counters for a dispatcher run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub dispatched: u64,
    pub delivered: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Drains the delivery queue, spawning one tracked task per name.
pub struct Dispatcher<S: DeliverySink> {
    sink: Arc<S>,
    tracker: TaskTracker,
    limit: Option<Arc<Semaphore>>,
    counters: Arc<Counters>,
}

impl<S: DeliverySink> Dispatcher<S> {
    /// Create a dispatcher with no cap on concurrent deliveries; the queue
    /// capacity is the only throttle.
    pub fn new(sink: S) -> Self {
        Self {
            sink: Arc::new(sink),
            tracker: TaskTracker::new(),
            limit: None,
            counters: Arc::default(),
        }
    }

    /// Cap concurrent deliveries at `max_in_flight`. While the cap is
    /// reached the dispatcher stops draining the queue.
    #[must_use]
    pub fn with_max_in_flight(mut self, max_in_flight: Option<usize>) -> Self {
        self.limit = max_in_flight.map(|max| Arc::new(Semaphore::new(max)));
        self
    }

    /// Run until the queue is closed and drained, then wait for every
    /// launched delivery to finish.
    ///
    /// Cancelling `shutdown` closes the queue to new names; names already
    /// buffered are still delivered.
    pub async fn run(
        self,
        mut receiver: AnswerReceiver,
        shutdown: CancellationToken,
    ) -> DispatchStats {
        let mut dispatched = 0u64;
        let mut closing = false;

        loop {
            let name = tokio::select! {
                biased;
                () = shutdown.cancelled(), if !closing => {
                    debug!(buffered = receiver.len(), "closing delivery queue");
                    receiver.close();
                    closing = true;
                    continue;
                }
                next = receiver.recv() => match next {
                    Some(name) => name,
                    None => break,
                },
            };

            let permit = match &self.limit {
                Some(limit) => Arc::clone(limit).acquire_owned().await.ok(),
                None => None,
            };

            dispatched += 1;
            let sink = Arc::clone(&self.sink);
            let counters = Arc::clone(&self.counters);
            self.tracker.spawn(async move {
                let _permit = permit;
                metrics::gauge!("dnscollect_deliveries_in_flight").increment(1.0);
                deliver_one(sink.as_ref(), &name, &counters).await;
                metrics::gauge!("dnscollect_deliveries_in_flight").decrement(1.0);
            });
        }

        self.tracker.close();
        debug!(outstanding = self.tracker.len(), "waiting for in-flight deliveries");
        self.tracker.wait().await;

        DispatchStats {
            dispatched,
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

/// Make the single delivery attempt for `name` and log its outcome.
async fn deliver_one<S: DeliverySink>(sink: &S, name: &str, counters: &Counters) {
    match sink.deliver(name).await {
        Ok(delivered) => {
            counters.delivered.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("dnscollect_deliveries_total", "outcome" => "delivered").increment(1);
            info!(answer = %name, status = delivered.status, "Successfully sent DNS answer");
        }
        Err(err) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("dnscollect_deliveries_total", "outcome" => "failed").increment(1);
            warn!(answer = %name, error = %err, "Error sending DNS answer");
        }
    }
}
