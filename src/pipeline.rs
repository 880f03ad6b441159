//! Capture-to-delivery orchestration.
//!
//! A dedicated OS thread runs the blocking capture loop and feeds new answer
//! names into the bounded queue; the dispatcher drains it on the async
//! runtime. Designed with trait-based dependencies for testability.

use std::thread::{self, JoinHandle};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::dedup::AnswerSet;
use crate::delivery::queue::{self, AnswerSender};
use crate::delivery::{DeliverySink, DispatchStats, Dispatcher};
use crate::dns::extract_answers;
use crate::error::{ConfigError, NetworkError, Result, ValidationError};
use crate::network::PacketCapture;

/// Pipeline tuning taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub channel_capacity: usize,
    pub max_in_flight: Option<usize>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            channel_capacity: queue::DEFAULT_CAPACITY,
            max_in_flight: None,
        }
    }
}

impl PipelineSettings {
    /// Check the limits the queue and the in-flight semaphore can honor.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.channel_capacity == 0 {
            return Err(ValidationError::ZeroChannelCapacity);
        }

        match self.max_in_flight {
            Some(0) => Err(ValidationError::ZeroMaxInFlight),
            Some(value) if value > Semaphore::MAX_PERMITS => {
                Err(ValidationError::MaxInFlightTooLarge {
                    value,
                    max: Semaphore::MAX_PERMITS,
                })
            }
            _ => Ok(()),
        }
    }
}

/// Statistics for the capture side of the pipeline.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CaptureStats {
    /// Frames read from the capture.
    pub frames: u64,
    /// IP-bearing answers extracted, duplicates included.
    pub answers: u64,
    /// Names that passed the dedup gate and were queued.
    pub enqueued: u64,
}

/// Summary of a finished pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineReport {
    /// None when the capture thread was abandoned on shutdown.
    pub capture: Option<CaptureStats>,
    pub dispatch: DispatchStats,
}

/// Run the capture loop until the capture ends or the queue is closed.
///
/// Answers are dedup-checked and enqueued in frame order. A full queue
/// blocks this loop.
pub fn run_capture_loop<C: PacketCapture>(
    capture: &mut C,
    answers: &AnswerSet,
    sender: &AnswerSender,
) -> CaptureStats {
    let mut stats = CaptureStats::default();

    while let Some(frame) = capture.next_frame() {
        stats.frames += 1;
        metrics::counter!("dnscollect_frames_total").increment(1);

        for answer in extract_answers(&frame) {
            stats.answers += 1;
            if !answers.is_new(&answer.name) {
                continue;
            }

            info!(answer = %answer.name, address = %answer.address, "New DNS answer");
            metrics::counter!("dnscollect_answers_new_total").increment(1);

            if sender.enqueue_blocking(answer.name).is_err() {
                debug!("delivery queue closed, stopping capture");
                return stats;
            }
            stats.enqueued += 1;
        }
    }

    debug!("capture ended");
    stats
}

/// Spawn the capture loop on its own thread. The sender is dropped when the
/// loop returns, which closes the queue.
pub fn spawn_capture_thread<C>(
    mut capture: C,
    answers: AnswerSet,
    sender: AnswerSender,
) -> Result<JoinHandle<CaptureStats>>
where
    C: PacketCapture + 'static,
{
    let handle = thread::Builder::new()
        .name("capture".into())
        .spawn(move || run_capture_loop(&mut capture, &answers, &sender))
        .map_err(NetworkError::ThreadSpawn)?;
    Ok(handle)
}

/// Run the whole pipeline: capture, dedup, queue, dispatch, deliver.
///
/// Returns once the capture has ended (or `shutdown` fired) and every
/// delivery launched before the queue closed has completed.
///
/// # Errors
///
/// Fails before capturing anything if `settings` do not validate, or if the
/// capture thread cannot be spawned.
pub async fn run_pipeline<C, S>(
    capture: C,
    sink: S,
    settings: PipelineSettings,
    shutdown: CancellationToken,
) -> Result<PipelineReport>
where
    C: PacketCapture + 'static,
    S: DeliverySink,
{
    settings.validate().map_err(ConfigError::from)?;

    let (sender, receiver) = queue::bounded(settings.channel_capacity);
    let capture_handle = spawn_capture_thread(capture, AnswerSet::new(), sender)?;

    let dispatch = Dispatcher::new(sink)
        .with_max_in_flight(settings.max_in_flight)
        .run(receiver, shutdown.clone())
        .await;

    // On shutdown the capture thread may be parked in a blocking read
    let capture = if shutdown.is_cancelled() {
        None
    } else {
        join_capture_thread(capture_handle).await
    };

    Ok(PipelineReport { capture, dispatch })
}

async fn join_capture_thread(handle: JoinHandle<CaptureStats>) -> Option<CaptureStats> {
    match tokio::task::spawn_blocking(move || handle.join()).await {
        Ok(Ok(stats)) => Some(stats),
        Ok(Err(_)) => {
            error!("capture thread panicked, capture stopped early");
            None
        }
        Err(err) => {
            error!(error = %err, "failed to join capture thread");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::sink::tests::MockSink;
    use crate::dns::extract::DNS_PORT;
    use crate::dns::extract::tests::{a_record, cname_record, dns_response, ipv4_udp_frame};
    use crate::error::Error;
    use crate::network::{Frame, MockCapture, PacketCapture};
    use std::net::Ipv4Addr;

    struct PanickingCapture;

    impl PacketCapture for PanickingCapture {
        fn next_frame(&mut self) -> Option<Frame> {
            panic!("capture device vanished");
        }
    }

    fn rejected(settings: PipelineSettings) -> ValidationError {
        match settings.validate() {
            Err(err) => err,
            Ok(()) => panic!("expected {settings:?} to be rejected"),
        }
    }

    fn response_frame(name: &str, ip: Ipv4Addr) -> Frame {
        let dns = dns_response(name, vec![a_record(name, ip)]);
        Frame::ethernet(ipv4_udp_frame(DNS_PORT, 53000, &dns))
    }

    #[test]
    fn should_enqueue_new_answers_in_frame_order() {
        let mut capture = MockCapture::new(vec![
            response_frame("first.com.", Ipv4Addr::new(10, 0, 0, 1)),
            response_frame("second.com.", Ipv4Addr::new(10, 0, 0, 2)),
            response_frame("first.com.", Ipv4Addr::new(10, 0, 0, 1)),
        ]);
        let answers = AnswerSet::new();
        let (sender, mut receiver) = queue::bounded(8);

        let stats = run_capture_loop(&mut capture, &answers, &sender);
        drop(sender);

        assert_eq!(
            stats,
            CaptureStats {
                frames: 3,
                answers: 3,
                enqueued: 2,
            }
        );
        assert_eq!(receiver.blocking_recv().as_deref(), Some("first.com"));
        assert_eq!(receiver.blocking_recv().as_deref(), Some("second.com"));
        assert_eq!(receiver.blocking_recv(), None);
    }

    #[test]
    fn should_never_queue_non_ip_answers() {
        let dns = dns_response(
            "www.example.com.",
            vec![cname_record("www.example.com.", "edge.example.net.")],
        );
        let frame = Frame::ethernet(ipv4_udp_frame(DNS_PORT, 53000, &dns));
        let mut capture = MockCapture::new(vec![frame]);
        let answers = AnswerSet::new();
        let (sender, mut receiver) = queue::bounded(8);

        let stats = run_capture_loop(&mut capture, &answers, &sender);
        drop(sender);

        assert_eq!(stats.answers, 0);
        assert!(answers.is_empty());
        assert_eq!(receiver.blocking_recv(), None);
    }

    #[test]
    fn should_stop_capture_when_queue_closed() {
        let mut capture = MockCapture::new(vec![
            response_frame("a.com.", Ipv4Addr::new(10, 0, 0, 1)),
            response_frame("b.com.", Ipv4Addr::new(10, 0, 0, 2)),
        ]);
        let answers = AnswerSet::new();
        let (sender, receiver) = queue::bounded(8);
        drop(receiver);

        let stats = run_capture_loop(&mut capture, &answers, &sender);

        assert_eq!(stats.frames, 1);
        assert_eq!(stats.enqueued, 0);
    }

    #[tokio::test]
    async fn should_deliver_each_answer_once_end_to_end() {
        let capture = MockCapture::new(vec![
            response_frame("example.com.", Ipv4Addr::new(93, 184, 216, 34)),
            response_frame("example.com.", Ipv4Addr::new(93, 184, 216, 34)),
            response_frame("other.com.", Ipv4Addr::new(198, 51, 100, 1)),
        ]);
        let sink = MockSink::new();

        let report = run_pipeline(
            capture,
            sink.clone(),
            PipelineSettings::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let mut attempts = sink.attempts();
        attempts.sort();
        assert_eq!(attempts, vec!["example.com", "other.com"]);
        assert_eq!(report.dispatch.dispatched, 2);
        assert_eq!(report.dispatch.delivered, 2);
        assert_eq!(report.capture.map(|stats| stats.enqueued), Some(2));
    }

    #[tokio::test]
    async fn should_keep_capturing_after_delivery_failure() {
        let capture = MockCapture::new(vec![
            response_frame("broken.com.", Ipv4Addr::new(10, 0, 0, 1)),
            response_frame("later.com.", Ipv4Addr::new(10, 0, 0, 2)),
        ]);
        let sink = MockSink::new();
        sink.fail_for("broken.com");

        let report = run_pipeline(
            capture,
            sink.clone(),
            PipelineSettings::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.dispatch.failed, 1);
        assert_eq!(report.dispatch.delivered, 1);
        assert_eq!(sink.attempts().len(), 2);
    }

    #[test]
    fn should_reject_unusable_settings() {
        assert_eq!(
            rejected(PipelineSettings {
                channel_capacity: 0,
                max_in_flight: None,
            }),
            ValidationError::ZeroChannelCapacity
        );
        assert_eq!(
            rejected(PipelineSettings {
                channel_capacity: 1,
                max_in_flight: Some(0),
            }),
            ValidationError::ZeroMaxInFlight
        );
        assert!(matches!(
            rejected(PipelineSettings {
                channel_capacity: 1,
                max_in_flight: Some(Semaphore::MAX_PERMITS + 1),
            }),
            ValidationError::MaxInFlightTooLarge { .. }
        ));
    }

    #[tokio::test]
    async fn should_fail_fast_instead_of_hanging_on_zero_max_in_flight() {
        let capture = MockCapture::new(vec![response_frame(
            "stuck.com.",
            Ipv4Addr::new(10, 0, 0, 9),
        )]);
        let sink = MockSink::new();

        let result = run_pipeline(
            capture,
            sink.clone(),
            PipelineSettings {
                channel_capacity: 4,
                max_in_flight: Some(0),
            },
            CancellationToken::new(),
        )
        .await;

        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::Validation(
                ValidationError::ZeroMaxInFlight
            )))
        ));
        assert!(sink.attempts().is_empty());
    }

    #[tokio::test]
    async fn should_report_no_capture_stats_when_capture_thread_panics() {
        let report = run_pipeline(
            PanickingCapture,
            MockSink::new(),
            PipelineSettings::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.capture, None);
        assert_eq!(report.dispatch.dispatched, 0);
    }
}
