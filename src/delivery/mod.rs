//! Delivery of newly observed answers: queue, dispatcher and sink.

pub mod dispatcher;
pub mod queue;
pub mod sink;

pub use dispatcher::{DispatchStats, Dispatcher};
pub use queue::{AnswerReceiver, AnswerSender, QueueClosed};
pub use sink::{Delivered, DeliveryError, DeliverySink, HttpSink};
