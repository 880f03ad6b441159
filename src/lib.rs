//! dnscollect - A passive DNS answer collector.
//!
//! dnscollect watches DNS responses on a local interface, remembers every
//! answer name it has seen, and reports each new one to a remote ingest
//! endpoint as `{"answer": "<name>"}`.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`config`]: Configuration loading and validation
//! - [`network`]: Interface selection and packet capture
//! - [`dns`]: Extraction of answers from captured DNS responses
//! - [`dedup`]: The set of answer names already seen
//! - [`delivery`]: Bounded queue, dispatcher and HTTP sink
//! - [`pipeline`]: Capture-to-delivery orchestration
//! - [`error`]: Error types
//!
//! # Testing
//!
//! Capture and delivery sit behind traits so the pipeline can be driven
//! without network access:
//!
//! ```rust
//! use dnscollect::dedup::AnswerSet;
//!
//! let seen = AnswerSet::new();
//! assert!(seen.is_new("example.com"));
//! assert!(!seen.is_new("example.com"));
//! ```

pub mod config;
pub mod dedup;
pub mod delivery;
pub mod dns;
pub mod error;
pub mod metrics;
pub mod network;
pub mod pipeline;

pub use config::Config;
pub use error::{Error, Result};
