//! DNS-related modules.

pub mod extract;

pub use extract::{Answer, extract_answers, extract_from_payload};
