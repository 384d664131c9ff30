//! Core of the calnotify reminder job.
//!
//! This crate turns an upcoming-events feed and a set of lead-time rules
//! into reminder notifications:
//! - `feed` and `index` decode the feed into typed occurrences
//! - `lead_time` decides which occurrences are due for which rule
//! - `fanout` renders `message`s and hands them to a `sink::Notifier`
//! - `run` ties the three together for a single pass

pub mod config;
pub mod error;
pub mod event;
pub mod fanout;
pub mod feed;
pub mod index;
pub mod lead_time;
pub mod message;
pub mod rules;
pub mod run;
pub mod sink;
pub mod time;

pub use error::{CalNotifyError, CalNotifyResult};
pub use event::*;
