//! # quarry-analytics
//!
//! Derived statistics over the latest objects of both datasets.
//!
//! [`AnalyticsTask`] is triggered by queue messages but never trusts their
//! content: every invocation re-reads the website primary file and the API
//! `latest.json`, computes the reports, and emits one [`ResultRecord`] to a
//! [`ResultSink`]. A missing or malformed input fails the invocation and
//! emits nothing.
//!
//! Reports:
//! - population mean and sample standard deviation over a year range,
//! - best year per series (quarterly periods summed per year),
//! - one series and period left-joined with population by year.

mod error;
pub mod input;
pub mod reports;
pub mod result;
pub mod sink;
mod task;

pub use error::AnalyticsError;
pub use result::{AnalyticsResult, InputFingerprint, ResultRecord};
pub use sink::{JsonlSink, LogSink, MemorySink, ResultSink, sink_from_config};
pub use task::{AnalyticsTask, ReportSettings};
