#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

pub mod calendar;
mod error;
mod recorder;
mod service;

pub use error::UsageError;
pub use recorder::UsageRecorder;
pub use service::{ModelUsageReport, UsageService, UserUsageReport, calculate_cost};
