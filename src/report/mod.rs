//! Delivery of correlation results.
//!
//! The correlator hands every outcome worth surfacing to a [`Reporter`] as a [`Report`].
mod logger;
mod models;

pub use logger::LogReporter;
pub use models::{ImagePulled, Report};

/// Receives reports synchronously from the consumer loop.
pub trait Reporter {
    fn report(&mut self, report: Report);
}

impl Reporter for Vec<Report> {
    fn report(&mut self, report: Report) {
        self.push(report);
    }
}
