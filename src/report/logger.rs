use super::{Report, Reporter};

/// Emits every report as a single JSON log line at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&mut self, report: Report) {
        match serde_json::to_string(&report) {
            Ok(line) => log::info!(target: "layer_timeline::report", "{} {}", report.kind(), line),
            Err(err) => log::error!("failed to serialize {} report: {}", report.kind(), err),
        }
    }
}
