use std::sync::Arc;
use log::{error, info};
use super::Report;

pub trait Sink: Send + Sync {
    fn emit(&self, report: Report);
}

/// Writes each report as one JSON line through the `log` facade.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogSink;

impl Sink for LogSink {
    fn emit(&self, report: Report) {
        match serde_json::to_string(&report) {
            Ok(line) => info!("{}", line),
            Err(e)   => error!("report encoding failed: {:?}", e),
        }
    }
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn emit(&self, report: Report) {
        (**self).emit(report)
    }
}
