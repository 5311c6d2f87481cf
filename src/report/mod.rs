pub use report::{Report, Reporter, INTERVAL_FORMAT};
pub use sink::{LogSink, Sink};
pub use stats::Stats;

pub mod stats;

mod report;
mod sink;
