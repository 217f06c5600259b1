//! Session telemetry: periodic snapshots pushed to a persistence sink.

mod payload;
mod reporter;
mod sink;

pub use payload::TelemetryPayload;
pub use reporter::{ReportOutcome, TelemetryHandle, TelemetryReporter};
pub use sink::{HttpTelemetrySink, TelemetrySink};
