//! Log diagnostics
//!
//! Scans the logs of an agent run for a fixed taxonomy of failure
//! signatures and classifies what it finds.

mod pattern;
mod scanner;

pub use pattern::Severity;
pub use scanner::{DiagnosticScanner, ScanFinding, ScanReport, SourceOutcome};

#[cfg(test)]
pub use pattern::{LogKind, LogSource};
#[cfg(test)]
pub use scanner::{SourceReport, SourceUnavailable};
