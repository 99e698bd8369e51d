//! Output formatting module
//!
//! Text and JSON renderings of controller reports.

mod formatter;

pub use formatter::{GatewayInfo, OutputFormat, ReportFormatter};
