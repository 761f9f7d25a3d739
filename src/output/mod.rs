//! End-of-run reporting.
//!
//! [`RunReport`] collects the counters and moves of one run. It prints as a
//! few summary lines or, with `--json`, as a JSON document on stdout.
//!
//! # Example
//!
//! ```
//! use dupequarantine::output::RunReport;
//! use std::path::Path;
//!
//! let report = RunReport::new(Path::new("/photos"), Path::new("/photos/Quarantined"), false);
//! println!("{}", report.to_json_pretty().unwrap());
//! ```

pub mod json;

pub use json::{JsonOutputError, ReportFailure, ReportMove, RunReport, RunSummary};
