//! Drivers behind the `lm-tester` and `parser-tester` binaries
//!
//! Both write their report to a caller supplied sink and log progress through `tracing`.

pub mod lm;
pub mod parse;

pub use lm::{LmTestReport, LmTesterConfig};
pub use parse::{ParserTesterConfig, TestMode};
