//! pathwise-report — HTML rendering of learner progress reports.
//!
//! The report model itself (with JSON and markdown output) lives in
//! `pathwise_core::report`.

pub mod html;

pub use html::{generate_html, write_html_report};
