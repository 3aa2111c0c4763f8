//! Report rendering
//!
//! Coordinator status reports and solution bank summaries, as
//! human-readable text or JSON.

pub mod json;
pub mod text;

use crate::config::cli::OutputFormat;
use crate::distributed::StatusReport;
use crate::Result;
use chrono::Utc;
use std::path::Path;

/// Print a status report in `format`.
pub fn print_status(report: &StatusReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", text::render_status(report, Utc::now())),
        OutputFormat::Json => {
            println!("{}", json::to_json_string(&json::JsonStatus::new(report, Utc::now()))?)
        }
    }
    Ok(())
}

/// Print a bank summary in `format`.
pub fn print_bank_summary(dir: &Path, summary: &[(usize, usize)], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", text::render_bank_summary(dir, summary)),
        OutputFormat::Json => {
            println!("{}", json::to_json_string(&json::JsonBankSummary::new(dir, summary))?)
        }
    }
    Ok(())
}
