//! Human-readable text output

use crate::distributed::StatusReport;
use crate::util::time::format_age;
use chrono::{DateTime, Utc};
use std::fmt::Write;
use std::path::Path;

const RULE: &str = "═══════════════════════════════════════════════════════════";

/// Render a coordinator status report
///
/// Workers behind the latest counterexample are flagged so an operator can
/// see who is due a preemption.
pub fn render_status(report: &StatusReport, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "                  COORDINATOR STATUS");
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out);

    if report.latest_size == 0 {
        let _ = writeln!(out, "Latest counterexample: none");
    } else {
        let _ = writeln!(
            out,
            "Latest counterexample: {} vertices ({} one-edges)",
            report.latest_size, report.latest_ones
        );
    }
    if let Some(updated) = report.updated_at {
        let _ = writeln!(
            out,
            "  Updated: {} ({})",
            updated.format("%Y-%m-%d %H:%M:%S UTC"),
            format_age(updated, now)
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Workers: {}", report.workers.len());
    let width = report
        .workers
        .iter()
        .map(|w| w.identity.len())
        .max()
        .unwrap_or(0);
    for worker in &report.workers {
        let marker = if worker.size < report.latest_size { "  (behind)" } else { "" };
        let _ = writeln!(
            out,
            "  {:<width$}  {:>4}{}",
            worker.identity, worker.size, marker
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{RULE}");
    out
}

/// Render the solution bank's per-size coin counts
pub fn render_bank_summary(dir: &Path, summary: &[(usize, usize)]) -> String {
    let total: usize = summary.iter().map(|&(_, coins)| coins).sum();
    let mut out = String::new();
    let _ = writeln!(out, "Solution bank: {}", dir.display());
    let _ = writeln!(out, "  Total coins: {}", format_number(total));
    for &(size, coins) in summary {
        let _ = writeln!(out, "  {:>4} vertices: {}", size, format_number(coins));
    }
    out
}

/// Format a number with thousands separators
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();

    for (count, c) in s.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::WorkerEntry;
    use chrono::TimeZone;

    fn report() -> StatusReport {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        StatusReport {
            latest_size: 41,
            latest_ones: 410,
            updated_at: Some(now - chrono::Duration::seconds(150)),
            workers: vec![
                WorkerEntry { identity: "10.0.0.1:5555".into(), size: 41 },
                WorkerEntry { identity: "10.0.0.2:5555".into(), size: 37 },
            ],
            generated_at: now,
        }
    }

    #[test]
    fn test_render_status() {
        let report = report();
        let text = render_status(&report, report.generated_at);
        assert!(text.contains("Latest counterexample: 41 vertices (410 one-edges)"));
        assert!(text.contains("2m30s ago"));
        assert!(text.contains("Workers: 2"));

        let lines: Vec<&str> = text.lines().filter(|l| l.contains("10.0.0.")).collect();
        assert_eq!(lines.len(), 2);
        assert!(!lines[0].contains("behind"));
        assert!(lines[1].contains("behind"));
    }

    #[test]
    fn test_render_empty_status() {
        let now = Utc::now();
        let report = StatusReport {
            latest_size: 0,
            latest_ones: 0,
            updated_at: None,
            workers: Vec::new(),
            generated_at: now,
        };
        let text = render_status(&report, now);
        assert!(text.contains("Latest counterexample: none"));
        assert!(!text.contains("Updated"));
        assert!(text.contains("Workers: 0"));
    }

    #[test]
    fn test_render_bank_summary() {
        let text = render_bank_summary(Path::new("bank"), &[(16, 2), (17, 1500)]);
        assert!(text.contains("Total coins: 1,502"));
        assert!(text.contains("  17 vertices: 1,500"));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1234567), "1,234,567");
    }
}
