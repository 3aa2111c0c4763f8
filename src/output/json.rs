//! JSON output formatting
//!
//! Serializable views of status reports and bank summaries, with
//! human-readable companions to the raw numbers.

use crate::distributed::StatusReport;
use crate::util::time::format_age;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Age of a timestamp in seconds plus a readable form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonAge {
    pub seconds: i64,
    pub human: String,
}

impl JsonAge {
    pub fn new(then: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            seconds: (now - then).num_seconds().max(0),
            human: format_age(then, now),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonLatest {
    pub size: usize,
    pub ones: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<JsonAge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonWorker {
    pub identity: String,
    pub size: usize,
    pub behind: bool,
}

/// Coordinator status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonStatus {
    pub latest: JsonLatest,
    pub workers: Vec<JsonWorker>,
    pub generated_at: DateTime<Utc>,
}

impl JsonStatus {
    pub fn new(report: &StatusReport, now: DateTime<Utc>) -> Self {
        Self {
            latest: JsonLatest {
                size: report.latest_size,
                ones: report.latest_ones,
                updated_at: report.updated_at,
                age: report.updated_at.map(|then| JsonAge::new(then, now)),
            },
            workers: report
                .workers
                .iter()
                .map(|w| JsonWorker {
                    identity: w.identity.clone(),
                    size: w.size,
                    behind: w.size < report.latest_size,
                })
                .collect(),
            generated_at: report.generated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonBucket {
    pub size: usize,
    pub coins: usize,
}

/// Solution bank contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonBankSummary {
    pub dir: String,
    pub total: usize,
    pub buckets: Vec<JsonBucket>,
}

impl JsonBankSummary {
    pub fn new(dir: &Path, summary: &[(usize, usize)]) -> Self {
        Self {
            dir: dir.display().to_string(),
            total: summary.iter().map(|&(_, coins)| coins).sum(),
            buckets: summary
                .iter()
                .map(|&(size, coins)| JsonBucket { size, coins })
                .collect(),
        }
    }
}

/// Pretty-printed JSON
pub fn to_json_string<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
