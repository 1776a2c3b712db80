use crate::codemod::Codemod;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-codemod outcome tally.
///
/// Counts are per file: `ok` files were changed, `nochange` files were left
/// as-is, `skip` files were ignored by the engine, `error` files failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub ok: u64,
    pub nochange: u64,
    pub skip: u64,
    pub error: u64,
    #[serde(with = "duration_secs")]
    pub time_elapsed: Duration,
}

impl Report {
    pub fn files_total(&self) -> u64 {
        self.ok + self.nochange + self.skip + self.error
    }

    pub fn has_errors(&self) -> bool {
        self.error > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodemodReport {
    pub codemod: Codemod,
    pub report: Report,
}

/// Aggregate over a list of codemod reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTotals {
    pub codemods: u64,
    pub ok: u64,
    pub nochange: u64,
    pub skip: u64,
    pub error: u64,
    #[serde(with = "duration_secs")]
    pub time_elapsed: Duration,
}

impl ReportTotals {
    pub fn from_reports(reports: &[CodemodReport]) -> Self {
        let mut totals = ReportTotals::default();
        for r in reports {
            totals.codemods += 1;
            totals.ok += r.report.ok;
            totals.nochange += r.report.nochange;
            totals.skip += r.report.skip;
            totals.error += r.report.error;
            totals.time_elapsed += r.report.time_elapsed;
        }
        totals
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(serde::de::Error::custom("time_elapsed must be a non-negative number"));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}
