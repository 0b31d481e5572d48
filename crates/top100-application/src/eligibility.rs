// SPDX-License-Identifier: GPL-3.0-or-later

use chrono::{Months, NaiveDate};
use thiserror::Error;
use top100_domain::TrackObservation;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EligibilityError {
    #[error("invalid label month '{0}', expected YYYY-MM")]
    InvalidLabelMonth(String),
    #[error("eligibility window of {0} months is out of range")]
    OutOfRange(u32),
}

/// Inclusive range of file modification times that count for a chart month.
///
/// Bounds are `YYYY-MM-DD HH:MM:SS` strings and comparisons are lexicographic,
/// matching how modification times are recorded on [`top100_domain::TrackFile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityWindow {
    start: String,
    end: String,
}

impl EligibilityWindow {
    /// Window from the first day `months` before the label month up to the
    /// last second of the label month.
    pub fn for_label_month(label_month: &str, months: u32) -> Result<Self, EligibilityError> {
        let month_start = parse_label_month(label_month)?;
        let window_start = month_start
            .checked_sub_months(Months::new(months))
            .ok_or(EligibilityError::OutOfRange(months))?;
        let month_end = month_start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or(EligibilityError::OutOfRange(months))?;

        Ok(Self {
            start: format!("{} 00:00:00", window_start.format("%Y-%m-%d")),
            end: format!("{} 23:59:59", month_end.format("%Y-%m-%d")),
        })
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }

    pub fn contains(&self, modified_at: &str) -> bool {
        modified_at >= self.start.as_str() && modified_at <= self.end.as_str()
    }

    /// Keep observations whose file falls inside the window.
    pub fn filter(&self, observations: &[TrackObservation]) -> Vec<TrackObservation> {
        let eligible: Vec<TrackObservation> = observations
            .iter()
            .filter(|observation| self.contains(observation.file.modified_at_or_default()))
            .cloned()
            .collect();

        debug!(
            target: "run",
            start = %self.start,
            end = %self.end,
            total = observations.len(),
            eligible = eligible.len(),
            "applied eligibility window"
        );
        eligible
    }
}

/// First day of a `YYYY-MM` label month.
pub fn parse_label_month(label_month: &str) -> Result<NaiveDate, EligibilityError> {
    let invalid = || EligibilityError::InvalidLabelMonth(label_month.to_string());

    let well_formed = label_month.len() == 7
        && label_month.as_bytes()[4] == b'-'
        && label_month
            .bytes()
            .enumerate()
            .all(|(index, byte)| index == 4 || byte.is_ascii_digit());
    if !well_formed {
        return Err(invalid());
    }

    NaiveDate::parse_from_str(&format!("{label_month}-01"), "%Y-%m-%d").map_err(|_| invalid())
}
