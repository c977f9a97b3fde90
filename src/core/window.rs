use crate::error::{Result, SweepError};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` calendar date
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| SweepError::InvalidDate {
        value: value.to_string(),
    })
}

/// Inclusive day count between departure and return (a same-day trip is 1 day)
pub fn stay_length(departure_date: NaiveDate, return_date: NaiveDate) -> i64 {
    (return_date - departure_date).num_days() + 1
}

/// Inclusive range of candidate departure dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl SearchWindow {
    /// An inverted window is allowed and enumerates nothing
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    pub fn parse(start_date: &str, end_date: &str) -> Result<Self> {
        Ok(Self::new(parse_date(start_date)?, parse_date(end_date)?))
    }

    pub fn is_empty(&self) -> bool {
        self.start_date > self.end_date
    }

    /// Number of calendar days in the window
    pub fn len_days(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            stay_length(self.start_date, self.end_date) as usize
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Every date of the window in ascending order
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end_date = self.end_date;
        self.start_date
            .iter_days()
            .take_while(move |date| *date <= end_date)
    }

    /// Candidate trips for this window under the given stay rule
    pub fn candidates(&self, rule: StayRule) -> TripCandidates {
        enumerate(*self, rule)
    }
}

/// How long a trip may last, in inclusive days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StayRule {
    Range {
        #[serde(rename = "min_stay_days")]
        min_stay: u32,
        #[serde(rename = "max_stay_days")]
        max_stay: u32,
    },
    Fixed {
        stay_days: u32,
    },
}

impl StayRule {
    pub fn range(min_stay: u32, max_stay: u32) -> Result<Self> {
        if min_stay == 0 {
            return Err(SweepError::InvalidStay(
                "minimum stay must be at least 1 day".to_string(),
            ));
        }
        if min_stay > max_stay {
            return Err(SweepError::InvalidStay(format!(
                "minimum stay {} exceeds maximum stay {}",
                min_stay, max_stay
            )));
        }
        Ok(StayRule::Range { min_stay, max_stay })
    }

    pub fn fixed(stay_days: u32) -> Result<Self> {
        if stay_days == 0 {
            return Err(SweepError::InvalidStay(
                "stay must be at least 1 day".to_string(),
            ));
        }
        Ok(StayRule::Fixed { stay_days })
    }

    /// Whether a stay of `days` satisfies the rule
    pub fn accepts(&self, days: i64) -> bool {
        match *self {
            StayRule::Range { min_stay, max_stay } => {
                i64::from(min_stay) <= days && days <= i64::from(max_stay)
            }
            StayRule::Fixed { stay_days } => days == i64::from(stay_days),
        }
    }

    pub fn describe(&self) -> String {
        match *self {
            StayRule::Range { min_stay, max_stay } => format!("{}-{} days", min_stay, max_stay),
            StayRule::Fixed { stay_days } => format!("{} days", stay_days),
        }
    }
}

/// A single departure/return pair considered for pricing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTrip {
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
    pub stay_days: u32,
}

/// Enumerate candidate trips for a window and stay rule.
///
/// Range mode yields every `(d1, d2)` inside the window with `d1 <= d2` whose
/// inclusive stay satisfies the rule, ordered by departure then return date.
/// Fixed mode yields exactly one trip per departure date; its return date may
/// fall after the window's end.
pub fn enumerate(window: SearchWindow, rule: StayRule) -> TripCandidates {
    TripCandidates {
        window,
        rule,
        departure: (!window.is_empty()).then_some(window.start_date),
        offset: 0,
    }
}

/// Lazy candidate sequence; clone it to restart from the current position
#[derive(Debug, Clone)]
pub struct TripCandidates {
    window: SearchWindow,
    rule: StayRule,
    departure: Option<NaiveDate>,
    // days between departure and the next return date to try
    offset: i64,
}

impl TripCandidates {
    fn advance_departure(&mut self) {
        self.departure = self
            .departure
            .and_then(|date| date.succ_opt())
            .filter(|date| *date <= self.window.end_date);
        self.offset = 0;
    }
}

impl Iterator for TripCandidates {
    type Item = CandidateTrip;

    fn next(&mut self) -> Option<CandidateTrip> {
        loop {
            let departure_date = self.departure?;

            match self.rule {
                StayRule::Fixed { stay_days } => {
                    self.advance_departure();
                    let offset = Duration::days(i64::from(stay_days) - 1);
                    match departure_date.checked_add_signed(offset) {
                        Some(return_date) => {
                            return Some(CandidateTrip {
                                departure_date,
                                return_date,
                                stay_days,
                            })
                        }
                        None => {
                            self.departure = None;
                            return None;
                        }
                    }
                }
                StayRule::Range { min_stay, max_stay } => {
                    // skip return dates that are too close to satisfy the minimum
                    self.offset = self.offset.max(i64::from(min_stay) - 1).max(0);
                    let stay = self.offset + 1;

                    if stay <= i64::from(max_stay) {
                        let return_date =
                            departure_date.checked_add_signed(Duration::days(self.offset));
                        if let Some(return_date) =
                            return_date.filter(|date| *date <= self.window.end_date)
                        {
                            self.offset += 1;
                            return Some(CandidateTrip {
                                departure_date,
                                return_date,
                                stay_days: stay as u32,
                            });
                        }
                    }

                    self.advance_departure();
                }
            }
        }
    }
}
