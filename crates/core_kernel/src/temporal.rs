//! Billing month calendar types
//!
//! Billing periods aggregate sessions per calendar month, so the whole system
//! keys on a validated (year, month) pair rather than raw integers.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid month: {0} (expected 1-12)")]
    InvalidMonth(u32),

    #[error("Invalid year: {0}")]
    InvalidYear(i32),

    #[error("Cannot parse billing month from '{0}' (expected YYYY-MM)")]
    Parse(String),
}

/// A calendar month used as the billing aggregation key
///
/// Ordering is chronological: field order (year, then month) makes the derived
/// `Ord` correct, which the oldest-unpaid derivation relies on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BillingMonth {
    year: i32,
    month: u32,
}

impl BillingMonth {
    /// Creates a validated billing month
    pub fn new(year: i32, month: u32) -> Result<Self, TemporalError> {
        if !(1..=12).contains(&month) {
            return Err(TemporalError::InvalidMonth(month));
        }
        if !(1970..=2200).contains(&year) {
            return Err(TemporalError::InvalidYear(year));
        }
        Ok(Self { year, month })
    }

    /// The billing month a given date falls in
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First calendar day of the month
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("validated month")
    }

    /// Last calendar day of the month
    pub fn last_day(&self) -> NaiveDate {
        self.next()
            .first_day()
            .pred_opt()
            .expect("month start has a predecessor")
    }

    /// True if the date falls inside this month
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// The following month
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// The preceding month
    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Steps back `n` months (used for the matcher's lookback window)
    pub fn minus_months(&self, n: u32) -> Self {
        let mut current = *self;
        for _ in 0..n {
            current = current.prev();
        }
        current
    }
}

impl fmt::Display for BillingMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for BillingMonth {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| TemporalError::Parse(s.to_string()))?;
        let year: i32 = year
            .parse()
            .map_err(|_| TemporalError::Parse(s.to_string()))?;
        let month: u32 = month
            .parse()
            .map_err(|_| TemporalError::Parse(s.to_string()))?;
        Self::new(year, month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_billing_month_validation() {
        assert!(BillingMonth::new(2025, 6).is_ok());
        assert_eq!(
            BillingMonth::new(2025, 13),
            Err(TemporalError::InvalidMonth(13))
        );
        assert_eq!(
            BillingMonth::new(2025, 0),
            Err(TemporalError::InvalidMonth(0))
        );
        assert_eq!(
            BillingMonth::new(1800, 6),
            Err(TemporalError::InvalidYear(1800))
        );
    }

    #[test]
    fn test_billing_month_bounds() {
        let june = BillingMonth::new(2025, 6).unwrap();
        assert_eq!(june.first_day(), NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert_eq!(june.last_day(), NaiveDate::from_ymd_opt(2025, 6, 30).unwrap());

        let feb = BillingMonth::new(2024, 2).unwrap();
        assert_eq!(feb.last_day(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_billing_month_ordering() {
        let jan = BillingMonth::new(2025, 1).unwrap();
        let jun = BillingMonth::new(2025, 6).unwrap();
        let dec_prev = BillingMonth::new(2024, 12).unwrap();

        assert!(jan < jun);
        assert!(dec_prev < jan);
    }

    #[test]
    fn test_billing_month_navigation() {
        let dec = BillingMonth::new(2024, 12).unwrap();
        assert_eq!(dec.next(), BillingMonth::new(2025, 1).unwrap());

        let jan = BillingMonth::new(2025, 1).unwrap();
        assert_eq!(jan.prev(), BillingMonth::new(2024, 12).unwrap());

        let jun = BillingMonth::new(2025, 6).unwrap();
        assert_eq!(jun.minus_months(4), BillingMonth::new(2025, 2).unwrap());
        assert_eq!(jun.minus_months(0), jun);
    }

    #[test]
    fn test_billing_month_contains() {
        let june = BillingMonth::new(2025, 6).unwrap();
        assert!(june.contains(NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()));
        assert!(!june.contains(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()));
    }

    #[test]
    fn test_billing_month_display_parse() {
        let june = BillingMonth::new(2025, 6).unwrap();
        assert_eq!(june.to_string(), "2025-06");
        let parsed: BillingMonth = "2025-06".parse().unwrap();
        assert_eq!(parsed, june);

        assert!("2025/06".parse::<BillingMonth>().is_err());
        assert!("2025-14".parse::<BillingMonth>().is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn next_then_prev_roundtrips(year in 1971i32..2199i32, month in 1u32..=12u32) {
            let m = BillingMonth::new(year, month).unwrap();
            prop_assert_eq!(m.next().prev(), m);
        }

        #[test]
        fn minus_months_is_monotonic(year in 1990i32..2100i32, month in 1u32..=12u32, n in 1u32..60u32) {
            let m = BillingMonth::new(year, month).unwrap();
            prop_assert!(m.minus_months(n) < m);
        }

        #[test]
        fn display_parse_roundtrips(year in 1970i32..2200i32, month in 1u32..=12u32) {
            let m = BillingMonth::new(year, month).unwrap();
            let parsed: BillingMonth = m.to_string().parse().unwrap();
            prop_assert_eq!(parsed, m);
        }
    }
}
