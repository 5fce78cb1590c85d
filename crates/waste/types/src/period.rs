use crate::ValidationError;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const MONTHS_PER_YEAR: u8 = 12;
pub const MIN_YEAR: i32 = 1970;
pub const MAX_YEAR: i32 = 9999;

pub fn validate_month(month: u8) -> Result<u8, ValidationError> {
    if (1..=MONTHS_PER_YEAR).contains(&month) {
        Ok(month)
    } else {
        Err(ValidationError::InvalidMonth(i64::from(month)))
    }
}

/// Month number as submitted by a caller, before it is narrowed to `u8`.
pub fn month_from_number(raw: i64) -> Result<u8, ValidationError> {
    u8::try_from(raw)
        .map_err(|_| ValidationError::InvalidMonth(raw))
        .and_then(validate_month)
}

pub fn validate_year(year: i32) -> Result<i32, ValidationError> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(year)
    } else {
        Err(ValidationError::InvalidYear(year))
    }
}

/// One accounting month of one year.
///
/// Only constructible with a valid year and a month in `1..=12`;
/// deserialization goes through the same check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod")]
pub struct Period {
    year: i32,
    month: u8,
}

#[derive(Deserialize)]
struct RawPeriod {
    year: i32,
    month: u8,
}

impl TryFrom<RawPeriod> for Period {
    type Error = ValidationError;

    fn try_from(raw: RawPeriod) -> Result<Self, Self::Error> {
        Period::new(raw.year, raw.month)
    }
}

impl Period {
    pub fn new(year: i32, month: u8) -> Result<Self, ValidationError> {
        Ok(Self {
            year: validate_year(year)?,
            month: validate_month(month)?,
        })
    }

    /// The period a UTC instant falls into.
    pub fn containing(timestamp: DateTime<Utc>) -> Result<Self, ValidationError> {
        let month = u8::try_from(timestamp.month()).map_err(|_| ValidationError::InvalidMonth(0))?;
        Self::new(timestamp.year(), month)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        // Both components were validated on construction.
        NaiveDate::from_ymd_opt(self.year, u32::from(self.month), 1).unwrap_or(NaiveDate::MIN)
    }

    /// Half-open UTC range `[start, end)` covering the whole month.
    pub fn utc_range(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.first_day();
        let end = start
            .checked_add_months(chrono::Months::new(1))
            .unwrap_or(NaiveDate::MAX);
        (start_of_day(start), start_of_day(end))
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        let (start, end) = self.utc_range();
        timestamp >= start && timestamp < end
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

pub(crate) fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rejects_months_outside_calendar() {
        assert!(matches!(
            Period::new(2025, 0),
            Err(ValidationError::InvalidMonth(0))
        ));
        assert!(matches!(
            Period::new(2025, 13),
            Err(ValidationError::InvalidMonth(13))
        ));
        assert!(Period::new(2025, 12).is_ok());
    }

    #[test]
    fn wide_month_numbers_keep_their_value_in_the_error() {
        assert_eq!(month_from_number(7), Ok(7));
        assert_eq!(month_from_number(300), Err(ValidationError::InvalidMonth(300)));
        assert_eq!(month_from_number(-1), Err(ValidationError::InvalidMonth(-1)));
        assert_eq!(month_from_number(13), Err(ValidationError::InvalidMonth(13)));
    }

    #[test]
    fn utc_range_is_half_open_and_rolls_over_december() {
        let december = Period::new(2024, 12).unwrap();
        let (start, end) = december.utc_range();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert!(december.contains(Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap()));
        assert!(!december.contains(end));
    }

    #[test]
    fn containing_maps_timestamp_to_month() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 15, 8, 30, 0).unwrap();
        assert_eq!(Period::containing(ts).unwrap(), Period::new(2025, 3).unwrap());
    }

    #[test]
    fn deserialization_validates_month() {
        let ok: Period = serde_json::from_str(r#"{"year":2025,"month":4}"#).unwrap();
        assert_eq!(ok.month(), 4);
        assert!(serde_json::from_str::<Period>(r#"{"year":2025,"month":14}"#).is_err());
    }
}
