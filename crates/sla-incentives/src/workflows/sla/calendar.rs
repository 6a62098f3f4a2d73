use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::BTreeSet;

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("holiday '{value}' is not a YYYY-MM-DD date")]
    InvalidHoliday {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Holiday set plus the Saturday/Sunday weekend rule.
///
/// Built once per run and read-only afterwards. Holidays match on the exact
/// calendar date; callers normalise timezones before asking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusinessCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl BusinessCalendar {
    pub fn new<I>(holidays: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    /// Parses the persisted `YYYY-MM-DD` holiday list.
    pub fn from_iso_dates<I, S>(dates: I) -> Result<Self, CalendarError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut holidays = BTreeSet::new();
        for raw in dates {
            let value = raw.as_ref().trim();
            let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|source| {
                CalendarError::InvalidHoliday {
                    value: value.to_string(),
                    source,
                }
            })?;
            holidays.insert(date);
        }
        Ok(Self { holidays })
    }

    pub fn holidays(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.holidays.iter().copied()
    }

    /// Whether any holiday falls in `year`. A table that stops short of the
    /// run year silently treats every weekday as a business day.
    pub fn covers_year(&self, year: i32) -> bool {
        self.holidays.iter().any(|date| date.year() == year)
    }

    pub fn is_weekend(date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        !Self::is_weekend(date) && !self.is_holiday(date)
    }

    /// First business day strictly after `date`.
    pub fn advance_to_business_day(&self, date: NaiveDate) -> NaiveDate {
        let mut current = date + Duration::days(1);
        while !self.is_business_day(current) {
            current += Duration::days(1);
        }
        current
    }

    /// `date` itself when it is a business day, otherwise the closest
    /// earlier one.
    pub fn roll_back_to_business_day(&self, date: NaiveDate) -> NaiveDate {
        let mut current = date;
        while !self.is_business_day(current) {
            current -= Duration::days(1);
        }
        current
    }

    pub fn add_business_days(&self, date: NaiveDate, days: u32) -> NaiveDate {
        (0..days).fold(date, |current, _| self.advance_to_business_day(current))
    }

    /// Last business day of the month preceding `date`'s month.
    pub fn last_business_day_before_month(&self, date: NaiveDate) -> NaiveDate {
        let first_of_month = date.with_day(1).unwrap_or(date);
        self.roll_back_to_business_day(first_of_month - Duration::days(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn weekends_and_holidays_are_not_business_days() {
        let calendar = BusinessCalendar::new([date(2025, 4, 21)]);
        assert!(calendar.is_business_day(date(2025, 4, 22)));
        assert!(!calendar.is_business_day(date(2025, 4, 21)));
        assert!(!calendar.is_business_day(date(2025, 4, 19)));
        assert!(!calendar.is_business_day(date(2025, 4, 20)));
    }

    #[test]
    fn advance_skips_weekend_and_holiday() {
        let calendar = BusinessCalendar::new([date(2025, 4, 21)]);
        // Friday -> Saturday, Sunday, holiday Monday -> Tuesday
        assert_eq!(
            calendar.advance_to_business_day(date(2025, 4, 18)),
            date(2025, 4, 22)
        );
        assert_eq!(
            calendar.advance_to_business_day(date(2025, 4, 22)),
            date(2025, 4, 23)
        );
    }

    #[test]
    fn add_business_days_counts_only_business_days() {
        let calendar = BusinessCalendar::default();
        assert_eq!(calendar.add_business_days(date(2025, 5, 8), 3), date(2025, 5, 13));
        assert_eq!(calendar.add_business_days(date(2025, 5, 8), 0), date(2025, 5, 8));
    }

    #[test]
    fn roll_back_and_previous_month_close() {
        let calendar = BusinessCalendar::new([date(2025, 10, 31)]);
        assert_eq!(
            calendar.roll_back_to_business_day(date(2025, 11, 2)),
            date(2025, 10, 30)
        );
        assert_eq!(
            calendar.last_business_day_before_month(date(2025, 11, 14)),
            date(2025, 10, 30)
        );
    }

    #[test]
    fn from_iso_dates_rejects_malformed_entries() {
        let calendar =
            BusinessCalendar::from_iso_dates(["2025-01-01", " 2025-12-25 "]).expect("parses");
        assert!(calendar.is_holiday(date(2025, 12, 25)));
        assert_eq!(calendar.holidays().count(), 2);

        assert!(calendar.covers_year(2025));
        assert!(!calendar.covers_year(2027));
        assert!(!BusinessCalendar::default().covers_year(2025));

        let err = BusinessCalendar::from_iso_dates(["25/12/2025"]).expect_err("invalid");
        assert!(err.to_string().contains("25/12/2025"));
    }
}
