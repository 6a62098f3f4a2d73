use super::calendar::BusinessCalendar;
use super::policy::SitePolicy;
use chrono::{Duration, NaiveDateTime};

/// Turns raw start instants into the instants they are judged against.
///
/// Pure given the calendar and the site policy; both are borrowed for the
/// length of one run.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineResolver<'a> {
    calendar: &'a BusinessCalendar,
    policy: &'a SitePolicy,
}

impl<'a> DeadlineResolver<'a> {
    pub fn new(calendar: &'a BusinessCalendar, policy: &'a SitePolicy) -> Self {
        Self { calendar, policy }
    }

    /// Order deadline: optional store extension, then carrier cutoff rollover
    /// onto the next business day, keeping the clock time.
    pub fn resolve_deadline(
        &self,
        reference_at: NaiveDateTime,
        carrier: Option<&str>,
        store: &str,
    ) -> NaiveDateTime {
        let mut deadline = reference_at;

        let extension = &self.policy.extended_sla;
        if extension.applies_to(store) {
            let date = self
                .calendar
                .add_business_days(reference_at.date(), extension.business_days);
            deadline = date
                .and_hms_opt(extension.snap_hour, 0, 0)
                .unwrap_or_else(|| date.and_time(reference_at.time()));
        }

        let cutoff = self.policy.cutoffs.cutoff_for(carrier);
        if cutoff.is_reached_by(deadline.time()) || !self.calendar.is_business_day(deadline.date())
        {
            let date = self.calendar.advance_to_business_day(deadline.date());
            deadline = date.and_time(deadline.time());
        }

        // second look in case the rollover target is itself a holiday
        if self.calendar.is_holiday(deadline.date()) {
            deadline += Duration::days(1);
        }

        deadline
    }

    /// Receipt deadline: one business day after arrival. Arrivals on a
    /// non-business day count from the previous business day.
    pub fn resolve_receipt_deadline(&self, arrived_at: NaiveDateTime) -> NaiveDateTime {
        let anchor = self.calendar.roll_back_to_business_day(arrived_at.date());
        self.calendar
            .advance_to_business_day(anchor)
            .and_time(arrived_at.time())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::sla::policy::Cutoff;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, min, 0))
            .expect("valid timestamp")
    }

    fn policy_with_default_cutoff(cutoff: Cutoff) -> SitePolicy {
        let mut policy = SitePolicy::embu();
        policy.cutoffs.cutoffs.clear();
        policy.cutoffs.default = cutoff;
        policy
    }

    #[test]
    fn friday_evening_rolls_to_monday_same_clock_time() {
        let calendar = BusinessCalendar::default();
        let policy = policy_with_default_cutoff(Cutoff::new(16, 0));
        let resolver = DeadlineResolver::new(&calendar, &policy);

        let deadline = resolver.resolve_deadline(at(2025, 5, 9, 20, 0), Some("ANY"), "Store");
        assert_eq!(deadline, at(2025, 5, 12, 20, 0));
    }

    #[test]
    fn before_cutoff_on_business_day_is_unchanged() {
        let calendar = BusinessCalendar::default();
        let policy = SitePolicy::embu();
        let resolver = DeadlineResolver::new(&calendar, &policy);

        let pending = at(2025, 5, 7, 10, 15);
        assert_eq!(resolver.resolve_deadline(pending, Some("LOGGI"), "Store"), pending);
    }

    #[test]
    fn exact_cutoff_minute_rolls_forward() {
        let calendar = BusinessCalendar::default();
        let policy = SitePolicy::embu();
        let resolver = DeadlineResolver::new(&calendar, &policy);

        let deadline = resolver.resolve_deadline(at(2025, 5, 7, 16, 30), Some("CUBBO"), "Store");
        assert_eq!(deadline, at(2025, 5, 8, 16, 30));
    }

    #[test]
    fn weekend_morning_and_holidays_roll_to_next_business_day() {
        let holiday = NaiveDate::from_ymd_opt(2025, 4, 21).expect("valid date");
        let calendar = BusinessCalendar::new([holiday]);
        let policy = SitePolicy::embu();
        let resolver = DeadlineResolver::new(&calendar, &policy);

        let deadline = resolver.resolve_deadline(at(2025, 4, 19, 9, 0), Some("LOGGI"), "Store");
        assert_eq!(deadline, at(2025, 4, 22, 9, 0));

        let deadline = resolver.resolve_deadline(at(2025, 4, 21, 8, 0), None, "Store");
        assert_eq!(deadline, at(2025, 4, 22, 8, 0));
    }

    #[test]
    fn extended_stores_add_business_days_and_snap_to_morning() {
        let calendar = BusinessCalendar::default();
        let policy = SitePolicy::embu();
        let resolver = DeadlineResolver::new(&calendar, &policy);

        // Thursday afternoon + 3 business days -> Tuesday 09:00
        let deadline =
            resolver.resolve_deadline(at(2025, 5, 8, 17, 45), Some("CORREIOS"), "Boitempo");
        assert_eq!(deadline, at(2025, 5, 13, 9, 0));
    }

    #[test]
    fn receipts_get_one_business_day() {
        let calendar = BusinessCalendar::default();
        let policy = SitePolicy::embu();
        let resolver = DeadlineResolver::new(&calendar, &policy);

        assert_eq!(
            resolver.resolve_receipt_deadline(at(2025, 5, 7, 14, 0)),
            at(2025, 5, 8, 14, 0)
        );
        // Saturday arrival counts from Friday
        assert_eq!(
            resolver.resolve_receipt_deadline(at(2025, 5, 10, 11, 0)),
            at(2025, 5, 12, 11, 0)
        );
    }
}
