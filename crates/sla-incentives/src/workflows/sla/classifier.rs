use super::domain::SlaOutcome;
use chrono::{Datelike, NaiveDateTime, Timelike};

/// Judges a completion instant against its resolved deadline.
///
/// With a `shipping_time_limit_hour` the shipping rules apply: same-day
/// completion must leave by the limit hour, earlier days in the same month
/// and earlier months always count. Without one, the comparison is by date
/// only (receiving and picking).
pub fn classify(
    deadline: NaiveDateTime,
    completed_at: Option<NaiveDateTime>,
    shipping_time_limit_hour: Option<u32>,
) -> SlaOutcome {
    let Some(completed_at) = completed_at else {
        return SlaOutcome::Pending;
    };

    match shipping_time_limit_hour {
        Some(limit_hour) => classify_shipment(deadline, completed_at, limit_hour),
        None if completed_at.date() <= deadline.date() => SlaOutcome::Hit,
        None => SlaOutcome::Miss,
    }
}

fn classify_shipment(
    deadline: NaiveDateTime,
    completed_at: NaiveDateTime,
    limit_hour: u32,
) -> SlaOutcome {
    let deadline_month = (deadline.year(), deadline.month());
    let completed_month = (completed_at.year(), completed_at.month());

    if completed_month == deadline_month {
        if completed_at.day() == deadline.day() && completed_at.hour() <= limit_hour {
            return SlaOutcome::Hit;
        }
        if completed_at.day() < deadline.day() {
            return SlaOutcome::Hit;
        }
        return SlaOutcome::Miss;
    }

    if completed_month < deadline_month {
        SlaOutcome::Hit
    } else {
        SlaOutcome::Miss
    }
}
