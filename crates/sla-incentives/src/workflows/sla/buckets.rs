use super::domain::{SlaOutcome, SlaStream, WeekBucket};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt;

/// Calendar month a run scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProcessingMonth {
    pub year: i32,
    pub month: u32,
}

impl ProcessingMonth {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::from_date(date) == *self
    }

    /// Bucket for an event dated `date`. Dates from earlier months are
    /// carry-over from the previous close-out and land in the first week;
    /// dates in later months land in the fourth.
    pub fn bucket_for(&self, date: NaiveDate) -> WeekBucket {
        match Self::from_date(date).cmp(self) {
            std::cmp::Ordering::Less => WeekBucket::First,
            std::cmp::Ordering::Greater => WeekBucket::Fourth,
            std::cmp::Ordering::Equal => WeekBucket::for_day(date.day()),
        }
    }
}

impl fmt::Display for ProcessingMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Hit count over attempt count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HitTally {
    pub hits: u32,
    pub attempts: u32,
}

impl HitTally {
    /// One phantom on-time event, so an empty bucket reads 100% and a single
    /// miss reads 50% instead of dividing by zero.
    pub const fn seeded() -> Self {
        Self {
            hits: 1,
            attempts: 1,
        }
    }

    pub fn record(&mut self, outcome: SlaOutcome) {
        match outcome {
            SlaOutcome::Hit => {
                self.hits += 1;
                self.attempts += 1;
            }
            SlaOutcome::Miss => self.attempts += 1,
            SlaOutcome::Pending => {}
        }
    }

    pub fn misses(&self) -> u32 {
        self.attempts - self.hits
    }

    pub fn percentage(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        f64::from(self.hits) / f64::from(self.attempts) * 100.0
    }
}

/// Per-bucket, per-stream tallies for one processing month.
///
/// Accumulation is a sequential fold; nothing here is shared across runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlaAggregator {
    period: ProcessingMonth,
    weekly: [[HitTally; 3]; 4],
}

impl SlaAggregator {
    pub fn new(period: ProcessingMonth) -> Self {
        Self {
            period,
            weekly: [[HitTally::seeded(); 3]; 4],
        }
    }

    pub fn period(&self) -> ProcessingMonth {
        self.period
    }

    pub fn accumulate(&mut self, bucket: WeekBucket, stream: SlaStream, outcome: SlaOutcome) {
        self.weekly[bucket.index()][stream.index()].record(outcome);
    }

    /// Buckets `date` against the processing month and accumulates.
    pub fn record(
        &mut self,
        stream: SlaStream,
        date: NaiveDate,
        outcome: SlaOutcome,
    ) -> WeekBucket {
        let bucket = self.period.bucket_for(date);
        self.accumulate(bucket, stream, outcome);
        bucket
    }

    pub fn tally(&self, bucket: WeekBucket, stream: SlaStream) -> HitTally {
        self.weekly[bucket.index()][stream.index()]
    }

    pub fn percentage(&self, bucket: WeekBucket, stream: SlaStream) -> f64 {
        self.tally(bucket, stream).percentage()
    }
}
