use super::buckets::{ProcessingMonth, SlaAggregator};
use super::domain::{SlaStream, WeekBucket};
use serde::{Deserialize, Serialize};

/// Operator-entered percentage-point corrections for known data errors.
///
/// Field names on the wire match the persisted adjustment document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyAdjustment {
    #[serde(rename = "ajuste_recibos", default)]
    pub receiving: i32,
    #[serde(rename = "ajuste_picking", default)]
    pub picking: i32,
    #[serde(rename = "ajuste_pedidos", default)]
    pub shipping: i32,
}

impl MonthlyAdjustment {
    pub fn for_stream(&self, stream: SlaStream) -> i32 {
        match stream {
            SlaStream::Shipping => self.shipping,
            SlaStream::Receiving => self.receiving,
            SlaStream::Picking => self.picking,
        }
    }

    /// The composite is the mean of the three streams, so it moves by the
    /// mean of their corrections.
    pub fn composite(&self) -> f64 {
        f64::from(self.shipping + self.receiving + self.picking) / 3.0
    }
}

/// Number of week buckets that have started by `day_of_month`.
pub fn elapsed_buckets(day_of_month: u32) -> usize {
    WeekBucket::for_day(day_of_month).number()
}

/// Mean over the buckets that have started. Unstarted buckets are left out
/// rather than read as zero.
pub fn progressive_mean(values: [f64; 4], day_of_month: u32) -> f64 {
    let elapsed = elapsed_buckets(day_of_month);
    values[..elapsed].iter().sum::<f64>() / elapsed as f64
}

/// Mean of the three stream percentages for one bucket.
pub fn composite(aggregator: &SlaAggregator, bucket: WeekBucket) -> f64 {
    SlaStream::ordered()
        .into_iter()
        .map(|stream| aggregator.percentage(bucket, stream))
        .sum::<f64>()
        / 3.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeekScore {
    pub bucket: WeekBucket,
    pub shipping: f64,
    pub receiving: f64,
    pub picking: f64,
    pub composite: f64,
}

impl WeekScore {
    pub fn stream(&self, stream: SlaStream) -> f64 {
        match stream {
            SlaStream::Shipping => self.shipping,
            SlaStream::Receiving => self.receiving,
            SlaStream::Picking => self.picking,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StreamTotals {
    pub shipping: f64,
    pub receiving: f64,
    pub picking: f64,
}

impl StreamTotals {
    pub fn stream(&self, stream: SlaStream) -> f64 {
        match stream {
            SlaStream::Shipping => self.shipping,
            SlaStream::Receiving => self.receiving,
            SlaStream::Picking => self.picking,
        }
    }

    fn adjusted(&self, adjustment: &MonthlyAdjustment) -> Self {
        Self {
            shipping: self.shipping - f64::from(adjustment.shipping),
            receiving: self.receiving - f64::from(adjustment.receiving),
            picking: self.picking - f64::from(adjustment.picking),
        }
    }
}

/// Weekly and month-to-date scores for one site and month.
///
/// Adjusted figures are not clamped; display code decides how to cap them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlaScorecard {
    pub period: ProcessingMonth,
    pub day_of_month: u32,
    pub weeks: [WeekScore; 4],
    pub raw_totals: StreamTotals,
    pub totals: StreamTotals,
    pub raw_month_composite: f64,
    pub month_composite: f64,
    pub adjustment: MonthlyAdjustment,
}

impl SlaScorecard {
    pub fn week(&self, bucket: WeekBucket) -> &WeekScore {
        &self.weeks[bucket.index()]
    }
}

pub fn score(
    aggregator: &SlaAggregator,
    day_of_month: u32,
    adjustment: MonthlyAdjustment,
) -> SlaScorecard {
    let weeks = WeekBucket::ordered().map(|bucket| WeekScore {
        bucket,
        shipping: aggregator.percentage(bucket, SlaStream::Shipping),
        receiving: aggregator.percentage(bucket, SlaStream::Receiving),
        picking: aggregator.percentage(bucket, SlaStream::Picking),
        composite: composite(aggregator, bucket),
    });

    let raw_totals = StreamTotals {
        shipping: progressive_mean(weeks.map(|week| week.shipping), day_of_month),
        receiving: progressive_mean(weeks.map(|week| week.receiving), day_of_month),
        picking: progressive_mean(weeks.map(|week| week.picking), day_of_month),
    };
    let raw_month_composite = progressive_mean(weeks.map(|week| week.composite), day_of_month);

    SlaScorecard {
        period: aggregator.period(),
        day_of_month,
        weeks,
        raw_totals,
        totals: raw_totals.adjusted(&adjustment),
        raw_month_composite,
        month_composite: raw_month_composite - adjustment.composite(),
        adjustment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::sla::domain::SlaOutcome;

    fn period() -> ProcessingMonth {
        ProcessingMonth {
            year: 2025,
            month: 5,
        }
    }

    #[test]
    fn elapsed_buckets_follow_day_of_month() {
        assert_eq!(elapsed_buckets(1), 1);
        assert_eq!(elapsed_buckets(8), 1);
        assert_eq!(elapsed_buckets(10), 2);
        assert_eq!(elapsed_buckets(24), 3);
        assert_eq!(elapsed_buckets(25), 4);
    }

    #[test]
    fn progressive_reveal_ignores_unstarted_buckets() {
        let mut aggregator = SlaAggregator::new(period());
        aggregator.accumulate(WeekBucket::First, SlaStream::Shipping, SlaOutcome::Miss);
        aggregator.accumulate(WeekBucket::Second, SlaStream::Receiving, SlaOutcome::Miss);

        let card = score(&aggregator, 10, MonthlyAdjustment::default());
        let expected = (card.week(WeekBucket::First).composite
            + card.week(WeekBucket::Second).composite)
            / 2.0;
        assert!((card.month_composite - expected).abs() < 1e-9);
        assert_eq!(card.week(WeekBucket::Third).composite, 100.0);
    }

    #[test]
    fn composite_is_mean_of_streams() {
        let mut aggregator = SlaAggregator::new(period());
        aggregator.accumulate(WeekBucket::First, SlaStream::Picking, SlaOutcome::Miss);
        let card = score(&aggregator, 3, MonthlyAdjustment::default());
        let week = card.week(WeekBucket::First);
        assert_eq!(week.picking, 50.0);
        assert!((week.composite - (100.0 + 100.0 + 50.0) / 3.0).abs() < 1e-9);
        assert_eq!(card.month_composite, week.composite);
    }

    #[test]
    fn adjustments_subtract_points_per_stream_without_clamping() {
        let mut aggregator = SlaAggregator::new(period());
        for _ in 0..4 {
            aggregator.accumulate(WeekBucket::First, SlaStream::Shipping, SlaOutcome::Hit);
            aggregator.accumulate(WeekBucket::First, SlaStream::Receiving, SlaOutcome::Hit);
        }
        let adjustment = MonthlyAdjustment {
            receiving: 2,
            picking: 1,
            shipping: 3,
        };
        let card = score(&aggregator, 2, adjustment);
        assert_eq!(card.raw_totals.shipping, 100.0);
        assert_eq!(card.totals.shipping, 97.0);
        assert_eq!(card.totals.receiving, 98.0);
        assert_eq!(card.totals.picking, 99.0);
        assert!((card.month_composite - (card.raw_month_composite - 2.0)).abs() < 1e-9);

        let negative = MonthlyAdjustment {
            receiving: 0,
            picking: 0,
            shipping: -5,
        };
        assert_eq!(score(&aggregator, 2, negative).totals.shipping, 105.0);
    }

    #[test]
    fn stream_totals_reveal_seeded_weeks_progressively() {
        let mut aggregator = SlaAggregator::new(period());
        for n in 0..100 {
            let outcome = if n < 90 { SlaOutcome::Hit } else { SlaOutcome::Miss };
            aggregator.accumulate(WeekBucket::First, SlaStream::Shipping, outcome);
        }
        aggregator.accumulate(WeekBucket::Second, SlaStream::Receiving, SlaOutcome::Miss);

        let day_five = score(&aggregator, 5, MonthlyAdjustment::default());
        let first = day_five.week(WeekBucket::First).shipping;
        assert!((first - 9100.0 / 101.0).abs() < 1e-9);
        assert_eq!(day_five.raw_totals.shipping, first);
        // the week-two miss has not been revealed yet
        assert_eq!(day_five.raw_totals.receiving, 100.0);

        let day_ten = score(&aggregator, 10, MonthlyAdjustment::default());
        assert!((day_ten.raw_totals.shipping - (first + 100.0) / 2.0).abs() < 1e-9);
        assert_eq!(day_ten.raw_totals.receiving, 75.0);
    }

    #[test]
    fn empty_month_reads_full_marks_everywhere() {
        let card = score(&SlaAggregator::new(period()), 20, MonthlyAdjustment::default());
        for stream in SlaStream::ordered() {
            assert_eq!(card.totals.stream(stream), 100.0);
        }
        assert_eq!(card.month_composite, 100.0);
    }

    #[test]
    fn adjustment_uses_persisted_field_names() {
        let adjustment: MonthlyAdjustment =
            serde_json::from_str(r#"{"ajuste_recibos": 1, "ajuste_pedidos": 4}"#)
                .expect("deserializes");
        assert_eq!(adjustment.receiving, 1);
        assert_eq!(adjustment.picking, 0);
        assert_eq!(adjustment.for_stream(SlaStream::Shipping), 4);
    }
}
