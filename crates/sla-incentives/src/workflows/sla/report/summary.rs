use super::super::domain::{SlaStream, WeekBucket};
use super::super::engine::SlaRun;
use super::views::SlaAggregateRecord;
use crate::workflows::bonus::{format_day_key, round_cents};

/// One decimal below 100, the literal `100.` at or above it.
pub fn format_percentage(value: f64) -> String {
    if value < 100.0 {
        format!("{value:.1}")
    } else {
        "100.".to_string()
    }
}

/// Gauge pair `"<floor> <100 - floor>"`. Adjusted values outside 0..=100
/// pass through unclamped.
pub fn complementary(value: f64) -> String {
    let whole = value.floor() as i64;
    format!("{} {}", whole, 100 - whole)
}

impl SlaRun {
    pub fn aggregate_record(&self) -> SlaAggregateRecord {
        let card = &self.scorecard;
        let week = |bucket: WeekBucket, stream: SlaStream| {
            format_percentage(card.week(bucket).stream(stream))
        };
        let composite = |bucket: WeekBucket| card.week(bucket).composite;
        let [first, second, third, fourth] = WeekBucket::ordered();

        SlaAggregateRecord {
            site: self.site.clone(),
            period: card.period.to_string(),
            generated_at: self.as_of,
            generated_clock: self.as_of.format("%H:%M").to_string(),

            shipping_week_1: week(first, SlaStream::Shipping),
            shipping_week_2: week(second, SlaStream::Shipping),
            shipping_week_3: week(third, SlaStream::Shipping),
            shipping_week_4: week(fourth, SlaStream::Shipping),
            shipping_total: format_percentage(card.totals.shipping),

            receiving_week_1: week(first, SlaStream::Receiving),
            receiving_week_2: week(second, SlaStream::Receiving),
            receiving_week_3: week(third, SlaStream::Receiving),
            receiving_week_4: week(fourth, SlaStream::Receiving),
            receiving_total: format_percentage(card.totals.receiving),

            picking_week_1: week(first, SlaStream::Picking),
            picking_week_2: week(second, SlaStream::Picking),
            picking_week_3: week(third, SlaStream::Picking),
            picking_week_4: week(fourth, SlaStream::Picking),
            picking_total: format_percentage(card.totals.picking),

            composite_week_1: format_percentage(composite(first)),
            composite_week_2: format_percentage(composite(second)),
            composite_week_3: format_percentage(composite(third)),
            composite_week_4: format_percentage(composite(fourth)),
            composite_month: format_percentage(card.month_composite),

            composite_week_1_gauge: complementary(composite(first)),
            composite_week_2_gauge: complementary(composite(second)),
            composite_week_3_gauge: complementary(composite(third)),
            composite_week_4_gauge: complementary(composite(fourth)),
            composite_month_gauge: complementary(card.month_composite),
            receiving_total_gauge: complementary(card.totals.receiving),
            picking_total_gauge: complementary(card.totals.picking),
            shipping_total_gauge: complementary(card.totals.shipping),

            adjustment: card.adjustment,

            bonus_eligible: self.bonus.eligible,
            bonus_unit_value: round_cents(self.bonus.unit_value),
            bonus_amount: self.bonus.amount,
            bonus_factor: self.bonus.factor,
            bonus_level: format!("Nivel {}", self.bonus.level),
            sla_progress: self.bonus.sla_progress.map(round_cents),
            bonus_sweep: self.bonus.sweep.clone(),

            throughput_average: self.throughput.average.map(round_cents),
            throughput_per_day: self
                .throughput
                .per_day
                .iter()
                .map(|(day, value)| (format_day_key(*day), *value))
                .collect(),
            shipped_month: self.throughput.shipped_month,
            shipped_today: self.throughput.shipped_today,
            outstanding_orders: self.throughput.outstanding,

            data_quality: self.data_quality.clone(),
        }
    }
}
