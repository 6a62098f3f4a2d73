use super::buckets::{ProcessingMonth, SlaAggregator};
use super::calendar::BusinessCalendar;
use super::classifier::classify;
use super::deadline::DeadlineResolver;
use super::domain::{ClassifiedEvent, OrderRecord, SlaEvent, SlaOutcome, SlaStream};
use super::exclusions::{filter_excluded, Exclusions};
use super::policy::SitePolicy;
use super::scoring::{score, MonthlyAdjustment, SlaScorecard};
use crate::workflows::bonus::{
    compute_throughput, BonusInputs, BonusOutcome, HeadcountLog, ThroughputReport,
};
use crate::workflows::ingest::NormalizedSnapshot;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Operator-owned state read once at the start of a run.
#[derive(Debug, Clone, Copy)]
pub struct RunInputs<'a> {
    pub exclusions: &'a Exclusions,
    pub adjustment: MonthlyAdjustment,
    pub headcount: &'a HeadcountLog,
}

/// What happened to the rows of one source stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamQuality {
    pub received: usize,
    pub malformed: usize,
    pub ignored: usize,
    pub excluded: usize,
    pub not_due: usize,
    pub prior_month: usize,
    pub scored: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQuality {
    pub orders: StreamQuality,
    pub receipts: StreamQuality,
    pub missing_headcount: Vec<NaiveDate>,
}

/// Result of one engine invocation for one site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlaRun {
    pub site: String,
    pub as_of: NaiveDateTime,
    pub scorecard: SlaScorecard,
    pub throughput: ThroughputReport,
    pub bonus: BonusOutcome,
    pub data_quality: DataQuality,
    pub classified: Vec<ClassifiedEvent>,
}

/// Single top-to-bottom pass from a normalised snapshot to scores and bonus.
///
/// The engine holds no state between runs; calendar and policy are borrowed
/// for the duration of one call.
pub struct SlaEngine<'a> {
    calendar: &'a BusinessCalendar,
    policy: &'a SitePolicy,
}

struct RunState {
    period: ProcessingMonth,
    month_start: NaiveDate,
    as_of: NaiveDateTime,
    aggregator: SlaAggregator,
    classified: Vec<ClassifiedEvent>,
    quality: DataQuality,
}

impl RunState {
    fn record(
        &mut self,
        stream: SlaStream,
        event: &SlaEvent,
        deadline: NaiveDateTime,
        completed_at: Option<NaiveDateTime>,
        outcome: SlaOutcome,
    ) {
        self.aggregator.record(stream, deadline.date(), outcome);
        self.classified.push(ClassifiedEvent {
            identifier: event.identifier.clone(),
            stream,
            store: event.store.clone(),
            carrier: event.carrier.clone(),
            deadline,
            completed_at,
            outcome,
        });
    }

    fn completed_before_month(&self, completed_at: Option<NaiveDateTime>) -> bool {
        completed_at.is_some_and(|completed| completed.date() < self.month_start)
    }
}

impl<'a> SlaEngine<'a> {
    pub fn new(calendar: &'a BusinessCalendar, policy: &'a SitePolicy) -> Self {
        Self { calendar, policy }
    }

    pub fn policy(&self) -> &SitePolicy {
        self.policy
    }

    pub fn run(
        &self,
        snapshot: &NormalizedSnapshot,
        inputs: RunInputs<'_>,
        as_of: NaiveDateTime,
    ) -> SlaRun {
        let period = ProcessingMonth::from_date(as_of.date());
        let mut state = RunState {
            period,
            month_start: period.first_day().unwrap_or_else(|| as_of.date()),
            as_of,
            aggregator: SlaAggregator::new(period),
            classified: Vec::new(),
            quality: DataQuality::default(),
        };
        state.quality.orders.received = snapshot.orders.len() + snapshot.report.malformed_orders;
        state.quality.orders.malformed = snapshot.report.malformed_orders;
        state.quality.receipts.received =
            snapshot.receipts.len() + snapshot.report.malformed_receipts;
        state.quality.receipts.malformed = snapshot.report.malformed_receipts;

        let orders = self.admit_orders(&snapshot.orders, inputs.exclusions, &mut state.quality);
        self.score_orders(&orders, &mut state);
        self.score_receipts(&snapshot.receipts, inputs.exclusions, &mut state);

        let shipments = orders.iter().filter_map(|order| order.event.completed_at);
        let outstanding = orders
            .iter()
            .filter(|order| order.event.completed_at.is_none())
            .count() as u64;
        let throughput = compute_throughput(
            shipments,
            outstanding,
            inputs.headcount,
            state.period,
            as_of.date(),
        );
        state.quality.missing_headcount = throughput.missing_headcount.clone();

        let scorecard = score(&state.aggregator, as_of.day(), inputs.adjustment);
        let bonus = self.policy.bonus.evaluate(&BonusInputs {
            shipping_sla: scorecard.totals.shipping,
            composite_sla: scorecard.month_composite,
            throughput: throughput.average,
            shipped: throughput.shipped_month,
        });

        info!(
            site = %self.policy.id,
            period = %state.period,
            orders_scored = state.quality.orders.scored,
            receipts_scored = state.quality.receipts.scored,
            month_composite = scorecard.month_composite,
            bonus_eligible = bonus.eligible,
            "sla run complete"
        );

        SlaRun {
            site: self.policy.id.clone(),
            as_of,
            scorecard,
            throughput,
            bonus,
            data_quality: state.quality,
            classified: state.classified,
        }
    }

    /// Drops ignored statuses, never-counted stores, and excluded orders.
    fn admit_orders(
        &self,
        orders: &[OrderRecord],
        exclusions: &Exclusions,
        quality: &mut DataQuality,
    ) -> Vec<OrderRecord> {
        let (admitted, ignored): (Vec<_>, Vec<_>) = orders.iter().cloned().partition(|order| {
            !self.policy.ignores_status(&order.status)
                && !self.policy.is_never_counted(&order.event.store)
        });
        quality.orders.ignored = ignored.len();

        let filtered = filter_excluded(admitted, &exclusions.orders);
        quality.orders.excluded = filtered.removed.len();
        filtered.kept
    }

    fn score_orders(&self, orders: &[OrderRecord], state: &mut RunState) {
        let resolver = DeadlineResolver::new(self.calendar, self.policy);

        for order in orders {
            let event = &order.event;
            if state.completed_before_month(event.completed_at) {
                state.quality.orders.prior_month += 1;
                continue;
            }

            let deadline = resolver.resolve_deadline(
                event.reference_at,
                event.carrier.as_deref(),
                &event.store,
            );
            let shipping = match event.completed_at {
                Some(_) => classify(
                    deadline,
                    event.completed_at,
                    Some(self.policy.time_limits.limit_for(event.carrier.as_deref())),
                ),
                None if deadline > state.as_of => {
                    debug!(order = %event.identifier, %deadline, "order not yet due");
                    state.quality.orders.not_due += 1;
                    continue;
                }
                None => SlaOutcome::Miss,
            };
            let picking = match order.picked_at {
                Some(_) => classify(deadline, order.picked_at, None),
                None => SlaOutcome::Miss,
            };

            state.record(SlaStream::Shipping, event, deadline, event.completed_at, shipping);
            state.record(SlaStream::Picking, event, deadline, order.picked_at, picking);
            state.quality.orders.scored += 1;
        }
    }

    fn score_receipts(
        &self,
        receipts: &[SlaEvent],
        exclusions: &Exclusions,
        state: &mut RunState,
    ) {
        let resolver = DeadlineResolver::new(self.calendar, self.policy);
        let filtered = filter_excluded(receipts.to_vec(), &exclusions.receipts);
        state.quality.receipts.excluded = filtered.removed.len();

        for receipt in &filtered.kept {
            if receipt.completed_at.is_none() {
                state.quality.receipts.not_due += 1;
                continue;
            }
            if state.completed_before_month(receipt.completed_at) {
                state.quality.receipts.prior_month += 1;
                continue;
            }

            let deadline = resolver.resolve_receipt_deadline(receipt.reference_at);
            let outcome = classify(deadline, receipt.completed_at, None);
            state.record(SlaStream::Receiving, receipt, deadline, receipt.completed_at, outcome);
            state.quality.receipts.scored += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::sla::domain::WeekBucket;
    use crate::workflows::sla::exclusions::ExclusionSet;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, d)
            .and_then(|date| date.and_hms_opt(h, m, 0))
            .expect("valid timestamp")
    }

    fn order(id: &str, pending: NaiveDateTime, shipped: Option<NaiveDateTime>) -> OrderRecord {
        OrderRecord {
            event: SlaEvent {
                identifier: id.to_string(),
                reference_at: pending,
                completed_at: shipped,
                carrier: Some("LOGGI".to_string()),
                store: "Acme".to_string(),
            },
            status: "complete".to_string(),
            picked_at: shipped,
        }
    }

    fn run_with(
        snapshot: &NormalizedSnapshot,
        exclusions: &Exclusions,
        as_of: NaiveDateTime,
    ) -> SlaRun {
        let calendar = BusinessCalendar::default();
        let policy = SitePolicy::embu();
        let headcount = HeadcountLog::default();
        SlaEngine::new(&calendar, &policy).run(
            snapshot,
            RunInputs {
                exclusions,
                adjustment: MonthlyAdjustment::default(),
                headcount: &headcount,
            },
            as_of,
        )
    }

    #[test]
    fn overdue_unshipped_orders_count_as_misses() {
        let snapshot = NormalizedSnapshot {
            orders: vec![
                order("1", at(5, 9, 0), Some(at(5, 12, 0))),
                order("2", at(5, 9, 0), None),
            ],
            ..NormalizedSnapshot::default()
        };
        let run = run_with(&snapshot, &Exclusions::default(), at(7, 12, 0));

        let tally = run.scorecard.week(WeekBucket::First);
        assert!((tally.shipping - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(run.data_quality.orders.scored, 2);
        assert_eq!(run.throughput.outstanding, 1);
    }

    #[test]
    fn orders_not_yet_due_are_left_out() {
        let snapshot = NormalizedSnapshot {
            orders: vec![order("1", at(7, 17, 0), None)],
            ..NormalizedSnapshot::default()
        };
        let run = run_with(&snapshot, &Exclusions::default(), at(7, 18, 0));
        assert_eq!(run.data_quality.orders.not_due, 1);
        assert!(run.classified.is_empty());
        assert_eq!(run.scorecard.week(WeekBucket::First).shipping, 100.0);
    }

    #[test]
    fn ignored_statuses_and_prior_month_completions_are_dropped() {
        let mut canceled = order("1", at(5, 9, 0), Some(at(5, 10, 0)));
        canceled.status = "canceled".to_string();
        let earlier = NaiveDate::from_ymd_opt(2025, 4, 30)
            .and_then(|date| date.and_hms_opt(10, 0, 0))
            .expect("valid");
        let snapshot = NormalizedSnapshot {
            orders: vec![canceled, order("2", earlier, Some(earlier))],
            ..NormalizedSnapshot::default()
        };
        let run = run_with(&snapshot, &Exclusions::default(), at(7, 10, 0));
        assert_eq!(run.data_quality.orders.ignored, 1);
        assert_eq!(run.data_quality.orders.prior_month, 1);
        assert_eq!(run.data_quality.orders.scored, 0);
    }

    #[test]
    fn excluded_orders_contribute_nothing() {
        let snapshot = NormalizedSnapshot {
            orders: vec![
                order("1", at(5, 9, 0), Some(at(5, 12, 0))),
                order("2", at(5, 9, 0), Some(at(9, 12, 0))),
            ],
            ..NormalizedSnapshot::default()
        };
        let exclusions = Exclusions {
            orders: ExclusionSet::new(["2"]),
            receipts: ExclusionSet::default(),
        };
        let run = run_with(&snapshot, &exclusions, at(10, 12, 0));
        assert_eq!(run.data_quality.orders.excluded, 1);
        assert_eq!(run.scorecard.week(WeekBucket::First).shipping, 100.0);
        assert_eq!(run.throughput.shipped_month, 1);
        assert!(run.classified.iter().all(|event| event.identifier == "1"));
    }

    #[test]
    fn receipts_use_next_business_day_and_skip_outstanding() {
        let snapshot = NormalizedSnapshot {
            receipts: vec![
                SlaEvent {
                    identifier: "R1".to_string(),
                    reference_at: at(7, 8, 0),
                    completed_at: Some(at(8, 17, 0)),
                    carrier: None,
                    store: "Acme".to_string(),
                },
                SlaEvent {
                    identifier: "R2".to_string(),
                    reference_at: at(7, 8, 0),
                    completed_at: Some(at(9, 8, 0)),
                    carrier: None,
                    store: "Acme".to_string(),
                },
                SlaEvent {
                    identifier: "R3".to_string(),
                    reference_at: at(7, 8, 0),
                    completed_at: None,
                    carrier: None,
                    store: "Acme".to_string(),
                },
            ],
            ..NormalizedSnapshot::default()
        };
        let run = run_with(&snapshot, &Exclusions::default(), at(12, 8, 0));
        let receiving: Vec<_> = run
            .classified
            .iter()
            .filter(|event| event.stream == SlaStream::Receiving)
            .map(|event| event.outcome)
            .collect();
        assert_eq!(receiving, vec![SlaOutcome::Hit, SlaOutcome::Miss]);
        assert_eq!(run.data_quality.receipts.not_due, 1);
        // both due Thursday 8 May; day 12 reveals weeks one and two
        let first = run.scorecard.week(WeekBucket::First).receiving;
        assert!((first - 200.0 / 3.0).abs() < 1e-9);
        assert!((run.scorecard.raw_totals.receiving - (first + 100.0) / 2.0).abs() < 1e-9);
    }
}
