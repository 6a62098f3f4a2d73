pub mod buckets;
pub mod calendar;
pub mod classifier;
pub mod deadline;
pub mod domain;
mod engine;
pub mod exclusions;
pub mod policy;
pub mod report;
pub mod scoring;

pub use buckets::{HitTally, ProcessingMonth, SlaAggregator};
pub use calendar::{BusinessCalendar, CalendarError};
pub use classifier::classify;
pub use deadline::DeadlineResolver;
pub use domain::{
    ClassifiedEvent, ExclusionStream, Identified, OrderRecord, SlaEvent, SlaOutcome, SlaStream,
    WeekBucket,
};
pub use engine::{DataQuality, RunInputs, SlaEngine, SlaRun, StreamQuality};
pub use exclusions::{filter_excluded, ExclusionSet, Exclusions, FilterResult};
pub use policy::{CarrierCutoffPolicy, Cutoff, ExtendedSla, ShippingTimeLimits, SitePolicy};
pub use report::{complementary, format_percentage, SlaAggregateRecord};
pub use scoring::{score, MonthlyAdjustment, SlaScorecard, StreamTotals, WeekScore};
