mod summary;
pub mod views;

pub use summary::{complementary, format_percentage};
pub use views::SlaAggregateRecord;
