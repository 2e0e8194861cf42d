pub mod clean;
pub mod raw;
pub mod summary;
pub mod watermark;

pub use clean::{CleanMeasurement, MeasurementKey};
pub use raw::{MeasurementPage, PageMeta, RawMeasurement};
pub use summary::{DailyAccumulator, DailySummary};
pub use watermark::Watermark;
