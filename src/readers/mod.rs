pub mod api_extractor;
pub mod watermark_reader;

pub use api_extractor::{ApiExtractor, MeasurementSource, PageDecision};
pub use watermark_reader::WatermarkReader;
