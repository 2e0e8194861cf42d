pub mod aggregator;
pub mod transformer;

pub use aggregator::Aggregator;
pub use transformer::{TransformOutcome, Transformer};
