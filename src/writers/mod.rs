pub mod tiered_loader;

pub use tiered_loader::{LoadReport, TieredLoader};
