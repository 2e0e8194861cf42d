pub mod constants;
pub mod filename;
pub mod logging;
pub mod progress;
pub mod timestamp;

pub use constants::*;
pub use filename::generate_log_filename;
pub use logging::init_logging;
pub use progress::ProgressReporter;
pub use timestamp::{format_day, format_timestamp, parse_timestamp};
