/// Measurement source defaults
pub const DEFAULT_API_BASE_URL: &str = "https://api.openaq.org/v3";
pub const MEASUREMENTS_ENDPOINT: &str = "measurements";
pub const API_KEY_HEADER: &str = "X-API-Key";
pub const API_KEY_ENV_VAR: &str = "OPENAQ_API_KEY";
pub const DEFAULT_CITY: &str = "Nairobi";
pub const DEFAULT_PARAMETER: &str = "pm25";

/// Paging and timeouts
pub const DEFAULT_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_MAX_PAGES: u32 = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Store defaults
pub const DEFAULT_DATABASE_PATH: &str = "pm25.sqlite";
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Tier table names
pub const BRONZE_TABLE: &str = "bronze_measurements";
pub const SILVER_TABLE: &str = "silver_measurements";
pub const GOLD_TABLE: &str = "gold_daily_summary";

/// Configuration sources
pub const DEFAULT_CONFIG_FILE: &str = "pm25-etl.toml";
pub const ENV_PREFIX: &str = "PM25_ETL";
pub const ENV_SEPARATOR: &str = "__";

/// Logging
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const LOG_FILE_PREFIX: &str = "pm25-etl";

/// Malformed record policies
pub const POLICY_ABORT: &str = "abort";
pub const POLICY_SKIP: &str = "skip";
