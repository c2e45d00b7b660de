// src/config/consts.rs

// Persisted state
pub const DEFAULT_STORE_PATH: &str = "data/report_summary.csv";
pub const STORE_HEADERS: [&str; 5] = ["period", "source", "metric_key", "value", "metadata"];

// Published artifact (read by the dashboard)
pub const DEFAULT_ARTIFACT_PATH: &str = "site/data/report_summary.csv";

// Adapter drop directories
pub const DEFAULT_PORTAL_INBOX: &str = "inbox/portal";
pub const DEFAULT_DATABASE_INBOX: &str = "inbox/database";

// Credentials (names only; values are never read by the core)
pub const PORTAL_USER_ENV: &str = "USERNAME";
pub const PORTAL_PASSWORD_ENV: &str = "PASSWORD";
pub const DATABASE_TOKEN_ENV: &str = "AIRTABLE_TOKEN";

// Run
pub const DEFAULT_CONFIG_FILE: &str = "snapshot.toml";
pub const DEFAULT_LOG_FILE: &str = ".store/debug.log";
pub const SOURCE_TIMEOUT_SECS: u64 = 60;

// Return rate
pub const RETURN_LOOKBACK_DAYS: i64 = 180;
pub const MAX_LOOKBACK_DAYS: i64 = 3660;
pub const RETURN_MIN_VISITS: usize = 2;
