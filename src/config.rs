// src/config.rs

use std::env;
use std::time::Duration;

use dotenvy::dotenv;

/// Countdown granted to every question, and the unit the exam budget is built from.
pub const SECONDS_PER_QUESTION: u32 = 30;

/// Marks awarded per correct answer.
pub const MARKS_PER_ANSWER: u32 = 1;

/// Period of both session timers.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// How often the client is expected to report window dimensions.
pub const DIMENSION_POLL_INTERVAL: Duration = Duration::from_millis(800);

/// Outer-minus-inner window size (px) above which an inspection panel is assumed open.
pub const DEVTOOLS_THRESHOLD_PX: u32 = 200;

/// Minimum spacing between two counted tab switches.
pub const VISIBILITY_DEBOUNCE: Duration = Duration::from_secs(3);

/// How long a time-threshold notice stays visible.
pub const TIME_NOTICE_DURATION: Duration = Duration::from_secs(3);

/// Grace period between the final integrity warning and session teardown.
pub const TERMINATION_DELAY: Duration = Duration::from_millis(800);

/// How long an expired, unsubmitted session is kept for a late submit.
pub const EXPIRED_SESSION_TTL: Duration = Duration::from_secs(10 * 60);

/// Lifetime of scored exam detail waiting for the results view.
pub const RESULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Where a terminated candidate is sent.
pub const CHEATING_REDIRECT: &str = "/login?cheating_attempt=true";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        // Both secrets must be present for admin login to be possible.
        let admin_username = env::var("ADMIN_USERNAME").ok().filter(|v| !v.is_empty());
        let admin_password = env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_username,
            admin_password,
        }
    }
}
