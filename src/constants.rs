pub const MIN_PASSWORD_LENGTH: usize = 5;
pub const MAX_PASSWORD_LENGTH: usize = 128;
pub const MAX_CHAR_LENGTH: usize = 255;

pub const PRICE_MAX_DIGITS: u32 = 5;
pub const PRICE_DECIMAL_PLACES: u32 = 2;

/// Raw token key length in bytes, rendered as twice as many hex characters.
pub const TOKEN_KEY_BYTES: usize = 20;
pub const TOKEN_KEYWORDS: &[&str] = &["token", "bearer"];

pub const MAX_BODY_BYTES: u64 = 64 * 1024;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";
pub const DEFAULT_MAX_CONNECTIONS: &str = "5";
pub const DEFAULT_WAIT_INTERVAL_MS: &str = "1000";
