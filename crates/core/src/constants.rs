/// Decimal precision for percentages stored on snapshots and operations
pub const PERCENTAGE_PRECISION: u32 = 2;

/// Quantity threshold for significant positions
pub const QUANTITY_THRESHOLD: &str = "0.00000001";

/// Contract multiplier used when an option movement does not carry one
pub const DEFAULT_OPTION_MULTIPLIER: i64 = 100;

/// Movements fetched from the store per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Accounts processed concurrently
pub const DEFAULT_MAX_CONCURRENT_ACCOUNTS: usize = 2;
