//! Time-Related Constants
//!
//! This module defines intervals and timeouts used by the sample loop and
//! the transport for scheduling and bounding operations.

// ===== TIME UNIT CONVERSIONS =====

/// Milliseconds per second.
pub const MS_PER_SECOND: u64 = 1000;

// ===== SAMPLING INTERVALS =====

/// Default sensor sampling interval (milliseconds).
///
/// One reading every 5 seconds. Environmental values change slowly and
/// each sample is published, so this also sets the message rate.
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 5000;

/// Pause between loop iterations (milliseconds).
///
/// Must be much smaller than the sample interval so an elapsed interval
/// is noticed promptly. Bounds CPU use of the polling loop.
pub const DEFAULT_LOOP_DELAY_MS: u32 = 100;

/// Device status report interval (milliseconds).
///
/// Zero disables periodic status publishing.
pub const DEFAULT_STATUS_INTERVAL_MS: u64 = 60_000;

// ===== TIMEOUT VALUES =====

/// Watchdog timeout (milliseconds).
///
/// Upper bound for any single blocking transport operation (connect,
/// send, disconnect). Expiry counts as a network failure.
pub const DEFAULT_WATCHDOG_TIMEOUT_MS: u64 = 30_000;

// ===== RETRY =====

/// Consecutive publish failures tolerated on a live connection.
///
/// Once reached the loop drops the connection so the next sample
/// reconnects from scratch.
pub const DEFAULT_MAX_RETRY_COUNT: u32 = 3;
