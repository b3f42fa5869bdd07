//! Error Types for the Device Core
//!
//! ## Error Categories
//!
//! Errors fall into four kinds, matching the places a device can fail:
//!
//! ### Caller Mistakes
//! - `InvalidArgument`: bad input, e.g. an absent output slot for a reading
//!
//! ### Transport Failures
//! - `Network`: the connection or a single send failed below MQTT
//!   (socket refused, timeout, broker dropped the link)
//!
//! ### Protocol Failures
//! - `Mqtt`: the broker refused us, or the client is not connected when a
//!   publish is attempted
//!
//! ### Everything Else
//! - `Generic`: configuration and unclassified failures
//!
//! ## Error Handling Strategy
//!
//! Only startup is allowed to treat an error as fatal. Inside the sample
//! loop every `Network` and `Mqtt` error is reported and the loop carries on:
//!
//! ```rust
//! use envmon_core::DeviceError;
//!
//! fn on_publish_result(result: Result<(), DeviceError>) {
//!     match result {
//!         Ok(()) => {}
//!         Err(DeviceError::Mqtt(_)) => {
//!             // Not connected: reconnect on this tick
//!         }
//!         Err(DeviceError::Network(_)) => {
//!             // Transient send failure: keep the connection, retry next sample
//!         }
//!         Err(_) => {
//!             // Log and investigate
//!         }
//!     }
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Device errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Bad caller input
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Transport-level connect or send failure
    #[error("Network error: {0}")]
    Network(String),

    /// Broker or protocol-level failure, including "not connected"
    #[error("MQTT error: {0}")]
    Mqtt(String),

    /// Unclassified failure
    #[error("Error: {0}")]
    Generic(String),
}

impl DeviceError {
    /// Short kind name used in structured log fields
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Network(_) => "network",
            Self::Mqtt(_) => "mqtt",
            Self::Generic(_) => "generic",
        }
    }

    /// Publish was gated because the client is offline
    pub fn not_connected() -> Self {
        Self::Mqtt("not connected".to_string())
    }

    /// True for `Mqtt` errors
    pub const fn is_mqtt(&self) -> bool {
        matches!(self, Self::Mqtt(_))
    }
}
