//! # Client Configuration
//!
//! Settings for the gRPC-Web client: endpoint, wire format, default deadline,
//! frame limits and connection pool tuning. Loaded in layers (defaults, an
//! optional TOML file, `GRPC_WEB_*` environment variables) by [`loader`].
//!
//! ```rust
//! use grpc_web_core::config::ClientConfig;
//! use grpc_web_core::protocol::WireFormat;
//!
//! let config = ClientConfig::default()
//!     .with_base_url("http://localhost:8080")
//!     .with_wire_format(WireFormat::Text)
//!     .with_default_timeout_ms(5_000);
//! assert!(config.validate().is_ok());
//! ```

pub mod loader;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_FRAME_SIZE, USER_AGENT};
use crate::error::{GrpcWebError, Result};
use crate::protocol::WireFormat;

/// Client configuration for gRPC-Web connections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the gRPC-Web endpoint (e.g., "<http://localhost:8080>")
    pub base_url: String,
    /// Body encoding: `binary` or `text`
    pub wire_format: WireFormat,
    /// Deadline applied to calls that do not set their own, in milliseconds
    pub default_timeout_ms: Option<u64>,
    /// TCP/TLS connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Largest accepted response frame payload in bytes
    pub max_frame_size: usize,
    /// Capacity of each call's event channel
    pub event_buffer: usize,
    /// Value sent in `x-user-agent` and `user-agent`
    pub user_agent: String,
    /// How long idle pooled connections are kept, in milliseconds
    pub pool_idle_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            wire_format: WireFormat::Binary,
            default_timeout_ms: None,
            connect_timeout_ms: 10_000,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            event_buffer: 32,
            user_agent: USER_AGENT.to_string(),
            pool_idle_timeout_ms: 90_000,
        }
    }
}

impl ClientConfig {
    /// Reject settings no call could run with
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(GrpcWebError::config_error("base_url must not be empty"));
        }
        if self.max_frame_size == 0 {
            return Err(GrpcWebError::config_error("max_frame_size must be positive"));
        }
        if self.event_buffer == 0 {
            return Err(GrpcWebError::config_error("event_buffer must be positive"));
        }
        if self.connect_timeout_ms == 0 {
            return Err(GrpcWebError::config_error(
                "connect_timeout_ms must be positive",
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(GrpcWebError::config_error("user_agent must not be empty"));
        }
        Ok(())
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_wire_format(mut self, wire_format: WireFormat) -> Self {
        self.wire_format = wire_format;
        self
    }

    pub fn with_default_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    pub fn with_event_buffer(mut self, event_buffer: usize) -> Self {
        self.event_buffer = event_buffer;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.wire_format, WireFormat::Binary);
        assert_eq!(config.max_frame_size, 4 * 1024 * 1024);
        assert!(config.default_timeout().is_none());
        assert!(config.user_agent.starts_with("grpc-web-core-rs/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_setters() {
        let config = ClientConfig::default()
            .with_base_url("https://example.com")
            .with_wire_format(WireFormat::Text)
            .with_default_timeout_ms(1500)
            .with_event_buffer(4);
        assert_eq!(config.base_url, "https://example.com");
        assert_eq!(config.wire_format, WireFormat::Text);
        assert_eq!(config.default_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.event_buffer, 4);
    }

    #[test]
    fn test_validation_rejects_unusable_values() {
        let cases = [
            ClientConfig::default().with_base_url("  "),
            ClientConfig::default().with_max_frame_size(0),
            ClientConfig::default().with_event_buffer(0),
            ClientConfig::default().with_connect_timeout_ms(0),
            ClientConfig::default().with_user_agent(""),
        ];
        for config in cases {
            assert!(matches!(
                config.validate(),
                Err(GrpcWebError::Configuration(_))
            ));
        }
    }
}
