//! Shared configuration for the nlpwire client.
//!
//! Values are layered by `ortho_config`: built-in defaults first, then a
//! configuration file, then `NLPWIRE_*` environment variables, and finally
//! command-line flags such as `--log-filter`. Embedding applications load a
//! [`Config`] once and hand it to the client and to telemetry
//! initialisation.

mod defaults;
mod logging;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, default_log_filter, default_log_filter_string, default_log_format,
    default_service_id,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "NLPWIRE")]
pub struct Config {
    /// `tracing` filter directive, e.g. `info` or `nlpwire_client=debug`.
    #[serde(default = "defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Output format for log events.
    #[serde(default = "defaults::default_log_format")]
    pub log_format: LogFormat,
    /// Sender identity of the remote service. When set, inbound messages
    /// from any other sender are discarded.
    #[serde(default = "defaults::default_service_id")]
    pub service_id: Option<String>,
}

impl Config {
    /// Log filter expression handed to the subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Output format for log events.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Expected sender identity, if the client should filter by sender.
    #[must_use]
    pub fn service_id(&self) -> Option<&str> {
        self.service_id.as_deref()
    }

    /// Returns a copy of the configuration that only accepts `service_id`.
    #[must_use]
    pub fn with_service_id(mut self, service_id: impl Into<String>) -> Self {
        self.service_id = Some(service_id.into());
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            service_id: default_service_id(),
        }
    }
}
