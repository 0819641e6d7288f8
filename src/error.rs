//! Error types for vpnctl

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum VpnError {
    /// Profile object has not finished loading
    #[error("VPN profile not initialized")]
    NotInitialized,

    /// Persisting the configuration to the host failed
    #[error("Configuration failed: {reason}")]
    ConfigurationFailed { reason: String },

    /// Start request rejected by the host
    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl VpnError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        VpnError::ConfigurationFailed { reason: reason.into() }
    }

    pub fn connection(reason: impl Into<String>) -> Self {
        VpnError::ConnectionFailed { reason: reason.into() }
    }
}

pub type VpnResult<T> = Result<T, VpnError>;
