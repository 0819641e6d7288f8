//! VPN configuration types
//!
//! `VpnConfiguration` is the value submitted from the UI; it is consumed by
//! the connection controller and never retained. `ProtocolSettings` is the
//! payload written onto the persisted profile, populated per protocol with
//! no shared logic between the two branches.

use serde::{Deserialize, Serialize};

use crate::credentials::SecretReference;

/// Supported tunnel protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolType {
    Ikev2,
    Ipsec,
}

impl ProtocolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolType::Ikev2 => "IKEv2",
            ProtocolType::Ipsec => "IPSec",
        }
    }

    pub fn index(&self) -> i64 {
        match self {
            ProtocolType::Ikev2 => 0,
            ProtocolType::Ipsec => 1,
        }
    }

    /// Selector-index mapping: 0 is IKEv2, everything else falls back to
    /// IPSec (including out-of-range values, see the presenter warning).
    pub fn from_index(index: i64) -> Self {
        if index == 0 {
            ProtocolType::Ikev2
        } else {
            ProtocolType::Ipsec
        }
    }
}

impl std::fmt::Display for ProtocolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configuration submission from the UI. Immutable once constructed;
/// a new value is created on every edit.
#[derive(Clone)]
pub struct VpnConfiguration {
    pub server: String,
    pub username: String,
    pub password: String,
    pub protocol: ProtocolType,
}

impl VpnConfiguration {
    pub fn new(
        server: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        protocol: ProtocolType,
    ) -> Self {
        Self {
            server: server.into(),
            username: username.into(),
            password: password.into(),
            protocol,
        }
    }
}

// Keep the password out of log output
impl std::fmt::Debug for VpnConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VpnConfiguration")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("protocol", &self.protocol)
            .finish()
    }
}

/// Authentication method carried in the protocol settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticationMethod {
    None,
    SharedSecret,
}

/// IKEv2 settings payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Ikev2Settings {
    pub server_address: String,
    pub remote_identifier: String,
    pub local_identifier: String,
    pub username: String,
    pub password_reference: SecretReference,
    pub authentication_method: AuthenticationMethod,
    pub use_extended_authentication: bool,
    pub disconnect_on_sleep: bool,
}

/// IPSec settings payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IpsecSettings {
    pub server_address: String,
    pub remote_identifier: String,
    pub local_identifier: String,
    pub username: String,
    pub password_reference: SecretReference,
    pub authentication_method: AuthenticationMethod,
    pub use_extended_authentication: bool,
    pub disconnect_on_sleep: bool,
}

/// Protocol-specific settings written onto the profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolSettings {
    Ikev2(Ikev2Settings),
    Ipsec(IpsecSettings),
}

impl ProtocolSettings {
    /// Populate the settings payload for the submitted configuration.
    /// Branches on the protocol type only; each arm fills its own fields.
    pub fn build(configuration: &VpnConfiguration, reference: SecretReference) -> Self {
        match configuration.protocol {
            ProtocolType::Ikev2 => ProtocolSettings::Ikev2(Ikev2Settings {
                server_address: configuration.server.clone(),
                remote_identifier: configuration.server.clone(),
                local_identifier: configuration.username.clone(),
                username: configuration.username.clone(),
                password_reference: reference,
                authentication_method: AuthenticationMethod::None,
                use_extended_authentication: true,
                disconnect_on_sleep: false,
            }),
            ProtocolType::Ipsec => ProtocolSettings::Ipsec(IpsecSettings {
                server_address: configuration.server.clone(),
                remote_identifier: configuration.server.clone(),
                local_identifier: configuration.username.clone(),
                username: configuration.username.clone(),
                password_reference: reference,
                authentication_method: AuthenticationMethod::SharedSecret,
                use_extended_authentication: true,
                disconnect_on_sleep: false,
            }),
        }
    }

    pub fn protocol(&self) -> ProtocolType {
        match self {
            ProtocolSettings::Ikev2(_) => ProtocolType::Ikev2,
            ProtocolSettings::Ipsec(_) => ProtocolType::Ipsec,
        }
    }

    pub fn server_address(&self) -> &str {
        match self {
            ProtocolSettings::Ikev2(s) => &s.server_address,
            ProtocolSettings::Ipsec(s) => &s.server_address,
        }
    }

    pub fn username(&self) -> &str {
        match self {
            ProtocolSettings::Ikev2(s) => &s.username,
            ProtocolSettings::Ipsec(s) => &s.username,
        }
    }
}

/// The one persisted VPN profile. Mirrors what the host keeps across runs;
/// everything else in this crate is transient.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VpnProfile {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<ProtocolSettings>,
}

impl VpnProfile {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            description: "My VPN".to_string(),
            enabled: true,
            protocol: None,
        }
    }
}

impl Default for VpnProfile {
    fn default() -> Self {
        Self::new()
    }
}
