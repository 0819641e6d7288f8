//! Connection status projection
//!
//! The host tunnel facility reports its own status representation; the UI
//! works with a small closed set. The projection is total: every native
//! value, including ones this crate has never seen, lands in exactly one
//! user-facing state.

/// Status as reported by the host tunnel facility.
///
/// `Unknown` carries the raw value for values introduced by future hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeStatus {
    Disconnected,
    Connecting,
    Connected,
    Reasserting,
    Disconnecting,
    Unknown(u32),
}

/// User-facing connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VpnStatus {
    Connected,
    Connecting,
    Disconnected,
    Disconnecting,
    /// Unrecognized host status, or no usable profile
    Invalid,
}

impl From<NativeStatus> for VpnStatus {
    fn from(native: NativeStatus) -> Self {
        match native {
            NativeStatus::Connected => VpnStatus::Connected,
            NativeStatus::Connecting | NativeStatus::Reasserting => VpnStatus::Connecting,
            NativeStatus::Disconnected => VpnStatus::Disconnected,
            NativeStatus::Disconnecting => VpnStatus::Disconnecting,
            NativeStatus::Unknown(_) => VpnStatus::Invalid,
        }
    }
}

impl VpnStatus {
    /// True while the tunnel is up or coming up; a toggle in this state
    /// requests a stop.
    pub fn is_active(&self) -> bool {
        matches!(self, VpnStatus::Connected | VpnStatus::Connecting)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VpnStatus::Connected => "connected",
            VpnStatus::Connecting => "connecting",
            VpnStatus::Disconnected => "disconnected",
            VpnStatus::Disconnecting => "disconnecting",
            VpnStatus::Invalid => "invalid",
        }
    }
}

impl std::fmt::Display for VpnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl NativeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NativeStatus::Disconnected => "disconnected",
            NativeStatus::Connecting => "connecting",
            NativeStatus::Connected => "connected",
            NativeStatus::Reasserting => "reasserting",
            NativeStatus::Disconnecting => "disconnecting",
            NativeStatus::Unknown(_) => "unknown",
        }
    }
}
