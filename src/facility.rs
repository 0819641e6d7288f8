//! Host tunnel facility
//!
//! `VpnFacility` is the contract this crate is a client of: profile
//! load/save, tunnel start/stop, and status query/notify. The connection
//! controller never drives state transitions itself; it issues requests and
//! relays whatever the facility later reports.
//!
//! `TunnelHost` is the in-process implementation: it persists the one
//! profile to a TOML file, loads the stub tunnel provider over its request
//! channel, and broadcasts native status transitions to subscribers.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tracing::{debug, info, warn};

use crate::config::VpnProfile;
use crate::error::{VpnError, VpnResult};
use crate::provider::{self, ProviderRequest, StopReason, TunnelNetworkSettings};
use crate::status::NativeStatus;

/// Profile file name inside the host's config directory
const PROFILE_FILE: &str = "profile.toml";

/// Contract of the host's VPN machinery
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VpnFacility: Send + Sync {
    /// Load the persisted profile, if one exists
    async fn load_profile(&self) -> VpnResult<Option<VpnProfile>>;

    /// Persist the profile
    async fn save_profile(&self, profile: &VpnProfile) -> VpnResult<()>;

    /// Request tunnel start for the profile
    async fn start_tunnel(&self, profile: &VpnProfile) -> VpnResult<()>;

    /// Request tunnel stop
    async fn stop_tunnel(&self, reason: StopReason) -> VpnResult<()>;

    /// Current native status
    async fn status(&self) -> NativeStatus;

    /// Subscribe to native status transitions
    fn subscribe(&self) -> broadcast::Receiver<NativeStatus>;
}

/// In-process host driving the stub tunnel provider
pub struct TunnelHost {
    profile_path: PathBuf,
    provider: mpsc::Sender<ProviderRequest>,
    status: RwLock<NativeStatus>,
    events: broadcast::Sender<NativeStatus>,
    negotiated: RwLock<Option<TunnelNetworkSettings>>,
}

impl TunnelHost {
    /// Create a host rooted at the given config directory.
    /// Spawns the provider task, so this must run inside a tokio runtime.
    pub fn new<P: AsRef<Path>>(config_dir: P) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            profile_path: config_dir.as_ref().join(PROFILE_FILE),
            provider: provider::spawn(),
            status: RwLock::new(NativeStatus::Disconnected),
            events,
            negotiated: RwLock::new(None),
        }
    }

    async fn set_status(&self, status: NativeStatus) {
        *self.status.write().await = status;
        debug!("Host status: {}", status.as_str());
        // No subscribers is fine; transitions are best-effort notifications
        let _ = self.events.send(status);
    }

    /// Diagnostic view of the host state
    pub async fn status_json(&self) -> VpnResult<Value> {
        let status = *self.status.read().await;
        let profile = self.load_profile().await?;
        let negotiated = self.negotiated.read().await.clone();

        Ok(json!({
            "status": status.as_str(),
            "profile": profile.map(|p| json!({
                "id": p.id,
                "description": p.description,
                "enabled": p.enabled,
                "protocol": p.protocol.as_ref().map(|s| s.protocol().as_str()),
                "server": p.protocol.as_ref().map(|s| s.server_address().to_string()),
            })),
            "negotiated": negotiated.map(|s| serde_json::to_value(s).unwrap_or(Value::Null)),
        }))
    }
}

#[async_trait]
impl VpnFacility for TunnelHost {
    async fn load_profile(&self) -> VpnResult<Option<VpnProfile>> {
        let contents = match fs::read_to_string(&self.profile_path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let profile: VpnProfile = toml::from_str(&contents)
            .map_err(|e| VpnError::ConfigError(format!("Invalid profile file: {}", e)))?;
        Ok(Some(profile))
    }

    async fn save_profile(&self, profile: &VpnProfile) -> VpnResult<()> {
        if let Some(parent) = self.profile_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let contents = toml::to_string_pretty(profile)
            .map_err(|e| VpnError::ConfigError(format!("Failed to serialize profile: {}", e)))?;
        fs::write(&self.profile_path, contents).await?;

        info!("Saved VPN profile: {}", self.profile_path.display());
        Ok(())
    }

    async fn start_tunnel(&self, profile: &VpnProfile) -> VpnResult<()> {
        if !profile.enabled {
            return Err(VpnError::connection("VPN profile is disabled"));
        }
        let settings = profile
            .protocol
            .as_ref()
            .ok_or_else(|| VpnError::connection("profile has no protocol configuration"))?;

        info!(
            "Starting tunnel: {} via {}",
            settings.protocol().as_str(),
            settings.server_address()
        );
        self.set_status(NativeStatus::Connecting).await;

        let mut options = HashMap::new();
        options.insert(
            provider::OPTION_SERVER_ADDRESS.to_string(),
            settings.server_address().to_string(),
        );

        let (reply, rx) = oneshot::channel();
        let request = ProviderRequest::Start { options, reply };
        if self.provider.send(request).await.is_err() {
            self.set_status(NativeStatus::Disconnected).await;
            return Err(VpnError::connection("tunnel provider unavailable"));
        }

        match rx.await {
            Ok(Ok(negotiated)) => {
                info!("Tunnel up: remote={} mtu={}", negotiated.remote_address, negotiated.mtu);
                *self.negotiated.write().await = Some(negotiated);
                self.set_status(NativeStatus::Connected).await;
                Ok(())
            }
            Ok(Err(reason)) => {
                warn!("Tunnel start rejected: {}", reason);
                self.set_status(NativeStatus::Disconnected).await;
                Err(VpnError::ConnectionFailed { reason })
            }
            Err(_) => {
                self.set_status(NativeStatus::Disconnected).await;
                Err(VpnError::connection("tunnel provider dropped the start request"))
            }
        }
    }

    async fn stop_tunnel(&self, reason: StopReason) -> VpnResult<()> {
        info!("Stopping tunnel ({:?})", reason);
        self.set_status(NativeStatus::Disconnecting).await;

        let (reply, rx) = oneshot::channel();
        let request = ProviderRequest::Stop { reason, reply };
        if self.provider.send(request).await.is_ok() {
            if rx.await.is_err() {
                warn!("Tunnel provider exited before acking stop");
            }
        } else {
            warn!("Tunnel provider unavailable during stop");
        }

        *self.negotiated.write().await = None;
        self.set_status(NativeStatus::Disconnected).await;
        Ok(())
    }

    async fn status(&self) -> NativeStatus {
        *self.status.read().await
    }

    fn subscribe(&self) -> broadcast::Receiver<NativeStatus> {
        self.events.subscribe()
    }
}
