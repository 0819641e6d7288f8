//! Connection controller
//!
//! Bridges user intent to the host tunnel facility. The controller owns
//! the one profile handle, issues configure/start/stop requests, and
//! relays whatever status the facility reports; it never forces a
//! transition itself.

use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::config::{ProtocolSettings, VpnConfiguration, VpnProfile};
use crate::credentials::{CredentialStore, SecretReference};
use crate::error::{VpnError, VpnResult};
use crate::facility::VpnFacility;
use crate::provider::StopReason;
use crate::status::VpnStatus;

/// Single status/error listener handed to the controller at construction.
/// Callbacks run synchronously on the controller's task.
pub trait ControllerObserver: Send + Sync {
    fn status_changed(&self, status: VpnStatus);
    fn configuration_failed(&self, error: &str);
    fn connection_failed(&self, error: &str);
}

pub struct ConnectionController {
    facility: Arc<dyn VpnFacility>,
    credentials: CredentialStore,
    observer: Arc<dyn ControllerObserver>,
    profile: RwLock<Option<VpnProfile>>,
    current_status: RwLock<VpnStatus>,
}

impl ConnectionController {
    pub fn new(
        facility: Arc<dyn VpnFacility>,
        credentials: CredentialStore,
        observer: Arc<dyn ControllerObserver>,
    ) -> Self {
        Self {
            facility,
            credentials,
            observer,
            profile: RwLock::new(None),
            current_status: RwLock::new(VpnStatus::Disconnected),
        }
    }

    /// Load the persisted profile or create a fresh one, persist it, and
    /// report the initial status. Configuration is rejected until this has
    /// completed.
    pub async fn initialize(&self) -> VpnResult<()> {
        let mut profile = match self.facility.load_profile().await {
            Ok(Some(existing)) => {
                debug!("Loaded existing VPN profile: {}", existing.id);
                existing
            }
            Ok(None) => {
                info!("No VPN profile found, creating one");
                VpnProfile::new()
            }
            Err(e) => {
                let msg = format!("Profile load failed: {}", e);
                self.observer.configuration_failed(&msg);
                return Err(VpnError::configuration(msg));
            }
        };
        profile.enabled = true;

        if let Err(e) = self.facility.save_profile(&profile).await {
            let msg = format!("Save failed: {}", e);
            self.observer.configuration_failed(&msg);
            return Err(VpnError::configuration(msg));
        }

        *self.profile.write().await = Some(profile);
        self.update_status().await;
        Ok(())
    }

    /// Apply a configuration submission: store the secret, build the
    /// protocol settings payload, and persist the profile.
    pub async fn configure(&self, configuration: VpnConfiguration) -> VpnResult<()> {
        let mut profile = match self.profile.read().await.clone() {
            Some(profile) => profile,
            None => {
                self.observer.configuration_failed("VPN profile not initialized");
                return Err(VpnError::NotInitialized);
            }
        };

        if let Err(e) = self
            .credentials
            .save(&configuration.username, &configuration.password)
            .await
        {
            let msg = format!("Credential save failed: {}", e);
            self.observer.configuration_failed(&msg);
            return Err(VpnError::configuration(msg));
        }

        // An absent entry yields an empty reference rather than an error
        let reference = match self.credentials.reference(&configuration.username).await {
            Ok(Some(reference)) => reference,
            Ok(None) => SecretReference::new(""),
            Err(e) => {
                let msg = format!("Credential lookup failed: {}", e);
                self.observer.configuration_failed(&msg);
                return Err(VpnError::configuration(msg));
            }
        };

        info!(
            "Configuring VPN: {} via {} as {}",
            configuration.protocol.as_str(),
            configuration.server,
            configuration.username
        );
        profile.protocol = Some(ProtocolSettings::build(&configuration, reference));
        profile.enabled = true;

        if let Err(e) = self.facility.save_profile(&profile).await {
            let msg = format!("Save failed: {}", e);
            self.observer.configuration_failed(&msg);
            return Err(VpnError::configuration(msg));
        }

        *self.profile.write().await = Some(profile);
        self.update_status().await;
        Ok(())
    }

    /// Two-way toggle: stop when the tunnel is up or coming up, start
    /// otherwise. No retry, no backoff.
    pub async fn toggle(&self, current_status: VpnStatus) -> VpnResult<()> {
        let profile = match self.profile.read().await.clone() {
            Some(profile) => profile,
            None => {
                self.observer.connection_failed("VPN profile not initialized");
                return Err(VpnError::NotInitialized);
            }
        };

        if current_status.is_active() {
            if let Err(e) = self.facility.stop_tunnel(StopReason::UserRequested).await {
                warn!("Stop request failed: {}", e);
            }
            Ok(())
        } else {
            match self.facility.start_tunnel(&profile).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    let reason = match e {
                        VpnError::ConnectionFailed { reason } => reason,
                        other => other.to_string(),
                    };
                    let msg = format!("Start failed: {}", reason);
                    self.observer.connection_failed(&msg);
                    Err(VpnError::ConnectionFailed { reason: msg })
                }
            }
        }
    }

    /// Re-query the facility and report the projected status
    pub async fn load_status(&self) -> VpnStatus {
        self.update_status().await
    }

    /// Last projected status
    pub async fn current_status(&self) -> VpnStatus {
        *self.current_status.read().await
    }

    async fn update_status(&self) -> VpnStatus {
        // An absent profile projects to invalid; only a present profile
        // reflects what the facility reports.
        let status = if self.profile.read().await.is_some() {
            VpnStatus::from(self.facility.status().await)
        } else {
            VpnStatus::Invalid
        };

        *self.current_status.write().await = status;
        self.observer.status_changed(status);
        status
    }

    /// Forward the facility's asynchronous status notifications through
    /// the projector to the observer. Runs until the facility closes its
    /// event channel; consecutive duplicates are collapsed.
    pub async fn run_status_events(&self) {
        let mut events = self.facility.subscribe();
        loop {
            match events.recv().await {
                Ok(native) => {
                    let status = VpnStatus::from(native);
                    let mut current = self.current_status.write().await;
                    if *current != status {
                        *current = status;
                        drop(current);
                        self.observer.status_changed(status);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Status events lagged, skipped {}", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        debug!("Status event stream closed");
    }
}
