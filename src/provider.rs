//! Stub tunnel provider
//!
//! The host loads the provider and talks to it over a request channel; it
//! is never called as an ordinary in-process function. On start the stub
//! answers with the network-settings payload the host needs before traffic
//! would flow (tunnel remote, local IPv4 address and subnet, default route,
//! DNS servers, MTU). It performs no packet encapsulation, encryption, or
//! forwarding.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Local tunnel address handed to the host
pub const TUNNEL_ADDRESS: &str = "192.168.1.2";

/// Subnet mask for the tunnel address
pub const TUNNEL_SUBNET_MASK: &str = "255.255.255.0";

/// DNS servers pushed with the settings payload
pub const TUNNEL_DNS_SERVERS: [&str; 2] = ["8.8.8.8", "8.8.4.4"];

/// Tunnel MTU
pub const TUNNEL_MTU: u32 = 1400;

/// Start option key carrying the remote server address
pub const OPTION_SERVER_ADDRESS: &str = "server-address";

/// IPv4 route included in the tunnel settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ipv4Route {
    /// Route all IPv4 traffic through the tunnel
    Default,
    Subnet { address: String, mask: String },
}

/// IPv4 portion of the settings payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Ipv4Settings {
    pub addresses: Vec<String>,
    pub subnet_masks: Vec<String>,
    pub included_routes: Vec<Ipv4Route>,
}

/// Network settings the provider reports back to the host before any
/// traffic flows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TunnelNetworkSettings {
    pub remote_address: String,
    pub ipv4: Ipv4Settings,
    pub dns_servers: Vec<String>,
    pub mtu: u32,
}

impl TunnelNetworkSettings {
    /// Settings payload for a tunnel to the given remote
    pub fn for_remote(remote_address: impl Into<String>) -> Self {
        Self {
            remote_address: remote_address.into(),
            ipv4: Ipv4Settings {
                addresses: vec![TUNNEL_ADDRESS.to_string()],
                subnet_masks: vec![TUNNEL_SUBNET_MASK.to_string()],
                included_routes: vec![Ipv4Route::Default],
            },
            dns_servers: TUNNEL_DNS_SERVERS.iter().map(|s| s.to_string()).collect(),
            mtu: TUNNEL_MTU,
        }
    }
}

/// Why the host is stopping the tunnel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    UserRequested,
    ProfileDisabled,
    HostShutdown,
}

/// Requests the host sends to the provider
#[derive(Debug)]
pub enum ProviderRequest {
    Start {
        options: HashMap<String, String>,
        reply: oneshot::Sender<Result<TunnelNetworkSettings, String>>,
    },
    Stop {
        reason: StopReason,
        reply: oneshot::Sender<()>,
    },
}

/// Run the provider loop until the host drops its sender
pub async fn run(mut requests: mpsc::Receiver<ProviderRequest>) {
    while let Some(request) = requests.recv().await {
        match request {
            ProviderRequest::Start { options, reply } => {
                let result = handle_start(&options);
                if reply.send(result).is_err() {
                    warn!("Host dropped the start reply channel");
                }
            }
            ProviderRequest::Stop { reason, reply } => {
                info!("Tunnel provider stopping ({:?})", reason);
                if reply.send(()).is_err() {
                    warn!("Host dropped the stop reply channel");
                }
            }
        }
    }
    debug!("Tunnel provider channel closed, exiting");
}

fn handle_start(options: &HashMap<String, String>) -> Result<TunnelNetworkSettings, String> {
    let remote = options
        .get(OPTION_SERVER_ADDRESS)
        .ok_or_else(|| "start options carry no server address".to_string())?;

    let settings = TunnelNetworkSettings::for_remote(remote.clone());
    info!(
        "Tunnel provider negotiated settings: remote={} address={}/{} mtu={}",
        settings.remote_address, TUNNEL_ADDRESS, TUNNEL_SUBNET_MASK, settings.mtu
    );
    Ok(settings)
}

/// Spawn the provider task and return the host's request handle
pub fn spawn() -> mpsc::Sender<ProviderRequest> {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(run(rx));
    tx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_options(server: &str) -> HashMap<String, String> {
        let mut options = HashMap::new();
        options.insert(OPTION_SERVER_ADDRESS.to_string(), server.to_string());
        options
    }

    #[tokio::test]
    async fn test_start_reports_network_settings() {
        let provider = spawn();
        let (reply, rx) = oneshot::channel();

        provider
            .send(ProviderRequest::Start { options: start_options("vpn.example.com"), reply })
            .await
            .expect("send start");

        let settings = rx.await.expect("reply").expect("settings");
        assert_eq!(settings.remote_address, "vpn.example.com");
        assert_eq!(settings.ipv4.addresses, vec!["192.168.1.2"]);
        assert_eq!(settings.ipv4.subnet_masks, vec!["255.255.255.0"]);
        assert_eq!(settings.ipv4.included_routes, vec![Ipv4Route::Default]);
        assert_eq!(settings.dns_servers, vec!["8.8.8.8", "8.8.4.4"]);
        assert_eq!(settings.mtu, 1400);
    }

    #[tokio::test]
    async fn test_start_without_server_is_rejected() {
        let provider = spawn();
        let (reply, rx) = oneshot::channel();

        provider
            .send(ProviderRequest::Start { options: HashMap::new(), reply })
            .await
            .expect("send start");

        assert!(rx.await.expect("reply").is_err());
    }

    #[tokio::test]
    async fn test_stop_acks() {
        let provider = spawn();
        let (reply, rx) = oneshot::channel();

        provider
            .send(ProviderRequest::Stop { reason: StopReason::UserRequested, reply })
            .await
            .expect("send stop");

        rx.await.expect("stop ack");
    }
}
