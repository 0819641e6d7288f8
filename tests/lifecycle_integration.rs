//! Integration tests for the connection lifecycle
//!
//! Exercises the presenter → controller → host chain end to end against a
//! real `TunnelHost` and credential store in a temp directory.

use libvpnctl::{
    ConfigurationView, CredentialStore, Presenter, ProtocolSettings, TunnelHost, VpnFacility,
    VpnProfile, VpnStatus,
};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Default)]
struct RecordingView {
    statuses: Mutex<Vec<VpnStatus>>,
    errors: Mutex<Vec<String>>,
}

impl ConfigurationView for RecordingView {
    fn update_connection_status(&self, status: VpnStatus) {
        self.statuses.lock().unwrap().push(status);
    }
    fn show_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

struct Harness {
    dir: TempDir,
    host: Arc<TunnelHost>,
    presenter: Presenter,
    view: Arc<RecordingView>,
}

async fn harness() -> Harness {
    let dir = TempDir::new().expect("tempdir");
    let host = Arc::new(TunnelHost::new(dir.path()));
    let credentials = CredentialStore::new(dir.path().join("credentials"));
    let view = Arc::new(RecordingView::default());
    let presenter = Presenter::assemble(host.clone(), credentials, view.clone());
    presenter
        .controller()
        .initialize()
        .await
        .expect("initialize");
    Harness { dir, host, presenter, view }
}

async fn saved_profile(harness: &Harness) -> VpnProfile {
    harness
        .host
        .load_profile()
        .await
        .expect("load profile")
        .expect("profile exists")
}

#[tokio::test]
async fn test_configure_produces_ikev2_profile() {
    let h = harness().await;

    h.presenter
        .submit_configuration("vpn.example.com", "alice", "secret123", 0)
        .await;

    assert!(h.view.errors.lock().unwrap().is_empty());

    let profile = saved_profile(&h).await;
    match profile.protocol.expect("protocol settings") {
        ProtocolSettings::Ikev2(s) => {
            assert_eq!(s.username, "alice");
            assert_eq!(s.remote_identifier, "vpn.example.com");
            assert_eq!(s.server_address, "vpn.example.com");
            assert_eq!(s.local_identifier, "alice");
            assert!(!s.password_reference.is_empty());
        }
        other => panic!("expected IKEv2 settings, got {:?}", other),
    }

    // The secret landed in the credential store, not in the profile file
    let profile_text =
        std::fs::read_to_string(h.dir.path().join("profile.toml")).expect("profile file");
    assert!(!profile_text.contains("secret123"));
    assert!(h.dir.path().join("credentials").join("alice.cred").exists());
}

#[tokio::test]
async fn test_protocol_index_one_produces_ipsec_profile() {
    let h = harness().await;

    h.presenter
        .submit_configuration("gw.example.net", "bob", "hunter2", 1)
        .await;

    let profile = saved_profile(&h).await;
    assert!(matches!(profile.protocol, Some(ProtocolSettings::Ipsec(_))));
}

#[tokio::test]
async fn test_connect_then_disconnect_roundtrip() {
    let h = harness().await;
    let controller = h.presenter.controller();

    h.presenter
        .submit_configuration("vpn.example.com", "alice", "secret123", 0)
        .await;

    // Connect: tap while disconnected
    h.presenter.connection_tapped(VpnStatus::Disconnected).await;
    assert_eq!(controller.load_status().await, VpnStatus::Connected);

    // Disconnect: tap while connected
    h.presenter.connection_tapped(VpnStatus::Connected).await;
    assert_eq!(controller.load_status().await, VpnStatus::Disconnected);

    assert!(h.view.errors.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_connect_without_configuration_reports_error() {
    let h = harness().await;

    h.presenter.connection_tapped(VpnStatus::Disconnected).await;

    let errors = h.view.errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Start failed"));
}

#[tokio::test]
async fn test_incomplete_submission_changes_nothing() {
    let h = harness().await;

    h.presenter
        .submit_configuration("vpn.example.com", "", "secret123", 0)
        .await;

    assert_eq!(h.view.errors.lock().unwrap().len(), 1);

    let profile = saved_profile(&h).await;
    assert!(profile.protocol.is_none());
    assert!(!h.dir.path().join("credentials").exists());
}

#[tokio::test]
async fn test_reconfigure_replaces_credential_entry() {
    let h = harness().await;

    h.presenter
        .submit_configuration("vpn.example.com", "alice", "first", 0)
        .await;
    h.presenter
        .submit_configuration("vpn.example.com", "alice", "second", 1)
        .await;

    let store_dir = h.dir.path().join("credentials");
    let entries: Vec<_> = std::fs::read_dir(&store_dir)
        .expect("store dir")
        .filter_map(|e| e.ok())
        .collect();
    assert_eq!(entries.len(), 1);

    // The latest submission wins
    let profile = saved_profile(&h).await;
    assert!(matches!(profile.protocol, Some(ProtocolSettings::Ipsec(_))));
}

#[tokio::test]
async fn test_profile_survives_across_hosts() {
    let dir = TempDir::new().expect("tempdir");

    {
        let host = Arc::new(TunnelHost::new(dir.path()));
        let credentials = CredentialStore::new(dir.path().join("credentials"));
        let view = Arc::new(RecordingView::default());
        let presenter = Presenter::assemble(host.clone(), credentials, view);
        presenter.controller().initialize().await.expect("initialize");
        presenter
            .submit_configuration("vpn.example.com", "alice", "secret123", 0)
            .await;
    }

    // A fresh host over the same directory sees the same profile
    let host = TunnelHost::new(dir.path());
    let profile = host
        .load_profile()
        .await
        .expect("load")
        .expect("persisted profile");
    assert!(matches!(profile.protocol, Some(ProtocolSettings::Ikev2(_))));
}
