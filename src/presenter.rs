//! UI boundary
//!
//! The presenter turns view events into controller operations and routes
//! controller output back to the view. Field validation lives here: an
//! incomplete submission is rejected with a generic message and never
//! reaches the controller or the credential store.

use std::sync::Arc;
use tracing::warn;

use crate::config::{ProtocolType, VpnConfiguration};
use crate::controller::{ConnectionController, ControllerObserver};
use crate::credentials::CredentialStore;
use crate::facility::VpnFacility;
use crate::status::VpnStatus;
use crate::validation::{require_submission_fields, FILL_ALL_FIELDS};

/// Outbound callbacks to whatever renders the UI
pub trait ConfigurationView: Send + Sync {
    fn update_connection_status(&self, status: VpnStatus);
    fn show_error(&self, message: &str);
}

/// Controller observer that forwards everything to the view
pub struct ViewRelay {
    view: Arc<dyn ConfigurationView>,
}

impl ViewRelay {
    pub fn new(view: Arc<dyn ConfigurationView>) -> Self {
        Self { view }
    }
}

impl ControllerObserver for ViewRelay {
    fn status_changed(&self, status: VpnStatus) {
        self.view.update_connection_status(status);
    }

    fn configuration_failed(&self, error: &str) {
        self.view.show_error(error);
    }

    fn connection_failed(&self, error: &str) {
        self.view.show_error(error);
    }
}

pub struct Presenter {
    controller: Arc<ConnectionController>,
    view: Arc<dyn ConfigurationView>,
}

impl Presenter {
    /// Wire view, relay, and controller together
    pub fn assemble(
        facility: Arc<dyn VpnFacility>,
        credentials: CredentialStore,
        view: Arc<dyn ConfigurationView>,
    ) -> Self {
        let relay = Arc::new(ViewRelay::new(view.clone()));
        let controller = Arc::new(ConnectionController::new(facility, credentials, relay));
        Self { controller, view }
    }

    pub fn controller(&self) -> Arc<ConnectionController> {
        self.controller.clone()
    }

    /// The view finished loading; report the current status
    pub async fn view_ready(&self) {
        self.controller.load_status().await;
    }

    /// Connect/disconnect tap; errors reach the view through the relay
    pub async fn connection_tapped(&self, current_status: VpnStatus) {
        let _ = self.controller.toggle(current_status).await;
    }

    /// Configuration form submission.
    ///
    /// Index 0 selects IKEv2; 1 and every other value fall back to IPSec.
    /// Out-of-range values are logged so the fallback is observable.
    pub async fn submit_configuration(
        &self,
        server: &str,
        username: &str,
        password: &str,
        protocol_index: i64,
    ) {
        if require_submission_fields(server, username, password).is_err() {
            self.view.show_error(FILL_ALL_FIELDS);
            return;
        }

        if !(0..=1).contains(&protocol_index) {
            warn!(
                "Protocol selector index {} out of range, falling back to IPSec",
                protocol_index
            );
        }
        let protocol = ProtocolType::from_index(protocol_index);

        let configuration = VpnConfiguration::new(server, username, password, protocol);
        let _ = self.controller.configure(configuration).await;
    }
}
