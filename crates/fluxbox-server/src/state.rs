use std::sync::Arc;

use fluxbox_core::config::Config;
use fluxbox_storage::{ObjectStore, StorageHandles};

use crate::accounts::AccountStore;
use crate::admission::AdmissionController;
use crate::payments::PaymentGateway;

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
pub struct AppState {
    /// Durable plans and payment intents.
    pub accounts: Arc<dyn AccountStore>,

    pub store: Arc<dyn ObjectStore>,

    pub payments: Arc<dyn PaymentGateway>,

    /// Owns the reservation ledger and pending-upload slots, so there is
    /// exactly one per process.
    pub admission: Arc<AdmissionController>,

    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        config: Config,
        accounts: Arc<dyn AccountStore>,
        storage: StorageHandles,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        let admission = Arc::new(AdmissionController::new(
            Arc::clone(&accounts),
            Arc::clone(&storage.store),
            storage.issuer,
            config.upload_url_ttl(),
            config.strict_quota,
        ));
        Self {
            accounts,
            store: storage.store,
            payments,
            admission,
            config: Arc::new(config),
        }
    }
}
