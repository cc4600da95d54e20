//! NapThe core: provider client, payment registry and reconciliation.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use napthe_core::{DonationHost, NapTheConfig};
//! # async fn demo(host: Arc<dyn DonationHost>) -> Result<(), napthe_core::ConfigError> {
//! let config = NapTheConfig::default();
//! let (registry, runner) = napthe_core::bootstrap(&config, host)?;
//! registry.start_periodic_sweep();
//! tokio::spawn(runner.run());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod host;
pub mod registry;
pub mod scheduler;
pub mod submission;

use std::sync::Arc;

pub use api::{CardInfo, HttpTransport, PaymentApiClient, ProviderTransport, RequestKind, TransportError};
pub use config::{ConfigError, Credentials, LoadConfigError, NapTheConfig};
pub use error::{ApiError, Result};
pub use host::DonationHost;
pub use registry::{PaymentRegistry, ReconcilePolicy};
pub use scheduler::{ReconciliationRunner, ScheduledTask, TaskScheduler};
pub use submission::{ChargeRequest, SubmissionGuard, SubmitRejected};

pub use napthe_types as types;

/// Wire a registry and its runner over the HTTP transport.
///
/// Fails when credentials are missing or the endpoint is not a URL.
pub fn bootstrap(
    config: &NapTheConfig,
    host: Arc<dyn DonationHost>,
) -> std::result::Result<(Arc<PaymentRegistry>, ReconciliationRunner), ConfigError> {
    config.credentials()?;
    let api = PaymentApiClient::from_config(config)?;
    Ok(bootstrap_with_client(config, Arc::new(api), host))
}

/// Wire a registry and its runner around an existing client.
pub fn bootstrap_with_client(
    config: &NapTheConfig,
    api: Arc<PaymentApiClient>,
    host: Arc<dyn DonationHost>,
) -> (Arc<PaymentRegistry>, ReconciliationRunner) {
    let (scheduler, rx) = TaskScheduler::channel();
    let registry = Arc::new(PaymentRegistry::new(
        api,
        host,
        scheduler,
        ReconcilePolicy::from(&config.reconcile),
    ));
    let runner = ReconciliationRunner::new(registry.clone(), rx);
    (registry, runner)
}
