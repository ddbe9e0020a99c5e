use async_trait::async_trait;
use serde::Serialize;

use fluxbox_core::plan::Plan;
use fluxbox_duckdb::payments::{NewPaymentIntent, PaymentIntent};

pub mod duckdb;

pub use self::duckdb::DuckDbAccountStore;

/// A user's entitlement as seen by the admission controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub user_id: String,
    pub plan_id: String,
    pub storage_limit_bytes: u64,
}

impl UserAccount {
    pub fn on_plan(user_id: &str, plan: &Plan) -> Self {
        Self {
            user_id: user_id.to_string(),
            plan_id: plan.id.to_string(),
            storage_limit_bytes: plan.storage_limit_bytes,
        }
    }
}

/// Durable storage for per-user plans and payment intents.
///
/// The server only depends on this trait; the DuckDB implementation is
/// wired in by `main` and by the integration tests.
#[async_trait]
pub trait AccountStore: Send + Sync + 'static {
    async fn get_user_plan(&self, user_id: &str) -> anyhow::Result<Option<String>>;
    async fn set_user_plan(&self, user_id: &str, plan_id: &str) -> anyhow::Result<()>;

    async fn create_payment_intent(&self, params: NewPaymentIntent)
        -> anyhow::Result<PaymentIntent>;
    async fn get_payment_intent(&self, id: &str) -> anyhow::Result<Option<PaymentIntent>>;
    /// Mark a pending intent confirmed and grant its plan in one step.
    /// Returns `false` if the intent had already been confirmed.
    async fn confirm_payment_intent(&self, id: &str) -> anyhow::Result<bool>;

    async fn ping(&self) -> anyhow::Result<()>;
}
