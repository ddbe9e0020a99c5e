use std::sync::Arc;

use async_trait::async_trait;

use fluxbox_duckdb::{
    payments::{NewPaymentIntent, PaymentIntent},
    DuckDbBackend,
};

use super::AccountStore;

pub struct DuckDbAccountStore {
    db: Arc<DuckDbBackend>,
}

impl DuckDbAccountStore {
    pub fn new(db: Arc<DuckDbBackend>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountStore for DuckDbAccountStore {
    async fn get_user_plan(&self, user_id: &str) -> anyhow::Result<Option<String>> {
        self.db.get_user_plan(user_id).await
    }

    async fn set_user_plan(&self, user_id: &str, plan_id: &str) -> anyhow::Result<()> {
        self.db.set_user_plan(user_id, plan_id).await
    }

    async fn create_payment_intent(
        &self,
        params: NewPaymentIntent,
    ) -> anyhow::Result<PaymentIntent> {
        self.db.create_payment_intent(params).await
    }

    async fn get_payment_intent(&self, id: &str) -> anyhow::Result<Option<PaymentIntent>> {
        self.db.get_payment_intent(id).await
    }

    async fn confirm_payment_intent(&self, id: &str) -> anyhow::Result<bool> {
        self.db.confirm_payment_intent(id).await
    }

    async fn ping(&self) -> anyhow::Result<()> {
        self.db.ping().await
    }
}
