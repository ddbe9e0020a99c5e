use std::future::Future;
use std::pin::Pin;

use fluxbox_duckdb::payments::PaymentIntent;

use super::{PaymentGateway, PaymentOutcome};

/// [`PaymentGateway`] that settles every intent without charging anyone.
pub struct SimulatedPaymentGateway;

impl PaymentGateway for SimulatedPaymentGateway {
    fn settle<'a>(
        &'a self,
        intent: &'a PaymentIntent,
    ) -> Pin<Box<dyn Future<Output = PaymentOutcome> + Send + 'a>> {
        Box::pin(async move {
            tracing::info!(
                intent_id = %intent.id,
                amount = intent.amount_minor_units,
                currency = %intent.currency,
                "Simulated payment settled"
            );
            PaymentOutcome::Settled
        })
    }
}

/// [`PaymentGateway`] that declines everything with a fixed reason.
pub struct DecliningPaymentGateway {
    pub reason: String,
}

impl PaymentGateway for DecliningPaymentGateway {
    fn settle<'a>(
        &'a self,
        _intent: &'a PaymentIntent,
    ) -> Pin<Box<dyn Future<Output = PaymentOutcome> + Send + 'a>> {
        Box::pin(async move { PaymentOutcome::Declined(self.reason.clone()) })
    }
}
