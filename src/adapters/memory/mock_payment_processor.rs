//! Mock payment processor for testing.
//!
//! Holds Stripe subscriptions by id and applies metadata updates to them
//! the way Stripe does: keys in the request overwrite existing keys.
//! Supports error injection and call tracking.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::webhook::StripeSubscription;
use crate::ports::{PaymentError, PaymentProcessor, UpdateSubscriptionRequest};

#[derive(Default)]
struct MockState {
    subscriptions: HashMap<String, StripeSubscription>,
    calls: Vec<UpdateSubscriptionRequest>,
    next_error: Option<PaymentError>,
}

#[derive(Clone, Default)]
pub struct MockPaymentProcessor {
    inner: Arc<Mutex<MockState>>,
}

impl MockPaymentProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Makes a subscription known to the processor.
    pub fn put_subscription(&self, subscription: StripeSubscription) {
        self.lock()
            .subscriptions
            .insert(subscription.id.clone(), subscription);
    }

    /// Error to return on the next call.
    pub fn fail_next(&self, error: PaymentError) {
        self.lock().next_error = Some(error);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Assertions
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<UpdateSubscriptionRequest> {
        self.lock().calls.clone()
    }

    pub fn subscription(&self, id: &str) -> Option<StripeSubscription> {
        self.lock().subscriptions.get(id).cloned()
    }
}

#[async_trait]
impl PaymentProcessor for MockPaymentProcessor {
    async fn update_subscription(
        &self,
        request: UpdateSubscriptionRequest,
    ) -> Result<StripeSubscription, PaymentError> {
        let mut state = self.lock();
        state.calls.push(request.clone());

        if let Some(err) = state.next_error.take() {
            return Err(err);
        }

        let subscription = state
            .subscriptions
            .get_mut(&request.subscription_id)
            .ok_or_else(|| PaymentError::not_found("subscription"))?;
        subscription.metadata.extend(request.metadata);
        Ok(subscription.clone())
    }
}
