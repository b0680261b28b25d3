//! Stripe webhook reconciliation handlers.
//!
//! Each handler owns one family of events. [`WebhookHandlers::build`] wires
//! them over a set of ports; nothing here is global.

mod cancellation_cascade;
mod checkout_completed;
mod event_router;
mod payment_ledger;
mod refund_reversal;
mod subscription_sync;
mod webhook_processor;

pub use cancellation_cascade::{CancellationCascade, CascadeReason};
pub use checkout_completed::{CheckoutCompletedHandler, CheckoutDependencies};
pub use event_router::EventRouter;
pub use payment_ledger::PaymentLedgerHandler;
pub use refund_reversal::RefundReversalHandler;
pub use subscription_sync::SubscriptionSynchronizer;
pub use webhook_processor::{ProcessResult, WebhookAck, WebhookProcessor, WebhookService};

use secrecy::SecretString;
use std::sync::Arc;

use crate::adapters::memory::{
    InMemoryAccountProvisioner, InMemoryBillingStore, MockPaymentProcessor,
    RecordingNotificationSender,
};
use crate::domain::billing::FeeSchedule;
use crate::ports::{
    AccountProvisioner, AccountRepository, CoachStudentLinkRepository, InvitationRepository,
    NotificationSender, PaymentProcessor, PaymentRepository, SubscriptionRepository,
    WebhookEventRepository,
};

/// Every collaborator the reconciliation engine talks to.
#[derive(Clone)]
pub struct BillingPorts {
    pub accounts: Arc<dyn AccountRepository>,
    pub invitations: Arc<dyn InvitationRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub links: Arc<dyn CoachStudentLinkRepository>,
    pub webhook_events: Arc<dyn WebhookEventRepository>,
    pub provisioner: Arc<dyn AccountProvisioner>,
    pub processor: Arc<dyn PaymentProcessor>,
    pub notifier: Arc<dyn NotificationSender>,
}

/// Handles on the in-memory adapters behind [`BillingPorts::in_memory`].
#[derive(Clone)]
pub struct InMemoryDoubles {
    pub store: InMemoryBillingStore,
    pub provisioner: InMemoryAccountProvisioner,
    pub processor: MockPaymentProcessor,
    pub notifier: RecordingNotificationSender,
}

impl BillingPorts {
    /// Ports backed entirely by in-memory adapters.
    pub fn in_memory() -> (Self, InMemoryDoubles) {
        let doubles = InMemoryDoubles {
            store: InMemoryBillingStore::new(),
            provisioner: InMemoryAccountProvisioner::new(),
            processor: MockPaymentProcessor::new(),
            notifier: RecordingNotificationSender::new(),
        };
        let store = &doubles.store;
        let ports = Self {
            accounts: Arc::new(store.clone()),
            invitations: Arc::new(store.clone()),
            subscriptions: Arc::new(store.clone()),
            payments: Arc::new(store.clone()),
            links: Arc::new(store.clone()),
            webhook_events: Arc::new(store.clone()),
            provisioner: Arc::new(doubles.provisioner.clone()),
            processor: Arc::new(doubles.processor.clone()),
            notifier: Arc::new(doubles.notifier.clone()),
        };
        (ports, doubles)
    }
}

/// The wired handler graph.
pub struct WebhookHandlers {
    router: EventRouter,
    webhook_events: Arc<dyn WebhookEventRepository>,
}

impl WebhookHandlers {
    pub fn build(ports: BillingPorts, fees: FeeSchedule) -> Self {
        let cascade = Arc::new(CancellationCascade::new(
            ports.accounts.clone(),
            ports.links.clone(),
            ports.notifier.clone(),
        ));
        let synchronizer = Arc::new(SubscriptionSynchronizer::new(
            ports.subscriptions.clone(),
            cascade.clone(),
        ));
        let checkout = Arc::new(CheckoutCompletedHandler::new(
            CheckoutDependencies {
                accounts: ports.accounts.clone(),
                invitations: ports.invitations.clone(),
                links: ports.links.clone(),
                provisioner: ports.provisioner.clone(),
                processor: ports.processor.clone(),
                notifier: ports.notifier.clone(),
            },
            synchronizer.clone(),
        ));
        let payments = Arc::new(PaymentLedgerHandler::new(
            ports.subscriptions.clone(),
            ports.payments.clone(),
            ports.accounts.clone(),
            ports.notifier.clone(),
            fees,
        ));
        let refunds = Arc::new(RefundReversalHandler::new(
            ports.payments.clone(),
            ports.subscriptions.clone(),
            cascade,
        ));

        Self {
            router: EventRouter::new(checkout, synchronizer, payments, refunds),
            webhook_events: ports.webhook_events,
        }
    }

    pub fn into_router(self) -> EventRouter {
        self.router
    }

    pub fn into_processor(self) -> WebhookProcessor {
        WebhookProcessor::new(self.webhook_events, self.router)
    }

    pub fn into_service(self, webhook_secret: Option<SecretString>) -> WebhookService {
        WebhookService::new(webhook_secret, self.into_processor())
    }
}
