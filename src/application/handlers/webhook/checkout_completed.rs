//! CheckoutCompletedHandler - `checkout.session.completed`.
//!
//! Provisions the student of a guest checkout, consumes the invitation,
//! writes the participants onto the Stripe subscription and mirrors it
//! locally.

use std::sync::Arc;

use super::subscription_sync::SubscriptionSynchronizer;
use crate::domain::billing::{
    normalize_email, Account, BillingMetadata, CoachStudentLink, ConsumeOutcome, Role,
};
use crate::domain::foundation::{AccountId, ErrorCode, Timestamp};
use crate::domain::webhook::{HandlerOutcome, StripeCheckoutSession, WebhookError};
use crate::ports::{
    AccountProvisioner, AccountRepository, CoachStudentLinkRepository, Identity,
    InvitationRepository, NewIdentity, Notification, NotificationSender, PaymentProcessor,
    UpdateSubscriptionRequest,
};

/// Collaborators of the checkout handler.
pub struct CheckoutDependencies {
    pub accounts: Arc<dyn AccountRepository>,
    pub invitations: Arc<dyn InvitationRepository>,
    pub links: Arc<dyn CoachStudentLinkRepository>,
    pub provisioner: Arc<dyn AccountProvisioner>,
    pub processor: Arc<dyn PaymentProcessor>,
    pub notifier: Arc<dyn NotificationSender>,
}

pub struct CheckoutCompletedHandler {
    deps: CheckoutDependencies,
    synchronizer: Arc<SubscriptionSynchronizer>,
}

/// How the paying student was resolved.
enum Student {
    Resolved(AccountId),
    Abandoned(HandlerOutcome),
}

impl CheckoutCompletedHandler {
    pub fn new(deps: CheckoutDependencies, synchronizer: Arc<SubscriptionSynchronizer>) -> Self {
        Self { deps, synchronizer }
    }

    pub async fn handle(
        &self,
        session: &StripeCheckoutSession,
    ) -> Result<HandlerOutcome, WebhookError> {
        let parsed = match BillingMetadata::from_map(&session.metadata) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Ok(HandlerOutcome::failed(format!(
                    "checkout {} metadata invalid: {}",
                    session.id, e
                )))
            }
        };
        if let Some(e) = parsed.rejected_participant() {
            return Ok(HandlerOutcome::failed(format!(
                "checkout {} metadata invalid: {}",
                session.id, e
            )));
        }
        for e in &parsed.rejected {
            tracing::warn!(session_id = %session.id, error = %e, "Ignoring invalid checkout metadata field");
        }
        let mut metadata = parsed.metadata;
        if metadata.student_email.is_none() {
            metadata.student_email = session.payer_email().map(normalize_email);
        }
        if metadata.student_name.is_none() {
            metadata.student_name = session
                .customer_details
                .as_ref()
                .and_then(|d| d.name.clone());
        }
        if metadata.student_phone.is_none() {
            metadata.student_phone = session
                .customer_details
                .as_ref()
                .and_then(|d| d.phone.clone());
        }

        let Some(coach_id) = metadata.coach_id else {
            tracing::info!(session_id = %session.id, "Checkout without coach id ignored");
            return Ok(HandlerOutcome::skipped(format!(
                "checkout {} has no coach id",
                session.id
            )));
        };

        let student = if metadata.is_guest_checkout() {
            self.resolve_guest(coach_id, &metadata).await?
        } else {
            match metadata.student_id {
                Some(id) => Student::Resolved(id),
                None => Student::Abandoned(HandlerOutcome::skipped(format!(
                    "checkout {} has no student",
                    session.id
                ))),
            }
        };
        let student_id = match student {
            Student::Resolved(id) => id,
            Student::Abandoned(outcome) => return Ok(outcome),
        };

        let link = CoachStudentLink::new_active(coach_id, student_id, Timestamp::now());
        if self.deps.links.insert_if_absent(&link).await?.is_inserted() {
            tracing::info!(coach_id = %coach_id, student_id = %student_id, "Coach-student link created");
        }

        if let Some(token) = metadata.invitation_token.as_deref() {
            self.consume_invitation(token, &student_id).await?;
        }

        let coach = self.deps.accounts.find_by_id(&coach_id).await?;
        let Some(destination) = coach.as_ref().and_then(|c| c.payout_destination()) else {
            tracing::warn!(
                session_id = %session.id,
                coach_id = %coach_id,
                "Coach has no payout account; subscription left unlinked"
            );
            return Ok(HandlerOutcome::skipped(format!(
                "coach {} has no payout account",
                coach_id
            )));
        };

        let Some(subscription_id) = session.subscription.as_deref() else {
            return Ok(HandlerOutcome::skipped(format!(
                "checkout {} created no subscription",
                session.id
            )));
        };

        let request = UpdateSubscriptionRequest {
            subscription_id: subscription_id.to_string(),
            metadata: metadata.with_student(student_id).to_map(),
            transfer_destination: Some(destination.to_string()),
        };
        let remote = match self.deps.processor.update_subscription(request).await {
            Ok(remote) => remote,
            Err(e) => {
                tracing::error!(
                    session_id = %session.id,
                    subscription_id,
                    error = %e,
                    "Failed to write billing metadata to subscription"
                );
                return Ok(HandlerOutcome::failed(format!(
                    "subscription {} update failed: {}",
                    subscription_id, e
                )));
            }
        };

        self.synchronizer.sync(&remote).await
    }

    /// Finds or provisions the student behind a guest checkout.
    ///
    /// The welcome email goes out only when this call created the identity.
    async fn resolve_guest(
        &self,
        coach_id: AccountId,
        metadata: &BillingMetadata,
    ) -> Result<Student, WebhookError> {
        let Some(email) = metadata.student_email.as_deref() else {
            return Ok(Student::Abandoned(HandlerOutcome::skipped(
                "guest checkout without email",
            )));
        };

        let existing = match self.deps.provisioner.find_identity_by_email(email).await {
            Ok(existing) => existing,
            Err(e) => return Ok(Student::Abandoned(provisioning_failed(email, &e))),
        };
        if let Some(identity) = existing {
            self.ensure_profile(&identity, coach_id, metadata).await?;
            return Ok(Student::Resolved(identity.id));
        }

        let request = NewIdentity {
            email: email.to_string(),
            full_name: metadata.student_name.clone(),
            phone: metadata.student_phone.clone(),
            role: Role::Student,
        };
        let identity = match self.deps.provisioner.create_identity(&request).await {
            Ok(identity) => identity,
            // A concurrent delivery won the race; adopt its identity.
            Err(e) if e.code == ErrorCode::AccountExists => {
                match self.deps.provisioner.find_identity_by_email(email).await {
                    Ok(Some(identity)) => {
                        self.ensure_profile(&identity, coach_id, metadata).await?;
                        return Ok(Student::Resolved(identity.id));
                    }
                    Ok(None) => return Ok(Student::Abandoned(provisioning_failed(email, &e))),
                    Err(e) => return Ok(Student::Abandoned(provisioning_failed(email, &e))),
                }
            }
            Err(e) => return Ok(Student::Abandoned(provisioning_failed(email, &e))),
        };

        let created = self.ensure_profile(&identity, coach_id, metadata).await?;
        tracing::info!(
            student_id = %identity.id,
            coach_id = %coach_id,
            "Student account provisioned from guest checkout"
        );
        if created {
            self.send_welcome(&identity, coach_id, metadata).await;
        }
        Ok(Student::Resolved(identity.id))
    }

    /// Creates the student profile if missing. Returns true when created.
    async fn ensure_profile(
        &self,
        identity: &Identity,
        coach_id: AccountId,
        metadata: &BillingMetadata,
    ) -> Result<bool, WebhookError> {
        if self.deps.accounts.find_by_id(&identity.id).await?.is_some() {
            return Ok(false);
        }
        let profile = Account::new_student(
            identity.id,
            identity.email.clone(),
            metadata.student_name.clone(),
            metadata.student_phone.clone(),
            coach_id,
            Timestamp::now(),
        );
        Ok(self.deps.accounts.insert_if_absent(&profile).await?.is_inserted())
    }

    async fn send_welcome(&self, identity: &Identity, coach_id: AccountId, metadata: &BillingMetadata) {
        let activation_link = match self
            .deps
            .provisioner
            .generate_activation_link(&identity.email)
            .await
        {
            Ok(link) => link,
            Err(e) => {
                tracing::error!(
                    student_id = %identity.id,
                    error = %e,
                    "Failed to generate activation link; welcome email not sent"
                );
                return;
            }
        };

        let coach_name = match self.deps.accounts.find_by_id(&coach_id).await {
            Ok(coach) => coach.and_then(|c| c.full_name),
            Err(_) => None,
        };
        let notification = Notification::Welcome {
            to: identity.email.clone(),
            student_name: metadata.student_name.clone(),
            coach_name,
            activation_link,
        };
        if let Err(e) = self.deps.notifier.send(notification).await {
            tracing::error!(student_id = %identity.id, error = %e, "Failed to send welcome email");
        }
    }

    async fn consume_invitation(&self, token: &str, student_id: &AccountId) -> Result<(), WebhookError> {
        let now = Timestamp::now();
        if let Some(invitation) = self.deps.invitations.find_by_token(token).await? {
            if invitation.is_pending() && invitation.is_expired(now) {
                tracing::warn!(
                    invitation_id = %invitation.id,
                    "Consuming expired invitation; payment already collected"
                );
            }
        }

        match self.deps.invitations.consume(token, student_id, now).await? {
            ConsumeOutcome::Consumed => {
                tracing::info!(student_id = %student_id, "Invitation completed");
            }
            ConsumeOutcome::AlreadyConsumed => {
                tracing::info!(student_id = %student_id, "Invitation already completed");
            }
            ConsumeOutcome::NotFound => {
                tracing::warn!(student_id = %student_id, "Invitation token not found");
            }
        }
        Ok(())
    }
}

fn provisioning_failed(email: &str, error: &impl std::fmt::Display) -> HandlerOutcome {
    tracing::error!(email, error = %error, "Student provisioning failed");
    HandlerOutcome::failed(format!("provisioning failed: {}", error))
}
