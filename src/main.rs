//! Coach Billing webhook service.
//!
//! - `POST /api/webhooks/stripe` - Stripe webhook deliveries
//! - `GET /health` - Liveness check

use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration as ChronoDuration, Utc};
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use coach_billing::adapters::email::{ResendConfig, ResendNotificationSender};
use coach_billing::adapters::http::{webhook_router, WebhookAppState};
use coach_billing::adapters::identity::{GoTrueConfig, GoTrueProvisioner};
use coach_billing::adapters::postgres::{
    PostgresAccountRepository, PostgresInvitationRepository, PostgresLinkRepository,
    PostgresPaymentRepository, PostgresSubscriptionRepository, PostgresWebhookEventRepository,
};
use coach_billing::adapters::stripe::{StripeClient, StripeConfig};
use coach_billing::application::{BillingPorts, WebhookHandlers};
use coach_billing::config::AppConfig;
use coach_billing::ports::WebhookEventRepository;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    init_tracing(&config)?;

    config.validate().context("validating configuration")?;
    tracing::info!(
        port = config.server.port,
        environment = ?config.server.environment,
        stripe_test_mode = config.payment.is_test_mode(),
        "Configuration loaded"
    );
    let webhook_secret = config.payment.webhook_secret();
    if webhook_secret.is_none() {
        tracing::error!("Stripe webhook secret is not configured; deliveries will answer 500");
    }

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await
        .context("connecting to database")?;
    tracing::info!("Database pool created");

    if config.database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("running migrations")?;
        tracing::info!("Migrations applied");
    }

    let webhook_events = Arc::new(PostgresWebhookEventRepository::new(pool.clone()));
    prune_webhook_ledger(webhook_events.as_ref(), config.payment.webhook_retention_days).await;

    let stripe = StripeClient::new(
        StripeConfig::new(config.payment.api_key()).with_base_url(&config.payment.stripe_api_base),
    );
    let notifier = ResendNotificationSender::new(
        ResendConfig::new(config.email.api_key(), config.email.from_header())
            .with_base_url(&config.email.api_base)
            .with_timeout(config.email.timeout()),
    )
    .context("building email client")?;
    let mut identity = GoTrueConfig::new(&config.identity.admin_url, config.identity.service_key());
    if let Some(redirect) = &config.identity.activation_redirect_url {
        identity = identity.with_redirect_url(redirect);
    }
    let provisioner = GoTrueProvisioner::new(identity).context("building identity client")?;

    let ports = BillingPorts {
        accounts: Arc::new(PostgresAccountRepository::new(pool.clone())),
        invitations: Arc::new(PostgresInvitationRepository::new(pool.clone())),
        subscriptions: Arc::new(PostgresSubscriptionRepository::new(pool.clone())),
        payments: Arc::new(PostgresPaymentRepository::new(pool.clone())),
        links: Arc::new(PostgresLinkRepository::new(pool.clone())),
        webhook_events,
        provisioner: Arc::new(provisioner),
        processor: Arc::new(stripe),
        notifier: Arc::new(notifier),
    };
    let service = WebhookHandlers::build(ports, config.payment.fee_schedule())
        .into_service(webhook_secret);
    let app = webhook_router(WebhookAppState::new(Arc::new(service)));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.server.log_level))
        .context("parsing log filter")?;

    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
    Ok(())
}

/// Drops ledger records past retention. Failure only costs disk space.
async fn prune_webhook_ledger(ledger: &dyn WebhookEventRepository, retention_days: u32) {
    let cutoff = Utc::now() - ChronoDuration::days(i64::from(retention_days));
    match ledger.delete_before(cutoff).await {
        Ok(deleted) => tracing::info!(deleted, retention_days, "Webhook ledger pruned"),
        Err(e) => tracing::warn!(error = %e, "Failed to prune webhook ledger"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
