// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `wagent serve` command implementation.
//!
//! Opens SQLite storage, builds the completion gateway, orchestrator and
//! billing service, then runs the webhook gateway alongside the inbound and
//! billing workers until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use wagent_agent::{
    InboundHandler, InboundWorker, MessageOrchestrator, ProductEnricher, TimingSimulator,
    install_signal_handler,
};
use wagent_billing::{BillingService, BillingWorker, UsageLedger, notifier_from_config};
use wagent_config::WagentConfig;
use wagent_context::ContextEngine;
use wagent_core::{StorageAdapter, WagentError};
use wagent_gateway::{BridgeChannel, GatewayState, WebhookAuth};
use wagent_provider::CompletionGateway;
use wagent_storage::{QueuePublisher, SqliteStorage};

/// Runs the `wagent serve` command.
pub async fn run_serve(config: WagentConfig) -> Result<(), WagentError> {
    init_tracing(&config.agent.log_level);
    info!(agent = %config.agent.name, "starting wagent serve");

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    let db = storage.database()?.clone();

    // Billing: ledger, alerts and the usage gate consulted before each reply.
    let ledger = UsageLedger::new(db.clone(), config.billing.currency.clone());
    let notifier = notifier_from_config(&config.notifications)?;
    info!(sink = notifier.name(), "notification sink ready");
    let billing = Arc::new(BillingService::new(ledger, &config.billing, notifier));

    // Reply pipeline.
    let gateway = Arc::new(CompletionGateway::from_config(&config.provider)?);
    info!(vendors = ?gateway.vendors(), "completion gateway ready");
    let orchestrator = Arc::new(MessageOrchestrator::new(
        ContextEngine::new(config.context.clone()),
        gateway,
        ProductEnricher::new(
            storage.clone(),
            config.context.catalog_excerpt_limit,
            config.context.catalog_reply_limit,
        ),
        TimingSimulator::new(config.timing.clone()),
        Arc::new(QueuePublisher::new(db.clone())),
    ));

    let bridge = Arc::new(BridgeChannel::new(&config.bridge)?);
    let processing_timeout = Duration::from_secs(config.worker.processing_timeout_secs);
    let handler = Arc::new(
        InboundHandler::new(storage.clone(), billing.clone(), orchestrator, bridge)
            .with_estimated_units(config.billing.estimated_units_per_message)
            .with_processing_timeout(processing_timeout),
    );

    let cancel = install_signal_handler();

    let inbound_worker = InboundWorker::new(db.clone(), handler, &config.worker);
    let inbound_task = tokio::spawn(inbound_worker.run(cancel.clone(), processing_timeout));

    let billing_worker = BillingWorker::new(db.clone(), billing, &config.worker);
    let billing_task = tokio::spawn(billing_worker.run(cancel.clone()));

    let state = GatewayState::new(
        db,
        WebhookAuth::new(config.gateway.webhook_secret.clone()),
    );
    let served = wagent_gateway::serve(&config.gateway, state, cancel.clone()).await;
    if let Err(e) = &served {
        error!(error = %e, "webhook gateway failed");
    }
    // Stop the workers whether the gateway exited on a signal or on an error.
    cancel.cancel();

    for (name, task) in [("inbound", inbound_task), ("billing", billing_task)] {
        if let Err(e) = task.await {
            warn!(worker = name, error = %e, "worker task ended abnormally");
        }
    }

    if let Err(e) = storage.close().await {
        warn!(error = %e, "storage did not close cleanly");
    }

    info!("wagent serve shutdown complete");
    served
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("wagent={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
