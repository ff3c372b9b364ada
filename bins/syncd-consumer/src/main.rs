//! # syncd-consumer
//!
//! The long-running queue consumer process: the explicit start-up phase
//! (spec §9 REDESIGN FLAGS) connects the destination pool, builds the
//! schema registry, and constructs the live Source/queue adapters before
//! the process ever reads a message — readiness blocks on all three.
//!
//! Once started, each inbound Kafka message is handed to its own spawned
//! task (bounded by a `Semaphore` sized from `worker_concurrency`), which
//! calls `syncd_sync::dispatch` and commits the message's offset on every
//! outcome except a rethrown (non-archivable) error, which is left
//! uncommitted for the broker's own redelivery policy.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rdkafka::client::ClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, ConsumerContext, StreamConsumer};
use rdkafka::message::Message;
use sqlx::postgres::PgPoolOptions;
use syncd_core::{production_catalog, AppConfig, SystemClock};
use syncd_io::{HttpSourceClient, KafkaQueueClient};
use syncd_sync::Orchestrator;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct LoggingContext;
impl ClientContext for LoggingContext {}
impl ConsumerContext for LoggingContext {}

const NOTIFICATION_TOPIC: &str = "syncd.notifications";
const POISON_TOPIC: &str = "syncd.notifications.poison";
const CONSUMER_GROUP: &str = "syncd-consumer";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match AppConfig::load() {
        Ok(cfg) => cfg,
        Err(err) => {
            // spec §6 exit codes: a config error at start-up is fatal.
            error!(error = %err, "configuration error at start-up");
            std::process::exit(1);
        }
    };

    info!(site_id = %config.site_id, list_id = %config.list_id, "starting syncd-consumer");

    let pool = PgPoolOptions::new()
        .max_connections(config.worker_concurrency as u32 + 2)
        .connect(&config.db_connection)
        .await
        .context("connecting to the destination database")?;
    info!("database pool ready");

    let registry = Arc::new(production_catalog());
    info!(tables = registry.tables().len(), "schema registry built");

    let source = Arc::new(HttpSourceClient::new(
        config.source_base_url.clone(),
        config.source_credentials.clone(),
    ));

    let queue = Arc::new(
        KafkaQueueClient::new(&config.queue_connection, NOTIFICATION_TOPIC, POISON_TOPIC)
            .context("constructing the Kafka queue client")?,
    );

    let orchestrator = Arc::new(Orchestrator::new(
        registry,
        source,
        pool,
        Arc::new(SystemClock),
        config.clone(),
    ));

    let consumer: Arc<StreamConsumer<LoggingContext>> = Arc::new(
        ClientConfig::new()
            .set("bootstrap.servers", &config.queue_connection)
            .set("group.id", CONSUMER_GROUP)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .create_with_context(LoggingContext)
            .context("constructing the Kafka stream consumer")?,
    );
    consumer
        .subscribe(&[NOTIFICATION_TOPIC])
        .context("subscribing to the notification topic")?;
    info!(topic = NOTIFICATION_TOPIC, "subscribed, ready to serve traffic");

    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            shutdown_signal.cancel();
        }
    });

    let fanout = Arc::new(Semaphore::new(config.worker_concurrency));
    let run_timeout = Duration::from_secs(config.run_timeout_secs);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("shutting down, no new messages will be accepted");
                break;
            }
            recv = consumer.recv() => {
                let message = match recv {
                    Ok(m) => m,
                    Err(err) => {
                        warn!(error = %err, "error receiving from broker");
                        continue;
                    }
                };

                let raw_body = message.payload().unwrap_or_default().to_vec();
                let owned_message = message.detach();
                let orchestrator = Arc::clone(&orchestrator);
                let queue = Arc::clone(&queue);
                let permit = Arc::clone(&fanout).acquire_owned().await.expect("semaphore never closes");
                let consumer_handle = Arc::clone(&consumer);

                tokio::spawn(async move {
                    let _permit = permit;
                    let outcome = tokio::time::timeout(
                        run_timeout,
                        syncd_sync::dispatch(&raw_body, &orchestrator, queue.as_ref()),
                    )
                    .await;

                    match outcome {
                        Ok(Ok(_)) => {
                            if let Err(err) = consumer_handle.commit_message(&owned_message, CommitMode::Async) {
                                warn!(error = %err, "failed to commit offset after successful dispatch");
                            }
                        }
                        Ok(Err(err)) if err.is_archivable() => {
                            // Shouldn't happen: dispatch already archives
                            // archivable errors internally. Defensive commit
                            // so a bug here doesn't wedge the partition.
                            warn!(error = %err, "archivable error escaped dispatch, committing anyway");
                            let _ = consumer_handle.commit_message(&owned_message, CommitMode::Async);
                        }
                        Ok(Err(err)) => {
                            error!(error = %err, "rethrown error, leaving offset uncommitted for redelivery");
                        }
                        Err(_) => {
                            error!("dispatch exceeded the per-run timeout, leaving offset uncommitted");
                        }
                    }
                });
            }
        }
    }

    Ok(())
}
