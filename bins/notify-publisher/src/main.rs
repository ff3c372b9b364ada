//! # notify-publisher
//!
//! Dev tool for injecting a hand-built notification envelope or continuation
//! payload onto the syncd notification topic, mirroring the teacher
//! workspace's own `kafka-producer` utility but narrowed to this pipeline's
//! two recognized inbound shapes (spec §6) instead of arbitrary JSON.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use syncd_core::{ChangeEntry, ContinuationPayload, NotificationEnvelope};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "notify-publisher", about = "Inject a notification or continuation message")]
struct Args {
    #[arg(long, default_value = "localhost:9092")]
    brokers: String,

    #[arg(long, default_value = "syncd.notifications")]
    topic: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish a notification envelope with a single `updated` change entry.
    Notify {
        #[arg(long)]
        site: String,
        #[arg(long)]
        list: String,
        #[arg(long, default_value = "dev-subscription")]
        subscription_id: String,
    },
    /// Publish an empty handshake-only envelope (spec §8 scenario S1).
    Handshake,
    /// Publish a continuation payload directly, bypassing the delta pull.
    Continuation {
        #[arg(long, value_delimiter = ',')]
        item_ids: Vec<String>,
        #[arg(long)]
        delta_link: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let producer: FutureProducer = ClientConfig::new()
        .set("bootstrap.servers", &args.brokers)
        .set("message.timeout.ms", "10000")
        .create()
        .context("failed to create Kafka producer")?;

    let body = match &args.command {
        Command::Notify {
            site,
            list,
            subscription_id,
        } => serde_json::to_vec(&NotificationEnvelope {
            value: vec![ChangeEntry {
                subscription_id: subscription_id.clone(),
                resource: format!("sites/{site}/lists/{list}"),
                change_type: "updated".to_string(),
                client_state: "notify-publisher".to_string(),
            }],
        })?,
        Command::Handshake => serde_json::to_vec(&NotificationEnvelope { value: vec![] })?,
        Command::Continuation { item_ids, delta_link } => serde_json::to_vec(&ContinuationPayload {
            item_ids: item_ids.clone(),
            delta_link: delta_link.clone(),
        })?,
    };

    info!(topic = %args.topic, body = %String::from_utf8_lossy(&body), "publishing message");

    producer
        .send(FutureRecord::<(), _>::to(&args.topic).payload(&body), Duration::from_secs(5))
        .await
        .map_err(|(e, _)| anyhow::anyhow!("failed to publish message: {e}"))?;

    info!("published");
    Ok(())
}
