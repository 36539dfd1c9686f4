use anyhow::{anyhow, Result};
use futures_util::StreamExt;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

use crate::modules::conversion::dispatcher::{self, DeliveryOutcome};
use crate::state::AppState;

pub async fn run(state: AppState) -> Result<()> {
    info!("📄 Starting conversion worker...");

    let channel = state.queue.get_channel().await;
    let channel_guard = channel.lock().await;

    let queue_name = state.config.queue_name.clone();

    channel_guard
        .queue_declare(
            &queue_name,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|e| anyhow!("Failed to declare queue: {}", e))?;

    // One unacknowledged message at a time. The broker holds the next
    // delivery until the current one is resolved, which also bounds
    // staging usage to a single pair.
    channel_guard
        .basic_qos(1, BasicQosOptions::default())
        .await
        .map_err(|e| anyhow!("Failed to set prefetch: {}", e))?;

    let mut consumer = channel_guard
        .basic_consume(
            &queue_name,
            "convert_worker",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await
        .map_err(|e| anyhow!("Failed to create consumer: {}", e))?;

    drop(channel_guard);

    info!("📄 Worker listening on '{}' – supports .docx and .pptx", queue_name);

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow!("Failed to install SIGTERM handler: {}", e))?;

    // A signal only interrupts the wait for the next delivery; the
    // handling of the current one always runs to resolution.
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down gracefully...");
                break;
            }
            _ = sigterm.recv() => {
                info!("Shutting down gracefully...");
                break;
            }
            delivery = consumer.next() => {
                match delivery {
                    Some(Ok(delivery)) => handle_delivery(&state, delivery).await,
                    Some(Err(e)) => error!("Consumer error: {}", e),
                    None => {
                        warn!("Consumer stream closed by broker");
                        break;
                    }
                }
            }
        }
    }

    if let Err(e) = state.queue.close().await {
        warn!("Failed to close broker connection cleanly: {}", e);
    }

    info!("Worker stopped.");
    Ok(())
}

async fn handle_delivery(state: &AppState, delivery: Delivery) {
    info!("📦 Received conversion job");

    let outcome = dispatcher::dispatch(
        &state.storage,
        &state.registry,
        &state.staging,
        &delivery.data,
        delivery.redelivered,
    )
    .await;

    resolve(delivery, outcome).await;
}

/// Resolves a delivery exactly once, after the dispatcher has returned.
async fn resolve(delivery: Delivery, outcome: DeliveryOutcome) {
    let result = match outcome {
        DeliveryOutcome::Acknowledge => delivery.ack(BasicAckOptions::default()).await,
        DeliveryOutcome::RejectRequeue => {
            delivery
                .nack(BasicNackOptions {
                    requeue: true,
                    ..BasicNackOptions::default()
                })
                .await
        }
        DeliveryOutcome::RejectDrop => {
            delivery
                .nack(BasicNackOptions {
                    requeue: false,
                    ..BasicNackOptions::default()
                })
                .await
        }
    };

    if let Err(e) = result {
        error!("Failed to resolve message: {}", e);
    }
}
