//! The single accrual worker.

use std::sync::Arc;

use tokio::sync::mpsc;

use scrip_core::{Order, OrderNumber};
use scrip_store::Store;

use crate::client::{AccrualClient, Poll};

/// Consume orders from the queue and apply accrual results.
///
/// The worker is the only consumer of the queue and the only caller of
/// the external service, so concurrency against that service is bounded
/// by one in-flight request plus the queue itself. Every recoverable
/// failure is logged and dropped; the sweeper re-enqueues the order on a
/// later tick. The loop ends when all queue producers are gone.
pub async fn run_worker(
    mut orders: mpsc::Receiver<Order>,
    client: AccrualClient,
    store: Arc<dyn Store>,
) {
    while let Some(order) = orders.recv().await {
        match client.poll_order(&order.number).await {
            Ok(Poll::Ready(reply)) => {
                let number = match reply.order.parse::<OrderNumber>() {
                    Ok(number) => number,
                    Err(err) => {
                        tracing::warn!(error = %err, "accrual reply names an invalid order");
                        continue;
                    }
                };

                if let Err(err) = store
                    .process_accrual(&number, &reply.status, reply.accrual)
                    .await
                {
                    tracing::warn!(
                        order = %number,
                        error = %err,
                        "could not apply accrual result"
                    );
                }
            }
            Ok(Poll::RetryAfter(delay)) => {
                // Rate-limited: pause without holding any store resources
                // and drop the attempt; the sweeper brings the order back.
                tracing::info!(
                    order = %order.number,
                    delay_secs = delay.as_secs(),
                    "accrual service rate-limited, pausing"
                );
                tokio::time::sleep(delay).await;
            }
            Ok(Poll::Unavailable(status)) => {
                tracing::warn!(
                    order = %order.number,
                    status = %status,
                    "accrual service returned unexpected status"
                );
            }
            Err(err) => {
                tracing::warn!(order = %order.number, error = %err, "accrual poll failed");
            }
        }
    }
}
