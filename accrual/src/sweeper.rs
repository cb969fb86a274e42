//! The order sweeper.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use scrip_core::Order;
use scrip_store::Store;

/// Periodically re-enqueue every unterminated order.
///
/// The sweeper is the pipeline's retry mechanism: offers dropped by the
/// upload handler on a full queue, attempts dropped by the worker on
/// rate-limits or failures, and orders created before the worker was
/// configured all come back on the next tick. Sends block, so a full
/// queue simply stretches the tick instead of losing orders. The loop
/// ends when the worker side of the queue is gone.
pub async fn run_sweeper(
    store: Arc<dyn Store>,
    orders: mpsc::Sender<Order>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);

    loop {
        ticker.tick().await;

        let pending = match store.extract_unterminated_orders().await {
            Ok(pending) => pending,
            Err(err) => {
                tracing::warn!(error = %err, "could not extract unterminated orders");
                continue;
            }
        };

        for order in pending {
            if orders.send(order).await.is_err() {
                return;
            }
        }
    }
}
