use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Domain events emitted by the service layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Catalog events
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductsImported {
        file_name: String,
        total: usize,
        created: usize,
        failed: usize,
    },

    // Inventory events
    InventoryAdjusted {
        product_id: Uuid,
        old_on_hand: i32,
        new_on_hand: i32,
        reason: String,
    },
    InventoryReserved {
        product_id: Uuid,
        quantity: i32,
        order_id: Uuid,
    },
    InventoryReleased {
        product_id: Uuid,
        quantity: i32,
        order_id: Uuid,
    },

    // Merchant / KYB events
    MerchantRegistered(Uuid),
    MerchantKybStatusChanged {
        merchant_id: Uuid,
        old_status: String,
        new_status: String,
    },

    // Wallet events
    WalletCredited {
        wallet_id: Uuid,
        amount_cents: i64,
    },
    WalletDebited {
        wallet_id: Uuid,
        amount_cents: i64,
    },

    // Order events
    OrderCreated(Uuid),
    OrderSubmitted {
        order_id: Uuid,
        tracking_number: String,
    },
    OrderCancelled(Uuid),

    // User events
    UserCreated(Uuid),
    UserLoggedIn(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Background consumer for the event channel.
///
/// Currently events are only logged; the channel exists so downstream
/// consumers (webhooks, projections) can attach without touching services.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    info!("Event processor started");
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::ProductsImported {
                file_name,
                total,
                created,
                failed,
            } => {
                info!(
                    file_name = %file_name,
                    total, created, failed,
                    "Processed bulk product import"
                );
            }
            other => debug!(event = ?other, "Event processed"),
        }
    }
    info!("Event processor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let id = Uuid::new_v4();

        sender.send(Event::ProductCreated(id)).await.unwrap();

        match rx.recv().await {
            Some(Event::ProductCreated(got)) => assert_eq!(got, id),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_fails_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender.send(Event::OrderCancelled(Uuid::new_v4())).await.is_err());
    }
}
