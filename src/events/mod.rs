use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::entities::OrderStatus;
use crate::notifications::Notifier;

/// Domain events emitted by the business services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderPlaced {
        order_id: Uuid,
        user_id: Uuid,
        store_id: Uuid,
        total_amount: Decimal,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    OrderCancelled(Uuid),
    CartItemAdded {
        user_id: Uuid,
        product_id: Uuid,
    },
    ReviewCreated {
        product_id: Uuid,
        user_id: Uuid,
    },
    UserRegistered(Uuid),
    /// One-time login code issued; delivery happens off the request path.
    OtpIssued {
        email: String,
        code: String,
    },
}

/// Cloneable handle for publishing events onto the processor channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("failed to send event: {e}"))
    }

    /// Publish without letting a full or closed channel affect the caller.
    /// Event delivery is always best-effort relative to the business write.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "dropping event");
        }
    }
}

/// Background loop draining the event channel. Notification-bearing events
/// are handed to the notifier on a detached task so a slow or failing
/// delivery never backs up the channel.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, notifier: Option<Arc<dyn Notifier>>) {
    while let Some(event) = rx.recv().await {
        match &event {
            Event::OtpIssued { email, code } => {
                if let Some(notifier) = notifier.clone() {
                    let email = email.clone();
                    let code = code.clone();
                    tokio::spawn(async move {
                        notifier.send_login_code(&email, &code).await;
                    });
                } else {
                    debug!(email = %email, "no notifier configured; one-time code not delivered");
                }
            }
            other => {
                debug!(event = ?other, "event processed");
            }
        }
    }
    debug!("event channel closed; processor exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_or_log_survives_dropped_receiver() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let sender = EventSender::new(tx);
        // Must not panic or error out to the caller.
        sender.send_or_log(Event::OrderCancelled(Uuid::new_v4())).await;
    }

    #[tokio::test]
    async fn events_round_trip_through_channel() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let id = Uuid::new_v4();
        sender.send(Event::UserRegistered(id)).await.unwrap();
        match rx.recv().await {
            Some(Event::UserRegistered(got)) => assert_eq!(got, id),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
