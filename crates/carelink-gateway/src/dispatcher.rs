use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::trace;
use uuid::Uuid;

use carelink_types::events::GatewayEvent;

/// Routes events to the connected users they concern.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Default)]
struct DispatcherInner {
    /// Per-user targeted send channels: user_id -> (conn_id, sender).
    /// The newest connection for a user replaces any older one.
    user_channels: RwLock<HashMap<Uuid, (Uuid, mpsc::UnboundedSender<GatewayEvent>)>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a per-user targeted channel. Returns (conn_id, receiver).
    pub async fn register_user_channel(&self, user_id: Uuid) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.user_channels.write().await.insert(user_id, (conn_id, tx));
        (conn_id, rx)
    }

    /// Unregister a per-user targeted channel, but only if conn_id matches.
    pub async fn unregister_user_channel(&self, user_id: Uuid, conn_id: Uuid) {
        let mut channels = self.inner.user_channels.write().await;
        if let Some((stored_conn_id, _)) = channels.get(&user_id) {
            if *stored_conn_id == conn_id {
                channels.remove(&user_id);
            }
        }
    }

    /// Send a targeted event to a specific user. Offline users miss it.
    pub async fn send_to_user(&self, user_id: Uuid, event: GatewayEvent) {
        let channels = self.inner.user_channels.read().await;
        if let Some((_, tx)) = channels.get(&user_id) {
            let _ = tx.send(event);
        }
    }

    /// Deliver an event to every user it names.
    pub async fn publish(&self, event: GatewayEvent) {
        let recipients = event.recipients();
        trace!("Publishing {:?} to {} recipients", event, recipients.len());
        for user_id in recipients {
            self.send_to_user(user_id, event.clone()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn link_event_reaches_both_parties_only() {
        let dispatcher = Dispatcher::new();
        let caregiver = Uuid::new_v4();
        let user = Uuid::new_v4();
        let bystander = Uuid::new_v4();

        let (_, mut caregiver_rx) = dispatcher.register_user_channel(caregiver).await;
        let (_, mut user_rx) = dispatcher.register_user_channel(user).await;
        let (_, mut bystander_rx) = dispatcher.register_user_channel(bystander).await;

        let event = GatewayEvent::LinkCreated {
            caregiver_id: caregiver,
            user_id: user,
            created_at: chrono::Utc::now(),
        };
        dispatcher.publish(event.clone()).await;

        assert_eq!(caregiver_rx.recv().await.unwrap(), event);
        assert_eq!(user_rx.recv().await.unwrap(), event);
        assert!(bystander_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn stale_connection_cannot_unregister_newer_one() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();

        let (old_conn, mut old_rx) = dispatcher.register_user_channel(user).await;
        let (new_conn, mut new_rx) = dispatcher.register_user_channel(user).await;

        dispatcher.unregister_user_channel(user, old_conn).await;
        dispatcher.send_to_user(user, GatewayEvent::LinkCodeRegenerated { user_id: user }).await;
        assert!(new_rx.recv().await.is_some());
        // replaced, so its sender is gone
        assert!(old_rx.recv().await.is_none());

        dispatcher.unregister_user_channel(user, new_conn).await;
        dispatcher.send_to_user(user, GatewayEvent::LinkCodeRegenerated { user_id: user }).await;
        assert!(new_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn sending_to_offline_user_is_a_no_op() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();
        dispatcher.send_to_user(user, GatewayEvent::LinkCodeRegenerated { user_id: user }).await;
        dispatcher.publish(GatewayEvent::LinkRemoved { caregiver_id: Uuid::new_v4(), user_id: user }).await;
    }
}
