use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events pushed over the WebSocket gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, username: String },

    /// A caregiver redeemed a code; sent to both parties
    LinkCreated {
        caregiver_id: Uuid,
        user_id: Uuid,
        created_at: DateTime<Utc>,
    },

    /// Either party removed the link; sent to both parties
    LinkRemoved { caregiver_id: Uuid, user_id: Uuid },

    /// The owner's code was replaced (e.g. from another device)
    LinkCodeRegenerated { user_id: Uuid },
}

impl GatewayEvent {
    /// Users that should receive this event.
    pub fn recipients(&self) -> Vec<Uuid> {
        match self {
            Self::Ready { user_id, .. } | Self::LinkCodeRegenerated { user_id } => vec![*user_id],
            Self::LinkCreated {
                caregiver_id,
                user_id,
                ..
            }
            | Self::LinkRemoved {
                caregiver_id,
                user_id,
            } => vec![*caregiver_id, *user_id],
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },
}
