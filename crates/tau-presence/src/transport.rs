//! Transport collaborator contract used by presence loops.

use async_trait::async_trait;
use thiserror::Error;

use crate::action::PresenceAction;
use crate::state::ConversationId;

#[derive(Debug, Error)]
/// Enumerates supported `PresenceTransportError` values.
pub enum PresenceTransportError {
    #[error("transport request failed: {0}")]
    Http(String),
    #[error("transport rejected presence signal: {description}")]
    Api { description: String },
    #[error("transport returned an unreadable response: {0}")]
    Serde(String),
}

#[async_trait]
/// Trait contract for delivering a single advisory presence signal.
pub trait PresenceTransport: Send + Sync {
    async fn send_presence(
        &self,
        conversation_id: ConversationId,
        action: PresenceAction,
    ) -> Result<(), PresenceTransportError>;
}
