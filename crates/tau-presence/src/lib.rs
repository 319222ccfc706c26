//! Per-conversation presence scheduling for Tau chat transports.
//!
//! Keeps a "currently composing" indicator alive in each conversation by
//! running one presence loop per conversation. Loops emit through a
//! [`PresenceTransport`], honor mute windows, and stop on TTL expiry
//! (message-triggered mode) or explicit stop requests (continuous mode).
//!
//! ```rust
//! # use std::sync::Arc;
//! # use async_trait::async_trait;
//! use tau_presence::{
//!     ConversationId, GlobalDefaults, PresenceAction, PresenceScheduler, PresenceTransport,
//!     PresenceTransportError,
//! };
//!
//! struct Silent;
//!
//! #[async_trait]
//! impl PresenceTransport for Silent {
//!     async fn send_presence(
//!         &self,
//!         _conversation_id: ConversationId,
//!         _action: PresenceAction,
//!     ) -> Result<(), PresenceTransportError> {
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> anyhow::Result<()> {
//! let scheduler = PresenceScheduler::new(Arc::new(Silent), GlobalDefaults::default())?;
//! scheduler.on_message(ConversationId(100));
//! assert!(scheduler.is_active(ConversationId(100)));
//! assert_eq!(scheduler.stop_all().await, 1);
//! # Ok(())
//! # }
//! ```

pub mod action;
mod presence_loop;
pub mod scheduler;
pub mod state;
mod store;
mod telemetry;
pub mod transport;

pub use action::*;
pub use presence_loop::MUTE_POLL_INTERVAL;
pub use scheduler::*;
pub use state::*;
pub use telemetry::PresenceTelemetrySnapshot;
pub use transport::*;
