//! Live channel for ResKit chat rooms
//!
//! Speaks Socket.IO v5 over the Engine.IO v4 websocket transport. The chat
//! view joins one room per project and receives `new_message` and `new_card`
//! events for it.
//!
//! ```no_run
//! use reskit_core::{ClientConfig, Id};
//! use reskit_provider_live::{LiveChannel, LiveClient, LiveConfig, LiveEvent};
//!
//! # async fn run() -> reskit_core::Result<()> {
//! let config = LiveConfig::from_client_config(&ClientConfig::from_env()?)?;
//! let mut client = LiveClient::new(config);
//! let mut events = client.connect().await?;
//! while let Some(event) = events.recv().await {
//!     if event == LiveEvent::Connected {
//!         client.join(&Id::Numeric(42))?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod codec;
pub mod events;

pub use client::{socket_url, ConnectionState, LiveChannel, LiveClient, LiveConfig};
pub use codec::{EnginePacket, OpenHandshake, SocketPacket};
pub use events::{LiveEvent, RoomCommand};
