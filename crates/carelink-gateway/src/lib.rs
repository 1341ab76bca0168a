//! Realtime push of link events over WebSocket.
//!
//! Clients connect to `/gateway`, send `Identify { token }` and then receive
//! only the events that concern them.

pub mod connection;
pub mod dispatcher;

pub use dispatcher::Dispatcher;
