//! Types shared between the carelink crates: domain models, REST payloads
//! and realtime gateway events.

pub mod api;
pub mod events;
pub mod models;
