//! HTTP and WebSocket Server
//!
//! Serves the chat relay and the facility to the terminal UI.

mod chat;
mod facility;
mod handler;
mod protocol;
mod router;
mod state;

pub use facility::HttpFacilityError;
pub use handler::handle_websocket;
pub use protocol::*;
pub use router::create_router;
pub use state::*;
