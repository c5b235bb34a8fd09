//! K.E.R.O.S. - Keeper of Emergency Response and Operational Safety
//!
//! Backend for the Upsilon-7 facility terminal: a tick-driven facility
//! simulator, the ARI chat relay, and the HTTP/WebSocket server that
//! exposes both.

pub use keros_runtime;

pub mod config;
pub mod facility;
pub mod relay;
pub mod server;
