//! Live system monitor
//!
//! A [`publisher::Publisher`] samples host metrics on a fixed interval,
//! renders them into one HTML payload and hands it to a [`hub::Hub`], which
//! fans it out to every connected WebSocket client through per-subscriber
//! bounded mailboxes.

pub mod config;
pub mod hardware;
pub mod hub;
pub mod publisher;
pub mod server;
pub mod util;
