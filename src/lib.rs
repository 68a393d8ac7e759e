//! Outbreak Server Library
//!
//! Host-authoritative simulation core for a zombies-vs-survivors arena:
//! the hosting peer runs the match and streams snapshots to joined clients
//! over WebTransport.

pub mod config;
pub mod game;
pub mod metrics;
pub mod net;
pub mod util;
