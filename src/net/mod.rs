pub mod channel;
pub mod client;
pub mod framing;
pub mod host;
pub mod protocol;
pub mod tls;
pub mod transport;
