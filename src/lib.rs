//! # raop-receiver
//!
//! A pure Rust `AirPlay` 1 (RAOP) audio receiver: an RTSP 1.0 control server, Apple
//! device-authentication handshake, SDP stream negotiation, AES-128-CBC audio
//! decryption, and `_raop._tcp` mDNS advertisement.
//!
//! ## Example
//!
//! ```rust,no_run
//! use raop_receiver::{AirPlayReceiver, ReceiverConfig};
//!
//! # async fn example() -> Result<(), raop_receiver::error::AirPlayError> {
//! let config = ReceiverConfig::with_name("Living Room").port(5000);
//! let mut receiver = AirPlayReceiver::new(config);
//! receiver.start().await.map_err(|e| raop_receiver::error::AirPlayError::PipelineFailed(e.to_string()))?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Crate-wide error kinds
pub mod error;

/// mDNS service discovery/advertisement
pub mod discovery;

/// Wire protocol implementations: RTSP, SDP, RTP/RAOP, DAAP/DMAP, crypto
pub mod protocol;

/// Receiver session lifecycle and RTSP request handling
pub mod receiver;

// Re-exports
pub use error::AirPlayError;
pub use receiver::{AirPlayReceiver, ReceiverConfig, ReceiverState};
