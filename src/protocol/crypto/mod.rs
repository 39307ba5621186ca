//! Cryptographic primitives for AirPlay/RAOP authentication and payload decryption

mod cbc;
mod error;
mod rsa;

pub use self::cbc::decrypt_audio_payload;
pub use self::error::CryptoError;
pub use self::rsa::{CompatibleOsRng, RaopRsaPrivateKey, sizes as rsa_sizes};

/// Length of cryptographic values used by this receiver
pub mod lengths {
    /// AES-128 key length
    pub const AES_128_KEY: usize = 16;
    /// AES-128 IV / block length
    pub const AES_128_IV: usize = 16;
}
