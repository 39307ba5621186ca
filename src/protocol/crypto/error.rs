use thiserror::Error;

/// Cryptographic operation errors
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("RNG error")]
    RngError,
}
