//! Apple-Challenge / Apple-Response handshake
//!
//! A client that wants to confirm it's talking to a genuine AirPlay receiver sends a
//! 16-byte nonce in the `Apple-Challenge` header; the receiver signs
//! `challenge ‖ server_ipv4 ‖ hw_addr`, zero-padded to 32 bytes, with the embedded
//! AirPort Express private key and returns the signature in `Apple-Response`.

use std::net::Ipv4Addr;

use crate::protocol::base64::{decode_tolerant, encode_stripped};
use crate::protocol::crypto::{CryptoError, RaopRsaPrivateKey};

/// Size of the client-supplied challenge nonce, in bytes
pub const CHALLENGE_SIZE: usize = 16;

/// Size of the buffer that gets signed (challenge + IPv4 + hw_addr, zero-padded)
const SIGNED_BUFFER_SIZE: usize = 32;

/// Decode the `Apple-Challenge` header value to its 16-byte nonce.
///
/// # Errors
/// Returns `CryptoError::DecryptionFailed` if the header isn't valid (tolerant) base64
/// or doesn't decode to exactly 16 bytes.
pub fn decode_challenge(header: &str) -> Result<[u8; CHALLENGE_SIZE], CryptoError> {
    let bytes = decode_tolerant(header)
        .map_err(|e| CryptoError::DecryptionFailed(format!("invalid base64: {e}")))?;

    bytes.try_into().map_err(|bytes: Vec<u8>| {
        CryptoError::InvalidKeyLength {
            expected: CHALLENGE_SIZE,
            actual: bytes.len(),
        }
    })
}

/// Build the 32-byte buffer to be signed: `challenge ‖ ipv4 ‖ hw_addr ‖ 0*`.
#[must_use]
pub fn build_signed_buffer(
    challenge: &[u8; CHALLENGE_SIZE],
    server_ip: &Ipv4Addr,
    hw_addr: &[u8; 6],
) -> [u8; SIGNED_BUFFER_SIZE] {
    let mut buf = [0u8; SIGNED_BUFFER_SIZE];
    buf[0..16].copy_from_slice(challenge);
    buf[16..20].copy_from_slice(&server_ip.octets());
    buf[20..26].copy_from_slice(hw_addr);
    // Remaining 6 bytes stay zero.
    buf
}

/// Compute the `Apple-Response` header value for a decoded challenge.
///
/// # Errors
/// Returns `CryptoError` if the raw PKCS#1 v1.5 signing operation fails.
pub fn sign_challenge(
    private_key: &RaopRsaPrivateKey,
    challenge: &[u8; CHALLENGE_SIZE],
    server_ip: &Ipv4Addr,
    hw_addr: &[u8; 6],
) -> Result<String, CryptoError> {
    let buffer = build_signed_buffer(challenge, server_ip, hw_addr);
    let signature = private_key.sign_raw_pkcs1v15(&buffer)?;
    Ok(encode_stripped(&signature))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> RaopRsaPrivateKey {
        RaopRsaPrivateKey::embedded()
    }

    #[test]
    fn decodes_unpadded_challenge() {
        let challenge = [0x42u8; 16];
        let header = crate::protocol::base64::encode_stripped(&challenge);
        assert_eq!(decode_challenge(&header).unwrap(), challenge);
    }

    #[test]
    fn rejects_wrong_length() {
        let header = crate::protocol::base64::encode_stripped(&[0u8; 10]);
        assert!(decode_challenge(&header).is_err());
    }

    #[test]
    fn signed_buffer_layout() {
        let challenge = [1u8; 16];
        let ip = Ipv4Addr::new(192, 168, 1, 2);
        let hw_addr = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF];
        let buf = build_signed_buffer(&challenge, &ip, &hw_addr);
        assert_eq!(&buf[0..16], &challenge[..]);
        assert_eq!(&buf[16..20], &ip.octets());
        assert_eq!(&buf[20..26], &hw_addr);
        assert_eq!(&buf[26..32], &[0u8; 6]);
    }

    #[test]
    fn sign_challenge_produces_unpadded_base64() {
        let key = test_key();
        let challenge = [7u8; 16];
        let ip = Ipv4Addr::new(10, 0, 0, 1);
        let hw_addr = [0, 1, 2, 3, 4, 5];
        let response = sign_challenge(&key, &challenge, &ip, &hw_addr).unwrap();
        assert!(!response.ends_with('='));
        // A 2048-bit signature base64-encodes to 342 or 343 chars before stripping.
        assert!(response.len() >= 340);
    }

    #[test]
    fn sign_challenge_is_deterministic() {
        let key = test_key();
        let challenge = [3u8; 16];
        let ip = Ipv4Addr::new(10, 0, 0, 2);
        let hw_addr = [5, 5, 5, 5, 5, 5];
        let a = sign_challenge(&key, &challenge, &ip, &hw_addr).unwrap();
        let b = sign_challenge(&key, &challenge, &ip, &hw_addr).unwrap();
        assert_eq!(a, b);
    }
}
